use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    /// Pulls `error.message` out of an OpenAI- or Anthropic-style error body.
    pub fn service_message(&self) -> Option<&str> {
        self.raw_response_json
            .as_ref()?
            .get("error")?
            .get("message")?
            .as_str()
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )?;
        if let Some(msg) = self.service_message() {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LlmDiagnosticsError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_includes_service_message() {
        let err = LlmDiagnosticsError {
            provider: Provider::OpenAI,
            stage: "http",
            detail: "status=429 Too Many Requests".to_string(),
            raw_output: None,
            raw_response_json: Some(json!({
                "error": {"message": "Rate limit reached", "type": "requests"}
            })),
        };
        assert_eq!(
            err.to_string(),
            "LLM error (provider=OpenAI, stage=http): status=429 Too Many Requests: Rate limit reached"
        );
    }

    #[test]
    fn display_without_body() {
        let err = LlmDiagnosticsError {
            provider: Provider::Anthropic,
            stage: "decode",
            detail: "no text content".to_string(),
            raw_output: Some("{}".to_string()),
            raw_response_json: None,
        };
        assert_eq!(
            err.to_string(),
            "LLM error (provider=Anthropic, stage=decode): no text content"
        );
    }
}
