pub mod anthropic;
pub mod error;
pub mod openai;

use crate::config::Settings;
use std::sync::Arc;

/// A single role-framed completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => anyhow::bail!("unsupported LLM_PROVIDER: {other} (expected openai or anthropic)"),
        }
    }
}

#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<String>;
}

/// Builds the configured generator, or `None` when no API key is available.
///
/// `LLM_PROVIDER` picks the backend explicitly; otherwise OpenAI is used when
/// its key is present, then Anthropic.
pub fn from_settings(settings: &Settings) -> anyhow::Result<Option<Arc<dyn TextGenerator>>> {
    let provider = match settings.llm_provider.as_deref() {
        Some(name) => Provider::parse(name)?,
        None if settings.openai_api_key.is_some() => Provider::OpenAI,
        None if settings.anthropic_api_key.is_some() => Provider::Anthropic,
        None => return Ok(None),
    };

    let client: Arc<dyn TextGenerator> = match provider {
        Provider::OpenAI => Arc::new(openai::OpenAiClient::from_settings(settings)?),
        Provider::Anthropic => Arc::new(anthropic::AnthropicClient::from_settings(settings)?),
    };
    Ok(Some(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_are_case_insensitive() {
        assert_eq!(Provider::parse("OpenAI").unwrap(), Provider::OpenAI);
        assert_eq!(Provider::parse(" anthropic ").unwrap(), Provider::Anthropic);
        assert!(Provider::parse("cohere").is_err());
    }
}
