use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{GenerateRequest, Provider, TextGenerator};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    fn chat_request<'a>(&'a self, req: &'a GenerateRequest) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &req.system,
                },
                ChatMessage {
                    role: "user",
                    content: &req.prompt,
                },
            ],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        }
    }

    async fn create_chat_completion(
        &self,
        req: ChatCompletionRequest<'_>,
    ) -> anyhow::Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read OpenAI response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                provider: Provider::OpenAI,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        serde_json::from_str::<ChatCompletionResponse>(&text)
            .with_context(|| format!("failed to decode OpenAI response: {text}"))
    }

    fn response_text(res: ChatCompletionResponse) -> anyhow::Result<String> {
        let choice = res.choices.into_iter().next().ok_or_else(|| LlmDiagnosticsError {
            provider: Provider::OpenAI,
            stage: "decode",
            detail: "response has no choices".to_string(),
            raw_output: None,
            raw_response_json: None,
        })?;

        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!("OpenAI finish_reason=length; summary may be cut short");
        }
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<String> {
        let res = self.create_chat_completion(self.chat_request(req)).await?;
        Self::response_text(res)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> OpenAiClient {
        OpenAiClient {
            http: reqwest::Client::new(),
            api_key: "sk-test".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    #[test]
    fn request_carries_roles_and_sampling_params() {
        let c = client();
        let req = GenerateRequest {
            system: "You are a helpful financial assistant.".to_string(),
            prompt: "Summarize this.".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        };
        let body = serde_json::to_value(c.chat_request(&req)).unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are a helpful financial assistant.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["max_tokens"], 1000);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn takes_first_choice_content() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "- Revenue up"}, "finish_reason": "stop"}
            ]
        }))
        .unwrap();
        assert_eq!(OpenAiClient::response_text(res).unwrap(), "- Revenue up");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        let err = OpenAiClient::response_text(res).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
