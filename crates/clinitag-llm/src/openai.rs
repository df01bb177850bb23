//! OpenAI-compatible chat completions provider

use crate::{truncate_body, LlmError};
use clinitag_domain::traits::ExtractionClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default API base URL
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default timeout for one generation request
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Provider for `POST {endpoint}/v1/chat/completions`
///
/// The prompt is sent as a single user message.
#[derive(Clone)]
pub struct OpenAiProvider {
    endpoint: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a provider with an explicit endpoint
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ExtractionClient for OpenAiProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        let url = format!("{}/v1/chat/completions", self.endpoint);
        debug!(url = %url, model = %self.model, prompt_len = prompt.len(), "Calling chat completions");

        let response = client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
            })
            .send()
            .map_err(|e| LlmError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("Response has no message content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAiProvider::new("https://api.openai.com/", DEFAULT_MODEL, "sk-test");
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(provider.model(), "gpt-4o");
        assert_eq!(provider.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = OpenAiProvider::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, "sk-secret");
        let rendered = format!("{:?}", provider);
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn test_response_content_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"[]"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("[]"));
    }

    #[test]
    fn test_unreachable_is_error() {
        let provider = OpenAiProvider::new("http://127.0.0.1:1", DEFAULT_MODEL, "k").with_timeout(5);
        assert!(provider.generate("x").is_err());
    }
}
