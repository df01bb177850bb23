//! Ollama Provider Implementation
//!
//! Calls a local Ollama instance through `POST {endpoint}/api/generate` with
//! streaming disabled. Local models can take several minutes per chunk, so
//! the default client timeout is generous.
//!
//! # Examples
//!
//! ```no_run
//! use clinitag_llm::OllamaProvider;
//! use clinitag_domain::traits::ExtractionClient;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3");
//! let text = provider.generate("Extraia as tags...").unwrap();
//! ```

use crate::{truncate_body, LlmError};
use clinitag_domain::traits::ExtractionClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "llama3";

/// Default timeout for one generation request
pub const DEFAULT_TIMEOUT_SECS: u64 = 480;

/// Ollama API provider for local inference
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaProvider {
    /// Create a provider for `model` served at `endpoint`
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create a provider against the default local endpoint
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
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

    fn request(&self, prompt: &str) -> Result<String, LlmError> {
        // Built per call: a blocking client owns a runtime and must be
        // created and dropped off the async workers.
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        let url = format!("{}/api/generate", self.endpoint);
        debug!(url = %url, model = %self.model, prompt_len = prompt.len(), "Calling Ollama");

        let response = client
            .post(&url)
            .json(&OllamaGenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .map_err(|e| LlmError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        Ok(parsed.response)
    }
}

impl ExtractionClient for OllamaProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.request(prompt)
    }
}
