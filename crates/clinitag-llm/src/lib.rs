//! Clinitag Generation Provider Layer
//!
//! Implementations of the `ExtractionClient` trait from `clinitag-domain`.
//! Every provider is a blocking, single-attempt client: the extraction
//! pipeline calls it from `spawn_blocking` under its own timeout and owns
//! all retry policy through the chunk ledger.
//!
//! # Providers
//!
//! - `MockProvider`: scripted test double
//! - `OllamaProvider`: local Ollama `/api/generate`
//! - `OpenAiProvider`: OpenAI-compatible chat completions
//!
//! # Examples
//!
//! ```
//! use clinitag_llm::MockProvider;
//! use clinitag_domain::traits::ExtractionClient;
//!
//! let provider = MockProvider::new("[]");
//! assert_eq!(provider.generate("any prompt").unwrap(), "[]");
//! ```

#![warn(missing_docs)]

pub mod ollama;
pub mod openai;

use clinitag_domain::traits::ExtractionClient;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Errors that can occur during generation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Backend unreachable or the connection failed mid-request
    #[error("Communication error: {0}")]
    Communication(String),

    /// The backend did not answer within the client timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// The backend answered with something that is not a completion
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not available on the backend
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Map a reqwest failure onto the error taxonomy
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(timeout_secs)
        } else if err.is_decode() {
            LlmError::InvalidResponse(err.to_string())
        } else {
            LlmError::Communication(err.to_string())
        }
    }
}

/// Longest response body kept in an `HttpStatus` error
pub(crate) const MAX_ERROR_BODY: usize = 500;

pub(crate) fn truncate_body(body: String) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body,
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Respond(String),
    Fail(LlmError),
    Stall(Duration, String),
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<(String, Scripted)>,
    prompts: Vec<String>,
}

/// Scripted generation provider for deterministic tests
///
/// Rules are matched by substring against the prompt, first registered rule
/// wins; prompts matching no rule get the default response. Clones share
/// state, so a test can keep a handle while the pipeline owns another.
///
/// # Examples
///
/// ```
/// use clinitag_llm::{LlmError, MockProvider};
/// use clinitag_domain::traits::ExtractionClient;
///
/// let provider = MockProvider::new("[]")
///     .respond_when("Parte 1", r#"[{"name":"febre"}]"#)
///     .fail_when("Parte 2", LlmError::Timeout(480));
///
/// assert_eq!(provider.generate("... Parte 1 de 3 ...").unwrap(), r#"[{"name":"febre"}]"#);
/// assert!(provider.generate("... Parte 2 de 3 ...").is_err());
/// assert_eq!(provider.generate("... Parte 3 de 3 ...").unwrap(), "[]");
/// assert_eq!(provider.call_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a mock answering every prompt with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Answer prompts containing `needle` with `response`
    pub fn respond_when(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.push_rule(needle.into(), Scripted::Respond(response.into()));
        self
    }

    /// Fail prompts containing `needle` with `error`
    pub fn fail_when(self, needle: impl Into<String>, error: LlmError) -> Self {
        self.push_rule(needle.into(), Scripted::Fail(error));
        self
    }

    /// Block for `delay` on prompts containing `needle`, then answer `response`
    pub fn stall_when(
        self,
        needle: impl Into<String>,
        delay: Duration,
        response: impl Into<String>,
    ) -> Self {
        self.push_rule(needle.into(), Scripted::Stall(delay, response.into()));
        self
    }

    /// Drop every scripted rule; the default response applies again
    pub fn clear_rules(&self) {
        self.lock().rules.clear();
    }

    /// Number of `generate` calls so far
    pub fn call_count(&self) -> usize {
        self.lock().prompts.len()
    }

    /// Every prompt received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    fn push_rule(&self, needle: String, rule: Scripted) {
        self.lock().rules.push((needle, rule));
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not wedge the other handles
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("[]")
    }
}

impl ExtractionClient for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let rule = {
            let mut state = self.lock();
            state.prompts.push(prompt.to_string());
            state
                .rules
                .iter()
                .find(|(needle, _)| prompt.contains(needle.as_str()))
                .map(|(_, rule)| rule.clone())
        };

        match rule {
            None => Ok(self.default_response.clone()),
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Stall(delay, response)) => {
                std::thread::sleep(delay);
                Ok(response)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        assert_eq!(provider.generate("any prompt").unwrap(), "Test response");
    }

    #[test]
    fn test_mock_provider_first_matching_rule_wins() {
        let provider = MockProvider::default()
            .respond_when("sepse", "first")
            .respond_when("sepse grave", "second");

        assert_eq!(provider.generate("sepse grave").unwrap(), "first");
        assert_eq!(provider.generate("febre").unwrap(), "[]");
    }

    #[test]
    fn test_mock_provider_error() {
        let provider = MockProvider::default().fail_when("bad", LlmError::Timeout(1));
        assert_eq!(provider.generate("bad prompt"), Err(LlmError::Timeout(1)));
    }

    #[test]
    fn test_mock_provider_records_prompts() {
        let provider = MockProvider::default();
        provider.generate("one").unwrap();
        provider.generate("two").unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test").unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }

    #[test]
    fn test_mock_provider_clear_rules() {
        let provider = MockProvider::default().fail_when("x", LlmError::Other("no".into()));
        assert!(provider.generate("x").is_err());

        provider.clear_rules();
        assert!(provider.generate("x").is_ok());
    }

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(MAX_ERROR_BODY + 10);
        assert_eq!(truncate_body(long).chars().count(), MAX_ERROR_BODY);
        assert_eq!(truncate_body("short".to_string()), "short");
    }
}
