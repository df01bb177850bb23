//! Generation backend selected by configuration.

use crate::config::{LlmSettings, ProviderKind};
use crate::error::{CliError, Result};
use clinitag_domain::traits::ExtractionClient;
use clinitag_llm::{ollama, openai, LlmError, OllamaProvider, OpenAiProvider};
use std::env;

/// Either configured backend, behind one `ExtractionClient`.
#[derive(Debug)]
pub enum Provider {
    /// Local Ollama server
    Ollama(OllamaProvider),
    /// OpenAI-compatible API
    OpenAi(OpenAiProvider),
}

impl Provider {
    /// Build the backend described by `settings`.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let provider = match settings.provider {
            ProviderKind::Ollama => {
                let endpoint = settings.endpoint.as_deref().unwrap_or(ollama::DEFAULT_ENDPOINT);
                let model = settings.model.as_deref().unwrap_or(ollama::DEFAULT_MODEL);
                let timeout = settings.timeout_secs.unwrap_or(ollama::DEFAULT_TIMEOUT_SECS);
                Provider::Ollama(OllamaProvider::new(endpoint, model).with_timeout(timeout))
            }
            ProviderKind::OpenAi => {
                let api_key = env::var(&settings.api_key_env).map_err(|_| {
                    CliError::Config(format!(
                        "Environment variable {} is not set",
                        settings.api_key_env
                    ))
                })?;
                let endpoint = settings.endpoint.as_deref().unwrap_or(openai::DEFAULT_ENDPOINT);
                let model = settings.model.as_deref().unwrap_or(openai::DEFAULT_MODEL);
                let timeout = settings.timeout_secs.unwrap_or(openai::DEFAULT_TIMEOUT_SECS);
                Provider::OpenAi(OpenAiProvider::new(endpoint, model, api_key).with_timeout(timeout))
            }
        };
        Ok(provider)
    }

    /// Model name
    pub fn model(&self) -> &str {
        match self {
            Provider::Ollama(p) => p.model(),
            Provider::OpenAi(p) => p.model(),
        }
    }
}

impl ExtractionClient for Provider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> std::result::Result<String, Self::Error> {
        match self {
            Provider::Ollama(p) => p.generate(prompt),
            Provider::OpenAi(p) => p.generate(prompt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_defaults() {
        let provider = Provider::from_settings(&LlmSettings::default()).unwrap();
        assert!(matches!(provider, Provider::Ollama(_)));
        assert_eq!(provider.model(), ollama::DEFAULT_MODEL);
    }

    #[test]
    fn test_openai_requires_key() {
        let settings = LlmSettings {
            provider: ProviderKind::OpenAi,
            api_key_env: "CLINITAG_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmSettings::default()
        };
        assert!(matches!(Provider::from_settings(&settings), Err(CliError::Config(_))));
    }
}
