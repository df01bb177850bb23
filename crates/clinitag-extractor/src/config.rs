//! Configuration for the extraction pipeline

use crate::prompt::CHUNK_PLACEHOLDER;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the extraction pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Words per chunk
    pub window_size: usize,

    /// Words shared between consecutive chunks; must be below `window_size`
    pub overlap: usize,

    /// Upper bound on one generation call (seconds)
    pub generation_timeout_secs: u64,

    /// Characters of each response kept in the execution trace
    pub response_preview_chars: usize,

    /// Agent name stamped on execution logs
    pub agent_name: String,

    /// Category for tags extracted without one
    pub default_category: String,

    /// Object storage bucket holding source documents
    pub source_bucket: String,

    /// Replacement extraction prompt; must contain `{{chunk}}`
    pub prompt_template: Option<String>,
}

impl ExtractorConfig {
    /// Get the generation timeout as a Duration
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be greater than 0".to_string());
        }
        if self.overlap >= self.window_size {
            return Err(format!(
                "overlap ({}) must be less than window_size ({})",
                self.overlap, self.window_size
            ));
        }
        if self.generation_timeout_secs == 0 {
            return Err("generation_timeout_secs must be greater than 0".to_string());
        }
        if self.agent_name.trim().is_empty() {
            return Err("agent_name must not be empty".to_string());
        }
        if self.default_category.trim().is_empty() {
            return Err("default_category must not be empty".to_string());
        }
        if let Some(template) = &self.prompt_template {
            if !template.contains(CHUNK_PLACEHOLDER) {
                return Err(format!("prompt_template must contain {}", CHUNK_PLACEHOLDER));
            }
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            window_size: 500,
            overlap: 50,
            // Local models can take minutes per chunk
            generation_timeout_secs: 600,
            response_preview_chars: 200,
            agent_name: "TagGenerationAgent".to_string(),
            default_category: "default".to_string(),
            source_bucket: "protocols".to_string(),
            prompt_template: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_below_window() {
        let config = ExtractorConfig {
            overlap: 500,
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_is_invalid() {
        let config = ExtractorConfig {
            window_size: 0,
            overlap: 0,
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let config = ExtractorConfig {
            generation_timeout_secs: 0,
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_template_without_chunk_placeholder_is_invalid() {
        let config = ExtractorConfig {
            prompt_template: Some("Extraia as tags.".to_string()),
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ExtractorConfig {
            prompt_template: Some("Texto: {{chunk}}".to_string()),
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = ExtractorConfig::from_toml("window_size = 200\noverlap = 20\n").unwrap();
        assert_eq!(parsed.window_size, 200);
        assert_eq!(parsed.overlap, 20);
        assert_eq!(parsed.source_bucket, "protocols");
    }
}
