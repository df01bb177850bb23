//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use clinitag_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Root directory of the local object storage
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    /// Generation backend
    #[serde(default)]
    pub llm: LlmSettings,

    /// Extraction pipeline settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Backend kind
    #[serde(default)]
    pub provider: ProviderKind,

    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Client-side request timeout override (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Generation backend kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama server
    #[default]
    Ollama,
    /// OpenAI-compatible chat completions
    OpenAi,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(clinitag_home()?.join("config.toml"))
    }

    /// Load configuration from `path`, or from the default path when `None`.
    /// A missing file yields the default configuration.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::path()?,
        };

        let config = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            toml::from_str(&contents)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.extractor.validate().map_err(CliError::Config)?;
        if self.llm.timeout_secs == Some(0) {
            return Err(CliError::Config("llm.timeout_secs must be greater than 0".into()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            storage_root: default_storage_root(),
            llm: LlmSettings::default(),
            extractor: ExtractorConfig::default(),
            settings: Settings::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            endpoint: None,
            model: None,
            api_key_env: default_api_key_env(),
            timeout_secs: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn clinitag_home() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
    Ok(home.join(".clinitag"))
}

fn default_database_path() -> PathBuf {
    clinitag_home()
        .map(|home| home.join("clinitag.db"))
        .unwrap_or_else(|_| PathBuf::from("clinitag.db"))
}

fn default_storage_root() -> PathBuf {
    clinitag_home()
        .map(|home| home.join("storage"))
        .unwrap_or_else(|_| PathBuf::from("storage"))
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert_eq!(config.extractor.window_size, 500);
        assert!(config.settings.color);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.settings.format, OutputFormat::Table);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
database_path = "/tmp/clinitag-test.db"

[llm]
provider = "openai"
model = "gpt-4o-mini"

[extractor]
window_size = 300
overlap = 30
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/clinitag-test.db"));
        assert_eq!(config.llm.provider, ProviderKind::OpenAi);
        assert_eq!(config.llm.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.extractor.window_size, 300);
        assert_eq!(config.extractor.agent_name, "TagGenerationAgent");
    }

    #[test]
    fn test_invalid_extractor_settings_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[extractor]\nwindow_size = 50\noverlap = 50\n").unwrap();
        assert!(matches!(Config::load_from(Some(&path)), Err(CliError::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.settings.format = OutputFormat::Json;
        config.llm.timeout_secs = Some(900);
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(Some(&path)).unwrap();
        assert_eq!(reloaded.settings.format, OutputFormat::Json);
        assert_eq!(reloaded.llm.timeout_secs, Some(900));
    }
}
