//! Configuration loading and management for precis.
//!
//! Loads settings from `precis.toml` with environment variable overrides for
//! sensitive data and deployment plumbing.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Style used when the caller does not name one
pub const DEFAULT_STYLE: &str = "concise";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing required API key for provider: {0}")]
    MissingApiKey(String),
    #[error("unknown summarisation provider: {0}")]
    UnknownProvider(String),
}

/// LLM backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// LLM provider: "gemini" or "openrouter"
    pub provider: String,
    /// Model identifier (e.g., "gemini-2.0-flash")
    #[serde(default)]
    pub model: String,
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub gemini_key: Option<String>,
    #[serde(default)]
    pub openrouter_key: Option<String>,
}

/// Storage paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base path for data storage
    pub path: PathBuf,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

/// Pipeline behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fallback style when a request names none
    pub default_style: String,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the default location (precis.toml in cwd or
    /// home), falling back to built-in defaults when no file exists
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::parse_file(&path)?,
            None => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from("precis.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config").join("precis").join("precis.toml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        None
    }

    /// Override sensitive or deployment-specific settings from the environment
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.api.gemini_key = Some(key);
        }
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            self.api.openrouter_key = Some(key);
        }
        if self.backend.provider == "openrouter" {
            if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
                self.backend.model = model;
            }
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
    }

    /// Get the API key for the configured provider
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        match self.backend.provider.as_str() {
            "gemini" => self
                .api
                .gemini_key
                .as_deref()
                .ok_or_else(|| ConfigError::MissingApiKey("gemini".to_string())),
            "openrouter" => self
                .api
                .openrouter_key
                .as_deref()
                .ok_or_else(|| ConfigError::MissingApiKey("openrouter".to_string())),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_style: DEFAULT_STYLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.backend.provider, "gemini");
        assert_eq!(config.pipeline.default_style, "concise");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn api_key_requires_provider_key() {
        let config = Config::default();
        assert!(matches!(
            config.api_key(),
            Err(ConfigError::MissingApiKey(_))
        ));

        let mut config = Config::default();
        config.api.gemini_key = Some("secret".to_string());
        assert_eq!(config.api_key().unwrap(), "secret");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = Config::default();
        config.backend.provider = "claude".to_string();
        assert!(matches!(
            config.api_key(),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn parses_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            provider = "openrouter"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.provider, "openrouter");
        assert_eq!(config.server.port, 8080);
    }
}
