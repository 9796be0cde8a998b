//! Configuration loading from files and the environment

use crate::{ConfigError, NegotiationConfig, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;

/// Prefix of environment overrides, e.g. `NEGOTIATION_RETRY__MAX_RETRIES=3`
pub const ENV_PREFIX: &str = "NEGOTIATION";

/// Separator between nested keys in environment variable names
pub const ENV_SEPARATOR: &str = "__";

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// Supports TOML, YAML, and JSON formats based on file extension
    pub fn from_file(path: &Path) -> Result<NegotiationConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let content = std::fs::read_to_string(path)?;

        match extension {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {extension}"
            ))),
        }
    }

    pub fn from_toml(content: &str) -> Result<NegotiationConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn from_yaml(content: &str) -> Result<NegotiationConfig> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    pub fn from_json(content: &str) -> Result<NegotiationConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from `NEGOTIATION_*` environment variables
    pub fn from_env() -> Result<NegotiationConfig> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Load configuration from environment variables with a custom prefix
    ///
    /// Nested keys are joined with `__`: `PREFIX_STATE_MACHINE__BATCH_SIZE=10`
    pub fn from_env_with_prefix(prefix: &str) -> Result<NegotiationConfig> {
        Self::builder().add_env(prefix).build()
    }

    /// Load configuration from a file, then apply environment overrides
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<NegotiationConfig> {
        if !path.exists() {
            return Err(ConfigError::LoadError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        Self::builder()
            .add_file(path, true)
            .add_env(env_prefix)
            .build()
    }

    /// Layer several sources; later sources take precedence
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder {
            builder: Config::builder(),
        }
    }
}

/// Builder for complex configuration loading scenarios
pub struct ConfigLoaderBuilder {
    builder: ConfigBuilder<config::builder::DefaultState>,
}

impl ConfigLoaderBuilder {
    /// Add a configuration file source
    pub fn add_file(mut self, path: &Path, required: bool) -> Self {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        };

        self.builder = self
            .builder
            .add_source(File::from(path).format(format).required(required));
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env(mut self, prefix: &str) -> Self {
        self.builder = self.builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );
        self
    }

    /// Set a default value for a key
    pub fn set_default(mut self, key: &str, value: &str) -> Result<Self> {
        self.builder = self.builder.set_default(key, value)?;
        Ok(self)
    }

    /// Set a value that overrides every other source
    pub fn set_override(mut self, key: &str, value: &str) -> Result<Self> {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Build the final configuration
    pub fn build(self) -> Result<NegotiationConfig> {
        let config = self.builder.build()?;
        config.try_deserialize().map_err(ConfigError::from)
    }
}
