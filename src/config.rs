//! Client configuration
//!
//! TOML-loadable settings for establishing a session. Secret material never
//! lives in the file: the NKey seed is referenced by environment variable
//! name and resolved at connect time, then forwarded to the engine without
//! being retained.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Connection settings for a [`NatsClient`](crate::NatsClient).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Server URL with scheme and port
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// NKey public identity (user public key, `U...`)
    pub nkey_public: String,
    /// Environment variable containing the NKey seed (`SU...`)
    pub nkey_seed_env: String,
}

fn default_server_url() -> String {
    "nats://127.0.0.1:4222".to_string()
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field shapes without resolving any secrets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.server_url).is_err() {
            return Err(ConfigError::InvalidConfig(format!(
                "server_url is not a valid URL: {}",
                self.server_url
            )));
        }
        if !self.nkey_public.starts_with('U') {
            return Err(ConfigError::InvalidConfig(
                "nkey_public must be a user public key (U...)".to_string(),
            ));
        }
        if self.nkey_seed_env.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "nkey_seed_env must name an environment variable".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the NKey seed from the configured environment variable.
    ///
    /// Resolved at connect time, not config load time, so the variable only
    /// has to exist when a session is actually established.
    pub fn resolve_seed(&self) -> Result<String, ConfigError> {
        std::env::var(&self.nkey_seed_env)
            .map_err(|_| ConfigError::EnvVarNotFound(self.nkey_seed_env.clone()))
    }
}
