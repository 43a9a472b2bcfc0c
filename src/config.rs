//! Configuration file parsing
//!
//! Parses TOML configuration for the service and the client proxies. Every
//! field has a default, so an empty file is a valid configuration.

use crate::protocol::DEFAULT_PAGE_LIMIT;
use crate::rpc::RESERVED_PREFIX;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service settings
    pub service: ServiceOptions,

    /// Client proxy settings
    pub store: StoreOptions,
}

/// Service settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceOptions {
    /// Page size for list requests that ask for a non-positive count
    pub page_limit: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Client proxy settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Inserted before every method name sent to the service
    pub method_prefix: String,

    /// Prepended to every key stored through the proxy
    pub key_prefix: String,

    /// Keys requested per list call
    pub page_limit: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            method_prefix: String::new(),
            key_prefix: String::new(),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl StoreOptions {
    pub fn with_method_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.method_prefix = prefix.into();
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit;
        self
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.page_limit == 0 {
            return Err(ConfigError::Invalid(
                "service.page_limit must be positive".to_string(),
            ));
        }
        if self.store.page_limit == 0 {
            return Err(ConfigError::Invalid(
                "store.page_limit must be positive".to_string(),
            ));
        }

        // The server answers rpc.* itself; a store mounted there is unreachable.
        if self.store.method_prefix.starts_with(RESERVED_PREFIX) {
            return Err(ConfigError::Invalid(format!(
                "store.method_prefix {:?} uses the reserved {:?} namespace",
                self.store.method_prefix, RESERVED_PREFIX
            )));
        }

        Ok(())
    }
}
