//! Configuration management for Gatelog
//!
//! Sources are layered, highest priority last:
//! - Hardcoded defaults
//! - `/etc/gatelog/gatelog.{yaml,toml,json}`
//! - `./config/gatelog.{yaml,toml,json}`
//! - The file named by `GATELOG_CONFIG`
//! - Environment variables prefixed `GATELOG`, nested with `__`
//!   (e.g. `GATELOG_LOGS__URL=http://es:9200`)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::credential::{Credential, PermissionRecord};

/// Root configuration structure for Gatelog
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GatelogConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logs: LogsConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

impl GatelogConfig {
    /// Load configuration from every source in precedence order and validate it.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults(Config::builder())?;

        builder = builder
            .add_source(File::with_name("/etc/gatelog/gatelog").required(false))
            .add_source(File::with_name("./config/gatelog").required(false));

        if let Ok(config_path) = std::env::var("GATELOG_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("GATELOG")
                .separator("__")
                .try_parsing(true),
        );

        let config: GatelogConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("server.bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("logs.url", DEFAULT_LOGS_URL)?
            .set_default("logs.index", DEFAULT_LOGS_INDEX)?
            .set_default("logs.request_timeout_secs", 10)?
            .set_default("logs.default_size", 100)?
            .set_default("gate.pattern_cache_capacity", 1024)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logs.url.trim().is_empty() {
            return Err(ConfigError::Message("logs.url must not be empty".to_string()));
        }

        if self.logs.index.trim().is_empty() {
            return Err(ConfigError::Message(
                "logs.index must not be empty".to_string(),
            ));
        }

        if self.logs.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "logs.request_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.logs.default_size == 0 {
            return Err(ConfigError::Message(
                "logs.default_size must be > 0".to_string(),
            ));
        }

        if let Some(entry) = self.auth.keys.iter().find(|k| k.key.trim().is_empty()) {
            return Err(ConfigError::Message(format!(
                "auth.keys contains an empty key for a {} credential",
                entry.credential
            )));
        }

        Ok(())
    }

    /// Load configuration from a specific file path, applying defaults for missing keys.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: GatelogConfig = Self::set_defaults(Config::builder())?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_LOGS_URL: &str = "http://localhost:9200";
const DEFAULT_LOGS_INDEX: &str = ".logs";

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

/// Audit log store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogsConfig {
    /// Storage engine endpoint. A single fixed node, no cluster sniffing.
    pub url: String,

    /// Physical index holding audit records.
    pub index: String,

    /// Deadline applied to every storage request.
    pub request_timeout_secs: u64,

    /// Page size used when the read API is called without `size`.
    pub default_size: usize,

    /// JSON file with index mappings/settings; the builtin schema is used when unset.
    #[serde(default)]
    pub schema_path: Option<PathBuf>,
}

impl LogsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LOGS_URL.to_string(),
            index: DEFAULT_LOGS_INDEX.to_string(),
            request_timeout_secs: 10,
            default_size: 100,
            schema_path: None,
        }
    }
}

/// Origin gate configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GateConfig {
    /// Maximum number of compiled origin patterns kept in memory.
    pub pattern_cache_capacity: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            pattern_cache_capacity: 1024,
        }
    }
}

/// Static API keys used to resolve credentials when no external authenticator is wired in.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub keys: Vec<ApiKeyConfig>,
}

/// One configured API key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyConfig {
    pub key: String,
    pub credential: Credential,
    /// Only meaningful for `permission` credentials.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl ApiKeyConfig {
    /// Permission record carried by this key, if it is a permission credential.
    #[must_use]
    pub fn permission(&self) -> Option<PermissionRecord> {
        self.credential
            .requires_referer()
            .then(|| PermissionRecord::new(self.allowed_origins.iter().cloned()))
    }
}
