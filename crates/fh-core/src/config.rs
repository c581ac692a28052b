//! Firehose Configuration — TOML-backed settings for the stream and rule endpoints

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Env var pointing at the config file
pub const CONFIG_ENV: &str = "FIREHOSE_CONFIG";

/// Env var overriding the bearer token from the file
pub const TOKEN_ENV: &str = "FIREHOSE_TOKEN";

/// File looked up in the working directory when [`CONFIG_ENV`] is unset
pub const DEFAULT_CONFIG_FILE: &str = "firehose.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirehoseConfig {
    /// Filtered-stream endpoint; the rules endpoint is `{base_uri}/rules`
    pub base_uri: String,

    /// Bearer token sent on every outbound request
    pub token: String,

    /// Pause between the remote delete and the second local clear
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Page size of the paged query API
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Number of records returned by the latest query
    #[serde(default = "default_latest_count")]
    pub latest_count: usize,

    /// Upper bound on concurrently running appends per stream session
    #[serde(default = "default_max_inflight_appends")]
    pub max_inflight_appends: usize,

    /// Connection handshake timeout
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Start a new stream session after the previous one closes
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Delay before reconnecting
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Longest stream line accepted before the session is failed
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    /// Fail the session when no bytes (heartbeats included) arrive for this
    /// long; 0 disables the check
    #[serde(default = "default_read_idle_timeout_ms")]
    pub read_idle_timeout_ms: u64,

    /// Address of the HTTP front end
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_grace_period_ms() -> u64 {
    3000
}

fn default_page_size() -> usize {
    20
}

fn default_latest_count() -> usize {
    20
}

fn default_max_inflight_appends() -> usize {
    64
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

fn default_max_line_bytes() -> usize {
    1024 * 1024
}

fn default_read_idle_timeout_ms() -> u64 {
    30_000
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl FirehoseConfig {
    /// Create a config with defaults for everything but the endpoint and token
    pub fn new(base_uri: &str, token: &str) -> Self {
        Self {
            base_uri: base_uri.to_string(),
            token: token.to_string(),
            grace_period_ms: default_grace_period_ms(),
            page_size: default_page_size(),
            latest_count: default_latest_count(),
            max_inflight_appends: default_max_inflight_appends(),
            connect_timeout_ms: default_connect_timeout_ms(),
            auto_reconnect: default_auto_reconnect(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_line_bytes: default_max_line_bytes(),
            read_idle_timeout_ms: default_read_idle_timeout_ms(),
            listen_addr: default_listen_addr(),
        }
    }

    /// Locate and load the config: `$FIREHOSE_CONFIG`, else `./firehose.toml`.
    ///
    /// `$FIREHOSE_TOKEN`, when set and non-empty, replaces the file's token.
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var(CONFIG_ENV) {
            Ok(p) => PathBuf::from(p),
            Err(_) => {
                let cwd = std::env::current_dir().map_err(|e| ConfigError::Io {
                    path: PathBuf::from("."),
                    source: e,
                })?;
                let candidate = cwd.join(DEFAULT_CONFIG_FILE);
                if !candidate.exists() {
                    return Err(ConfigError::NotFound(format!(
                        "tried {candidate:?}; set {CONFIG_ENV}=/path/to/firehose.toml"
                    )));
                }
                candidate
            }
        };

        let mut config = Self::load_from_path(&path)?;
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                config.token = token;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file path (no env overrides, no validation)
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&raw)
    }

    /// Parse from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_uri.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "base_uri",
                reason: "cannot be empty".to_string(),
            });
        }
        url::Url::parse(&self.base_uri).map_err(|e| ConfigError::Invalid {
            field: "base_uri",
            reason: e.to_string(),
        })?;
        if self.token.is_empty() {
            return Err(ConfigError::Invalid {
                field: "token",
                reason: format!("cannot be empty (set it in the file or via {TOKEN_ENV})"),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "page_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_inflight_appends == 0 {
            return Err(ConfigError::Invalid {
                field: "max_inflight_appends",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_line_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_line_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Rules endpoint
    pub fn rules_uri(&self) -> String {
        format!("{}/rules", self.base_uri.trim_end_matches('/'))
    }

    /// Grace period as a [`Duration`]
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Handshake timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Reconnect delay as a [`Duration`]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Read-idle limit, `None` when disabled
    pub fn read_idle_timeout(&self) -> Option<Duration> {
        (self.read_idle_timeout_ms > 0).then(|| Duration::from_millis(self.read_idle_timeout_ms))
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}
