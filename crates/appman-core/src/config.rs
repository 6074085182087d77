//! Manager configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! server_url = "https://apps.example.com"
//! passphrase = "shared secret"
//! debug = false
//! key_encoding = "raw"            # or "base64-text"
//! timestamp_format = "%Y-%m-%d %H:%M:%S"
//! timeout_secs = 30
//! region = "JP"                   # optional, defaults to the locale
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::KeyEncoding;

/// Format of the server timestamp, interpreted as UTC.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Failure to load a [`ManagerConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not a valid config document.
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// The shared secret. Redacted from `Debug`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wrap a secret string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The secret itself. Keep it out of logs.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Process-wide settings for one [`Manager`](crate::Manager).
///
/// Configurations are plain values; two equal configurations for the same
/// application id share a manager in the [`ManagerRegistry`](crate::ManagerRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Base URL the endpoint paths are resolved against.
    pub server_url: String,

    /// Shared secret keying the summary request.
    pub passphrase: Passphrase,

    /// Treat every summary as an upgrade.
    #[serde(default)]
    pub debug: bool,

    /// How HMAC digests become cipher keys.
    #[serde(default)]
    pub key_encoding: KeyEncoding,

    /// `chrono` format of the server timestamp.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// HTTP request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Country code sent with the packages request. Locale-derived if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ManagerConfig {
    /// A configuration with defaults for everything but the server and secret.
    pub fn new(server_url: impl Into<String>, passphrase: impl Into<Passphrase>) -> Self {
        Self {
            server_url: server_url.into(),
            passphrase: passphrase.into(),
            debug: false,
            key_encoding: KeyEncoding::default(),
            timestamp_format: default_timestamp_format(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            region: None,
        }
    }

    /// Set the debug override.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set how HMAC digests become keys.
    pub fn with_key_encoding(mut self, encoding: KeyEncoding) -> Self {
        self.key_encoding = encoding;
        self
    }

    /// Pin the region instead of reading the locale.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] on syntax errors or missing required keys.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Toml`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// [`Self::timeout_secs`] as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Default config location: `<config_dir>/appman/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("appman").join("config.toml"))
}
