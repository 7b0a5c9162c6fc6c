//! Configuration for line streaming.
//!
//! Every field has a default, so a file only lists what it changes:
//!
//! ```yaml
//! separator: "\r\n"
//! encoding: windows-1252
//! honor-charset: true
//! http:
//!   timeout-secs: 300
//!   connect-timeout-secs: 10
//!   user-agent: log-tailer/1.0
//! ```

use crate::decode::encoding_for_label;
use crate::error::{Error, Result};
use crate::split::DEFAULT_SEPARATOR;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Default source encoding label
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Options controlling how a stream is decoded and split.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct StreamConfig {
    /// Record separator between lines.
    pub separator: String,

    /// Label of the source encoding, e.g. `utf-8` or `shift_jis`.
    pub encoding: String,

    /// Prefer the `charset` declared by the server over `encoding`. Off by
    /// default: bytes are read as `encoding` whatever the headers say.
    pub honor_charset: bool,

    /// HTTP transport settings.
    pub http: HttpConfig,
}

/// Settings for the default HTTP transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct HttpConfig {
    /// Total time allowed for the whole download, in seconds.
    pub timeout_secs: Option<u64>,

    /// Time allowed to establish the connection, in seconds.
    pub connect_timeout_secs: Option<u64>,

    /// Value of the `User-Agent` header.
    pub user_agent: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
            honor_charset: false,
            http: HttpConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails [`validate`](Self::validate).
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded stream configuration");
        Ok(config)
    }

    /// Check that the separator is non-empty and the encoding is known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(Error::Config("separator must not be empty".to_string()));
        }
        self.source_encoding()?;
        Ok(())
    }

    /// Resolve the configured encoding label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the label is unknown.
    pub fn source_encoding(&self) -> Result<&'static Encoding> {
        encoding_for_label(&self.encoding)
            .ok_or_else(|| Error::Config(format!("unknown encoding: {}", self.encoding)))
    }
}

impl HttpConfig {
    /// The overall request timeout, if set.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// The connect timeout, if set.
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}
