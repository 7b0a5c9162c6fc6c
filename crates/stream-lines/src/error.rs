//! Error types for stream-lines operations.
//!
//! Streaming failures surface as a single [`DownloadError`], whatever the
//! transport reported. The crate-level [`Error`] covers the operations that
//! happen before a stream is opened, such as loading configuration or
//! building the HTTP client.

use std::fmt;
use std::io;
use thiserror::Error;

/// The error type for operations outside of a running stream.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration could not be parsed or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
}

/// A specialized Result type for stream-lines operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a [`Transport`](crate::transport::Transport).
///
/// These never reach consumers of a line stream directly; they are wrapped
/// into a [`DownloadError`] at the transport boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a status outside the success range.
    #[error("server responded with status {code}")]
    Status {
        /// The numeric HTTP status code.
        code: u16,
    },

    /// No response was received, or the body could not be read.
    #[error("connection failed: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps any error as a connection failure.
    pub fn connection<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Connection(error.into())
    }

    /// Returns the response status, if the server answered at all.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Status { code } => Some(*code),
            Self::Connection(_) => None,
        }
    }
}

/// The response code carried by a [`DownloadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    /// The server answered with this status.
    Status(u16),
    /// No response was received.
    None,
}

impl From<Option<u16>> for ResponseCode {
    fn from(code: Option<u16>) -> Self {
        code.map_or(Self::None, Self::Status)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "{code}"),
            Self::None => f.write_str("none"),
        }
    }
}

/// A download failed before the stream reached its end.
///
/// This is the only error a line stream yields. Lines delivered before it
/// remain valid.
#[derive(Debug, Error)]
#[error("Failed to download `{url}` with code: `{code}`")]
pub struct DownloadError {
    url: String,
    code: ResponseCode,
    #[source]
    source: TransportError,
}

impl DownloadError {
    /// Wraps a transport failure for the given locator.
    #[must_use]
    pub fn new(url: impl Into<String>, source: TransportError) -> Self {
        Self {
            url: url.into(),
            code: source.code().into(),
            source,
        }
    }

    /// The locator that failed to download.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The response status, if the server answered at all.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        match self.code {
            ResponseCode::Status(code) => Some(code),
            ResponseCode::None => None,
        }
    }

    /// The transport failure behind this error.
    #[must_use]
    pub fn transport_error(&self) -> &TransportError {
        &self.source
    }
}
