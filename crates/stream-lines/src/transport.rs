//! Transport abstraction delivering raw response chunks.
//!
//! A [`Transport`] opens a request and hands back a [`ChunkStream`]. The
//! stream is pull-based: the next chunk is only read from the network once
//! the previous one has been consumed, which keeps line emission in step
//! with delivery. Dropping the stream releases the connection.
//!
//! [`HttpTransport`] is the default implementation, built on `reqwest`.

use crate::config::HttpConfig;
use crate::error::{Error, Result, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;

/// An open response body, delivered chunk by chunk.
pub struct ChunkStream {
    /// Character set declared by the server, if any.
    pub charset: Option<String>,
    /// The raw body chunks, in order. Chunks may be empty.
    pub chunks: BoxStream<'static, std::result::Result<Bytes, TransportError>>,
}

impl ChunkStream {
    /// Wraps a chunk stream with no declared charset.
    pub fn new<S>(chunks: S) -> Self
    where
        S: futures::Stream<Item = std::result::Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            charset: None,
            chunks: chunks.boxed(),
        }
    }

    /// Sets the declared charset.
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("charset", &self.charset)
            .field("chunks", &"<stream>")
            .finish()
    }
}

/// Opens streaming requests against a resource locator.
///
/// Implementations report a non-success response as
/// [`TransportError::Status`] and failures without a response as
/// [`TransportError::Connection`], either when opening the stream or while
/// reading it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Begins a streaming GET of `url`.
    async fn stream_get(&self, url: &str) -> std::result::Result<ChunkStream, TransportError>;
}

/// `reqwest`-backed HTTP(S) transport.
///
/// Redirects are followed by the client. Any final status outside 200-399
/// is an error.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with default client settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport from HTTP settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the client cannot be built.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder.build().map_err(Error::Client)?;
        Ok(Self::with_client(client))
    }

    /// Uses an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn stream_get(&self, url: &str) -> std::result::Result<ChunkStream, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(TransportError::connection)?;

        let status = response.status();
        if !is_success(status.as_u16()) {
            return Err(TransportError::Status {
                code: status.as_u16(),
            });
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_from_content_type);

        tracing::trace!(url, status = status.as_u16(), ?charset, "Response headers received");

        let chunks = response.bytes_stream().map_err(TransportError::connection);
        Ok(ChunkStream {
            charset,
            chunks: chunks.boxed(),
        })
    }
}

/// Statuses treated as success: 2xx and 3xx.
#[must_use]
pub fn is_success(code: u16) -> bool {
    (200..400).contains(&code)
}

/// Extracts the `charset` parameter from a `Content-Type` value.
#[must_use]
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    let mime: mime::Mime = content_type.parse().ok()?;
    mime.get_param(mime::CHARSET)
        .map(|charset| charset.as_str().to_string())
}
