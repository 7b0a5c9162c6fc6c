//! Streaming lines out of a remote resource.
//!
//! [`LineStreamer`] turns the chunks delivered by a [`Transport`] into a lazy
//! sequence of lines. Every iteration opens its own request and owns its own
//! decoder and carry-over buffer, so one streamer can be iterated any number
//! of times, including concurrently.
//!
//! # Examples
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use stream_lines::LineStreamer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let streamer = LineStreamer::new("https://example.com/access.log");
//! let mut lines = streamer.lines();
//! while let Some(line) = lines.try_next().await? {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::StreamConfig;
use crate::decode::{ChunkDecoder, encoding_for_label};
use crate::error::{DownloadError, Result};
use crate::split::LineSplitter;
use crate::transport::{ChunkStream, HttpTransport, Transport};
use encoding_rs::{Encoding, UTF_8};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::Arc;

/// A lazy sequence of lines. Ends after the first error.
pub type LineStream = BoxStream<'static, std::result::Result<String, DownloadError>>;

/// How a [`LineStreamer::for_each`] run ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The whole resource was read.
    Completed {
        /// Number of lines delivered to the callback.
        lines: usize,
    },
    /// The callback asked to stop before the end.
    Stopped {
        /// Number of lines delivered to the callback, including the last one.
        lines: usize,
    },
}

impl StreamOutcome {
    /// Number of lines delivered to the callback.
    #[must_use]
    pub fn lines(&self) -> usize {
        match self {
            Self::Completed { lines } | Self::Stopped { lines } => *lines,
        }
    }
}

/// Streams the lines of a single resource.
#[derive(Clone)]
pub struct LineStreamer {
    url: String,
    transport: Arc<dyn Transport>,
    splitter: LineSplitter,
    encoding: &'static Encoding,
    honor_charset: bool,
}

impl std::fmt::Debug for LineStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStreamer")
            .field("url", &self.url)
            .field("separator", &self.splitter.separator())
            .field("encoding", &self.encoding.name())
            .field("honor_charset", &self.honor_charset)
            .field("transport", &"<dyn Transport>")
            .finish()
    }
}

impl LineStreamer {
    /// Creates a streamer for `url` using the default HTTP transport,
    /// newline separator and UTF-8. A charset declared by the server is
    /// ignored unless [`configure`](Self::configure) enables it.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_transport(url, HttpTransport::new())
    }

    /// Creates a streamer that fetches through the given transport.
    #[must_use]
    pub fn with_transport(url: impl Into<String>, transport: impl Transport + 'static) -> Self {
        Self {
            url: url.into(),
            transport: Arc::new(transport),
            splitter: LineSplitter::default(),
            encoding: UTF_8,
            honor_charset: false,
        }
    }

    /// Creates a streamer configured from `config`, using an HTTP transport
    /// built from its `http` section.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(url: impl Into<String>, config: &StreamConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(&config.http)?;
        Self::with_transport(url, transport).configure(config)
    }

    /// Applies the separator and encoding settings of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration
    /// is invalid.
    pub fn configure(mut self, config: &StreamConfig) -> Result<Self> {
        config.validate()?;
        self.splitter = LineSplitter::new(config.separator.clone())?;
        self.encoding = config.source_encoding()?;
        self.honor_charset = config.honor_charset;
        Ok(self)
    }

    /// The resource locator.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Starts a new iteration over the resource.
    ///
    /// Nothing is requested until the returned stream is first polled.
    /// Dropping the stream early releases the connection.
    #[must_use]
    pub fn lines(&self) -> LineStream {
        let session = Session::new(self);
        stream::unfold(session, |mut session| async move {
            let item = session.next_line().await?;
            Some((item, session))
        })
        .boxed()
    }

    /// Pushes every line to `callback`, in order.
    ///
    /// The callback may return [`ControlFlow::Break`] to stop early; the
    /// connection is released and [`StreamOutcome::Stopped`] is returned.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] if the transport fails. Lines passed to
    /// the callback before the failure stay delivered.
    pub async fn for_each<F>(
        &self,
        mut callback: F,
    ) -> std::result::Result<StreamOutcome, DownloadError>
    where
        F: FnMut(String) -> ControlFlow<()>,
    {
        let mut lines = self.lines();
        let mut delivered = 0;

        while let Some(line) = lines.next().await {
            let line = line?;
            delivered += 1;
            if callback(line).is_break() {
                tracing::debug!(url = %self.url, lines = delivered, "Consumer stopped the stream");
                return Ok(StreamOutcome::Stopped { lines: delivered });
            }
        }

        Ok(StreamOutcome::Completed { lines: delivered })
    }
}

/// State of one iteration: the open body, the decoder and the carry-over
/// buffer.
struct Session {
    url: String,
    transport: Arc<dyn Transport>,
    encoding: &'static Encoding,
    honor_charset: bool,
    splitter: LineSplitter,
    decoder: Option<ChunkDecoder>,
    body: Option<ChunkStream>,
    ready: VecDeque<String>,
    finished: bool,
    chunks_read: usize,
    lines_emitted: usize,
}

impl Session {
    fn new(streamer: &LineStreamer) -> Self {
        Self {
            url: streamer.url.clone(),
            transport: Arc::clone(&streamer.transport),
            encoding: streamer.encoding,
            honor_charset: streamer.honor_charset,
            splitter: streamer.splitter.clone(),
            decoder: None,
            body: None,
            ready: VecDeque::new(),
            finished: false,
            chunks_read: 0,
            lines_emitted: 0,
        }
    }

    /// Yields the next line, reading chunks only when no completed line is
    /// waiting.
    async fn next_line(&mut self) -> Option<std::result::Result<String, DownloadError>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                self.lines_emitted += 1;
                return Some(Ok(line));
            }
            if self.finished {
                return None;
            }

            if self.body.is_none() {
                if let Err(err) = self.open().await {
                    return Some(Err(err));
                }
                continue;
            }

            let next = match self.body.as_mut() {
                Some(body) => body.chunks.next().await,
                None => None,
            };
            match next {
                Some(Ok(chunk)) => {
                    self.chunks_read += 1;
                    let text = self.decoder_mut().decode(&chunk);
                    let completed = self.splitter.push(&text, &mut self.ready);
                    tracing::trace!(
                        bytes = chunk.len(),
                        lines = completed,
                        pending = self.splitter.pending().len(),
                        "Processed chunk"
                    );
                }
                Some(Err(source)) => return Some(Err(self.fail(source))),
                None => self.end_of_stream(),
            }
        }
    }

    async fn open(&mut self) -> std::result::Result<(), DownloadError> {
        tracing::debug!(url = %self.url, "Opening line stream");
        match self.transport.stream_get(&self.url).await {
            Ok(body) => {
                let decoder = ChunkDecoder::new(self.select_encoding(body.charset.as_deref()));
                tracing::trace!(encoding = decoder.encoding().name(), "Decoding response body");
                self.decoder = Some(decoder);
                self.body = Some(body);
                Ok(())
            }
            Err(source) => Err(self.fail(source)),
        }
    }

    fn select_encoding(&self, charset: Option<&str>) -> &'static Encoding {
        if !self.honor_charset {
            return self.encoding;
        }
        match charset {
            Some(label) => encoding_for_label(label).unwrap_or_else(|| {
                tracing::debug!(charset = label, "Ignoring unknown charset");
                self.encoding
            }),
            None => self.encoding,
        }
    }

    fn decoder_mut(&mut self) -> &mut ChunkDecoder {
        let encoding = self.encoding;
        self.decoder.get_or_insert_with(|| ChunkDecoder::new(encoding))
    }

    fn end_of_stream(&mut self) {
        self.finished = true;
        self.body = None;

        let tail = self.decoder_mut().finish();
        self.splitter.push(&tail, &mut self.ready);
        self.ready.extend(self.splitter.finish());

        let dropped = self.decoder.as_ref().map_or(0, ChunkDecoder::dropped);
        tracing::debug!(
            url = %self.url,
            chunks = self.chunks_read,
            lines = self.lines_emitted + self.ready.len(),
            dropped_bytes = dropped,
            "Line stream finished"
        );
    }

    fn fail(&mut self, source: crate::error::TransportError) -> DownloadError {
        self.finished = true;
        self.body = None;
        self.ready.clear();

        let err = DownloadError::new(self.url.clone(), source);
        tracing::warn!(
            url = %self.url,
            chunks = self.chunks_read,
            lines = self.lines_emitted,
            error = %err.transport_error(),
            "Line stream failed"
        );
        err
    }
}
