//! Stream the lines of a remote HTTP(S) resource as its chunks arrive.
//!
//! This library reassembles the raw chunks of a response body into
//! separator-delimited lines without buffering the whole body. Lines may be
//! split across any number of chunks, and malformed byte sequences are
//! removed rather than aborting the download.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod decode;
pub mod error;
pub mod split;
pub mod stream;
pub mod transport;

pub use config::{HttpConfig, StreamConfig};
pub use error::{DownloadError, Error, Result, TransportError};
pub use stream::{LineStream, LineStreamer, StreamOutcome};
pub use transport::{ChunkStream, HttpTransport, Transport};
