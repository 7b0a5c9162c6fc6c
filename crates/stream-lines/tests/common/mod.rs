//! Common test utilities shared across integration tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};
use stream_lines::{ChunkStream, LineStreamer, Transport, TransportError};

/// One step of a scripted response body.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver these bytes as a chunk.
    Chunk(Vec<u8>),
    /// Fail with this status mid-stream.
    Status(u16),
    /// Fail mid-stream without a response code.
    Disconnect,
}

/// In-memory transport that replays a fixed sequence of chunks.
///
/// Records every chunk it hands out in `delivered`, so tests can check
/// that chunks are pulled one at a time.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    steps: Vec<Step>,
    refuse: Option<u16>,
    pub delivered: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedTransport {
    /// Serves the given chunks and then ends the stream.
    pub fn chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            steps: chunks
                .into_iter()
                .map(|c| Step::Chunk(c.as_ref().to_vec()))
                .collect(),
            ..Self::default()
        }
    }

    /// Serves the given steps in order.
    pub fn steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Rejects the request with `code` before any chunk is sent.
    pub fn refusing(code: u16) -> Self {
        Self {
            refuse: Some(code),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn stream_get(&self, _url: &str) -> Result<ChunkStream, TransportError> {
        if let Some(code) = self.refuse {
            return Err(TransportError::Status { code });
        }

        let delivered = Arc::clone(&self.delivered);
        let items = self.steps.clone().into_iter().enumerate().map(move |(i, step)| {
            delivered.lock().unwrap().push(i);
            match step {
                Step::Chunk(bytes) => Ok(Bytes::from(bytes)),
                Step::Status(code) => Err(TransportError::Status { code }),
                Step::Disconnect => Err(TransportError::connection("connection reset by peer")),
            }
        });
        Ok(ChunkStream::new(stream::iter(items)))
    }
}

/// Streams `transport` to completion and returns every line.
pub async fn collect_lines(transport: ScriptedTransport) -> Vec<String> {
    use futures::TryStreamExt;

    LineStreamer::with_transport("mem://test", transport)
        .lines()
        .try_collect()
        .await
        .expect("scripted stream should not fail")
}

/// Splits `data` into chunks at the given byte offsets.
pub fn split_at_offsets(data: &[u8], offsets: &[usize]) -> Vec<Vec<u8>> {
    let mut bounds: Vec<usize> = offsets.iter().map(|&o| o.min(data.len())).collect();
    bounds.push(0);
    bounds.push(data.len());
    bounds.sort_unstable();
    bounds.dedup();
    bounds.windows(2).map(|w| data[w[0]..w[1]].to_vec()).collect()
}
