//! Encoding normalization for incoming chunks.
//!
//! Every chunk goes through a real decode pass, including when the source
//! encoding is already UTF-8, so malformed sequences are always found.
//! Malformed bytes are removed from the output instead of being replaced
//! with U+FFFD, and decoding never fails.
//!
//! The decoder keeps state between chunks: a multi-byte character whose
//! bytes straddle a chunk boundary is decoded once the rest arrives.

use encoding_rs::{DecoderResult, Encoding, UTF_8};

/// Streaming decoder that drops malformed byte sequences.
///
/// # Examples
///
/// ```
/// use stream_lines::decode::ChunkDecoder;
///
/// let mut decoder = ChunkDecoder::new(encoding_rs::UTF_8);
/// let mut text = decoder.decode(b"caf\xC3");
/// text.push_str(&decoder.decode(b"\xA9 \xFFok"));
/// text.push_str(&decoder.finish());
/// assert_eq!(text, "café ok");
/// ```
pub struct ChunkDecoder {
    decoder: encoding_rs::Decoder,
    encoding: &'static Encoding,
    /// Total number of malformed bytes removed so far.
    dropped: usize,
}

impl ChunkDecoder {
    /// Creates a decoder for the given source encoding.
    ///
    /// Byte order marks are kept as ordinary characters.
    #[must_use]
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder_without_bom_handling(),
            encoding,
            dropped: 0,
        }
    }

    /// The source encoding this decoder reads.
    #[must_use]
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Number of malformed bytes removed so far.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Decodes one chunk.
    ///
    /// Trailing bytes of an incomplete character are held back until the
    /// next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.run(bytes, false)
    }

    /// Flushes any held-back bytes at end of stream.
    ///
    /// An incomplete character left over is malformed and is dropped.
    pub fn finish(&mut self) -> String {
        self.run(&[], true)
    }

    fn run(&mut self, bytes: &[u8], last: bool) -> String {
        let mut out = String::with_capacity(self.capacity_for(bytes.len()));
        let mut input = bytes;

        loop {
            let (result, read) =
                self.decoder
                    .decode_to_string_without_replacement(input, &mut out, last);
            input = &input[read..];

            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => {
                    let needed = self.capacity_for(input.len());
                    out.reserve(needed);
                }
                DecoderResult::Malformed(bad, _) => {
                    self.dropped += usize::from(bad);
                    tracing::debug!(
                        encoding = self.encoding.name(),
                        bytes = bad,
                        "Removed malformed byte sequence"
                    );
                }
            }
        }

        out
    }

    fn capacity_for(&self, len: usize) -> usize {
        self.decoder
            .max_utf8_buffer_length_without_replacement(len)
            .unwrap_or(len)
            .max(4)
    }
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new(UTF_8)
    }
}

impl std::fmt::Debug for ChunkDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkDecoder")
            .field("encoding", &self.encoding.name())
            .field("dropped", &self.dropped)
            .finish_non_exhaustive()
    }
}

/// Decodes a complete byte buffer, dropping malformed sequences.
///
/// # Examples
///
/// ```
/// use stream_lines::decode::normalize;
///
/// assert_eq!(normalize(b"a\xFFb", encoding_rs::UTF_8), "ab");
/// ```
#[must_use]
pub fn normalize(bytes: &[u8], encoding: &'static Encoding) -> String {
    let mut decoder = ChunkDecoder::new(encoding);
    let mut text = decoder.decode(bytes);
    text.push_str(&decoder.finish());
    text
}

/// Looks up an encoding by its WHATWG label, e.g. `"utf-8"` or `"latin1"`.
#[must_use]
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}
