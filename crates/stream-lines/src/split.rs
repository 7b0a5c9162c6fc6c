//! Reassembly of decoded chunks into lines.
//!
//! [`LineSplitter`] owns the carry-over buffer: the text received since the
//! last separator. Each pushed chunk completes zero or more lines; whatever
//! follows the final separator waits in the buffer for the next chunk, so a
//! line may span any number of chunks.

use crate::error::{Error, Result};
use std::collections::VecDeque;

/// The default record separator.
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Splits a sequence of text chunks into separator-delimited lines.
///
/// Separators are stripped. An empty string between two separators is a
/// line of its own, but a separator at the very end of the stream does not
/// produce a trailing empty line.
///
/// # Examples
///
/// ```
/// use std::collections::VecDeque;
/// use stream_lines::split::LineSplitter;
///
/// let mut splitter = LineSplitter::default();
/// let mut lines = VecDeque::new();
///
/// splitter.push("hel", &mut lines);
/// splitter.push("lo\nwor", &mut lines);
/// assert_eq!(lines.pop_front().as_deref(), Some("hello"));
///
/// assert_eq!(splitter.finish().as_deref(), Some("wor"));
/// ```
#[derive(Debug, Clone)]
pub struct LineSplitter {
    separator: String,
    /// Text after the last separator seen so far.
    carry: String,
}

impl LineSplitter {
    /// Creates a splitter for the given separator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `separator` is empty.
    pub fn new(separator: impl Into<String>) -> Result<Self> {
        let separator = separator.into();
        if separator.is_empty() {
            return Err(Error::Config("separator must not be empty".to_string()));
        }
        Ok(Self {
            separator,
            carry: String::new(),
        })
    }

    /// The separator this splitter breaks lines on.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// The text held back since the last separator.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.carry
    }

    /// Feeds one decoded chunk, appending every completed line to `lines`.
    ///
    /// Returns the number of lines completed by this chunk. An empty chunk
    /// completes nothing and leaves the buffer unchanged.
    pub fn push(&mut self, text: &str, lines: &mut VecDeque<String>) -> usize {
        if text.is_empty() {
            return 0;
        }

        // A separator may have started at the tail of the previous chunk.
        let overlap = self.separator.len() - 1;
        let mut scan_from =
            floor_char_boundary(&self.carry, self.carry.len().saturating_sub(overlap));
        self.carry.push_str(text);

        let mut start = 0;
        let mut completed = 0;
        while let Some(offset) = self.carry[scan_from..].find(&self.separator) {
            let end = scan_from + offset;
            lines.push_back(self.carry[start..end].to_owned());
            completed += 1;
            start = end + self.separator.len();
            scan_from = start;
        }

        if start > 0 {
            self.carry.drain(..start);
        }
        completed
    }

    /// Takes the unterminated final line at end of stream, if any.
    ///
    /// Returns `None` when the stream ended on a separator or was empty.
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.carry))
        }
    }
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            carry: String::new(),
        }
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
