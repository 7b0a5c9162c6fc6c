//! CLI argument parsing and execution.
//!
//! # Example
//!
//! ```bash
//! stream-lines https://example.com/access.log --max-lines 100
//! stream-lines https://example.com/export.csv --separator '\r\n' -n
//! stream-lines https://example.com/legacy.txt --encoding windows-1252
//! stream-lines https://example.com/page.txt --charset
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use stream_lines::{LineStreamer, StreamConfig, StreamOutcome};

/// Print the lines of a remote resource as they arrive
///
/// Lines are written to stdout as soon as the chunk completing them is
/// received. Malformed byte sequences are removed. Diagnostics go to stderr
/// and are controlled with `RUST_LOG`.
#[derive(Parser, Debug)]
#[command(name = "stream-lines")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// URL of the resource to stream
    pub url: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Record separator (escapes: \n, \r, \t, \0, \\)
    #[arg(short, long, value_parser = parse_separator)]
    pub separator: Option<String>,

    /// Source encoding label (e.g. utf-8, windows-1252, shift_jis)
    #[arg(short, long)]
    pub encoding: Option<String>,

    /// Decode with the charset declared by the server, when known
    #[arg(long)]
    pub charset: bool,

    /// Overall download timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// User-Agent header to send
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Prefix each line with its 1-based line number
    #[arg(short, long)]
    pub number: bool,

    /// Stop after this many lines
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_lines: Option<u64>,
}

impl Cli {
    /// Parse CLI arguments from the environment
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    #[cfg_attr(
        not(test),
        expect(dead_code, reason = "Only the unit tests parse from an iterator")
    )]
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Build the effective configuration: the config file, if any, with
    /// command-line flags applied on top.
    pub async fn resolve_config(&self) -> Result<StreamConfig> {
        let mut config = match &self.config {
            Some(path) => StreamConfig::load(path)
                .await
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => StreamConfig::default(),
        };

        if let Some(separator) = &self.separator {
            config.separator.clone_from(separator);
        }
        if let Some(encoding) = &self.encoding {
            config.encoding.clone_from(encoding);
        }
        if self.charset {
            config.honor_charset = true;
        }
        if let Some(timeout) = self.timeout {
            config.http.timeout_secs = Some(timeout);
        }
        if let Some(agent) = &self.user_agent {
            config.http.user_agent = Some(agent.clone());
        }

        config.validate()?;
        Ok(config)
    }

    /// Stream the URL to stdout.
    pub async fn execute(&self) -> Result<()> {
        let config = self.resolve_config().await?;
        let streamer = LineStreamer::from_config(self.url.clone(), &config)?;

        let stdout = io::stdout();
        let mut out = io::BufWriter::new(stdout.lock());
        let mut write_error = None;
        let mut count: u64 = 0;

        let outcome = streamer
            .for_each(|line| {
                count += 1;
                let written = if self.number {
                    writeln!(out, "{count:>6}\t{line}")
                } else {
                    writeln!(out, "{line}")
                };
                if let Err(err) = written {
                    write_error = Some(err);
                    return ControlFlow::Break(());
                }
                match self.max_lines {
                    Some(max) if count >= max => ControlFlow::Break(()),
                    _ => ControlFlow::Continue(()),
                }
            })
            .await;

        let flushed = out.flush();
        match write_error {
            Some(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("stdout closed, stopping");
                return Ok(());
            }
            Some(err) => return Err(err).context("Failed to write to stdout"),
            None => {}
        }
        flushed.context("Failed to write to stdout")?;

        match outcome? {
            StreamOutcome::Completed { lines } => {
                tracing::info!(lines, url = %self.url, "Download complete");
            }
            StreamOutcome::Stopped { lines } => {
                tracing::info!(lines, url = %self.url, "Stopped at line limit");
            }
        }
        Ok(())
    }
}

/// Parse a separator argument, expanding backslash escapes.
pub fn parse_separator(s: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some(other) => return Err(format!("Unknown escape sequence: \\{other}")),
            None => return Err("Separator cannot end with a lone backslash".to_string()),
        }
    }

    if out.is_empty() {
        return Err("Separator cannot be empty".to_string());
    }
    Ok(out)
}
