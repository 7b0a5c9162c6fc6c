//! stream-lines CLI binary.

mod cli;

use anyhow::Result;
use cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the stream-lines CLI.
///
/// Uses tokio's current_thread runtime: a single download is consumed
/// sequentially, line by line.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Diagnostics go to stderr so stdout carries only lines.
    // Example: RUST_LOG=stream_lines=trace stream-lines https://example.com/app.log
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stream_lines=warn,stream_lines_cli=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse_args();
    tracing::debug!(url = %cli.url, "Starting stream-lines");
    cli.execute().await?;

    Ok(())
}
