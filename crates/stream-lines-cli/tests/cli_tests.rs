//! Integration tests for the stream-lines CLI.
//!
//! These tests run the built binary against a local HTTP server.

use rstest::rstest;
use std::process::{Command, Output};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Run the stream-lines binary with the given arguments
async fn run_stream_lines(args: Vec<String>) -> Output {
    tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_stream-lines"))
            .args(&args)
            .env("RUST_LOG", "off")
            .output()
            .expect("Failed to execute stream-lines binary")
    })
    .await
    .expect("blocking task panicked")
}

async fn serve(route: &str, response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[rstest]
#[case::help("--help", "Usage:")]
#[case::version("--version", "stream-lines")]
#[tokio::test(flavor = "multi_thread")]
async fn test_cli_info_flags(#[case] flag: &str, #[case] expected: &str) {
    let output = run_stream_lines(vec![flag.to_string()]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(expected), "stdout: {stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_requires_url() {
    let output = run_stream_lines(vec![]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("<URL>"), "stderr: {stderr}");
}

// ============================================================================
// Streaming Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_prints_lines() {
    let server = serve(
        "/app.log",
        ResponseTemplate::new(200).set_body_string("start\nworking\ndone"),
    )
    .await;

    let output = run_stream_lines(vec![format!("{}/app.log", server.uri())]).await;

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "start\nworking\ndone\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_numbers_and_limits_lines() {
    let server = serve(
        "/app.log",
        ResponseTemplate::new(200).set_body_string("a\nb\nc\nd\n"),
    )
    .await;

    let output = run_stream_lines(vec![
        format!("{}/app.log", server.uri()),
        "--number".to_string(),
        "--max-lines".to_string(),
        "2".to_string(),
    ])
    .await;

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "     1\ta\n     2\tb\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_custom_separator() {
    let server = serve(
        "/export.csv",
        ResponseTemplate::new(200).set_body_string("h1,h2\r\nv1,v2\r\n"),
    )
    .await;

    let output = run_stream_lines(vec![
        format!("{}/export.csv", server.uri()),
        "--separator".to_string(),
        "\\r\\n".to_string(),
    ])
    .await;

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "h1,h2\nv1,v2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_reports_download_error() {
    let server = serve("/missing", ResponseTemplate::new(404)).await;
    let url = format!("{}/missing", server.uri());

    let output = run_stream_lines(vec![url.clone()]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(&format!("Failed to download `{url}` with code: `404`")),
        "stderr: {stderr}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_reads_config_file() {
    let server = serve(
        "/records",
        ResponseTemplate::new(200).set_body_string("x|y|z"),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("stream-lines.yaml");
    std::fs::write(&config_path, "separator: \"|\"\n").unwrap();

    let output = run_stream_lines(vec![
        format!("{}/records", server.uri()),
        "--config".to_string(),
        config_path.display().to_string(),
    ])
    .await;

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "x\ny\nz\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("bad.yaml");
    std::fs::write(&config_path, "encoding: klingon\n").unwrap();

    let output = run_stream_lines(vec![
        "http://127.0.0.1:1/unused".to_string(),
        "--config".to_string(),
        config_path.display().to_string(),
    ])
    .await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown encoding"), "stderr: {stderr}");
}
