//! HTTP client wrapper for page fetches and streamed file downloads.
//!
//! This module provides the `HttpClient` struct which handles streaming
//! downloads with proper timeout configuration and error handling.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::progress::DownloadProgress;
use crate::user_agent::BROWSER_USER_AGENT;

/// HTTP client for archive pages and audio files.
///
/// This client is designed to be created once and reused for every request
/// of a run, taking advantage of connection pooling.
///
/// # Example
///
/// ```no_run
/// use cratedigger::download::{HttpClient, NoProgress};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let bytes = client
///     .download_to_path("https://example.com/track.mp3", Path::new("./track.mp3"), &NoProgress)
///     .await?;
/// println!("Downloaded {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes between received bytes (no limit on the
    ///   total transfer time)
    /// - Gzip decompression: enabled
    /// - Browser User-Agent
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(READ_TIMEOUT_SECS),
        )
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self::try_new_with_timeouts(connect_timeout, read_timeout)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Fallible variant of [`new_with_timeouts`](Self::new_with_timeouts).
    ///
    /// # Errors
    ///
    /// Returns the builder error when TLS or proxy initialisation fails.
    pub fn try_new_with_timeouts(
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .gzip(true)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches a page and returns its body as text.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid, the request fails, the
    /// server answers with a non-2xx status, or the body cannot be read.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self.send_get(url).await?;
        let body = response
            .text()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        debug!(bytes = body.len(), "page fetched");
        Ok(body)
    }

    /// Streams `url` into the file at `path`, returning the bytes written.
    ///
    /// The file is created (or truncated) once the server has answered with a
    /// success status. Chunks go straight to disk, so memory use does not
    /// depend on the file size. On any error, and when the body turned out to
    /// be empty, the file is removed before returning.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    /// - The body is empty
    /// - Writing to disk fails
    #[instrument(skip(self, progress), fields(url = %url, path = %path.display()))]
    pub async fn download_to_path(
        &self,
        url: &str,
        path: &Path,
        progress: &dyn DownloadProgress,
    ) -> Result<u64, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self.send_get(url).await?;
        let total = response.content_length();
        debug!(content_length = ?total, "response received");

        let mut file = File::create(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;

        progress.start(url, total);
        let stream_result = stream_to_file(&mut file, response, url, path, progress).await;
        progress.finish();
        drop(file);

        let written = match stream_result {
            Ok(written) => written,
            Err(e) => {
                debug!(path = %path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(path).await;
                return Err(e);
            }
        };

        if written == 0 {
            debug!(path = %path.display(), "removing empty file");
            let _ = tokio::fs::remove_file(path).await;
            return Err(DownloadError::empty_body(url));
        }

        Ok(written)
    }

    async fn send_get(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }

}

/// Streams response body to file, returning bytes written.
///
/// This is extracted to enable cleanup on error in the caller.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    progress: &dyn DownloadProgress,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
        progress.advance(chunk.len() as u64);
    }

    // Ensure all data is flushed to disk
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::NoProgress;
    use crate::download::progress::BarProgress;
    use crate::test_support::socket_guard::{
        should_skip_socket_bound_test, start_mock_server_or_skip,
    };
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use wiremock::matchers::{header_regex, method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_download_to_path_writes_body_and_reports_progress() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/track.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 audio bytes"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let progress = BarProgress::hidden();
        let target = temp_dir.path().join("track.mp3");
        let url = format!("{}/track.mp3", mock_server.uri());

        let written = client.download_to_path(&url, &target, &progress).await.unwrap();

        assert_eq!(written, 15);
        assert_eq!(std::fs::read(&target).unwrap(), b"ID3 audio bytes");
        assert_eq!(progress.position(), 15);
    }

    #[tokio::test]
    async fn test_download_to_path_sends_browser_user_agent() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/ua.mp3"))
            .and(header_regex("user-agent", "^Mozilla/5.0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/ua.mp3", mock_server.uri());
        let result = client
            .download_to_path(&url, &temp_dir.path().join("ua.mp3"), &NoProgress)
            .await;
        assert!(result.is_ok(), "Expected Ok, got: {result:?}");
    }

    #[tokio::test]
    async fn test_download_to_path_empty_body_removes_file() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/empty.mp3"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let target = temp_dir.path().join("empty.mp3");
        let url = format!("{}/empty.mp3", mock_server.uri());

        let result = client.download_to_path(&url, &target, &NoProgress).await;

        assert!(matches!(result, Err(DownloadError::EmptyBody { .. })));
        assert!(!target.exists(), "empty file must be removed");
    }

    #[tokio::test]
    async fn test_download_to_path_http_error_creates_no_file() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/missing.mp3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let target = temp_dir.path().join("missing.mp3");
        let url = format!("{}/missing.mp3", mock_server.uri());

        match client.download_to_path(&url, &target, &NoProgress).await {
            Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got: {other:?}"),
        }
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_download_to_path_timeout_maps_to_timeout_error() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/slow.mp3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let client =
            HttpClient::new_with_timeouts(Duration::from_secs(5), Duration::from_millis(300));
        let url = format!("{}/slow.mp3", mock_server.uri());
        let result = client
            .download_to_path(&url, &temp_dir.path().join("slow.mp3"), &NoProgress)
            .await;

        assert!(
            matches!(result, Err(DownloadError::Timeout { .. })),
            "Expected Timeout, got: {result:?}"
        );
    }

    /// Serves every connection with a raw HTTP/1.1 response announcing
    /// `content_length` bytes, then writes `body` one byte at a time with
    /// `gap` between bytes and closes.
    async fn spawn_trickle_server(
        content_length: usize,
        body: &'static [u8],
        gap: Duration,
    ) -> Option<String> {
        if should_skip_socket_bound_test() {
            return None;
        }
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let head = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: {content_length}\r\nConnection: close\r\n\r\n"
                    );
                    if socket.write_all(head.as_bytes()).await.is_err() {
                        return;
                    }
                    for byte in body {
                        tokio::time::sleep(gap).await;
                        if socket.write_all(&[*byte]).await.is_err() {
                            return;
                        }
                        let _ = socket.flush().await;
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });

        Some(format!("http://{addr}/a.mp3"))
    }

    #[tokio::test]
    async fn test_download_to_path_slow_steady_body_outlives_read_timeout() {
        // 10 bytes over ~3s: longer than the read timeout in total, but each
        // byte arrives well within it.
        let Some(url) =
            spawn_trickle_server(10, b"0123456789", Duration::from_millis(300)).await
        else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a.mp3");

        let client = HttpClient::new_with_timeouts(Duration::from_secs(5), Duration::from_secs(1));
        let written = client
            .download_to_path(&url, &target, &NoProgress)
            .await
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(std::fs::read(&target).unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_download_to_path_truncated_body_removes_partial_file() {
        // Announces 100 bytes, sends 4, then closes the connection.
        let Some(url) = spawn_trickle_server(100, b"ID3\x04", Duration::from_millis(10)).await
        else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a.mp3");

        let result = HttpClient::new()
            .download_to_path(&url, &target, &NoProgress)
            .await;

        assert!(
            matches!(result, Err(DownloadError::Network { .. })),
            "Expected Network error, got: {result:?}"
        );
        assert!(!target.exists(), "partial file must be removed");
    }

    #[tokio::test]
    async fn test_fetch_text_returns_body() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/page.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let body = client
            .fetch_text(&format!("{}/page.html", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html></html>");
    }

    #[test]
    fn test_fetch_text_rejects_invalid_url() {
        let client = HttpClient::new();
        let result = tokio_test::block_on(client.fetch_text("definitely-not-a-url"));
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }
}
