/// One-shot redirect catcher for the authorization-code flow
/// Accepts a single connection on the redirect URI's host/port and hands back the raw request
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AuthError, Result};

// Word chars plus `^` and `-` as in the provider's GUID-style codes, and the
// remaining URL-unreserved chars used by personal-account codes (M.C5xx_BAY.2...)
static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcode=([\w^.~-]+)").expect("valid code pattern"));
static STATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bstate=([^&\s#']+)").expect("valid state pattern"));
static ERROR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\berror=([^&\s#']+)").expect("valid error pattern"));
static ERROR_DESCRIPTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\berror_description=([^&\s#']+)").expect("valid description pattern"));

const CLOSE_PAGE: &str = "<html><body><h3>drivelink: sign-in received.</h3><p>You can close this window.</p></body></html>";

/// Source of the raw redirect request
#[async_trait]
pub trait RedirectListener: Send + Sync {
    /// Wait for exactly one redirect and return its request text.
    /// `None` waits indefinitely.
    async fn catch(&self, timeout: Option<Duration>) -> Result<String>;
}

/// Query values pulled out of a redirect request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectParams {
    pub code: String,
    pub state: Option<String>,
}

pub struct TcpRedirectListener {
    host: String,
    port: u16,
    buffer_size: usize,
}

impl TcpRedirectListener {
    pub fn new(host: impl Into<String>, port: u16, buffer_size: usize) -> Self {
        Self {
            host: host.into(),
            port,
            buffer_size,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let (host, port) = config.redirect_endpoint()?;
        Ok(Self::new(host, port, config.redirect_buffer_size))
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn accept_one(&self) -> Result<String> {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        info!("Waiting for sign-in redirect on {}", self.address());

        let (mut stream, peer) = listener.accept().await?;
        debug!("Redirect connection from {}", peer);

        let mut buffer = vec![0u8; self.buffer_size];
        let read = stream.read(&mut buffer).await?;
        let request = String::from_utf8_lossy(&buffer[..read]).into_owned();

        // Best effort: the browser tab is cosmetic
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            CLOSE_PAGE.len(),
            CLOSE_PAGE
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;

        Ok(request)
    }
}

#[async_trait]
impl RedirectListener for TcpRedirectListener {
    async fn catch(&self, timeout: Option<Duration>) -> Result<String> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.accept_one())
                .await
                .map_err(|_| AuthError::RedirectTimeout(limit))?,
            None => self.accept_one().await,
        }
    }
}

/// Pull the authorization code out of a redirect request (`code=<token>`)
pub fn extract_code(request: &str) -> Option<String> {
    CODE_PATTERN
        .captures(request)
        .map(|caps| caps[1].to_string())
}

/// Parse a redirect into its code and state, surfacing provider errors such as `access_denied`
pub fn parse_redirect(request: &str) -> Result<RedirectParams> {
    if let Some(code) = extract_code(request) {
        return Ok(RedirectParams {
            code,
            state: capture_decoded(&STATE_PATTERN, request),
        });
    }

    match capture_decoded(&ERROR_PATTERN, request) {
        Some(error) => Err(AuthError::Denied {
            error,
            description: capture_decoded(&ERROR_DESCRIPTION_PATTERN, request),
        }),
        None => Err(AuthError::MissingCode),
    }
}

fn capture_decoded(pattern: &Regex, request: &str) -> Option<String> {
    let raw = pattern.captures(request)?.get(1)?.as_str().replace('+', " ");
    let decoded = urlencoding::decode(&raw)
        .map(|value| value.into_owned())
        .unwrap_or(raw);
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;

    #[test]
    fn test_extract_code() {
        let request = "GET /?code=ABC123-def HTTP/1.1\r\nHost: localhost:9001\r\n\r\n";
        assert_eq!(extract_code(request).as_deref(), Some("ABC123-def"));
    }

    #[test]
    fn test_extract_code_stops_at_next_param() {
        let request = "GET /?code=M.C507_BAY.2.U.9a4f-77&state=xyz HTTP/1.1\r\n";
        assert_eq!(extract_code(request).as_deref(), Some("M.C507_BAY.2.U.9a4f-77"));
    }

    #[test]
    fn test_extract_code_missing() {
        assert_eq!(extract_code("GET /favicon.ico HTTP/1.1\r\n\r\n"), None);
        assert_eq!(extract_code("GET /?error_code=42 HTTP/1.1\r\n\r\n"), None);
        assert_eq!(extract_code(""), None);
    }

    #[test]
    fn test_parse_redirect_with_state() {
        let request = "GET /?code=abc&state=s%2Bt&session_state=ignored HTTP/1.1\r\n";
        let params = parse_redirect(request).unwrap();

        assert_eq!(params.code, "abc");
        assert_eq!(params.state.as_deref(), Some("s+t"));
    }

    #[test]
    fn test_parse_redirect_denied() {
        let request = "GET /?error=access_denied&error_description=The+user+has+denied+access HTTP/1.1\r\n";

        match parse_redirect(request) {
            Err(AuthError::Denied { error, description }) => {
                assert_eq!(error, "access_denied");
                assert_eq!(description.as_deref(), Some("The user has denied access"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_redirect_without_code() {
        assert!(matches!(
            parse_redirect("GET / HTTP/1.1\r\n\r\n"),
            Err(AuthError::MissingCode)
        ));
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    async fn connect_with_retry(port: u16) -> TcpStream {
        for _ in 0..100 {
            if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)).await {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("redirect listener never came up on port {port}");
    }

    #[tokio::test]
    async fn test_tcp_listener_catches_one_request() {
        let port = free_port();
        let listener = TcpRedirectListener::new("127.0.0.1", port, 1024);
        let task = tokio::spawn(async move { listener.catch(Some(Duration::from_secs(10))).await });

        let mut stream = connect_with_retry(port).await;
        stream
            .write_all(b"GET /?code=ABC123-def HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("You can close this window"));

        let request = task.await.unwrap().unwrap();
        assert!(request.starts_with("GET /?code=ABC123-def"));
        assert_eq!(extract_code(&request).as_deref(), Some("ABC123-def"));
    }

    #[tokio::test]
    async fn test_tcp_listener_respects_buffer_budget() {
        let port = free_port();
        let listener = TcpRedirectListener::new("127.0.0.1", port, 16);
        let task = tokio::spawn(async move { listener.catch(Some(Duration::from_secs(10))).await });

        let mut stream = connect_with_retry(port).await;
        stream
            .write_all(b"GET /?code=0123456789abcdef HTTP/1.1\r\n\r\n")
            .await
            .unwrap();

        let request = task.await.unwrap().unwrap();
        assert!(request.len() <= 16);
    }

    #[tokio::test]
    async fn test_tcp_listener_times_out() {
        let listener = TcpRedirectListener::new("127.0.0.1", free_port(), 1024);

        match listener.catch(Some(Duration::from_millis(50))).await {
            Err(AuthError::RedirectTimeout(limit)) => assert_eq!(limit, Duration::from_millis(50)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tcp_listener_port_in_use() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let listener = TcpRedirectListener::new("127.0.0.1", port, 1024);

        assert!(matches!(
            listener.catch(Some(Duration::from_secs(1))).await,
            Err(AuthError::Io(_))
        ));
    }

    #[test]
    fn test_from_config_uses_redirect_uri() {
        let config = Config::default();
        let listener = TcpRedirectListener::from_config(&config).unwrap();

        assert_eq!(listener.address(), "localhost:9001");
    }
}
