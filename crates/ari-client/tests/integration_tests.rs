//! Integration tests for ari-client.
//!
//! The client tests run against a one-shot HTTP stub on localhost, so no
//! call-control platform is needed. Tests marked `#[ignore]` talk to a real
//! ARI endpoint configured through `ARI_URL`, `ARI_USERNAME`, `ARI_PASSWORD`:
//!   cargo test -p ari-client --test integration_tests -- --ignored

use ari_client::{AriClient, AriConfig, CallControl, Command, GatewayError, OriginateRequest};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve a single HTTP response and hand back the raw request text.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if request_complete(&buf) {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&buf).to_string()
    });

    (format!("http://{}/ari", addr), handle)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    buf.len() >= header_end + 4 + content_length
}

fn request_line(raw: &str) -> &str {
    raw.lines().next().unwrap_or_default()
}

// ============================================================================
// Config tests
// ============================================================================

mod config_tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_config_default() {
        let config = AriConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8088/ari");
        assert!(config.username.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = AriConfig::new("http://pbx:8088/ari/");
        assert_eq!(config.resource_url("channels"), "http://pbx:8088/ari/channels");
        assert_eq!(config.resource_url("/channels/1"), "http://pbx:8088/ari/channels/1");
        assert_eq!(config.check_url(), "http://pbx:8088/ari/asterisk/info");
    }

    #[test]
    fn test_config_with_credentials() {
        let config = AriConfig::with_credentials("http://pbx:8088/ari", "ari", "secret");
        assert_eq!(config.username.as_deref(), Some("ari"));
        assert_eq!(config.password.as_deref(), Some("secret"));
    }
}

// ============================================================================
// Client tests (local stub server)
// ============================================================================

mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_device_state_request_path() {
        let (url, server) = serve_once("200 OK", r#"{"name":"PJSIP/2765","state":"INUSE"}"#).await;
        let client = AriClient::new(AriConfig::new(url)).unwrap();

        let state = client.device_state("PJSIP/2765").await.unwrap();
        assert_eq!(state.state, "INUSE");

        let raw = server.await.unwrap();
        assert_eq!(
            request_line(&raw),
            "GET /ari/deviceStates/PJSIP%2F2765 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let (url, server) = serve_once("204 No Content", "").await;
        let client = AriClient::new(AriConfig::with_credentials(url, "ari", "secret")).unwrap();

        let response = client
            .send_command(Command::start_moh("caller-1", "default"))
            .await
            .unwrap();
        assert_eq!(response, Value::Null);

        let raw = server.await.unwrap();
        assert_eq!(
            request_line(&raw),
            "POST /ari/channels/caller-1/moh?mohClass=default HTTP/1.1"
        );
        assert!(raw
            .to_ascii_lowercase()
            .contains("authorization: basic yxjponnly3jlda=="));
    }

    #[tokio::test]
    async fn test_originate_sends_body() {
        let (url, server) = serve_once("200 OK", r#"{"id":"agent-42"}"#).await;
        let client = AriClient::new(AriConfig::new(url)).unwrap();

        let request = OriginateRequest::new("PJSIP/2765", "voice-agent")
            .app_args(["attended-transfer", "call-1", "support_agent"]);
        let id = client.originate(&request).await.unwrap();
        assert_eq!(id, "agent-42");

        let raw = server.await.unwrap();
        assert!(request_line(&raw).starts_with("POST /ari/channels?app=voice-agent&appArgs="));
        assert!(raw.contains(r#""endpoint":"PJSIP/2765""#));
    }

    #[tokio::test]
    async fn test_error_status() {
        let (url, server) = serve_once("404 Not Found", r#"{"message":"Channel not found"}"#).await;
        let client = AriClient::new(AriConfig::new(url)).unwrap();

        let result = client.hangup("missing").await;
        match result {
            Err(GatewayError::Status {
                status, resource, ..
            }) => {
                assert_eq!(status, 404);
                assert_eq!(resource, "channels/missing");
            }
            other => panic!("Unexpected result: {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let config = AriConfig::new("http://127.0.0.1:59999/ari");
        let result = AriClient::connect(config).await;
        assert!(result.is_err());
        match result.unwrap_err() {
            GatewayError::Http(_) => {} // Expected
            e => panic!("Unexpected error type: {:?}", e),
        }
    }
}

// ============================================================================
// Live tests (require a reachable ARI endpoint)
// ============================================================================

mod live_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires running ARI endpoint"]
    async fn test_connect_live() {
        let config = AriConfig::from_env().unwrap();
        let client = AriClient::connect(config).await;
        assert!(client.is_ok(), "Failed to connect: {:?}", client.err());
        assert!(client.unwrap().is_connected());
    }
}
