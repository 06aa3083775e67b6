//! IPC client for communicating with the daemon

use std::path::PathBuf;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use super::MAX_MESSAGE_SIZE;
use super::get_socket_path;
use super::messages::{DaemonMessage, DaemonResponse};
use crate::domain::{CraftRequest, RequestId, UserId};
use crate::lifecycle::{CraftEvent, Reply};
use crate::state::StoreMetrics;

/// Default timeout for IPC operations
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Responses carry whole request snapshots, so they get more room than messages
const MAX_RESPONSE_SIZE: usize = 64 * 1024;

/// Client for communicating with the daemon via IPC
#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl Default for DaemonClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DaemonClient {
    /// Create a new client with the default socket path
    pub fn new() -> Self {
        Self::with_socket_path(get_socket_path())
    }

    /// Create a client with a custom socket path
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the daemon socket exists
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    /// Deliver an inbound event and return the reply for its actor
    pub async fn send_event(&self, event: CraftEvent) -> Result<Reply> {
        debug!(kind = event.kind(), "DaemonClient: sending event");
        match self.send_message(DaemonMessage::Event { event }).await? {
            DaemonResponse::Reply { reply } => Ok(reply),
            other => Err(unexpected(other)),
        }
    }

    /// Deliver a pressed control and return the reply for its actor
    pub async fn press(&self, custom_id: &str, actor: &UserId) -> Result<Reply> {
        debug!(%custom_id, %actor, "DaemonClient: pressing control");
        let msg = DaemonMessage::Control {
            custom_id: custom_id.to_string(),
            actor: actor.clone(),
        };
        match self.send_message(msg).await? {
            DaemonResponse::Reply { reply } => Ok(reply),
            other => Err(unexpected(other)),
        }
    }

    /// Fetch one request
    pub async fn show(&self, request_id: &RequestId) -> Result<Option<CraftRequest>> {
        debug!(%request_id, "DaemonClient: fetching request");
        let msg = DaemonMessage::Show {
            request_id: request_id.clone(),
        };
        match self.send_message(msg).await? {
            DaemonResponse::Request { request } => Ok(request.map(|r| *r)),
            other => Err(unexpected(other)),
        }
    }

    /// Fetch request counts
    pub async fn status(&self) -> Result<StoreMetrics> {
        debug!("DaemonClient: fetching status");
        match self.send_message(DaemonMessage::Status).await? {
            DaemonResponse::Metrics { metrics } => Ok(metrics),
            other => Err(unexpected(other)),
        }
    }

    /// Check if daemon is alive and get its version
    pub async fn ping(&self) -> Result<String> {
        debug!("DaemonClient: pinging daemon");
        match self.send_message(DaemonMessage::Ping).await? {
            DaemonResponse::Pong { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    /// Request daemon to shutdown gracefully
    pub async fn shutdown(&self) -> Result<()> {
        debug!("DaemonClient: requesting daemon shutdown");
        match self.send_message(DaemonMessage::Shutdown).await? {
            DaemonResponse::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Send a message to the daemon and wait for response
    async fn send_message(&self, msg: DaemonMessage) -> Result<DaemonResponse> {
        debug!(?self.socket_path, ?msg, "DaemonClient: sending message");

        let stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timeout")?
            .context("Failed to connect to daemon socket")?;

        self.send_on_stream(stream, msg).await
    }

    async fn send_on_stream(&self, mut stream: UnixStream, msg: DaemonMessage) -> Result<DaemonResponse> {
        let msg_json = serde_json::to_string(&msg).context("Failed to serialize message")?;

        if msg_json.len() + 1 > MAX_MESSAGE_SIZE {
            return Err(eyre::eyre!("Message too large: {} bytes", msg_json.len()));
        }

        tokio::time::timeout(self.timeout, async {
            stream
                .write_all(msg_json.as_bytes())
                .await
                .context("Failed to write message")?;
            stream.write_all(b"\n").await.context("Failed to write newline")?;
            stream.flush().await.context("Failed to flush stream")?;
            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Write timeout")??;

        let mut reader = BufReader::new(&mut stream).take(MAX_RESPONSE_SIZE as u64 + 1);
        let mut response_line = String::new();

        tokio::time::timeout(self.timeout, async {
            let bytes_read = reader
                .read_line(&mut response_line)
                .await
                .context("Failed to read response")?;

            if bytes_read > MAX_RESPONSE_SIZE {
                return Err(eyre::eyre!("Response too large: {} bytes", bytes_read));
            }

            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Read timeout")??;

        let response: DaemonResponse =
            serde_json::from_str(response_line.trim()).context("Failed to parse daemon response")?;

        debug!(?response, "DaemonClient: received response");
        Ok(response)
    }
}

fn unexpected(response: DaemonResponse) -> eyre::Report {
    match response {
        DaemonResponse::Error { message } => eyre::eyre!("Daemon error: {}", message),
        other => eyre::eyre!("Unexpected response: {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_client_default() {
        let client = DaemonClient::default();
        assert!(client.socket_path.ends_with("craftd.sock"));
    }

    #[test]
    fn test_client_with_timeout() {
        let client = DaemonClient::new().with_timeout(Duration::from_secs(10));
        assert_eq!(client.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_socket_exists_false() {
        let temp = TempDir::new().unwrap();
        let client = DaemonClient::with_socket_path(temp.path().join("nonexistent.sock"));
        assert!(!client.socket_exists());
    }

    #[tokio::test]
    async fn test_connect_fails_without_daemon() {
        let temp = TempDir::new().unwrap();
        let client = DaemonClient::with_socket_path(temp.path().join("nonexistent.sock"));
        assert!(client.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_event_is_rejected_locally() {
        let temp = TempDir::new().unwrap();
        let client = DaemonClient::with_socket_path(temp.path().join("craftd.sock"));
        let (_listener, _) = super::super::create_listener_at(&temp.path().join("craftd.sock")).unwrap();

        let event = CraftEvent::Submit {
            requester: "u1".into(),
            item: "x".repeat(MAX_MESSAGE_SIZE),
            notes: None,
            confirmation: "yes".to_string(),
        };
        let err = client.send_event(event).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
