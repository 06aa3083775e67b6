//! IPC listener for the daemon side
//!
//! Helpers for creating and managing the Unix Domain Socket listener.

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, warn};

use super::MAX_MESSAGE_SIZE;
use super::messages::{DaemonMessage, DaemonResponse};

/// Create and bind a listener at `socket_path`
///
/// Handles cleanup of stale socket files from previous runs.
pub fn create_listener_at(socket_path: &Path) -> Result<(UnixListener, PathBuf)> {
    debug!(?socket_path, "create_listener: creating IPC socket");

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
    }

    if socket_path.exists() {
        debug!(?socket_path, "create_listener: removing stale socket");
        std::fs::remove_file(socket_path).context("Failed to remove stale socket")?;
    }

    let listener = UnixListener::bind(socket_path).context("Failed to bind IPC socket")?;
    debug!(?socket_path, "create_listener: socket bound successfully");

    Ok((listener, socket_path.to_path_buf()))
}

/// Remove the socket file on shutdown
pub fn cleanup_socket(socket_path: &Path) {
    if socket_path.exists() {
        debug!(?socket_path, "cleanup_socket: removing socket file");
        if let Err(e) = std::fs::remove_file(socket_path) {
            warn!(?socket_path, error = %e, "Failed to remove socket file");
        }
    }
}

/// Read one message line from the stream
pub async fn read_message(stream: &mut UnixStream) -> Result<DaemonMessage> {
    let mut reader = BufReader::new(stream).take(MAX_MESSAGE_SIZE as u64 + 1);
    let mut line = String::new();

    let bytes_read = reader
        .read_line(&mut line)
        .await
        .context("Failed to read IPC message")?;

    if bytes_read > MAX_MESSAGE_SIZE {
        return Err(eyre::eyre!("Message too large: more than {} bytes", MAX_MESSAGE_SIZE));
    }

    if line.trim().is_empty() {
        return Err(eyre::eyre!("Empty message received"));
    }

    let msg: DaemonMessage = serde_json::from_str(line.trim()).context("Failed to parse IPC message")?;
    debug!(?msg, "read_message: parsed message");

    Ok(msg)
}

/// Send a response on the stream
pub async fn send_response(stream: &mut UnixStream, response: &DaemonResponse) -> Result<()> {
    let response_json = serde_json::to_string(response).context("Failed to serialize response")?;
    stream
        .write_all(response_json.as_bytes())
        .await
        .context("Failed to write response")?;
    stream.write_all(b"\n").await.context("Failed to write newline")?;
    stream.flush().await.context("Failed to flush response")?;
    debug!(?response, "send_response: sent response");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_listener_creates_parent_dir() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("subdir").join("craftd.sock");

        let (_, path) = create_listener_at(&socket_path).unwrap();
        assert_eq!(path, socket_path);
        assert!(socket_path.exists());
    }

    #[tokio::test]
    async fn test_create_listener_removes_stale_socket() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("craftd.sock");
        std::fs::write(&socket_path, "stale").unwrap();

        assert!(create_listener_at(&socket_path).is_ok());
    }

    #[test]
    fn test_cleanup_socket() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("craftd.sock");
        std::fs::write(&socket_path, "test").unwrap();

        cleanup_socket(&socket_path);
        assert!(!socket_path.exists());

        // Missing file is fine
        cleanup_socket(&socket_path);
    }

    #[tokio::test]
    async fn test_read_message_rejects_oversized_line() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("craftd.sock");
        let (listener, _) = create_listener_at(&socket_path).unwrap();

        let writer = tokio::spawn(async move {
            let mut stream = UnixStream::connect(&socket_path).await.unwrap();
            let huge = format!("{{\"type\":\"Ping\",\"pad\":\"{}\"}}\n", "x".repeat(MAX_MESSAGE_SIZE));
            let _ = stream.write_all(huge.as_bytes()).await;
        });

        let (mut stream, _) = listener.accept().await.unwrap();
        let err = read_message(&mut stream).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_end_to_end_ping_pong() {
        use super::super::client::DaemonClient;

        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("test.sock");
        let (listener, _) = create_listener_at(&socket_path).unwrap();

        let mock_daemon = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let msg = read_message(&mut stream).await.unwrap();
            assert_eq!(msg, DaemonMessage::Ping);
            send_response(
                &mut stream,
                &DaemonResponse::Pong {
                    version: "test-version".to_string(),
                },
            )
            .await
            .unwrap();
        });

        let client = DaemonClient::with_socket_path(socket_path);
        let version = client.ping().await.unwrap();
        assert_eq!(version, "test-version");

        mock_daemon.await.unwrap();
    }
}
