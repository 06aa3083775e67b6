//! Inter-Process Communication with the daemon
//!
//! Unix Domain Socket IPC between the CLI (or a gateway process) and the
//! running daemon. Inbound craft events, status queries and shutdown requests
//! all travel this way, one JSON line per message.

use std::path::PathBuf;

pub mod client;
pub mod listener;
pub mod messages;

pub use client::DaemonClient;
pub use listener::{cleanup_socket, create_listener_at, read_message, send_response};
pub use messages::{DaemonMessage, DaemonResponse};

/// Maximum size of one message line in bytes
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Get the default socket path for daemon IPC
pub fn get_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("craftd")
        .join("craftd.sock")
}
