//! IPC message types for daemon communication
//!
//! Simple JSON-over-newline protocol. Each message is a single line of JSON followed by `\n`.

use serde::{Deserialize, Serialize};

use crate::domain::{CraftRequest, RequestId, UserId};
use crate::lifecycle::{CraftEvent, Reply};
use crate::state::StoreMetrics;

/// Messages from CLI/gateway to Daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DaemonMessage {
    /// Deliver an inbound craft event and return the actor's reply
    Event { event: CraftEvent },

    /// Deliver a pressed control by its custom id, as a chat gateway sees it
    Control { custom_id: String, actor: UserId },

    /// Fetch one request
    Show { request_id: RequestId },

    /// Fetch request counts
    Status,

    /// Ping to check if daemon is alive
    Ping,

    /// Request daemon to stop gracefully
    Shutdown,
}

/// Responses from Daemon to CLI/gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DaemonResponse {
    /// Private reply to the actor of an event
    Reply { reply: Reply },

    /// Request snapshot, if it exists
    Request { request: Option<Box<CraftRequest>> },

    /// Request counts per status
    Metrics { metrics: StoreMetrics },

    /// Pong response to ping
    Pong { version: String },

    /// Acknowledgment
    Ok,

    /// Error response
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_message_serialize() {
        let msg = DaemonMessage::Event {
            event: CraftEvent::StartRequest {
                actor: UserId::from("42"),
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"Event","event":{"type":"start_request","actor":"42"}}"#);
    }

    #[test]
    fn test_control_deserialize() {
        let json = r#"{"type":"Control","custom_id":"craft:accept:a1b2c3d4","actor":"7"}"#;
        let msg: DaemonMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            DaemonMessage::Control {
                custom_id: "craft:accept:a1b2c3d4".to_string(),
                actor: UserId::from("7")
            }
        );
    }

    #[test]
    fn test_show_deserialize() {
        let json = r#"{"type":"Show","request_id":"a1b2c3d4"}"#;
        let msg: DaemonMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            DaemonMessage::Show {
                request_id: RequestId::from("a1b2c3d4")
            }
        );
    }

    #[test]
    fn test_ping_serialize() {
        let json = serde_json::to_string(&DaemonMessage::Ping).unwrap();
        assert_eq!(json, r#"{"type":"Ping"}"#);
    }

    #[test]
    fn test_reply_response_serialize() {
        let resp = DaemonResponse::Reply {
            reply: Reply::message("🎁 Accepted; requester notified."),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            json,
            r#"{"type":"Reply","reply":{"reply":"message","text":"🎁 Accepted; requester notified."}}"#
        );
    }

    #[test]
    fn test_missing_request_response() {
        let json = serde_json::to_string(&DaemonResponse::Request { request: None }).unwrap();
        assert_eq!(json, r#"{"type":"Request","request":null}"#);
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = DaemonResponse::Error {
            message: "Something went wrong".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"type":"Error","message":"Something went wrong"}"#);
    }
}
