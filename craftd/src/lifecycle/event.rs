//! Inbound events and replies
//!
//! Every interaction the hosting runtime can deliver is one [`CraftEvent`]
//! variant, and every answer is a private [`Reply`] to the actor who caused it.

use serde::{Deserialize, Serialize};

use crate::domain::{RequestId, RequestStatus, UserId};

/// Inbound event from the hosting runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CraftEvent {
    /// The "Request Craft" button on the entry-point card was pressed
    StartRequest { actor: UserId },

    /// The request form was submitted
    Submit {
        requester: UserId,
        item: String,
        #[serde(default)]
        notes: Option<String>,
        confirmation: String,
    },

    /// A crafter pressed the claim button
    Accept { request_id: RequestId, candidate: UserId },

    /// The accepter pressed a status button
    AdvanceStatus {
        request_id: RequestId,
        actor: UserId,
        status: RequestStatus,
    },

    /// The completion-note form was submitted
    SubmitCompletionNote {
        request_id: RequestId,
        actor: UserId,
        #[serde(default)]
        note: Option<String>,
    },

    /// The prefix command asking for the entry-point card in a channel
    EntryPoint { channel_id: String },
}

impl CraftEvent {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            CraftEvent::StartRequest { .. } => "start_request",
            CraftEvent::Submit { .. } => "submit",
            CraftEvent::Accept { .. } => "accept",
            CraftEvent::AdvanceStatus { .. } => "advance_status",
            CraftEvent::SubmitCompletionNote { .. } => "submit_completion_note",
            CraftEvent::EntryPoint { .. } => "entry_point",
        }
    }
}

/// Structured form the runtime should present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum Form {
    /// Item, optional notes, and the "type YES" confirmation
    CraftRequest,
    /// Optional personal note before marking a request ready
    CompletionNote { request_id: RequestId },
}

/// Private, non-persistent answer to the triggering actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    Message { text: String },
    OpenForm { form: Form },
}

impl Reply {
    pub fn message(text: impl Into<String>) -> Self {
        Reply::Message { text: text.into() }
    }

    /// Message text, if this is a message reply
    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Message { text } => Some(text),
            Reply::OpenForm { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = CraftEvent::Accept {
            request_id: RequestId::from("r1"),
            candidate: UserId::from("a"),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"accept","request_id":"r1","candidate":"a"}"#);
    }

    #[test]
    fn test_submit_notes_default_to_none() {
        let json = r#"{"type":"submit","requester":"u","item":"Chair","confirmation":"yes"}"#;
        let event: CraftEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            CraftEvent::Submit {
                requester: UserId::from("u"),
                item: "Chair".to_string(),
                notes: None,
                confirmation: "yes".to_string(),
            }
        );
    }

    #[test]
    fn test_advance_status_wire_format() {
        let json = r#"{"type":"advance_status","request_id":"r1","actor":"a","status":"in_progress"}"#;
        let event: CraftEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), "advance_status");
    }

    #[test]
    fn test_reply_wire_format() {
        let reply = Reply::OpenForm {
            form: Form::CompletionNote {
                request_id: RequestId::from("r1"),
            },
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(
            json,
            r#"{"reply":"open_form","form":{"form":"completion_note","request_id":"r1"}}"#
        );
        assert_eq!(reply.text(), None);
        assert_eq!(Reply::message("hi").text(), Some("hi"));
    }
}
