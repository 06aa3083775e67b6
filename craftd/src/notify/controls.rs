//! Interactive controls attached to surfaces
//!
//! A control is identified on the wire by a custom id such as `craft:accept:3f9a1c0b`.
//! A gateway forwards the id of a pressed control as an IPC `Control` message;
//! [`ControlId::decode`] and [`ControlId::into_event`] turn it into an inbound event.

use crate::domain::{RequestId, RequestStatus, UserId};
use crate::lifecycle::CraftEvent;

const PREFIX: &str = "craft";

/// Set of controls shown on a surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Controls {
    /// No interactive controls (terminal surfaces, the audit log)
    None,
    /// "Start a request" button on the entry-point card
    StartRequest,
    /// Single claim button on a crafter invitation
    Claim { request_id: RequestId },
    /// Status buttons on the accepter's surface
    Status { request_id: RequestId },
}

/// Visual weight of a button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Success,
}

/// One rendered button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: &'static str,
    pub style: ButtonStyle,
    pub control: ControlId,
}

impl Controls {
    /// Buttons for this control set, in display order
    pub fn buttons(&self) -> Vec<Button> {
        match self {
            Controls::None => Vec::new(),
            Controls::StartRequest => vec![Button {
                label: "🪵 Request Craft",
                style: ButtonStyle::Primary,
                control: ControlId::StartRequest,
            }],
            Controls::Claim { request_id } => vec![Button {
                label: "🎁 Accept",
                style: ButtonStyle::Success,
                control: ControlId::Accept(request_id.clone()),
            }],
            Controls::Status { request_id } => vec![
                Button {
                    label: "⛏️ In Progress",
                    style: ButtonStyle::Primary,
                    control: ControlId::Advance(request_id.clone(), RequestStatus::InProgress),
                },
                Button {
                    label: "🎁 Ready for Pickup",
                    style: ButtonStyle::Success,
                    control: ControlId::Advance(request_id.clone(), RequestStatus::ReadyForPickup),
                },
            ],
        }
    }
}

/// Identity of a single pressable control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlId {
    StartRequest,
    Accept(RequestId),
    Advance(RequestId, RequestStatus),
}

impl ControlId {
    /// Encode as a custom id string
    pub fn encode(&self) -> String {
        match self {
            ControlId::StartRequest => format!("{}:start", PREFIX),
            ControlId::Accept(id) => format!("{}:accept:{}", PREFIX, id),
            ControlId::Advance(id, RequestStatus::InProgress) => format!("{}:progress:{}", PREFIX, id),
            ControlId::Advance(id, RequestStatus::ReadyForPickup) => format!("{}:ready:{}", PREFIX, id),
            // No control ever targets Pending/Accepted; encode them verbatim so decode rejects them
            ControlId::Advance(id, status) => format!("{}:{}:{}", PREFIX, status.as_str(), id),
        }
    }

    /// Decode a custom id string; `None` for ids this daemon did not issue
    pub fn decode(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, ':');
        if parts.next()? != PREFIX {
            return None;
        }
        let action = parts.next()?;
        let id = parts.next().filter(|s| !s.is_empty()).map(RequestId::from);
        match (action, id) {
            ("start", None) => Some(ControlId::StartRequest),
            ("accept", Some(id)) => Some(ControlId::Accept(id)),
            ("progress", Some(id)) => Some(ControlId::Advance(id, RequestStatus::InProgress)),
            ("ready", Some(id)) => Some(ControlId::Advance(id, RequestStatus::ReadyForPickup)),
            _ => None,
        }
    }

    /// Translate a press of this control by `actor` into an inbound event
    pub fn into_event(self, actor: UserId) -> CraftEvent {
        match self {
            ControlId::StartRequest => CraftEvent::StartRequest { actor },
            ControlId::Accept(request_id) => CraftEvent::Accept {
                request_id,
                candidate: actor,
            },
            ControlId::Advance(request_id, status) => CraftEvent::AdvanceStatus {
                request_id,
                actor,
                status,
            },
        }
    }
}

impl std::fmt::Display for ControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}
