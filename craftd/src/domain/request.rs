//! CraftRequest domain type
//!
//! A craft request moves `Pending → Accepted → {InProgress →} ReadyForPickup`.
//! The transition rules live here as plain methods so the store actor can apply
//! them inside a single command.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{RequestId, UserId};

/// Request status, ordered from first to terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for a crafter to claim it
    #[default]
    Pending,
    /// Claimed by a crafter
    Accepted,
    /// Crafter is working on it
    InProgress,
    /// Done, waiting for the requester to collect
    ReadyForPickup,
}

impl RequestStatus {
    /// All statuses in lifecycle order
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Accepted,
        RequestStatus::InProgress,
        RequestStatus::ReadyForPickup,
    ];

    /// Human-readable label used on every surface
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::InProgress => "In Progress",
            Self::ReadyForPickup => "Ready for Pickup",
        }
    }

    /// Machine name (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::ReadyForPickup => "ready_for_pickup",
        }
    }

    /// Whether the claimant may move a request from `self` to `target`
    ///
    /// `Pending → Accepted` is not listed: that edge belongs to `accept`.
    pub fn can_advance_to(self, target: RequestStatus) -> bool {
        matches!(
            (self, target),
            (Self::Accepted, Self::InProgress)
                | (Self::Accepted, Self::ReadyForPickup)
                | (Self::InProgress, Self::ReadyForPickup)
        )
    }

    /// Check if this is the terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ReadyForPickup)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "in_progress" | "progress" => Ok(Self::InProgress),
            "ready_for_pickup" | "ready" => Ok(Self::ReadyForPickup),
            _ => Err(format!(
                "Unknown status '{}'. Expected one of: pending, accepted, in_progress, ready_for_pickup",
                s
            )),
        }
    }
}

/// Weak reference to an externally created message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceRef {
    pub channel_id: String,
    pub message_id: String,
}

impl SurfaceRef {
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

/// Which surface a reference belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user", rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Audit log message in the shared channel
    Log,
    /// Direct message to the requester
    Requester,
    /// Claim/status message sent to one crafter
    Fulfiller(UserId),
}

/// Surface references recorded for a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSurfaces {
    pub log: Option<SurfaceRef>,
    pub requester: Option<SurfaceRef>,
    /// One entry per invited crafter; the accepter's entry is the active workflow surface
    pub fulfillers: BTreeMap<UserId, SurfaceRef>,
}

/// Rule violations raised by `accept` and `advance`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Already accepted by {0}")]
    AlreadyAccepted(UserId),

    #[error("{0} is not the accepter")]
    Unauthorized(UserId),

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },
}

/// One craft request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftRequest {
    pub id: RequestId,
    pub requester: UserId,
    pub item: String,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub accepter: Option<UserId>,
    pub completion_note: Option<String>,
    pub surfaces: RequestSurfaces,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trim free text and drop it entirely if nothing is left
fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl CraftRequest {
    /// Create a new pending request
    pub fn new(id: RequestId, requester: UserId, item: impl Into<String>, notes: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            requester,
            item: item.into(),
            notes: non_blank(notes),
            status: RequestStatus::Pending,
            accepter: None,
            completion_note: None,
            surfaces: RequestSurfaces::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Claim the request for `candidate`
    ///
    /// First claim wins; later claims fail with the existing accepter and change nothing.
    pub fn accept(&mut self, candidate: UserId) -> Result<(), TransitionError> {
        if let Some(existing) = &self.accepter {
            return Err(TransitionError::AlreadyAccepted(existing.clone()));
        }
        self.accepter = Some(candidate);
        self.status = RequestStatus::Accepted;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Check whether `actor` may move this request to `target`, without changing it
    pub fn check_advance(&self, actor: &UserId, target: RequestStatus) -> Result<(), TransitionError> {
        if self.accepter.as_ref() != Some(actor) {
            return Err(TransitionError::Unauthorized(actor.clone()));
        }
        if !self.status.can_advance_to(target) {
            return Err(TransitionError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    /// Move the request forward on behalf of `actor`
    ///
    /// The note is only recorded on the final transition into `ReadyForPickup`.
    pub fn advance(&mut self, actor: &UserId, target: RequestStatus, note: Option<String>) -> Result<(), TransitionError> {
        self.check_advance(actor, target)?;
        self.status = target;
        if target == RequestStatus::ReadyForPickup {
            self.completion_note = non_blank(note);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record a surface reference
    pub fn set_surface(&mut self, kind: SurfaceKind, surface: SurfaceRef) {
        match kind {
            SurfaceKind::Log => self.surfaces.log = Some(surface),
            SurfaceKind::Requester => self.surfaces.requester = Some(surface),
            SurfaceKind::Fulfiller(user) => {
                self.surfaces.fulfillers.insert(user, surface);
            }
        }
    }

    /// The accepter's own crafter surface, if one was delivered
    pub fn active_fulfiller_surface(&self) -> Option<&SurfaceRef> {
        self.accepter
            .as_ref()
            .and_then(|accepter| self.surfaces.fulfillers.get(accepter))
    }

    /// Check if the request reached its terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
