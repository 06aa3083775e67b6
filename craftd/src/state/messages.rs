//! Request store messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{CraftRequest, RequestId, RequestStatus, SurfaceKind, SurfaceRef, TransitionError, UserId};

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request not found: {0}")]
    NotFound(RequestId),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Could not generate a unique request id after {0} attempts")]
    IdSpaceExhausted(usize),

    #[error("Channel error")]
    ChannelError,
}

/// Response from store operations
pub type StoreResponse<T> = Result<T, StoreError>;

/// Commands sent to the RequestStore actor
#[derive(Debug)]
pub enum StoreCommand {
    Create {
        requester: UserId,
        item: String,
        notes: Option<String>,
        reply: oneshot::Sender<StoreResponse<CraftRequest>>,
    },
    Get {
        id: RequestId,
        reply: oneshot::Sender<StoreResponse<Option<CraftRequest>>>,
    },
    List {
        status_filter: Option<RequestStatus>,
        reply: oneshot::Sender<StoreResponse<Vec<CraftRequest>>>,
    },
    SetSurface {
        id: RequestId,
        kind: SurfaceKind,
        surface: SurfaceRef,
        reply: oneshot::Sender<StoreResponse<()>>,
    },

    // Lifecycle transitions: each is one critical section inside the actor
    Accept {
        id: RequestId,
        candidate: UserId,
        reply: oneshot::Sender<StoreResponse<CraftRequest>>,
    },
    Advance {
        id: RequestId,
        actor: UserId,
        status: RequestStatus,
        note: Option<String>,
        reply: oneshot::Sender<StoreResponse<CraftRequest>>,
    },

    // Shutdown
    Shutdown,
}
