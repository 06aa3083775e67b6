//! Lifecycle error types

use thiserror::Error;

use crate::domain::{RequestId, RequestStatus, TransitionError, UserId};
use crate::state::StoreError;

/// Errors reported back to the actor that triggered an operation
///
/// None of these change request state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Confirmation text was not 'yes'")]
    ConfirmationRejected,

    #[error("Item is blank")]
    MissingItem,

    #[error("Request not found: {0}")]
    RequestNotFound(RequestId),

    #[error("Request already accepted by {0}")]
    AlreadyAccepted(UserId),

    #[error("{0} is not the accepter of this request")]
    Unauthorized(UserId),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LifecycleError {
    /// Private acknowledgment text for the triggering actor
    pub fn user_message(&self, request_id: Option<&RequestId>) -> String {
        match self {
            LifecycleError::ConfirmationRejected => {
                "❗ Type **YES** to confirm you’ve placed the order in-game.".to_string()
            }
            LifecycleError::MissingItem => "❗ Tell the crafters which item you need.".to_string(),
            LifecycleError::RequestNotFound(_) => "❗ Data missing.".to_string(),
            LifecycleError::AlreadyAccepted(existing) => format!("❗ Already accepted by {}.", existing.mention()),
            LifecycleError::Unauthorized(_) => "❗ Only the accepter can update.".to_string(),
            LifecycleError::InvalidTransition { from, to } => match request_id {
                Some(id) => format!("❗ Cannot move request {} from **{}** to **{}**.", id, from, to),
                None => format!("❗ Cannot move from **{}** to **{}**.", from, to),
            },
            LifecycleError::Internal(_) => "❗ Something went wrong, please try again.".to_string(),
        }
    }
}

impl From<TransitionError> for LifecycleError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::AlreadyAccepted(existing) => LifecycleError::AlreadyAccepted(existing),
            TransitionError::Unauthorized(actor) => LifecycleError::Unauthorized(actor),
            TransitionError::InvalidTransition { from, to } => LifecycleError::InvalidTransition { from, to },
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => LifecycleError::RequestNotFound(id),
            StoreError::Transition(t) => t.into(),
            other @ (StoreError::IdSpaceExhausted(_) | StoreError::ChannelError) => {
                LifecycleError::Internal(other.to_string())
            }
        }
    }
}
