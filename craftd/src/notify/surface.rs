//! Surface sink trait
//!
//! The narrow set of operations the core needs from a chat platform: create a
//! message, edit a message, and list who may craft.

use async_trait::async_trait;
use thiserror::Error;

use super::controls::Controls;
use super::render::Card;
use crate::domain::{SurfaceRef, UserId};

/// Failure to deliver to a surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The recipient made the surface unreachable (blocked DMs, missing permissions)
    #[error("Delivery unavailable: {0}")]
    Unavailable(String),

    /// Anything else: transport failure, unexpected response
    #[error("Delivery failed: {0}")]
    Fatal(String),
}

impl DeliveryError {
    /// Check if this is the expected "recipient unreachable" case
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DeliveryError::Unavailable(_))
    }
}

/// Partial update of an existing surface; `None` leaves that part as is
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SurfaceEdit {
    pub card: Option<Card>,
    pub controls: Option<Controls>,
}

impl SurfaceEdit {
    /// Replace the card only
    pub fn card(card: Card) -> Self {
        Self {
            card: Some(card),
            controls: None,
        }
    }

    /// Replace the controls only
    pub fn controls(controls: Controls) -> Self {
        Self {
            card: None,
            controls: Some(controls),
        }
    }
}

/// Member of the crafter role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user: UserId,
    pub bot: bool,
}

/// A chat platform the daemon can render surfaces on
#[async_trait]
pub trait SurfaceSink: Send + Sync {
    /// Post a card to the shared audit channel
    async fn post_log(&self, card: &Card) -> Result<SurfaceRef, DeliveryError>;

    /// Send a card to a user directly
    async fn send_direct(&self, user: &UserId, card: &Card, controls: &Controls) -> Result<SurfaceRef, DeliveryError>;

    /// Post a card to an arbitrary channel
    async fn post_channel(&self, channel_id: &str, card: &Card, controls: &Controls)
    -> Result<SurfaceRef, DeliveryError>;

    /// Edit an existing surface
    async fn edit(&self, surface: &SurfaceRef, edit: &SurfaceEdit) -> Result<(), DeliveryError>;

    /// Members of the crafter role
    async fn eligible_fulfillers(&self) -> Result<Vec<Member>, DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_classification() {
        assert!(DeliveryError::Unavailable("dm blocked".to_string()).is_unavailable());
        assert!(!DeliveryError::Fatal("timeout".to_string()).is_unavailable());
    }

    #[test]
    fn test_surface_edit_constructors() {
        let edit = SurfaceEdit::controls(Controls::None);
        assert!(edit.card.is_none());
        assert_eq!(edit.controls, Some(Controls::None));
    }
}
