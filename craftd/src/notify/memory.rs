//! In-memory surface sink
//!
//! Keeps every surface in a map instead of talking to a platform. Used for
//! `serve --dry-run` and as the sink in tests. Individual users or surfaces can
//! be made unreachable to exercise the delivery-failure paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::info;

use super::controls::Controls;
use super::render::Card;
use super::surface::{DeliveryError, Member, SurfaceEdit, SurfaceSink};
use crate::domain::{SurfaceRef, UserId};

/// Channel id used for the audit log
pub const MEMORY_LOG_CHANNEL: &str = "log";

/// One recorded sink call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOp {
    PostLog { surface: SurfaceRef },
    SendDirect { user: UserId, surface: SurfaceRef },
    PostChannel { channel_id: String, surface: SurfaceRef },
    Edit { surface: SurfaceRef, edit: SurfaceEdit },
}

#[derive(Default)]
struct Inner {
    next_message: u64,
    members: Vec<Member>,
    blocked_users: HashSet<UserId>,
    blocked_channels: HashSet<String>,
    log_unavailable: bool,
    members_unavailable: bool,
    surfaces: HashMap<SurfaceRef, (Card, Controls)>,
    ops: Vec<SinkOp>,
}

impl Inner {
    fn create(&mut self, channel_id: String, card: &Card, controls: &Controls) -> SurfaceRef {
        self.next_message += 1;
        let surface = SurfaceRef::new(channel_id, format!("m{}", self.next_message));
        self.surfaces.insert(surface.clone(), (card.clone(), controls.clone()));
        surface
    }
}

/// Surface sink backed by a map
#[derive(Default)]
pub struct MemorySink {
    inner: Mutex<Inner>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the crafter role members
    pub fn with_members(self, members: impl IntoIterator<Item = Member>) -> Self {
        self.lock().members = members.into_iter().collect();
        self
    }

    /// Make direct messages to `user` fail as unavailable
    pub fn block_direct(&self, user: &UserId) {
        self.lock().blocked_users.insert(user.clone());
    }

    /// Make posts to `channel_id` fail as unavailable
    pub fn block_channel(&self, channel_id: &str) {
        self.lock().blocked_channels.insert(channel_id.to_string());
    }

    /// Make the audit channel unreachable
    pub fn block_log(&self) {
        self.lock().log_unavailable = true;
    }

    /// Make member enumeration fail
    pub fn block_members(&self) {
        self.lock().members_unavailable = true;
    }

    /// All calls made so far, oldest first
    pub fn ops(&self) -> Vec<SinkOp> {
        self.lock().ops.clone()
    }

    /// Current card and controls of a surface
    pub fn surface(&self, surface: &SurfaceRef) -> Option<(Card, Controls)> {
        self.lock().surfaces.get(surface).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn direct_channel(user: &UserId) -> String {
        format!("dm-{}", user)
    }
}

#[async_trait]
impl SurfaceSink for MemorySink {
    async fn post_log(&self, card: &Card) -> Result<SurfaceRef, DeliveryError> {
        let mut inner = self.lock();
        if inner.log_unavailable {
            return Err(DeliveryError::Unavailable("log channel not found".to_string()));
        }
        let surface = inner.create(MEMORY_LOG_CHANNEL.to_string(), card, &Controls::None);
        inner.ops.push(SinkOp::PostLog {
            surface: surface.clone(),
        });
        info!(title = %card.title, message_id = %surface.message_id, "memory sink: posted log");
        Ok(surface)
    }

    async fn send_direct(&self, user: &UserId, card: &Card, controls: &Controls) -> Result<SurfaceRef, DeliveryError> {
        let mut inner = self.lock();
        if inner.blocked_users.contains(user) {
            return Err(DeliveryError::Unavailable(format!("{} does not accept direct messages", user)));
        }
        let surface = inner.create(Self::direct_channel(user), card, controls);
        inner.ops.push(SinkOp::SendDirect {
            user: user.clone(),
            surface: surface.clone(),
        });
        info!(%user, title = %card.title, "memory sink: sent direct message");
        Ok(surface)
    }

    async fn post_channel(
        &self,
        channel_id: &str,
        card: &Card,
        controls: &Controls,
    ) -> Result<SurfaceRef, DeliveryError> {
        let mut inner = self.lock();
        if inner.blocked_channels.contains(channel_id) {
            return Err(DeliveryError::Unavailable(format!("missing access to channel {}", channel_id)));
        }
        let surface = inner.create(channel_id.to_string(), card, controls);
        inner.ops.push(SinkOp::PostChannel {
            channel_id: channel_id.to_string(),
            surface: surface.clone(),
        });
        info!(%channel_id, title = %card.title, "memory sink: posted to channel");
        Ok(surface)
    }

    async fn edit(&self, surface: &SurfaceRef, edit: &SurfaceEdit) -> Result<(), DeliveryError> {
        let mut inner = self.lock();
        if inner.log_unavailable && surface.channel_id == MEMORY_LOG_CHANNEL {
            return Err(DeliveryError::Unavailable("log channel not found".to_string()));
        }
        let blocked = inner
            .blocked_users
            .iter()
            .any(|user| surface.channel_id == Self::direct_channel(user));
        if blocked {
            return Err(DeliveryError::Unavailable(format!(
                "channel {} no longer accepts messages",
                surface.channel_id
            )));
        }

        let Some((card, controls)) = inner.surfaces.get_mut(surface) else {
            return Err(DeliveryError::Fatal(format!("unknown message {}", surface.message_id)));
        };
        if let Some(new_card) = &edit.card {
            *card = new_card.clone();
        }
        if let Some(new_controls) = &edit.controls {
            *controls = new_controls.clone();
        }
        inner.ops.push(SinkOp::Edit {
            surface: surface.clone(),
            edit: edit.clone(),
        });
        info!(message_id = %surface.message_id, "memory sink: edited surface");
        Ok(())
    }

    async fn eligible_fulfillers(&self) -> Result<Vec<Member>, DeliveryError> {
        let inner = self.lock();
        if inner.members_unavailable {
            return Err(DeliveryError::Fatal("member list unavailable".to_string()));
        }
        Ok(inner.members.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::render::entry_point_card;
    use chrono::Utc;

    #[tokio::test]
    async fn test_memory_sink_create_and_edit() {
        let sink = MemorySink::new();
        let card = entry_point_card(Utc::now());

        let surface = sink
            .send_direct(&UserId::from("a"), &card, &Controls::StartRequest)
            .await
            .unwrap();
        assert_eq!(surface.channel_id, "dm-a");

        sink.edit(&surface, &SurfaceEdit::controls(Controls::None)).await.unwrap();
        let (_, controls) = sink.surface(&surface).unwrap();
        assert_eq!(controls, Controls::None);
        assert_eq!(sink.ops().len(), 2);
    }

    #[tokio::test]
    async fn test_memory_sink_blocked_user() {
        let sink = MemorySink::new();
        sink.block_direct(&UserId::from("a"));

        let err = sink
            .send_direct(&UserId::from("a"), &entry_point_card(Utc::now()), &Controls::None)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        assert!(sink.ops().is_empty());
    }

    #[tokio::test]
    async fn test_memory_sink_edit_unknown_surface() {
        let sink = MemorySink::new();
        let err = sink
            .edit(&SurfaceRef::new("x", "m99"), &SurfaceEdit::default())
            .await
            .unwrap_err();
        assert!(!err.is_unavailable());
    }
}
