//! IntakeBroadcaster - fans a new request out to the crafters

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::CraftRequest;
use crate::notify::{NotificationDispatcher, SurfaceOutcome, SurfaceSink};

/// What happened when a request was broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeReport {
    /// Outcome of posting the audit log entry
    pub log: SurfaceOutcome,
    /// Crafters that received an invitation
    pub notified: usize,
    /// Crafters we tried to invite
    pub eligible: usize,
}

/// Posts new requests to the log and invites the crafter role
#[derive(Clone)]
pub struct IntakeBroadcaster {
    sink: Arc<dyn SurfaceSink>,
    dispatcher: NotificationDispatcher,
}

impl IntakeBroadcaster {
    pub fn new(sink: Arc<dyn SurfaceSink>, dispatcher: NotificationDispatcher) -> Self {
        Self { sink, dispatcher }
    }

    /// Broadcast a freshly created request
    ///
    /// Invitations are sent one crafter at a time; a failure for one crafter
    /// does not stop the rest. Bots are never invited.
    pub async fn broadcast(&self, request: &CraftRequest) -> IntakeReport {
        debug!(request_id = %request.id, "broadcast: called");
        let log = self.dispatcher.publish_log(request).await;

        let members = match self.sink.eligible_fulfillers().await {
            Ok(members) => members,
            Err(e) => {
                warn!(request_id = %request.id, error = %e, "could not list crafters, nobody invited");
                Vec::new()
            }
        };

        let crafters: Vec<_> = members.into_iter().filter(|m| !m.bot).map(|m| m.user).collect();
        let eligible = crafters.len();

        let mut notified = 0;
        for crafter in &crafters {
            if self.dispatcher.invite(request, crafter).await.is_delivered() {
                notified += 1;
            }
        }

        info!(request_id = %request.id, notified, eligible, "request broadcast");
        IntakeReport { log, notified, eligible }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::notify::{Member, MemorySink, SinkOp};
    use crate::state::RequestStore;

    fn member(id: &str, bot: bool) -> Member {
        Member {
            user: UserId::from(id),
            bot,
        }
    }

    async fn setup(sink: MemorySink) -> (Arc<MemorySink>, RequestStore, IntakeBroadcaster) {
        let sink = Arc::new(sink);
        let store = RequestStore::spawn();
        let dispatcher = NotificationDispatcher::new(sink.clone(), store.clone());
        let broadcaster = IntakeBroadcaster::new(sink.clone(), dispatcher);
        (sink, store, broadcaster)
    }

    #[tokio::test]
    async fn test_broadcast_skips_bots_and_counts_deliveries() {
        let sink = MemorySink::new().with_members([member("a", false), member("b", false), member("bot", true)]);
        let (sink, store, broadcaster) = setup(sink).await;
        sink.block_direct(&UserId::from("b"));

        let request = store
            .create(UserId::from("u1"), "Chair".to_string(), None)
            .await
            .unwrap();
        let report = broadcaster.broadcast(&request).await;

        assert_eq!(report.log, SurfaceOutcome::Delivered);
        assert_eq!(report.eligible, 2);
        assert_eq!(report.notified, 1);

        let stored = store.get_required(&request.id).await.unwrap();
        assert!(stored.surfaces.log.is_some());
        assert_eq!(stored.surfaces.fulfillers.len(), 1);
        assert!(stored.surfaces.fulfillers.contains_key(&UserId::from("a")));

        // Log first, then invitations
        let ops = sink.ops();
        assert!(matches!(ops[0], SinkOp::PostLog { .. }));
        assert!(matches!(ops[1], SinkOp::SendDirect { ref user, .. } if user == &UserId::from("a")));

        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_broadcast_continues_without_log_channel() {
        let sink = MemorySink::new().with_members([member("a", false)]);
        let (sink, store, broadcaster) = setup(sink).await;
        sink.block_log();

        let request = store
            .create(UserId::from("u1"), "Chair".to_string(), None)
            .await
            .unwrap();
        let report = broadcaster.broadcast(&request).await;

        assert!(matches!(report.log, SurfaceOutcome::Unavailable(_)));
        assert_eq!(report.notified, 1);
        let stored = store.get_required(&request.id).await.unwrap();
        assert!(stored.surfaces.log.is_none());

        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_broadcast_with_member_lookup_failure() {
        let sink = MemorySink::new().with_members([member("a", false)]);
        let (sink, store, broadcaster) = setup(sink).await;
        sink.block_members();

        let request = store
            .create(UserId::from("u1"), "Chair".to_string(), None)
            .await
            .unwrap();
        let report = broadcaster.broadcast(&request).await;

        assert_eq!(report.notified, 0);
        assert_eq!(report.eligible, 0);
        assert_eq!(report.log, SurfaceOutcome::Delivered);

        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invitation_surface_is_recorded_per_crafter() {
        let sink = MemorySink::new().with_members([member("a", false), member("c", false)]);
        let (_sink, store, broadcaster) = setup(sink).await;

        let request = store
            .create(UserId::from("u1"), "Chair".to_string(), None)
            .await
            .unwrap();
        broadcaster.broadcast(&request).await;

        let stored = store.get_required(&request.id).await.unwrap();
        let a = &stored.surfaces.fulfillers[&UserId::from("a")];
        let c = &stored.surfaces.fulfillers[&UserId::from("c")];
        assert_ne!(a, c);
        assert!(stored.surfaces.requester.is_none());

        store.shutdown().await.unwrap();
    }
}
