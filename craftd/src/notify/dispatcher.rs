//! NotificationDispatcher - projects request state onto surfaces
//!
//! Every surface is best-effort. A failed delivery is logged and reported in the
//! [`DispatchReport`] but never touches the committed request state. Surfaces are
//! attempted in a fixed order: log, requester, crafter.
//!
//! Dispatches for the same request run one at a time and render the latest
//! stored state, so a slow dispatch can never overwrite a newer one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::controls::Controls;
use super::render::{entry_point_card, fulfiller_card, log_card, requester_card};
use super::surface::{DeliveryError, SurfaceEdit, SurfaceSink};
use crate::domain::{CraftRequest, RequestId, SurfaceKind, SurfaceRef, UserId};
use crate::state::RequestStore;

/// Which surface an outcome refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceTarget {
    Log,
    Requester,
    Fulfiller(UserId),
}

impl std::fmt::Display for SurfaceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceTarget::Log => write!(f, "log"),
            SurfaceTarget::Requester => write!(f, "requester"),
            SurfaceTarget::Fulfiller(user) => write!(f, "fulfiller:{}", user),
        }
    }
}

/// Result of one surface operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOutcome {
    /// Created or updated
    Delivered,
    /// No surface to update
    Skipped,
    /// Recipient unreachable
    Unavailable(String),
    /// Transport or platform error
    Failed(String),
}

impl SurfaceOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SurfaceOutcome::Delivered)
    }
}

impl From<DeliveryError> for SurfaceOutcome {
    fn from(e: DeliveryError) -> Self {
        match e {
            DeliveryError::Unavailable(detail) => SurfaceOutcome::Unavailable(detail),
            DeliveryError::Fatal(detail) => SurfaceOutcome::Failed(detail),
        }
    }
}

/// Per-surface outcomes of one dispatch, in the order they were attempted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcomes: Vec<(SurfaceTarget, SurfaceOutcome)>,
}

impl DispatchReport {
    fn push(&mut self, target: SurfaceTarget, outcome: SurfaceOutcome) {
        self.outcomes.push((target, outcome));
    }

    /// Outcome for a given surface, if it was attempted
    pub fn outcome(&self, target: &SurfaceTarget) -> Option<&SurfaceOutcome> {
        self.outcomes.iter().find(|(t, _)| t == target).map(|(_, o)| o)
    }

    /// Number of surfaces that were delivered
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_delivered()).count()
    }
}

/// Projects request changes onto the log, requester and crafter surfaces
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn SurfaceSink>,
    store: RequestStore,
    dispatch_locks: Arc<Mutex<HashMap<RequestId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn SurfaceSink>, store: RequestStore) -> Self {
        Self {
            sink,
            store,
            dispatch_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn dispatch_lock(&self, id: &RequestId) -> Arc<tokio::sync::Mutex<()>> {
        self.dispatch_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(id.clone())
            .or_default()
            .clone()
    }

    /// Current stored state of `request`, or the given snapshot if the store is gone
    async fn latest(&self, request: &CraftRequest) -> CraftRequest {
        match self.store.get(&request.id).await {
            Ok(Some(latest)) => latest,
            Ok(None) => request.clone(),
            Err(e) => {
                warn!(request_id = %request.id, error = %e, "latest: store unavailable, using snapshot");
                request.clone()
            }
        }
    }

    /// Log a delivery result and convert it to an outcome
    fn settle<T>(request: &CraftRequest, target: &SurfaceTarget, result: Result<T, DeliveryError>) -> (Option<T>, SurfaceOutcome) {
        match result {
            Ok(value) => {
                debug!(request_id = %request.id, %target, "surface delivered");
                (Some(value), SurfaceOutcome::Delivered)
            }
            Err(e @ DeliveryError::Unavailable(_)) => {
                debug!(request_id = %request.id, %target, error = %e, "surface unavailable, skipping");
                (None, e.into())
            }
            Err(e) => {
                warn!(request_id = %request.id, %target, error = %e, "surface delivery failed");
                (None, e.into())
            }
        }
    }

    /// Remember a newly created surface; bookkeeping failures are logged only
    async fn record(&self, request: &CraftRequest, kind: SurfaceKind, surface: SurfaceRef) {
        if let Err(e) = self.store.set_surface(&request.id, kind, surface).await {
            warn!(request_id = %request.id, error = %e, "failed to record surface reference");
        }
    }

    async fn edit(&self, request: &CraftRequest, target: SurfaceTarget, surface: Option<&SurfaceRef>, edit: SurfaceEdit, report: &mut DispatchReport) {
        let outcome = match surface {
            Some(surface) => {
                let result = self.sink.edit(surface, &edit).await;
                Self::settle(request, &target, result).1
            }
            None => {
                debug!(request_id = %request.id, %target, "no surface recorded, skipping");
                SurfaceOutcome::Skipped
            }
        };
        report.push(target, outcome);
    }

    /// Post the initial audit log entry for a new request
    pub async fn publish_log(&self, request: &CraftRequest) -> SurfaceOutcome {
        debug!(request_id = %request.id, "publish_log: called");
        let result = self.sink.post_log(&log_card(request)).await;
        let (surface, outcome) = Self::settle(request, &SurfaceTarget::Log, result);
        if let Some(surface) = surface {
            self.record(request, SurfaceKind::Log, surface).await;
        }
        outcome
    }

    /// Send a claim invitation to one crafter
    pub async fn invite(&self, request: &CraftRequest, crafter: &UserId) -> SurfaceOutcome {
        debug!(request_id = %request.id, %crafter, "invite: called");
        let controls = Controls::Claim {
            request_id: request.id.clone(),
        };
        let result = self
            .sink
            .send_direct(crafter, &fulfiller_card(request), &controls)
            .await;
        let target = SurfaceTarget::Fulfiller(crafter.clone());
        let (surface, outcome) = Self::settle(request, &target, result);
        if let Some(surface) = surface {
            self.record(request, SurfaceKind::Fulfiller(crafter.clone()), surface).await;
        }
        outcome
    }

    /// Propagate a successful claim
    ///
    /// Updates the log, opens the requester DM, and swaps the accepter's claim
    /// button for status buttons. Other crafters' invitations are left alone.
    pub async fn on_accepted(&self, request: &CraftRequest) -> DispatchReport {
        debug!(request_id = %request.id, accepter = ?request.accepter, "on_accepted: called");
        let lock = self.dispatch_lock(&request.id);
        let _guard = lock.lock().await;
        let latest = self.latest(request).await;
        let request = &latest;
        let mut report = DispatchReport::default();

        self.edit(
            request,
            SurfaceTarget::Log,
            request.surfaces.log.as_ref(),
            SurfaceEdit::card(log_card(request)),
            &mut report,
        )
        .await;

        let result = self
            .sink
            .send_direct(&request.requester, &requester_card(request), &Controls::None)
            .await;
        let (surface, outcome) = Self::settle(request, &SurfaceTarget::Requester, result);
        if let Some(surface) = surface {
            self.record(request, SurfaceKind::Requester, surface).await;
        }
        report.push(SurfaceTarget::Requester, outcome);

        if let Some(accepter) = &request.accepter {
            // The accepter may already have finished while this dispatch waited
            let controls = if request.is_terminal() {
                Controls::None
            } else {
                Controls::Status {
                    request_id: request.id.clone(),
                }
            };
            self.edit(
                request,
                SurfaceTarget::Fulfiller(accepter.clone()),
                request.active_fulfiller_surface(),
                SurfaceEdit::controls(controls),
                &mut report,
            )
            .await;
        }

        info!(request_id = %request.id, delivered = report.delivered(), "accept dispatched");
        report
    }

    /// Propagate a status change made by the accepter
    ///
    /// The crafter surface only changes on the terminal status, where it loses its controls.
    pub async fn on_advanced(&self, request: &CraftRequest) -> DispatchReport {
        debug!(request_id = %request.id, status = ?request.status, "on_advanced: called");
        let lock = self.dispatch_lock(&request.id);
        let _guard = lock.lock().await;
        let latest = self.latest(request).await;
        let request = &latest;
        let mut report = DispatchReport::default();

        self.edit(
            request,
            SurfaceTarget::Log,
            request.surfaces.log.as_ref(),
            SurfaceEdit::card(log_card(request)),
            &mut report,
        )
        .await;

        self.edit(
            request,
            SurfaceTarget::Requester,
            request.surfaces.requester.as_ref(),
            SurfaceEdit::card(requester_card(request)),
            &mut report,
        )
        .await;

        if let (true, Some(accepter)) = (request.is_terminal(), &request.accepter) {
            self.edit(
                request,
                SurfaceTarget::Fulfiller(accepter.clone()),
                request.active_fulfiller_surface(),
                SurfaceEdit::controls(Controls::None),
                &mut report,
            )
            .await;
        }

        info!(request_id = %request.id, status = %request.status, delivered = report.delivered(), "status change dispatched");
        report
    }

    /// Post the persistent "start a request" card to a channel
    pub async fn post_entry_point(&self, channel_id: &str) -> Result<SurfaceRef, DeliveryError> {
        debug!(%channel_id, "post_entry_point: called");
        self.sink
            .post_channel(channel_id, &entry_point_card(Utc::now()), &Controls::StartRequest)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RequestStatus;
    use crate::notify::{MemorySink, SinkOp};

    fn setup() -> (Arc<MemorySink>, RequestStore, NotificationDispatcher) {
        let sink = Arc::new(MemorySink::new());
        let store = RequestStore::spawn();
        let dispatcher = NotificationDispatcher::new(sink.clone(), store.clone());
        (sink, store, dispatcher)
    }

    async fn pending(store: &RequestStore) -> CraftRequest {
        store
            .create(UserId::from("req"), "Oak Table".to_string(), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_log_records_surface() {
        let (sink, store, dispatcher) = setup();
        let request = pending(&store).await;

        assert_eq!(dispatcher.publish_log(&request).await, SurfaceOutcome::Delivered);

        let stored = store.get_required(&request.id).await.unwrap();
        let log = stored.surfaces.log.expect("log surface recorded");
        let (card, controls) = sink.surface(&log).unwrap();
        assert_eq!(card.title, format!("🔨 Craft Request {}", request.id));
        assert_eq!(controls, Controls::None);
    }

    #[tokio::test]
    async fn test_unavailable_log_is_not_recorded() {
        let (sink, store, dispatcher) = setup();
        sink.block_log();
        let request = pending(&store).await;

        let outcome = dispatcher.publish_log(&request).await;
        assert!(matches!(outcome, SurfaceOutcome::Unavailable(_)));
        assert!(store.get_required(&request.id).await.unwrap().surfaces.log.is_none());
    }

    #[tokio::test]
    async fn test_on_accepted_without_invitation_skips_swap() {
        let (sink, store, dispatcher) = setup();
        let request = pending(&store).await;
        dispatcher.publish_log(&request).await;

        let accepted = store.accept(&request.id, UserId::from("crafter")).await.unwrap();
        let report = dispatcher.on_accepted(&accepted).await;

        assert_eq!(report.outcome(&SurfaceTarget::Log), Some(&SurfaceOutcome::Delivered));
        assert_eq!(report.outcome(&SurfaceTarget::Requester), Some(&SurfaceOutcome::Delivered));
        assert_eq!(
            report.outcome(&SurfaceTarget::Fulfiller(UserId::from("crafter"))),
            Some(&SurfaceOutcome::Skipped)
        );
        assert_eq!(report.delivered(), 2);

        let ops = sink.ops();
        assert!(matches!(ops[1], SinkOp::Edit { .. }));
        assert!(matches!(&ops[2], SinkOp::SendDirect { user, .. } if user.as_str() == "req"));
    }

    #[tokio::test]
    async fn test_on_advanced_touches_crafter_only_when_terminal() {
        let (sink, store, dispatcher) = setup();
        let request = pending(&store).await;
        let crafter = UserId::from("crafter");
        dispatcher.invite(&request, &crafter).await;
        store.accept(&request.id, crafter.clone()).await.unwrap();

        let progress = store
            .advance(&request.id, crafter.clone(), RequestStatus::InProgress, None)
            .await
            .unwrap();
        let report = dispatcher.on_advanced(&progress).await;
        // Neither log nor requester surface exists yet
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes.iter().all(|(_, o)| *o == SurfaceOutcome::Skipped));

        let done = store
            .advance(&request.id, crafter.clone(), RequestStatus::ReadyForPickup, Some("done".to_string()))
            .await
            .unwrap();
        let report = dispatcher.on_advanced(&done).await;
        assert_eq!(
            report.outcome(&SurfaceTarget::Fulfiller(crafter.clone())),
            Some(&SurfaceOutcome::Delivered)
        );

        let invitation = done.surfaces.fulfillers[&crafter].clone();
        let (_, controls) = sink.surface(&invitation).unwrap();
        assert_eq!(controls, Controls::None);
    }

    #[tokio::test]
    async fn test_stale_dispatch_renders_latest_state() {
        let (sink, store, dispatcher) = setup();
        let request = pending(&store).await;
        let crafter = UserId::from("crafter");
        dispatcher.publish_log(&request).await;
        dispatcher.invite(&request, &crafter).await;
        let accepted = store.accept(&request.id, crafter.clone()).await.unwrap();
        dispatcher.on_accepted(&accepted).await;

        let progress = store
            .advance(&request.id, crafter.clone(), RequestStatus::InProgress, None)
            .await
            .unwrap();
        let done = store
            .advance(&request.id, crafter.clone(), RequestStatus::ReadyForPickup, None)
            .await
            .unwrap();

        // The newer dispatch finishes first
        dispatcher.on_advanced(&done).await;
        dispatcher.on_advanced(&progress).await;

        let stored = store.get_required(&request.id).await.unwrap();
        let (log, _) = sink.surface(stored.surfaces.log.as_ref().unwrap()).unwrap();
        assert_eq!(log.field("Status"), Some("Ready for Pickup"));
        let (requester, _) = sink.surface(stored.surfaces.requester.as_ref().unwrap()).unwrap();
        assert_eq!(requester.title, "🎁 Craft Ready");
        let (_, controls) = sink.surface(&stored.surfaces.fulfillers[&crafter]).unwrap();
        assert_eq!(controls, Controls::None);
    }

    #[tokio::test]
    async fn test_post_entry_point() {
        let (sink, _store, dispatcher) = setup();

        let surface = dispatcher.post_entry_point("general").await.unwrap();
        assert_eq!(surface.channel_id, "general");
        let (_, controls) = sink.surface(&surface).unwrap();
        assert_eq!(controls, Controls::StartRequest);
    }
}
