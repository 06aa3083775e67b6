//! RequestStore - actor that owns the request map
//!
//! Processes commands via channels. Every command runs to completion before the
//! next one is received, so the claim check-and-set in `Accept` cannot interleave
//! with another claim.

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::domain::{CraftRequest, RequestId, RequestStatus, SurfaceKind, SurfaceRef, UserId, generate_request_id};

use super::messages::{StoreCommand, StoreError, StoreResponse};

/// Attempts at finding an unused request id before giving up
pub const MAX_ID_ATTEMPTS: usize = 16;

/// Source of candidate request ids
pub type IdGenerator = Box<dyn FnMut() -> RequestId + Send>;

/// Counts of requests per status
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoreMetrics {
    /// Total number of requests since startup
    pub total: u64,
    /// Waiting for a crafter
    pub pending: u64,
    /// Claimed but not started
    pub accepted: u64,
    /// Being crafted
    pub in_progress: u64,
    /// Finished
    pub ready_for_pickup: u64,
}

/// Event broadcast when a request changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestEvent {
    /// A new request was created
    Created { id: RequestId, requester: UserId },
    /// A crafter claimed a request
    Accepted { id: RequestId, accepter: UserId },
    /// The accepter moved a request forward
    Advanced { id: RequestId, status: RequestStatus },
}

/// Handle to send commands to the RequestStore
#[derive(Clone)]
pub struct RequestStore {
    tx: mpsc::Sender<StoreCommand>,
    /// Broadcast sender for request change notifications
    event_tx: broadcast::Sender<RequestEvent>,
}

impl RequestStore {
    /// Spawn a new RequestStore actor with random ids
    pub fn spawn() -> Self {
        Self::spawn_with_id_generator(Box::new(generate_request_id))
    }

    /// Spawn a RequestStore actor drawing ids from `next_id`
    pub fn spawn_with_id_generator(next_id: IdGenerator) -> Self {
        debug!("spawn_with_id_generator: called");
        let (tx, rx) = mpsc::channel(256);
        let (event_tx, _) = broadcast::channel(64);

        tokio::spawn(actor_loop(rx, next_id));

        info!("RequestStore spawned");
        Self { tx, event_tx }
    }

    /// Subscribe to request change events
    pub fn subscribe_events(&self) -> broadcast::Receiver<RequestEvent> {
        self.event_tx.subscribe()
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<StoreResponse<T>>) -> StoreCommand) -> StoreResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }

    /// Create a new pending request under a fresh id
    pub async fn create(&self, requester: UserId, item: String, notes: Option<String>) -> StoreResponse<CraftRequest> {
        debug!(%requester, %item, "create: called");
        let result = self
            .call(|reply| StoreCommand::Create {
                requester,
                item,
                notes,
                reply,
            })
            .await;

        if let Ok(request) = &result {
            let _ = self.event_tx.send(RequestEvent::Created {
                id: request.id.clone(),
                requester: request.requester.clone(),
            });
        }
        result
    }

    /// Get a snapshot of a request
    pub async fn get(&self, id: &RequestId) -> StoreResponse<Option<CraftRequest>> {
        debug!(%id, "get: called");
        self.call(|reply| StoreCommand::Get { id: id.clone(), reply }).await
    }

    /// Get a snapshot of a request, returning error if not found
    pub async fn get_required(&self, id: &RequestId) -> StoreResponse<CraftRequest> {
        debug!(%id, "get_required: called");
        self.get(id).await?.ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// List requests, oldest first, optionally filtered by status
    pub async fn list(&self, status_filter: Option<RequestStatus>) -> StoreResponse<Vec<CraftRequest>> {
        debug!(?status_filter, "list: called");
        self.call(|reply| StoreCommand::List { status_filter, reply }).await
    }

    /// Record a surface reference for a request
    pub async fn set_surface(&self, id: &RequestId, kind: SurfaceKind, surface: SurfaceRef) -> StoreResponse<()> {
        debug!(%id, ?kind, "set_surface: called");
        self.call(|reply| StoreCommand::SetSurface {
            id: id.clone(),
            kind,
            surface,
            reply,
        })
        .await
    }

    /// Claim a request; first claim wins
    pub async fn accept(&self, id: &RequestId, candidate: UserId) -> StoreResponse<CraftRequest> {
        debug!(%id, %candidate, "accept: called");
        let result = self
            .call(|reply| StoreCommand::Accept {
                id: id.clone(),
                candidate,
                reply,
            })
            .await;

        if let Ok(CraftRequest {
            id,
            accepter: Some(accepter),
            ..
        }) = &result
        {
            let _ = self.event_tx.send(RequestEvent::Accepted {
                id: id.clone(),
                accepter: accepter.clone(),
            });
        }
        result
    }

    /// Move a request forward on behalf of `actor`
    pub async fn advance(
        &self,
        id: &RequestId,
        actor: UserId,
        status: RequestStatus,
        note: Option<String>,
    ) -> StoreResponse<CraftRequest> {
        debug!(%id, %actor, ?status, "advance: called");
        let result = self
            .call(|reply| StoreCommand::Advance {
                id: id.clone(),
                actor,
                status,
                note,
                reply,
            })
            .await;

        if let Ok(request) = &result {
            let _ = self.event_tx.send(RequestEvent::Advanced {
                id: request.id.clone(),
                status: request.status,
            });
        }
        result
    }

    /// Count requests per status
    pub async fn metrics(&self) -> StoreResponse<StoreMetrics> {
        debug!("metrics: called");
        let requests = self.list(None).await?;
        let mut metrics = StoreMetrics {
            total: requests.len() as u64,
            ..Default::default()
        };
        for request in &requests {
            match request.status {
                RequestStatus::Pending => metrics.pending += 1,
                RequestStatus::Accepted => metrics.accepted += 1,
                RequestStatus::InProgress => metrics.in_progress += 1,
                RequestStatus::ReadyForPickup => metrics.ready_for_pickup += 1,
            }
        }
        Ok(metrics)
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> StoreResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(StoreCommand::Shutdown)
            .await
            .map_err(|_| StoreError::ChannelError)
    }
}

/// Pick an id not present in `requests`, regenerating on collision
fn unused_id(requests: &HashMap<RequestId, CraftRequest>, next_id: &mut IdGenerator) -> StoreResponse<RequestId> {
    for attempt in 1..=MAX_ID_ATTEMPTS {
        let id = next_id();
        if !requests.contains_key(&id) {
            return Ok(id);
        }
        debug!(%id, attempt, "unused_id: collision, regenerating");
    }
    Err(StoreError::IdSpaceExhausted(MAX_ID_ATTEMPTS))
}

/// The actor loop that owns the request map and processes commands
///
/// No command handler awaits, so each one is a critical section.
async fn actor_loop(mut rx: mpsc::Receiver<StoreCommand>, mut next_id: IdGenerator) {
    debug!("RequestStore actor started");
    let mut requests: HashMap<RequestId, CraftRequest> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::Create {
                requester,
                item,
                notes,
                reply,
            } => {
                debug!(%requester, "actor_loop: Create command");
                let result = unused_id(&requests, &mut next_id).map(|id| {
                    let request = CraftRequest::new(id.clone(), requester, item, notes);
                    requests.insert(id, request.clone());
                    request
                });
                let _ = reply.send(result);
            }

            StoreCommand::Get { id, reply } => {
                debug!(%id, "actor_loop: Get command");
                let _ = reply.send(Ok(requests.get(&id).cloned()));
            }

            StoreCommand::List { status_filter, reply } => {
                debug!(?status_filter, "actor_loop: List command");
                let mut list: Vec<CraftRequest> = requests
                    .values()
                    .filter(|r| status_filter.is_none_or(|status| r.status == status))
                    .cloned()
                    .collect();
                list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
                let _ = reply.send(Ok(list));
            }

            StoreCommand::SetSurface {
                id,
                kind,
                surface,
                reply,
            } => {
                debug!(%id, ?kind, "actor_loop: SetSurface command");
                let result = match requests.get_mut(&id) {
                    Some(request) => {
                        request.set_surface(kind, surface);
                        Ok(())
                    }
                    None => Err(StoreError::NotFound(id)),
                };
                let _ = reply.send(result);
            }

            StoreCommand::Accept { id, candidate, reply } => {
                debug!(%id, %candidate, "actor_loop: Accept command");
                let result = match requests.get_mut(&id) {
                    Some(request) => request
                        .accept(candidate)
                        .map(|()| request.clone())
                        .map_err(StoreError::from),
                    None => Err(StoreError::NotFound(id)),
                };
                let _ = reply.send(result);
            }

            StoreCommand::Advance {
                id,
                actor,
                status,
                note,
                reply,
            } => {
                debug!(%id, %actor, ?status, "actor_loop: Advance command");
                let result = match requests.get_mut(&id) {
                    Some(request) => request
                        .advance(&actor, status, note)
                        .map(|()| request.clone())
                        .map_err(StoreError::from),
                    None => Err(StoreError::NotFound(id)),
                };
                let _ = reply.send(result);
            }

            StoreCommand::Shutdown => {
                debug!("actor_loop: Shutdown command");
                info!(requests = requests.len(), "RequestStore shutting down");
                break;
            }
        }
    }

    debug!("RequestStore actor stopped");
}
