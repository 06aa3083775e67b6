//! LifecycleController - validates actions and drives the request state machine
//!
//! Every operation commits to the [`RequestStore`] first and only then touches
//! surfaces. A failed surface never undoes a committed transition.

use tracing::{debug, info, warn};

use super::error::LifecycleError;
use super::event::{CraftEvent, Form, Reply};
use crate::domain::{CraftRequest, RequestId, RequestStatus, SurfaceRef, UserId};
use crate::intake::IntakeBroadcaster;
use crate::notify::{DeliveryError, NotificationDispatcher};
use crate::state::RequestStore;

/// Confirmation word the requester has to type
pub const CONFIRMATION_WORD: &str = "yes";

/// The request form as submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitForm {
    pub item: String,
    pub notes: Option<String>,
    pub confirmation: String,
}

/// Result of a successful submission
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub request: CraftRequest,
    /// Crafters that received an invitation
    pub notified: usize,
}

/// Whether the typed confirmation is an affirmative
pub fn is_confirmed(confirmation: &str) -> bool {
    confirmation.trim().eq_ignore_ascii_case(CONFIRMATION_WORD)
}

/// Drives requests through Pending, Accepted, InProgress and ReadyForPickup
#[derive(Clone)]
pub struct LifecycleController {
    store: RequestStore,
    dispatcher: NotificationDispatcher,
    broadcaster: IntakeBroadcaster,
}

impl LifecycleController {
    pub fn new(store: RequestStore, dispatcher: NotificationDispatcher, broadcaster: IntakeBroadcaster) -> Self {
        Self {
            store,
            dispatcher,
            broadcaster,
        }
    }

    /// The store this controller commits to
    pub fn store(&self) -> &RequestStore {
        &self.store
    }

    /// Create a request and broadcast it to the crafters
    pub async fn submit(&self, requester: UserId, form: SubmitForm) -> Result<SubmitOutcome, LifecycleError> {
        debug!(%requester, item = %form.item, "submit: called");
        if !is_confirmed(&form.confirmation) {
            debug!(%requester, "submit: confirmation rejected");
            return Err(LifecycleError::ConfirmationRejected);
        }
        let item = form.item.trim();
        if item.is_empty() {
            debug!(%requester, "submit: blank item rejected");
            return Err(LifecycleError::MissingItem);
        }

        let request = self.store.create(requester, item.to_string(), form.notes).await?;
        info!(request_id = %request.id, requester = %request.requester, item = %request.item, "request created");

        let report = self.broadcaster.broadcast(&request).await;

        // Re-read so the caller sees the recorded surfaces
        let request = self.store.get_required(&request.id).await?;
        Ok(SubmitOutcome {
            request,
            notified: report.notified,
        })
    }

    /// Claim a request for `candidate`; only the first claim succeeds
    pub async fn accept(&self, id: &RequestId, candidate: UserId) -> Result<CraftRequest, LifecycleError> {
        debug!(%id, %candidate, "accept: called");
        let request = self.store.accept(id, candidate).await?;
        info!(request_id = %request.id, accepter = ?request.accepter, "request accepted");

        self.dispatcher.on_accepted(&request).await;
        Ok(self.store.get_required(id).await?)
    }

    /// Move a claimed request forward on behalf of its accepter
    pub async fn advance(
        &self,
        id: &RequestId,
        actor: UserId,
        status: RequestStatus,
        note: Option<String>,
    ) -> Result<CraftRequest, LifecycleError> {
        debug!(%id, %actor, ?status, "advance: called");
        let request = self.store.advance(id, actor, status, note).await?;
        info!(request_id = %request.id, status = %request.status, "request advanced");

        self.dispatcher.on_advanced(&request).await;
        Ok(request)
    }

    /// Read-only check that `actor` may move `id` to `status`
    pub async fn preflight(&self, id: &RequestId, actor: &UserId, status: RequestStatus) -> Result<(), LifecycleError> {
        debug!(%id, %actor, ?status, "preflight: called");
        let request = self.store.get_required(id).await?;
        request.check_advance(actor, status)?;
        Ok(())
    }

    /// Post the "start a request" card in a channel
    pub async fn entry_point(&self, channel_id: &str) -> Result<SurfaceRef, DeliveryError> {
        debug!(%channel_id, "entry_point: called");
        let surface = self.dispatcher.post_entry_point(channel_id).await?;
        info!(%channel_id, message_id = %surface.message_id, "entry point posted");
        Ok(surface)
    }

    /// Handle one inbound event and produce the private reply to its actor
    pub async fn handle(&self, event: CraftEvent) -> Reply {
        debug!(kind = event.kind(), "handle: called");
        match event {
            CraftEvent::StartRequest { actor } => {
                debug!(%actor, "handle: opening request form");
                Reply::OpenForm {
                    form: Form::CraftRequest,
                }
            }

            CraftEvent::Submit {
                requester,
                item,
                notes,
                confirmation,
            } => {
                let form = SubmitForm {
                    item,
                    notes,
                    confirmation,
                };
                match self.submit(requester, form).await {
                    Ok(outcome) => Reply::message(format!(
                        "🎁 Sent to **{}** crafter(s). (ID: {})",
                        outcome.notified, outcome.request.id
                    )),
                    Err(e) => Reply::message(e.user_message(None)),
                }
            }

            CraftEvent::Accept { request_id, candidate } => match self.accept(&request_id, candidate).await {
                Ok(_) => Reply::message("🎁 Accepted; requester notified."),
                Err(e) => Reply::message(e.user_message(Some(&request_id))),
            },

            CraftEvent::AdvanceStatus {
                request_id,
                actor,
                status: RequestStatus::ReadyForPickup,
            } => match self.preflight(&request_id, &actor, RequestStatus::ReadyForPickup).await {
                Ok(()) => Reply::OpenForm {
                    form: Form::CompletionNote { request_id },
                },
                Err(e) => Reply::message(e.user_message(Some(&request_id))),
            },

            CraftEvent::AdvanceStatus {
                request_id,
                actor,
                status,
            } => self.advance_reply(&request_id, actor, status, None).await,

            CraftEvent::SubmitCompletionNote {
                request_id,
                actor,
                note,
            } => {
                self.advance_reply(&request_id, actor, RequestStatus::ReadyForPickup, note)
                    .await
            }

            CraftEvent::EntryPoint { channel_id } => match self.entry_point(&channel_id).await {
                Ok(_) => Reply::message("🎁 Craft entry point posted."),
                Err(e) => {
                    warn!(%channel_id, error = %e, "handle: entry point not posted");
                    Reply::message("❗ Could not post the entry point, please try again.")
                }
            },
        }
    }

    async fn advance_reply(&self, id: &RequestId, actor: UserId, status: RequestStatus, note: Option<String>) -> Reply {
        match self.advance(id, actor, status, note).await {
            Ok(request) => Reply::message(format!("🎁 Status updated to **{}**.", request.status.label())),
            Err(e) => Reply::message(e.user_message(Some(id))),
        }
    }
}
