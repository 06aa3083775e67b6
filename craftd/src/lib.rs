//! craftd - Craft Request Daemon
//!
//! A requester submits a craft request; every member of the crafter role is
//! invited to claim it, exactly one claim succeeds, and the accepter moves it
//! through its remaining states while the requester and the audit log follow along.
//!
//! # Core Concepts
//!
//! - **One Owner**: All request state lives in the [`state::RequestStore`] actor
//! - **First Claim Wins**: The claim check-and-set is a single actor command
//! - **Surfaces Are Side Channels**: Delivery failures never undo a committed change
//! - **Forward Only**: Pending, Accepted, InProgress, ReadyForPickup
//!
//! # Modules
//!
//! - [`domain`] - Request, status machine and identifiers
//! - [`state`] - RequestStore actor
//! - [`lifecycle`] - Inbound events and the LifecycleController
//! - [`notify`] - Card rendering, controls and the NotificationDispatcher
//! - [`intake`] - Fan-out of new requests to crafters
//! - [`discord`] - Discord REST implementation of the surface sink
//! - [`ipc`] - Unix socket protocol between CLI and daemon
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod daemon;
pub mod discord;
pub mod domain;
pub mod intake;
pub mod ipc;
pub mod lifecycle;
pub mod notify;
pub mod state;

// Re-export commonly used types
pub use config::{Config, DiscordConfig, IpcConfig};
pub use daemon::CraftDaemon;
pub use discord::DiscordSurfaces;
pub use domain::{CraftRequest, RequestId, RequestStatus, SurfaceKind, SurfaceRef, UserId};
pub use intake::{IntakeBroadcaster, IntakeReport};
pub use ipc::{DaemonClient, DaemonMessage, DaemonResponse};
pub use lifecycle::{CraftEvent, Form, LifecycleController, LifecycleError, Reply, SubmitForm, SubmitOutcome};
pub use notify::{
    Card, ControlId, Controls, DeliveryError, DispatchReport, MemorySink, NotificationDispatcher, SurfaceOutcome,
    SurfaceSink,
};
pub use state::{RequestEvent, RequestStore, StoreError, StoreMetrics};
