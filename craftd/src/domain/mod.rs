//! Domain types for craftd
//!
//! Core domain types: CraftRequest and its identifiers.

mod id;
mod request;

pub use id::{REQUEST_ID_LEN, RequestId, UserId, generate_request_id};
pub use request::{CraftRequest, RequestStatus, RequestSurfaces, SurfaceKind, SurfaceRef, TransitionError};
