//! Request state with actor pattern
//!
//! RequestStore owns the in-memory request map and processes messages via
//! channels. State lives for the process lifetime only.

mod manager;
mod messages;

pub use manager::{IdGenerator, MAX_ID_ATTEMPTS, RequestEvent, RequestStore, StoreMetrics};
pub use messages::{StoreCommand, StoreError, StoreResponse};
