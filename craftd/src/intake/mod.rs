//! Intake of new requests
//!
//! Posts the audit log entry and invites every crafter to claim.

mod broadcaster;

pub use broadcaster::{IntakeBroadcaster, IntakeReport};
