//! Request lifecycle
//!
//! Inbound [`CraftEvent`]s are validated by the [`LifecycleController`], which
//! commits the change to the store and then fans it out to the surfaces.

mod controller;
mod error;
mod event;

pub use controller::{CONFIRMATION_WORD, LifecycleController, SubmitForm, SubmitOutcome, is_confirmed};
pub use error::LifecycleError;
pub use event::{CraftEvent, Form, Reply};
