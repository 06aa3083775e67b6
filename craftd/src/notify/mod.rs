//! Notification surfaces
//!
//! A request is shown on up to three kinds of surface:
//!
//! - **Log**: one entry in the shared audit channel, edited on every change
//! - **Requester**: a direct message to the requester, created on claim
//! - **Fulfiller**: one invitation per crafter; the accepter's becomes the workflow surface
//!
//! Surfaces are side channels. The [`NotificationDispatcher`] renders a request
//! snapshot with the pure functions in [`render`] and pushes it through a
//! [`SurfaceSink`]; delivery failures never feed back into request state.

pub mod controls;
mod dispatcher;
mod memory;
pub mod render;
mod surface;

pub use controls::{Button, ButtonStyle, ControlId, Controls};
pub use dispatcher::{DispatchReport, NotificationDispatcher, SurfaceOutcome, SurfaceTarget};
pub use memory::{MEMORY_LOG_CHANNEL, MemorySink, SinkOp};
pub use render::{Card, Color, Field};
pub use surface::{DeliveryError, Member, SurfaceEdit, SurfaceSink};
