//! Discord adapter
//!
//! Maps surfaces onto Discord messages: cards become embeds and controls
//! become button components.

pub mod payload;
mod surfaces;

pub use surfaces::DiscordSurfaces;
