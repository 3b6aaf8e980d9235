//! Line handlers.
//!
//! Plain lines are chat and go through the recipient filter. Lines starting
//! with `/` are routed by the [`Registry`] to `/ignore` or a whisper alias.

pub mod chat;
pub mod ignore;
mod registry;
pub mod whisper;

pub use registry::{Context, Registry};
