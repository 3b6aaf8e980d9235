//! State management module.
//!
//! Contains the ignore cache and service, the roster of online users and the
//! `Hub` that ties them to connections.

mod cache;
mod hub;
mod roster;
mod service;
mod uid;

pub use cache::IgnoreCache;
pub use hub::{Hub, Session};
pub use service::IgnoreService;
pub use uid::user_id;

#[cfg(test)]
pub(crate) use hub::test_hub;
