//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, ListenConfig)
//! - [`ignore`]: Ignore feature settings (blocked whisper commands, message template)
//! - [`validation`]: Startup checks

mod ignore;
mod types;
mod validation;

pub use types::Config;
pub use validation::validate;
