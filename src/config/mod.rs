//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, IdleTimeoutsConfig)
//! - [`listen`]: Network listener configuration (ListenConfig)
//! - [`limits`]: Queue and input limits (LimitsConfig)
//! - [`validation`]: Startup checks over a loaded Config

mod limits;
mod listen;
mod types;
pub mod validation;

pub use limits::LimitsConfig;
pub use types::{Config, IdleTimeoutsConfig};
