//! Core handler infrastructure.
//!
//! This module contains the handler registry, the context type, and the
//! state-aware handler traits.
//!
//! - [`PreRegHandler`]: receives `Context<'_, UnregisteredState>`
//! - [`PostRegHandler`]: receives `Context<'_, RegisteredState>`

pub mod context;
pub mod registry;
pub mod traits;

pub use context::Context;
pub use registry::{Registry, record_error};
pub use traits::{PostRegHandler, PreRegHandler};
