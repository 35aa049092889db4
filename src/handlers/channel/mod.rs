//! Room membership handlers.

mod join;
mod leave;

pub use join::JoinHandler;
pub use leave::LeaveHandler;
