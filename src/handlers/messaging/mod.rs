//! Message routing handlers.

mod broadcast;
mod direct;

pub use broadcast::BroadcastHandler;
pub use direct::DirectHandler;
