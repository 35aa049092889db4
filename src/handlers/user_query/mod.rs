//! Query handlers.

mod who;

pub use who::WhoHandler;
