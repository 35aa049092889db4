//! Connection lifecycle handlers.

mod exit;
mod register;

pub use exit::ExitHandler;
pub use register::RegisterHandler;
