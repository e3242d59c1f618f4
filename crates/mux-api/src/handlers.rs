//! Request handlers.

pub mod health;
pub mod relay;

pub use health::*;
pub use relay::*;
