//! Control API request handlers.

pub mod simulations;
pub mod store;
pub mod system;
