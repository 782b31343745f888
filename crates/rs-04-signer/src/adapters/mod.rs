//! Adapters layer.

pub mod bus;
pub mod lease;
