//! Adapters layer.

pub mod bus;
