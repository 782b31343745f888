//! Adapters layer.

pub mod http;
pub mod memory;
