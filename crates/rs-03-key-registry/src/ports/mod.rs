//! Ports layer.

pub mod inbound;
pub mod outbound;
