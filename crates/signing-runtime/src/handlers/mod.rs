//! # Stage Handlers
//!
//! Consumer loops that drive each stage from its queue.

pub mod consumer;
pub mod stages;

pub use consumer::{run_consumer, ConsumerStats, StageHandler};
