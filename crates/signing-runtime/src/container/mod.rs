//! # Pipeline Container
//!
//! Configuration plus the single place where stages are constructed and
//! connected.

pub mod config;
pub mod pipeline;

pub use config::{ConfigError, RegistryConfig, RuntimeConfig};
pub use pipeline::{Allocator, Keeper, LocalRegistry, PipelineContainer, Signer};
