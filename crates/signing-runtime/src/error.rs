//! Runtime error type.

use crate::container::config::ConfigError;
use rs_01_record_store::StoreError;
use rs_02_batch_allocator::AllocatorError;
use rs_03_key_registry::{KeyRegistryError, LeaseError};
use shared_bus::BusError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Allocator setup failed: {0}")]
    Allocator(#[from] AllocatorError),

    #[error("Lease client setup failed: {0}")]
    Lease(#[from] LeaseError),

    #[error("Key registry error: {0}")]
    Registry(#[from] KeyRegistryError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Message bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Control plane I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `start` was called on a runtime that is already running.
    #[error("Runtime already started")]
    AlreadyStarted,
}
