//! # Record Keeper Subsystem
//!
//! **Subsystem ID:** 5
//!
//! ## Purpose
//!
//! Makes signatures durable. For every signed batch it writes exactly one
//! signature row per record and flips those records to signed, as one unit,
//! and only then lets the message be acknowledged.
//!
//! ## Idempotence Guard
//!
//! A redelivered batch whose signatures are already stored fails the
//! duplicate check as a whole. Nothing is overwritten; the message is
//! dead-lettered so operators see it and the queue does not spin.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! adapters/bus.rs        - SignedBatchHandler
//! ports/inbound.rs       - RecordKeeperApi
//! service.rs             - RecordKeeperService over rs_01_record_store::RecordStore
//! domain/validation.rs   - validate_signed_batch
//! domain/                - RecordingReport, KeeperError
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::bus::SignedBatchHandler;
pub use domain::entities::RecordingReport;
pub use domain::errors::KeeperError;
pub use domain::validation::validate_signed_batch;
pub use ports::inbound::RecordKeeperApi;
pub use service::RecordKeeperService;
