//! # Batch Allocator Subsystem
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Turns a control request for N records into unsigned batches. Each claim
//! stamps a fresh batch id on up to `max_batch_size` unclaimed records, and
//! each non-empty claim is published as one `UnsignedBatch`.
//!
//! ## Allocation Run
//!
//! ```text
//! BatchRequest(N) ──lock──→ claim(min(N, max)) ──publish──→ N -= claimed ─┐
//!                               ↑                                          │
//!                               └────────────── while N > 0 ───────────────┘
//!                                      stops on empty claim or shutdown
//! ```
//!
//! Runs are mutually exclusive: a second request waits for the first run to
//! finish. The control message is acknowledged only after its run ends.
//!
//! ## Failure Modes
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Store unavailable before any claim | Run aborts, control message redelivered |
//! | Store unavailable after a claim | Run aborts, control message acknowledged |
//! | Publish fails | Run aborts and the message is acknowledged; the claimed batch stays claimed and is logged as orphaned |
//! | Shutdown mid-run | Acknowledged if anything was claimed, otherwise redelivered |
//! | Malformed control message | Dead-lettered |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! adapters/bus.rs     - BusBatchPublisher, ControlMessageHandler
//! ports/inbound.rs    - BatchAllocatorApi
//! ports/outbound.rs   - BatchPublisher
//! service.rs          - BatchAllocatorService
//! domain/             - AllocatorConfig, AllocationReport, AllocatorError
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::bus::{BusBatchPublisher, ControlMessageHandler};
pub use domain::entities::{AllocationReport, AllocatorConfig, DEFAULT_MAX_BATCH_SIZE};
pub use domain::errors::AllocatorError;
pub use ports::inbound::BatchAllocatorApi;
pub use ports::outbound::BatchPublisher;
pub use service::BatchAllocatorService;
