//! # Signer Subsystem
//!
//! **Subsystem ID:** 4
//!
//! ## Purpose
//!
//! Signs every record of an unsigned batch with a key leased from the key
//! registry and publishes the signatures as one signed batch.
//!
//! ## Per-Batch State Machine
//!
//! ```text
//! received ──lease──→ key-leased ──sign──→ signed ──publish──→ published ──→ acknowledged
//!     │                    │                  │
//!     │ (empty batch: acknowledged at once)   └── release key (always) ──┘
//!     └──────── failure: logged, not acknowledged ────────┘
//! ```
//!
//! ## Failure Modes
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Malformed or unclaimed batch | Dead-lettered, no key leased |
//! | Shutdown while waiting for a key | Abandoned, redelivered later |
//! | Publish fails | Key released, batch redelivered |
//! | Release fails after publish | Logged; batch still acknowledged |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! adapters/bus.rs     - BusSignedBatchPublisher, UnsignedBatchHandler
//! adapters/lease.rs   - KeyLeaseGateway for the registry's KeyLeaseClient
//! ports/inbound.rs    - SignerApi
//! ports/outbound.rs   - KeyLeaseGateway, SignedBatchPublisher
//! service.rs          - SignerService
//! domain/             - sign_batch, SigningStage, SigningReport, SignerError
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::bus::{BusSignedBatchPublisher, UnsignedBatchHandler};
pub use domain::entities::SigningReport;
pub use domain::errors::SignerError;
pub use domain::signing::sign_batch;
pub use domain::stage::SigningStage;
pub use ports::inbound::SignerApi;
pub use ports::outbound::{KeyLeaseGateway, SignedBatchPublisher};
pub use service::SignerService;
