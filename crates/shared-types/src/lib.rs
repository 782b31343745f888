//! # Shared Types Crate
//!
//! Domain entities and wire payloads shared by every stage of the
//! record-signing pipeline.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the queue message formats are defined once,
//!   here, and every stage encodes/decodes through [`wire`].
//! - **Claim Marker**: a record with [`BatchId::UNCLAIMED`] has never been
//!   claimed; any other batch id is final for that record.
//! - **Opaque Payloads**: record payloads are strings the pipeline never
//!   interprets; only their UTF-8 bytes are signed.

pub mod entities;
pub mod errors;
pub mod wire;

pub use entities::*;
pub use errors::*;
pub use wire::*;
