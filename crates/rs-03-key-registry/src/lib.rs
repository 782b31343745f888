//! # Key Registry Subsystem
//!
//! **Subsystem ID:** 3
//!
//! ## Purpose
//!
//! Maintains the pool of signing keys and serializes their use: a key is
//! leased to at most one signer at a time, and the least recently used free
//! key is always handed out next so load rotates across the pool.
//!
//! ## Lease Protocol
//!
//! ```text
//! [FREE] ──lease_next (oldest last_used)──→ [LEASED] ──release──→ [FREE]
//!                                               │
//!                                  lease older than TTL (optional)
//!                                               ↓
//!                                      reclaimable by lease_next
//! ```
//!
//! Selection and marking happen in one atomic step of the key store. With
//! no TTL configured, a signer that dies while holding a lease leaves the
//! key leased until an operator re-marks it.
//!
//! ## Surfaces
//!
//! | Surface | Module | Users |
//! |---------|--------|-------|
//! | `KeyRegistryApi` | `ports/inbound.rs` | HTTP adapter, in-process lease source |
//! | HTTP control plane | `adapters/http.rs` | Remote signers, operators |
//! | Key Lease Client | `client/` | Signer |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! client/             - KeyLeaseClient, LeaseSource (HTTP + local), poll policy
//! adapters/http.rs    - axum router for the control plane
//! adapters/memory.rs  - InMemoryKeyStore
//! ports/inbound.rs    - KeyRegistryApi
//! ports/outbound.rs   - KeyStore, TimeSource
//! service.rs          - KeyRegistryService
//! domain/             - KeyEntry, LeasedKey, lease selection, errors
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod client;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::http::router;
pub use adapters::memory::InMemoryKeyStore;
pub use client::{
    HttpLeaseSource, KeyLeaseClient, Lease, LeaseError, LeasePollPolicy, LeaseSource,
    LocalLeaseSource,
};
pub use domain::entities::{KeyEntry, KeyStatus, LeasePolicy, LeasedKey};
pub use domain::errors::KeyRegistryError;
pub use ports::inbound::KeyRegistryApi;
pub use ports::outbound::{KeyStore, ManualTimeSource, SystemTimeSource, TimeSource};
pub use service::KeyRegistryService;
