//! # Record Store Subsystem
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Holds the records awaiting signature and the append-only signature
//! table. Two operations carry the pipeline's correctness:
//!
//! - **Claim**: select unclaimed records, compute a fresh batch id and stamp
//!   it on them, all inside one atomic unit.
//! - **Record signatures**: insert one signature per record and flip the
//!   signed flag, all-or-nothing.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | A record is claimed by at most one batch | `domain/ledger.rs` - `claim()` removes from the unclaimed index |
//! | Batch ids strictly increase | `domain/ledger.rs` - high-water mark advanced inside `claim()` |
//! | At most one signature per record | `domain/ledger.rs` - `record_signatures()` validates before writing |
//! | `signed` implies a stored signature | `domain/ledger.rs` - flag set only for records just signed |
//!
//! ## Record Lifecycle
//!
//! ```text
//! [UNCLAIMED] ──claim──→ [CLAIMED(batch)] ──record_signatures──→ [SIGNED]
//! ```
//!
//! Records are never deleted and never return to unclaimed.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! adapters/memory.rs  - InMemoryRecordStore (ledger behind a mutex)
//! ports/inbound.rs    - RecordStore trait used by allocator and keeper
//! domain/ledger.rs    - RecordLedger: claim and signature rules
//! domain/entities.rs  - ClaimedBatch
//! domain/errors.rs    - StoreError
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::memory::InMemoryRecordStore;
pub use domain::entities::ClaimedBatch;
pub use domain::errors::StoreError;
pub use domain::ledger::RecordLedger;
pub use ports::inbound::RecordStore;
