//! Ports layer.
//!
//! The only driven port is `rs_01_record_store::RecordStore`.

pub mod inbound;
