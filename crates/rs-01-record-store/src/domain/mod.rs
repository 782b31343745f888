//! Domain layer: record ledger rules, entities and errors.

pub mod entities;
pub mod errors;
pub mod ledger;
