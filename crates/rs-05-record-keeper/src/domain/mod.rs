//! Domain layer: signed batch validation, reports and errors.

pub mod entities;
pub mod errors;
pub mod validation;
