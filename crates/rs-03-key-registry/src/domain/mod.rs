//! Domain layer: key entries, lease selection and errors.

pub mod entities;
pub mod errors;
pub mod lease;
