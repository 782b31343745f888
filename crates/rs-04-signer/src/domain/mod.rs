//! Domain layer: batch signing, signer stages, reports and errors.

pub mod entities;
pub mod errors;
pub mod signing;
pub mod stage;
