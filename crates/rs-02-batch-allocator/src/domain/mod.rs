//! Domain layer: allocator configuration, run reports and errors.

pub mod entities;
pub mod errors;
