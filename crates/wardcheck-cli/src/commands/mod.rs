//! CLI command implementations.

pub mod tables;
pub mod validate;
