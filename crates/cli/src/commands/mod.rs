//! Command implementations

pub mod clean;
pub mod index;
