//! Report housekeeping CLI
//!
//! Cleans up and indexes the Lighthouse reports written by audit steps.

pub mod commands;
pub mod output;
