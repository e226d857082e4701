//! Shared types for the stashd system
//!
//! This crate contains the error types and small helpers shared by the
//! configuration, filesystem and daemon crates.

pub mod error;
pub mod utils;

// Re-export commonly used types
pub use error::{ConfigError, FsError, Result, StashError};
