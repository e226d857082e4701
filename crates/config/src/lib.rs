//! Configuration management for the stashd system
//!
//! This crate handles creating, parsing, mapping and validating the INI
//! configuration file, with environment variable overrides.

pub mod defaults;
pub mod document;
pub mod loader;
pub mod mapping;
pub mod schema;
pub mod validation;

pub use document::ConfigDocument;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validation::*;
