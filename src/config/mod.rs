//! Configuration model for conduit.
//!
//! This module defines the Config struct that represents `.conduit/config.yml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for every section, and validation of config values.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::Config;
pub use types::{ApprovalLevel, IntegrationConfig};
