//! Core engine for shipyard
//!
//! - **config**: `shipyard.toml` parsing and validation
//! - **context**: Modules, cohorts and the resolved channel, loaded once per invocation
//! - **error**: Error types with contextual help messages and exit codes
//! - **tools**: External tool invocation from argv templates
//! - **credentials**: Credential lookup with redacted secrets
//! - **actions**: Task actions backed by the configured tools

pub mod actions;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod tools;
