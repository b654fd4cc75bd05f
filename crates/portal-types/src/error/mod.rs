//! Typed error definitions shared across the workspace.

mod config;

pub use config::ConfigError;
