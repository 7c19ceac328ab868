//! Shared utilities for the advisor workspace
//!
//! This crate provides the logging bootstrap and process-level configuration
//! used by binaries and examples in the workspace.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, LogFormat};
pub use logging::{init_tracing, init_tracing_with};
