//! CLI command implementations for haproxy-stats-exporter.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Configuration validation and socket probe
//! - `collect`: One-shot collection cycles printed to stdout
//! - `config`: Configuration file generation

pub mod check;
pub mod collect;
pub mod config;

// Re-export command functions
pub use check::command_check;
pub use collect::command_collect;
pub use config::command_config;
