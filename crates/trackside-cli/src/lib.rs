//! Trackside CLI library.
//!
//! This crate provides the command-line interface over `trackside-core`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, InsightKind};
pub use config::Config;
