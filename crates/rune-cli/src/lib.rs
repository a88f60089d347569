//! Work session timer CLI library.
//!
//! This crate provides the CLI interface for rune.

mod cli;
pub mod commands;
mod config;
pub mod idle;

pub use cli::{Cli, Commands, PeriodArgs};
pub use config::Config;
