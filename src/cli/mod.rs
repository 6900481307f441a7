//! CLI module
//!
//! Command-line interface for walking paged sources.
//!
//! # Commands
//!
//! - `fetch` - Walk a JSON HTTP endpoint page by page
//! - `demo` - Walk the built-in mock source, printing each state change

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
