//! Command-line interface components
//!
//! Argument parsing and the handler that wires parsed arguments to the
//! fetch pipeline.

pub mod args;
pub mod commands;

pub use args::{Cli, FetchArgs, GlobalArgs, SourceMode};
pub use commands::handle_fetch;
