//! CLI module for garlic
//!
//! Provides command-line interface for:
//! - check: load a module and list what it defines
//! - validate: validate documents against a model
//! - resolve: print part of a document by dotted path

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, resolve, run, run_command, validate, Config, OutputFormat};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response, write_text};
