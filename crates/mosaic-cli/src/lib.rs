//! # mosaic-cli
//!
//! Library side of the `mosaic` binary: argument definitions, YAML job files,
//! logging setup and the `info`, `analyze` and `merge` subcommands.

pub mod args;
pub mod commands;
mod error;
pub mod job_file;
pub mod logging;
pub mod report;

pub use args::Cli;
pub use commands::run;
pub use error::CliError;
