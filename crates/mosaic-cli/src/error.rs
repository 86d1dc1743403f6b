//! CLI error type.

use mosaic_engine::MergeError;
use std::path::PathBuf;
use thiserror::Error;

/// Anything that makes the `mosaic` command exit with a failure status.
#[derive(Debug, Error)]
pub enum CliError {
    /// The engine rejected or failed the request.
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// The job file could not be read.
    #[error("Failed to read job file {}: {source}", path.display())]
    JobFileRead {
        /// Job file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The job file is not valid YAML for a job.
    #[error("Invalid job file {}: {source}", path.display())]
    JobFileParse {
        /// Job file path.
        path: PathBuf,
        /// YAML parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Neither the command line nor the job file named any sources.
    #[error("No input files given")]
    NoInputs,

    /// Neither the command line nor the job file named an output.
    #[error("No output file given (use --output or set `output` in the job file)")]
    NoOutput,

    /// Creating the output directory failed.
    #[error("Failed to create output directory {}: {source}", path.display())]
    OutputDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the JSON report failed.
    #[error("Failed to write report {}: {source}", path.display())]
    Report {
        /// Report path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serialising a report or summary failed.
    #[error("Failed to serialise report: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing to stdout failed.
    #[error("Failed to write output: {0}")]
    Stdout(#[from] std::io::Error),

    /// The logging subscriber could not be installed.
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}
