//! Error types for the mosaic engine.

use mosaic_raster::{CrsToken, RasterError, SampleType};
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that stop a merge or analysis.
#[derive(Debug, Error)]
pub enum MergeError {
    /// No sources were supplied.
    #[error("No raster sources supplied")]
    EmptySourceSet,

    /// A source's CRS differs from source 0.
    #[error(
        "CRS mismatch: source {index} uses {found}, source 0 uses {expected}; \
         all sources must share one CRS"
    )]
    CrsMismatch {
        /// Offending source index.
        index: usize,
        /// CRS of source 0.
        expected: CrsToken,
        /// CRS of the offending source.
        found: CrsToken,
    },

    /// A source's band count differs from source 0.
    #[error("Band count mismatch: source {index} has {found} bands, source 0 has {expected}")]
    BandCountMismatch {
        /// Offending source index.
        index: usize,
        /// Band count of source 0.
        expected: usize,
        /// Band count of the offending source.
        found: usize,
    },

    /// A source's sample type differs from source 0.
    #[error("Sample type mismatch: source {index} is {found}, source 0 is {expected}")]
    SampleTypeMismatch {
        /// Offending source index.
        index: usize,
        /// Sample type of source 0.
        expected: SampleType,
        /// Sample type of the offending source.
        found: SampleType,
    },

    /// Requested or derived output resolution is not a positive number.
    #[error("Invalid output resolution {0}: must be a positive number")]
    InvalidResolution(f64),

    /// Output grid would exceed the configured dimension ceiling.
    #[error("Output of {width} x {height} pixels exceeds the {max} pixel limit per side")]
    OutputTooLarge {
        /// Planned width in pixels.
        width: f64,
        /// Planned height in pixels.
        height: f64,
        /// Configured ceiling.
        max: u32,
    },

    /// Output grid would hold more samples than the configured budget.
    #[error("Output of {samples} samples (width x height x bands) exceeds the {max} sample limit")]
    OutputTooManySamples {
        /// Planned width x height x bands.
        samples: u64,
        /// Configured ceiling.
        max: u64,
    },

    /// Opening or decoding a source failed.
    #[error("Failed to read source {}: {source}", path.display())]
    SourceRead {
        /// Source path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: RasterError,
    },

    /// Resampling a source onto the output grid failed.
    #[error("Failed to resample source {index} ({}): {source}", path.display())]
    Resample {
        /// Source index in the job.
        index: usize,
        /// Source path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: RasterError,
    },

    /// Encoding or finalising the output failed.
    #[error("Failed to write output {}: {source}", path.display())]
    OutputWrite {
        /// Output path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: RasterError,
    },

    /// The merge was cancelled between alignment tasks.
    #[error("Merge cancelled")]
    Cancelled,
}

impl MergeError {
    /// Pipeline stage the error belongs to, used as a metric label.
    pub fn stage(&self) -> &'static str {
        match self {
            MergeError::EmptySourceSet
            | MergeError::CrsMismatch { .. }
            | MergeError::BandCountMismatch { .. }
            | MergeError::SampleTypeMismatch { .. } => "validate",
            MergeError::InvalidResolution(_)
            | MergeError::OutputTooLarge { .. }
            | MergeError::OutputTooManySamples { .. } => "plan",
            MergeError::SourceRead { .. } => "open",
            MergeError::Resample { .. } | MergeError::Cancelled => "align",
            MergeError::OutputWrite { .. } => "write",
        }
    }
}
