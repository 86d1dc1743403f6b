//! Error types for the raster crate.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when reading, resampling or writing rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing or malformed georeferencing tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Sample format / bit depth combination with no [`crate::SampleType`].
    #[error("Unsupported sample format {format} with {bits} bits per sample")]
    UnsupportedSampleType {
        /// TIFF SampleFormat value (1 = unsigned, 2 = signed, 3 = float).
        format: u32,
        /// Bits per sample.
        bits: u32,
    },

    /// Pixel layout the decoder cannot represent.
    #[error("Unsupported raster layout: {0}")]
    UnsupportedLayout(String),

    /// The geotransform has no inverse (zero-area pixels).
    #[error("Degenerate geotransform: pixels have zero area")]
    DegenerateTransform,

    /// Sample buffer length does not match the declared dimensions.
    #[error("Sample buffer holds {actual} samples, expected {expected}")]
    BufferSize {
        /// Expected number of samples (width x height x bands).
        expected: usize,
        /// Actual number of samples.
        actual: usize,
    },

    /// Strip compression failed.
    #[error("Compression failed: {0}")]
    Compression(String),

    /// No raster registered under this path.
    #[error("Raster not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Failure while reading a specific raster.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Raster that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<RasterError>,
    },

    /// Failure while writing a specific raster.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// Raster that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<RasterError>,
    },
}

impl RasterError {
    /// Attach the path of the raster being read.
    pub fn reading(path: &Path, source: RasterError) -> Self {
        RasterError::Read {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    /// Attach the path of the raster being written.
    pub fn writing(path: &Path, source: RasterError) -> Self {
        RasterError::Write {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }
}
