//! # mosaic-raster
//!
//! Raster I/O and georeferencing primitives used by the mosaic engine.
//!
//! This crate provides:
//! - Sample types, affine geotransforms, world-space rectangles and CRS tokens
//! - GeoTIFF decoding (metadata only, or metadata plus pixels)
//! - GeoTIFF encoding with LZW or Deflate compression and GDAL-style nodata tags
//! - Resampling kernels that project a decoded raster onto a target output grid
//!
//! ## Overview
//!
//! ### Georeferencing
//!
//! Every raster carries an [`AffineTransform`] in GDAL coefficient order
//! (`x0, a, b, y0, d, e`) mapping pixel corners to world coordinates. Its
//! world-space rectangle is the raster's *footprint*. CRS identity is an opaque
//! [`CrsToken`]; the only operation defined on it is [`crs_equals`].
//!
//! ### Resampling
//!
//! [`resample`] walks a target [`GridSpec`] and, for each output pixel, looks up
//! the covering source pixel(s) through the inverse transform. Output pixels whose
//! centre falls outside the source footprint are reported as
//! [`AlignedSample::Outside`], which is distinct from [`AlignedSample::NoData`]
//! inside the footprint.
//!
//! ## Examples
//!
//! ```no_run
//! use mosaic_raster::{read_raster, resample, GridSpec, ResamplingKernel};
//!
//! let raster = read_raster("tiles/west.tif")?;
//! let footprint = raster.header.footprint();
//!
//! // Same footprint, pixels twice as large
//! let grid = GridSpec::covering(&footprint, raster.header.resolution() * 2.0)?;
//! let aligned = resample(&raster, &grid, ResamplingKernel::Average)?;
//! println!("{} covered pixels", aligned.covered_pixels());
//! # Ok::<(), mosaic_raster::RasterError>(())
//! ```

mod error;
mod grid;
mod raster;
mod reader;
mod resample;
mod types;
mod writer;

pub use error::RasterError;
pub use grid::{cells_spanning, GridSpec};
pub use raster::{OutputRaster, Raster, RasterHeader, SampleBuffer};
pub use reader::{read_header, read_raster};
pub use resample::{resample, AlignedBuffer, AlignedSample, ResamplingKernel};
pub use types::{crs_equals, AffineTransform, CrsToken, Rect, SampleType};
pub use writer::{Compression, GeoTiffWriter, WriteOptions, GEOTIFF_EXTENSION};

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
