//! # mosaic-engine
//!
//! Merges any number of georeferenced rasters that share a CRS into one
//! output raster.
//!
//! ## Pipeline
//!
//! 1. [`validate`] checks that every source matches source 0 in CRS, band
//!    count and sample type.
//! 2. [`plan`] takes the union of the source footprints and resolves the
//!    output resolution and dimensions.
//! 3. [`analyze_coverage`] (advisory) and [`align_sources`] run side by
//!    side. Alignment resamples each source onto the output grid, one rayon
//!    task per source.
//! 4. [`combine`] merges the aligned values pixel by pixel with a
//!    [`MergeRule`].
//! 5. [`materialize`] narrows the result to the output sample type, and the
//!    [`RasterIo`] backend writes it.
//!
//! [`run_merge`] drives the whole pipeline; [`analyze`] stops after step 2
//! and returns the coverage report without reading any pixels.
//!
//! ## Examples
//!
//! ```no_run
//! use mosaic_engine::{open_sources, run_merge, GeoTiffIo, MergeJob, MergeRule};
//!
//! let io = GeoTiffIo::new();
//! let sources = open_sources(&io, &["west.tif", "east.tif"])?;
//! let job = MergeJob::new(sources, "mosaic.tif").with_rule(MergeRule::Max);
//!
//! let result = run_merge(&io, &job)?;
//! for warning in &result.warnings {
//!     println!("{warning}");
//! }
//! # Ok::<(), mosaic_engine::MergeError>(())
//! ```

mod align;
mod combine;
mod coverage;
mod engine;
mod error;
mod io;
mod job;
mod materialize;
mod plan;
mod source;
mod validate;
mod warning;

pub use align::{align_sources, CancelFlag};
pub use combine::{combine, CombinedBuffer};
pub use coverage::{analyze_coverage, CoverageReport, OverlapPair};
pub use engine::{
    analyze, analyze_with_limits, open_sources, run_merge, run_merge_with_cancel, MergeResult,
};
pub use error::MergeError;
pub use io::{GeoTiffIo, MemoryRasterIo, RasterIo};
pub use job::{
    MergeJob, MergeRule, NodataPolicy, PlanLimits, ResolutionPolicy, DEFAULT_MAX_DIMENSION,
    DEFAULT_MAX_SAMPLES, DEFAULT_NODATA,
};
pub use materialize::{materialize, resolve_nodata, Materialized};
pub use plan::{plan, resolution_range, SpatialPlan};
pub use source::SourceDescriptor;
pub use validate::validate;
pub use warning::{MergeWarning, GAP_THRESHOLD, OVERLAP_THRESHOLD, RESOLUTION_VARIANCE_THRESHOLD};

pub use mosaic_raster::{Compression, ResamplingKernel, SampleType};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, MergeError>;
