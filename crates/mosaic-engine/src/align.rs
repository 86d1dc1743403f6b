//! Source-parallel resampling onto the output grid.

use crate::{MergeError, RasterIo, Result, SourceDescriptor, SpatialPlan};
use mosaic_metrics::metric_defs;
use mosaic_metrics::metrics::counter;
use mosaic_raster::{AlignedBuffer, RasterError, ResamplingKernel};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Shared cancellation request.
///
/// Checked before each per-source alignment task; a merge never stops in the
/// middle of resampling a source or combining pixels.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that has not been raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Resample every source onto `plan`'s grid, one rayon task per source.
///
/// Buffers come back in source order. The first failure aborts the stage.
pub fn align_sources<I: RasterIo + ?Sized>(
    io: &I,
    sources: &[SourceDescriptor],
    plan: &SpatialPlan,
    kernel: ResamplingKernel,
    cancel: &CancelFlag,
) -> Result<Vec<AlignedBuffer>> {
    let grid = plan.grid();

    sources
        .par_iter()
        .enumerate()
        .map(|(index, source)| {
            if cancel.is_cancelled() {
                return Err(MergeError::Cancelled);
            }

            let resample_error = |e: RasterError| MergeError::Resample {
                index,
                path: source.path.clone(),
                source: e,
            };
            let buffer = io.resample(source, &grid, kernel).map_err(resample_error)?;
            let expected = grid.pixel_count() * source.bands;
            if buffer.width != grid.width
                || buffer.height != grid.height
                || buffer.samples().len() != expected
            {
                return Err(resample_error(RasterError::BufferSize {
                    expected,
                    actual: buffer.samples().len(),
                }));
            }

            debug!(
                index,
                source = %source.display_name(),
                covered = buffer.covered_pixels(),
                "aligned source"
            );
            counter!(metric_defs::SOURCES_ALIGNED.name, "kernel" => kernel.as_str()).increment(1);
            Ok(buffer)
        })
        .collect()
}
