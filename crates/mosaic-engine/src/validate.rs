//! Cross-source compatibility checks.

use crate::{MergeError, Result, SourceDescriptor};
use mosaic_raster::crs_equals;
use tracing::debug;

/// Check that every source shares source 0's CRS, band count and sample type.
///
/// Checks run in that order for each source, so the first mismatch reported
/// names the lowest offending index. Returns the input unchanged on success.
pub fn validate(sources: &[SourceDescriptor]) -> Result<&[SourceDescriptor]> {
    let first = sources.first().ok_or(MergeError::EmptySourceSet)?;

    for (index, source) in sources.iter().enumerate().skip(1) {
        if !crs_equals(&source.crs, &first.crs) {
            return Err(MergeError::CrsMismatch {
                index,
                expected: first.crs.clone(),
                found: source.crs.clone(),
            });
        }
        if source.bands != first.bands {
            return Err(MergeError::BandCountMismatch {
                index,
                expected: first.bands,
                found: source.bands,
            });
        }
        if source.sample_type != first.sample_type {
            return Err(MergeError::SampleTypeMismatch {
                index,
                expected: first.sample_type,
                found: source.sample_type,
            });
        }
    }

    debug!(
        sources = sources.len(),
        crs = %first.crs,
        bands = first.bands,
        sample_type = %first.sample_type,
        "sources are compatible"
    );
    Ok(sources)
}
