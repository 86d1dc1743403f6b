//! Pairwise overlap and coverage analysis.

use crate::plan::resolution_range;
use crate::warning::{GAP_THRESHOLD, OVERLAP_THRESHOLD, RESOLUTION_VARIANCE_THRESHOLD};
use crate::{MergeWarning, SourceDescriptor, SpatialPlan};
use serde::Serialize;
use tracing::debug;

/// Footprint intersection of two sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapPair {
    /// Lower source index.
    pub first: usize,
    /// Higher source index.
    pub second: usize,
    /// Intersection area in squared world units.
    pub area: f64,
    /// Intersection area as a percentage of `first`'s footprint.
    pub percent: f64,
}

/// Advisory description of how the sources tile the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// The output grid the sources were analysed against.
    pub plan: SpatialPlan,
    /// Smallest source resolution.
    pub finest_resolution: f64,
    /// Largest source resolution.
    pub coarsest_resolution: f64,
    /// Every overlapping pair, ordered by `(first, second)`.
    pub overlaps: Vec<OverlapPair>,
    /// Σ footprint areas.
    pub total_source_area: f64,
    /// Area of the union rectangle.
    pub output_area: f64,
    /// `total_source_area / output_area`; 0 for a zero-area output.
    pub coverage_ratio: f64,
    /// Findings, in detection order.
    pub warnings: Vec<MergeWarning>,
}

impl CoverageReport {
    /// Estimated output pixel count per band.
    pub fn estimated_pixels(&self) -> u64 {
        self.plan.pixel_count()
    }
}

/// Pairwise overlaps, coverage ratio and the warnings they imply.
pub fn analyze_coverage(sources: &[SourceDescriptor], plan: &SpatialPlan) -> CoverageReport {
    let footprints: Vec<_> = sources.iter().map(SourceDescriptor::footprint).collect();

    let mut overlaps = Vec::new();
    for (i, a) in footprints.iter().enumerate() {
        for (j, b) in footprints.iter().enumerate().skip(i + 1) {
            if let Some(intersection) = a.intersection(b) {
                let area = intersection.area();
                let own = a.area();
                overlaps.push(OverlapPair {
                    first: i,
                    second: j,
                    area,
                    percent: if own > 0.0 { area / own * 100.0 } else { 0.0 },
                });
            }
        }
    }

    let total_source_area: f64 = footprints.iter().map(|f| f.area()).sum();
    let output_area = plan.bounds.area();
    let coverage_ratio = if output_area > 0.0 {
        total_source_area / output_area
    } else {
        0.0
    };
    let (finest, coarsest) =
        resolution_range(sources).unwrap_or((plan.resolution, plan.resolution));

    let mut warnings = Vec::new();
    if sources.len() >= 2 && overlaps.is_empty() {
        warnings.push(MergeWarning::NoOverlapsDetected {
            sources: sources.len(),
        });
    }
    if coverage_ratio < GAP_THRESHOLD {
        warnings.push(MergeWarning::PossibleGaps { coverage_ratio });
    } else if coverage_ratio > OVERLAP_THRESHOLD {
        warnings.push(MergeWarning::OverlapCoverage { coverage_ratio });
    }
    if finest > 0.0 && coarsest / finest > RESOLUTION_VARIANCE_THRESHOLD {
        warnings.push(MergeWarning::ResolutionVariance { finest, coarsest });
    }
    if !nodata_consistent(sources) {
        warnings.push(MergeWarning::InconsistentNodata {
            values: sources.iter().map(|s| s.nodata).collect(),
        });
    }

    debug!(
        overlaps = overlaps.len(),
        coverage_ratio,
        warnings = warnings.len(),
        "analysed coverage"
    );

    CoverageReport {
        plan: *plan,
        finest_resolution: finest,
        coarsest_resolution: coarsest,
        overlaps,
        total_source_area,
        output_area,
        coverage_ratio,
        warnings,
    }
}

/// Whether every source declares the same no-data value (or none does).
fn nodata_consistent(sources: &[SourceDescriptor]) -> bool {
    let same = |a: Option<f64>, b: Option<f64>| match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => false,
    };
    match sources.split_first() {
        Some((first, rest)) => rest.iter().all(|s| same(first.nodata, s.nodata)),
        None => true,
    }
}
