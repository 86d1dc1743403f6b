//! Advisory warnings.

use crate::MergeRule;
use mosaic_raster::SampleType;
use serde::Serialize;
use std::fmt;

/// Coverage ratio below which gaps are likely.
pub const GAP_THRESHOLD: f64 = 0.95;

/// Coverage ratio above which sources noticeably overlap.
pub const OVERLAP_THRESHOLD: f64 = 1.05;

/// Coarsest/finest resolution ratio above which resampling artefacts are likely.
pub const RESOLUTION_VARIANCE_THRESHOLD: f64 = 1.5;

/// A non-fatal finding. Warnings accumulate and never stop a merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeWarning {
    /// Source footprints cover noticeably less area than the output.
    PossibleGaps {
        /// Σ footprint areas / output area.
        coverage_ratio: f64,
    },
    /// Source footprints overlap by a noticeable amount. Informational.
    OverlapCoverage {
        /// Σ footprint areas / output area.
        coverage_ratio: f64,
    },
    /// Two or more sources and no overlapping pair.
    NoOverlapsDetected {
        /// Number of sources.
        sources: usize,
    },
    /// Source resolutions differ widely.
    ResolutionVariance {
        /// Smallest source resolution.
        finest: f64,
        /// Largest source resolution.
        coarsest: f64,
    },
    /// Sources disagree on their no-data value.
    InconsistentNodata {
        /// No-data value of every source, in order.
        values: Vec<Option<f64>>,
    },
    /// An elementwise numeric rule on multi-band data combines each band
    /// independently, which can mix pixels from different sources.
    MultiBandMergeCaution {
        /// Band count.
        bands: usize,
        /// The rule in use.
        rule: MergeRule,
    },
    /// The requested no-data value had to be narrowed for the output type.
    NodataNotRepresentable {
        /// Requested value.
        requested: f64,
        /// Value actually written.
        written: f64,
        /// Output sample type.
        sample_type: SampleType,
    },
}

impl MergeWarning {
    /// Stable snake_case identifier, used in reports and metric labels.
    pub const fn kind(&self) -> &'static str {
        match self {
            MergeWarning::PossibleGaps { .. } => "possible_gaps",
            MergeWarning::OverlapCoverage { .. } => "overlap_coverage",
            MergeWarning::NoOverlapsDetected { .. } => "no_overlaps_detected",
            MergeWarning::ResolutionVariance { .. } => "resolution_variance",
            MergeWarning::InconsistentNodata { .. } => "inconsistent_nodata",
            MergeWarning::MultiBandMergeCaution { .. } => "multi_band_merge_caution",
            MergeWarning::NodataNotRepresentable { .. } => "nodata_not_representable",
        }
    }

    /// Whether this is purely informational rather than a likely problem.
    pub const fn is_info(&self) -> bool {
        matches!(self, MergeWarning::OverlapCoverage { .. })
    }
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeWarning::PossibleGaps { coverage_ratio } => write!(
                f,
                "potential gaps: sources cover ~{:.1}% less area than the output",
                (1.0 - coverage_ratio) * 100.0
            ),
            MergeWarning::OverlapCoverage { coverage_ratio } => write!(
                f,
                "sources have {:.1}% overlap coverage",
                (coverage_ratio - 1.0) * 100.0
            ),
            MergeWarning::NoOverlapsDetected { sources } => {
                write!(f, "no overlaps detected between {} sources; files may have gaps", sources)
            }
            MergeWarning::ResolutionVariance { finest, coarsest } => write!(
                f,
                "source resolutions vary from {:.4} to {:.4} ({:.2}x)",
                finest,
                coarsest,
                coarsest / finest
            ),
            MergeWarning::InconsistentNodata { values } => {
                let list: Vec<String> = values
                    .iter()
                    .map(|v| v.map_or_else(|| "none".to_string(), |v| v.to_string()))
                    .collect();
                write!(f, "sources disagree on nodata: [{}]", list.join(", "))
            }
            MergeWarning::MultiBandMergeCaution { bands, rule } => write!(
                f,
                "rule '{}' combines each of the {} bands independently",
                rule, bands
            ),
            MergeWarning::NodataNotRepresentable {
                requested,
                written,
                sample_type,
            } => write!(
                f,
                "nodata {} cannot be represented as {}; writing {}",
                requested, sample_type, written
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_display() {
        let w = MergeWarning::PossibleGaps { coverage_ratio: 0.5 };
        assert_eq!(w.kind(), "possible_gaps");
        assert!(w.to_string().contains("50.0%"));
        assert!(!w.is_info());
        assert!(MergeWarning::OverlapCoverage { coverage_ratio: 1.2 }.is_info());

        let w = MergeWarning::InconsistentNodata {
            values: vec![Some(0.0), None],
        };
        assert_eq!(w.to_string(), "sources disagree on nodata: [0, none]");
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let w = MergeWarning::MultiBandMergeCaution {
            bands: 3,
            rule: MergeRule::Sum,
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "multi_band_merge_caution");
        assert_eq!(json["rule"], "sum");
        assert_eq!(json["bands"], 3);
    }
}
