//! Output extent and resolution planning.

use crate::{MergeError, PlanLimits, ResolutionPolicy, Result, SourceDescriptor};
use mosaic_raster::{cells_spanning, GridSpec, Rect};
use serde::Serialize;
use tracing::debug;

/// The output grid of a merge.
///
/// `width = ceil(bounds.width() / resolution)` and likewise for height, with
/// quotients within floating point noise of an integer snapped to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpatialPlan {
    /// Union of all source footprints.
    pub bounds: Rect,
    /// Output pixel size in world units.
    pub resolution: f64,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

impl SpatialPlan {
    /// The north-up grid anchored at the top-left of `bounds`.
    pub fn grid(&self) -> GridSpec {
        GridSpec {
            origin_x: self.bounds.min_x,
            origin_y: self.bounds.max_y,
            resolution: self.resolution,
            width: self.width,
            height: self.height,
        }
    }

    /// Pixels per band.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Smallest and largest source resolution.
pub fn resolution_range(sources: &[SourceDescriptor]) -> Option<(f64, f64)> {
    sources.iter().map(SourceDescriptor::resolution).fold(None, |acc, r| {
        Some(match acc {
            None => (r, r),
            Some((lo, hi)) => (lo.min(r), hi.max(r)),
        })
    })
}

/// Union bounds, resolution and output dimensions for `sources`.
///
/// Pure: the same sources and policy always yield the same plan.
pub fn plan(
    sources: &[SourceDescriptor],
    policy: ResolutionPolicy,
    limits: &PlanLimits,
) -> Result<SpatialPlan> {
    let (first, rest) = sources.split_first().ok_or(MergeError::EmptySourceSet)?;
    let bounds = rest
        .iter()
        .fold(first.footprint(), |acc, s| acc.union(&s.footprint()));

    let resolution = match policy {
        ResolutionPolicy::Explicit(r) => r,
        ResolutionPolicy::Finest | ResolutionPolicy::Coarsest => {
            let (finest, coarsest) =
                resolution_range(sources).ok_or(MergeError::EmptySourceSet)?;
            if policy == ResolutionPolicy::Finest {
                finest
            } else {
                coarsest
            }
        }
    };
    if !(resolution > 0.0 && resolution.is_finite()) {
        return Err(MergeError::InvalidResolution(resolution));
    }

    let width = cells_spanning(bounds.width(), resolution).max(1.0);
    let height = cells_spanning(bounds.height(), resolution).max(1.0);
    let max = limits.max_dimension as f64;
    if !(width <= max && height <= max) {
        return Err(MergeError::OutputTooLarge {
            width,
            height,
            max: limits.max_dimension,
        });
    }
    let samples = (width as u64)
        .saturating_mul(height as u64)
        .saturating_mul(first.bands as u64);
    if samples > limits.max_samples {
        return Err(MergeError::OutputTooManySamples {
            samples,
            max: limits.max_samples,
        });
    }

    let plan = SpatialPlan {
        bounds,
        resolution,
        width: width as u32,
        height: height as u32,
    };
    debug!(
        bounds = %plan.bounds,
        resolution = plan.resolution,
        width = plan.width,
        height = plan.height,
        "planned output grid"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_MAX_SAMPLES;
    use mosaic_raster::AffineTransform;

    fn source(x: f64, y: f64, res: f64, width: u32, height: u32) -> SourceDescriptor {
        SourceDescriptor::new("s.tif", AffineTransform::north_up(x, y, res, res), width, height)
    }

    fn two_sources() -> Vec<SourceDescriptor> {
        vec![source(0.0, 100.0, 1.0, 100, 100), source(50.0, 150.0, 2.5, 40, 40)]
    }

    #[test]
    fn test_finest_and_coarsest() {
        let limits = PlanLimits::default();
        let finest = plan(&two_sources(), ResolutionPolicy::Finest, &limits).unwrap();
        assert_eq!(finest.bounds, Rect::new(0.0, 0.0, 150.0, 150.0));
        assert_eq!(finest.resolution, 1.0);
        assert_eq!((finest.width, finest.height), (150, 150));

        let coarsest = plan(&two_sources(), ResolutionPolicy::Coarsest, &limits).unwrap();
        assert_eq!(coarsest.resolution, 2.5);
        assert_eq!((coarsest.width, coarsest.height), (60, 60));
    }

    #[test]
    fn test_explicit_resolution_rounds_up() {
        let limits = PlanLimits::default();
        let p = plan(&two_sources(), ResolutionPolicy::Explicit(40.0), &limits).unwrap();
        // 150 / 40 = 3.75
        assert_eq!((p.width, p.height), (4, 4));
        assert_eq!(p.grid().bounds(), Rect::new(0.0, -10.0, 160.0, 150.0));
    }

    #[test]
    fn test_invalid_resolution() {
        let limits = PlanLimits::default();
        for r in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                plan(&two_sources(), ResolutionPolicy::Explicit(r), &limits),
                Err(MergeError::InvalidResolution(_))
            ));
        }
    }

    #[test]
    fn test_output_too_large() {
        let limits = PlanLimits {
            max_dimension: 100,
            ..PlanLimits::default()
        };
        let err = plan(&two_sources(), ResolutionPolicy::Finest, &limits).unwrap_err();
        assert!(matches!(err, MergeError::OutputTooLarge { max: 100, .. }));
        assert!(plan(&two_sources(), ResolutionPolicy::Coarsest, &limits).is_ok());
    }

    #[test]
    fn test_sample_budget_covers_sparse_corners() {
        // Two tiny tiles far apart: each side fits, the area does not
        let sources = vec![
            source(0.0, 10.0, 1.0, 10, 10),
            source(49_989.0, 49_999.0, 1.0, 10, 10),
        ];
        let err = plan(&sources, ResolutionPolicy::Finest, &PlanLimits::default()).unwrap_err();
        assert!(matches!(
            err,
            MergeError::OutputTooManySamples { samples: 2_499_900_001, max: DEFAULT_MAX_SAMPLES }
        ));
        assert_eq!(err.stage(), "plan");

        let mut banded = two_sources();
        for s in &mut banded {
            s.bands = 4;
        }
        // 150 x 150 x 4
        let limits = PlanLimits {
            max_samples: 89_999,
            ..PlanLimits::default()
        };
        assert!(matches!(
            plan(&banded, ResolutionPolicy::Finest, &limits),
            Err(MergeError::OutputTooManySamples { samples: 90_000, .. })
        ));
        let limits = PlanLimits {
            max_samples: 90_000,
            ..PlanLimits::default()
        };
        assert!(plan(&banded, ResolutionPolicy::Finest, &limits).is_ok());
    }

    #[test]
    fn test_resolution_range() {
        assert_eq!(resolution_range(&two_sources()), Some((1.0, 2.5)));
        assert_eq!(resolution_range(&[]), None);
    }
}
