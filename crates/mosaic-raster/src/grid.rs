//! Target output grid definition.

use crate::{AffineTransform, RasterError, Rect, Result};
use serde::{Deserialize, Serialize};

/// Relative tolerance used when deciding whether an extent is an exact
/// multiple of the resolution.
const SNAP_TOLERANCE: f64 = 1e-9;

/// Number of whole cells needed to span `extent` at `resolution`.
///
/// This is `ceil(extent / resolution)`, except that quotients within floating
/// point noise of an integer snap to that integer, so a 100-unit extent at a
/// resolution of 0.1 spans 1000 cells rather than 1001.
pub fn cells_spanning(extent: f64, resolution: f64) -> f64 {
    let cells = extent / resolution;
    let nearest = cells.round();
    if (cells - nearest).abs() <= SNAP_TOLERANCE * nearest.abs().max(1.0) {
        nearest
    } else {
        cells.ceil()
    }
}

/// A north-up pixel grid with square cells.
///
/// Row 0 is the northern edge; column 0 is the western edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// World X of the western edge.
    pub origin_x: f64,
    /// World Y of the northern edge.
    pub origin_y: f64,
    /// Cell size in world units.
    pub resolution: f64,
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl GridSpec {
    /// Grid anchored at the top-left corner of `bounds` with enough cells to
    /// cover it at `resolution`.
    pub fn covering(bounds: &Rect, resolution: f64) -> Result<Self> {
        if !(resolution > 0.0 && resolution.is_finite()) {
            return Err(RasterError::UnsupportedLayout(format!(
                "grid resolution must be positive, got {}",
                resolution
            )));
        }
        let width = cells_spanning(bounds.width(), resolution);
        let height = cells_spanning(bounds.height(), resolution);
        if width < 1.0 || height < 1.0 || width > u32::MAX as f64 || height > u32::MAX as f64 {
            return Err(RasterError::UnsupportedLayout(format!(
                "grid of {} x {} cells cannot be represented",
                width, height
            )));
        }
        Ok(Self {
            origin_x: bounds.min_x,
            origin_y: bounds.max_y,
            resolution,
            width: width as u32,
            height: height as u32,
        })
    }

    /// Pixel-to-world transform of the grid.
    pub fn transform(&self) -> AffineTransform {
        AffineTransform::north_up(self.origin_x, self.origin_y, self.resolution, self.resolution)
    }

    /// World coordinates of the centre of a cell.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.resolution,
            self.origin_y - (row as f64 + 0.5) * self.resolution,
        )
    }

    /// Number of cells.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// World-space rectangle actually covered by the grid (may extend past the
    /// rectangle it was built from by up to one cell east and south).
    pub fn bounds(&self) -> Rect {
        self.transform().footprint(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_spanning_exact_and_partial() {
        assert_eq!(cells_spanning(100.0, 10.0), 10.0);
        assert_eq!(cells_spanning(101.0, 10.0), 11.0);
        assert_eq!(cells_spanning(99.0, 10.0), 10.0);
        // 0.3 / 0.1 is 2.9999999999999996 in binary floating point
        assert_eq!(cells_spanning(0.3, 0.1), 3.0);
        assert_eq!(cells_spanning(100.0, 0.1), 1000.0);
    }

    #[test]
    fn test_covering_grid() {
        let bounds = Rect::new(0.0, 0.0, 25.0, 10.0);
        let grid = GridSpec::covering(&bounds, 10.0).unwrap();
        assert_eq!(grid.width, 3);
        assert_eq!(grid.height, 1);
        assert_eq!(grid.origin_x, 0.0);
        assert_eq!(grid.origin_y, 10.0);
        assert_eq!(grid.pixel_center(0, 0), (5.0, 5.0));
        assert_eq!(grid.bounds(), Rect::new(0.0, 0.0, 30.0, 10.0));
    }

    #[test]
    fn test_covering_rejects_bad_resolution() {
        let bounds = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert!(GridSpec::covering(&bounds, 0.0).is_err());
        assert!(GridSpec::covering(&bounds, -1.0).is_err());
        assert!(GridSpec::covering(&bounds, f64::NAN).is_err());
    }
}
