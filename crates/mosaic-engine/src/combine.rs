//! Per-pixel merge of aligned sources.

use crate::MergeRule;
use mosaic_raster::{AlignedBuffer, AlignedSample};
use rayon::prelude::*;

/// Merged samples before narrowing, band-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of bands.
    pub bands: usize,
    /// Wide samples, band-major.
    pub values: Vec<f64>,
}

impl CombinedBuffer {
    /// Pixels per band.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Sample at a pixel.
    pub fn get(&self, band: usize, col: usize, row: usize) -> f64 {
        self.values[band * self.pixel_count() + row * self.width as usize + col]
    }
}

/// Combine aligned buffers with `rule`, in parallel over output rows.
///
/// A source contributes to a pixel when it covers the pixel with a valid
/// value. Pixels without contributors get `output_nodata`, or zero when
/// there is none. `count` always writes the contributor count, zero included.
/// Bands are combined independently. All buffers must share the first
/// buffer's dimensions.
pub fn combine(
    buffers: &[AlignedBuffer],
    rule: MergeRule,
    output_nodata: Option<f64>,
) -> CombinedBuffer {
    let Some(first) = buffers.first() else {
        return CombinedBuffer {
            width: 0,
            height: 0,
            bands: 0,
            values: Vec::new(),
        };
    };
    let (width, height, bands) = (first.width as usize, first.height as usize, first.bands);
    let pixels = width * height;
    let fill = output_nodata.unwrap_or(0.0);

    let mut values = vec![0.0; pixels * bands];
    if width > 0 {
        values
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(band_row, out)| {
                let row_start = band_row * width;
                for (col, slot) in out.iter_mut().enumerate() {
                    let index = row_start + col;
                    let contributions = buffers.iter().filter_map(|b| match b.samples().get(index) {
                        Some(AlignedSample::Value(v)) => Some(*v),
                        _ => None,
                    });
                    *slot = merge_pixel(rule, contributions).unwrap_or(fill);
                }
            });
    }

    CombinedBuffer {
        width: first.width,
        height: first.height,
        bands,
        values,
    }
}

/// Merge the contributing values of one pixel, in source order.
fn merge_pixel(rule: MergeRule, mut values: impl Iterator<Item = f64>) -> Option<f64> {
    match rule {
        MergeRule::First => values.next(),
        MergeRule::Last => values.last(),
        MergeRule::Min => values.reduce(f64::min),
        MergeRule::Max => values.reduce(f64::max),
        MergeRule::Sum => values.reduce(|a, b| a + b),
        MergeRule::Count => Some(values.count() as f64),
    }
}
