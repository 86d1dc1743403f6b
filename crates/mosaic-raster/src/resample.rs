//! Resampling a decoded raster onto a target grid.
//!
//! Output pixel centres are mapped into source pixel space through the inverse
//! geotransform. Point kernels (nearest, bilinear, cubic) sample around that
//! position; footprint kernels (average, mode, min, max) aggregate every source
//! pixel under the output pixel's footprint.

use crate::{GridSpec, Raster, RasterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Edge tolerance when deciding which source pixels a footprint touches.
const FOOTPRINT_EPSILON: f64 = 1e-9;

/// Weight sums below this are treated as "no valid neighbours".
const MIN_WEIGHT: f64 = 1e-12;

/// Keys cubic convolution parameter.
const CUBIC_A: f64 = -0.5;

/// How source pixels are combined into one output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingKernel {
    /// Value of the source pixel containing the output centre.
    #[default]
    Nearest,
    /// Distance-weighted mean of the 2x2 neighbourhood.
    Bilinear,
    /// Keys cubic convolution over the 4x4 neighbourhood.
    Cubic,
    /// Area-weighted mean over the output footprint.
    Average,
    /// Most frequent value over the output footprint.
    Mode,
    /// Minimum over the output footprint.
    Min,
    /// Maximum over the output footprint.
    Max,
}

impl ResamplingKernel {
    /// All kernels.
    pub const ALL: [ResamplingKernel; 7] = [
        ResamplingKernel::Nearest,
        ResamplingKernel::Bilinear,
        ResamplingKernel::Cubic,
        ResamplingKernel::Average,
        ResamplingKernel::Mode,
        ResamplingKernel::Min,
        ResamplingKernel::Max,
    ];

    /// Lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResamplingKernel::Nearest => "nearest",
            ResamplingKernel::Bilinear => "bilinear",
            ResamplingKernel::Cubic => "cubic",
            ResamplingKernel::Average => "average",
            ResamplingKernel::Mode => "mode",
            ResamplingKernel::Min => "min",
            ResamplingKernel::Max => "max",
        }
    }

    fn uses_footprint(&self) -> bool {
        matches!(
            self,
            ResamplingKernel::Average
                | ResamplingKernel::Mode
                | ResamplingKernel::Min
                | ResamplingKernel::Max
        )
    }
}

impl fmt::Display for ResamplingKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResamplingKernel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ResamplingKernel::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| {
                format!(
                    "unknown resampling kernel '{}' (expected nearest, bilinear, cubic, \
                     average, mode, min or max)",
                    s
                )
            })
    }
}

/// One aligned sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlignedSample {
    /// The output pixel centre lies outside the source footprint.
    Outside,
    /// Inside the footprint, but every contributing source pixel is no-data.
    NoData,
    /// A valid value.
    Value(f64),
}

impl AlignedSample {
    /// The value, if valid.
    pub fn value(&self) -> Option<f64> {
        match self {
            AlignedSample::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether the source footprint covers this pixel.
    pub fn is_covered(&self) -> bool {
        !matches!(self, AlignedSample::Outside)
    }
}

/// One source resampled onto a target grid, band-major.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedBuffer {
    /// Grid width.
    pub width: u32,
    /// Grid height.
    pub height: u32,
    /// Number of bands.
    pub bands: usize,
    samples: Vec<AlignedSample>,
}

impl AlignedBuffer {
    /// Wrap samples, checking their count.
    pub fn new(width: u32, height: u32, bands: usize, samples: Vec<AlignedSample>) -> Result<Self> {
        let expected = width as usize * height as usize * bands;
        if samples.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bands,
            samples,
        })
    }

    /// Pixels per band.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// All samples.
    pub fn samples(&self) -> &[AlignedSample] {
        &self.samples
    }

    /// Samples of one band.
    pub fn band(&self, band: usize) -> &[AlignedSample] {
        let n = self.pixel_count();
        &self.samples[band * n..(band + 1) * n]
    }

    /// Sample at a pixel.
    pub fn get(&self, band: usize, col: usize, row: usize) -> AlignedSample {
        self.samples[band * self.pixel_count() + row * self.width as usize + col]
    }

    /// Number of grid pixels inside the source footprint.
    pub fn covered_pixels(&self) -> usize {
        self.band(0).iter().filter(|s| s.is_covered()).count()
    }
}

/// Resample `raster` onto `grid` with `kernel`.
///
/// Returns [`RasterError::DegenerateTransform`] when the source transform has
/// no inverse.
pub fn resample(
    raster: &Raster,
    grid: &GridSpec,
    kernel: ResamplingKernel,
) -> Result<AlignedBuffer> {
    let header = &raster.header;
    let inverse = header
        .transform
        .invert()
        .ok_or(RasterError::DegenerateTransform)?;
    let grid_transform = grid.transform();
    let (w, h) = (header.width as f64, header.height as f64);

    let pixels = grid.pixel_count();
    let mut samples = vec![AlignedSample::Outside; pixels * header.bands];

    for row in 0..grid.height as usize {
        for col in 0..grid.width as usize {
            let (wx, wy) = grid.pixel_center(col, row);
            let (sc, sr) = inverse.apply(wx, wy);
            if !(sc >= 0.0 && sr >= 0.0 && sc < w && sr < h) {
                continue;
            }

            let footprint = kernel.uses_footprint().then(|| {
                let corners = [
                    grid_transform.apply(col as f64, row as f64),
                    grid_transform.apply(col as f64 + 1.0, row as f64),
                    grid_transform.apply(col as f64, row as f64 + 1.0),
                    grid_transform.apply(col as f64 + 1.0, row as f64 + 1.0),
                ]
                .map(|(x, y)| inverse.apply(x, y));
                Footprint::new(&corners, sc, sr, header.width, header.height)
            });

            let index = row * grid.width as usize + col;
            for band in 0..header.bands {
                let sampler = BandSampler { raster, band };
                samples[band * pixels + index] = match (kernel, &footprint) {
                    (ResamplingKernel::Nearest, _) => sampler.nearest(sc, sr),
                    (ResamplingKernel::Bilinear, _) => sampler.bilinear(sc, sr),
                    (ResamplingKernel::Cubic, _) => sampler.cubic(sc, sr),
                    (_, Some(fp)) => sampler.aggregate(kernel, fp),
                    (_, None) => sampler.nearest(sc, sr),
                };
            }
        }
    }

    AlignedBuffer::new(grid.width, grid.height, header.bands, samples)
}

/// Source pixel window under one output pixel, in fractional source pixel
/// coordinates.
#[derive(Debug, Clone, Copy)]
struct Footprint {
    c0: f64,
    c1: f64,
    r0: f64,
    r1: f64,
    cols: (usize, usize),
    rows: (usize, usize),
}

impl Footprint {
    fn new(corners: &[(f64, f64); 4], sc: f64, sr: f64, width: u32, height: u32) -> Self {
        let fold = |f: fn(f64, f64) -> f64, pick: fn(&(f64, f64)) -> f64, init: f64| {
            corners.iter().map(pick).fold(init, f)
        };
        let c0 = fold(f64::min, |p| p.0, f64::INFINITY);
        let c1 = fold(f64::max, |p| p.0, f64::NEG_INFINITY);
        let r0 = fold(f64::min, |p| p.1, f64::INFINITY);
        let r1 = fold(f64::max, |p| p.1, f64::NEG_INFINITY);
        Self {
            c0,
            c1,
            r0,
            r1,
            cols: index_range(c0, c1, sc, width),
            rows: index_range(r0, r1, sr, height),
        }
    }

    /// Overlap of source pixel `(col, row)` with the footprint.
    fn weight(&self, col: usize, row: usize) -> f64 {
        let overlap = |lo: f64, hi: f64, i: usize| {
            let i = i as f64;
            (hi.min(i + 1.0) - lo.max(i)).max(0.0)
        };
        overlap(self.c0, self.c1, col) * overlap(self.r0, self.r1, row)
    }
}

/// Half-open index range touched by `[lo, hi]`, clamped to `[0, size)`.
/// Falls back to the pixel containing `centre` when the range is empty.
fn index_range(lo: f64, hi: f64, centre: f64, size: u32) -> (usize, usize) {
    let size = size as f64;
    let start = (lo + FOOTPRINT_EPSILON).floor().clamp(0.0, size);
    let end = (hi - FOOTPRINT_EPSILON).ceil().clamp(0.0, size);
    if end > start {
        (start as usize, end as usize)
    } else {
        let c = centre.floor().clamp(0.0, size - 1.0) as usize;
        (c, c + 1)
    }
}

/// Keys cubic convolution kernel.
fn cubic_weight(t: f64) -> f64 {
    let t = t.abs();
    if t <= 1.0 {
        ((CUBIC_A + 2.0) * t - (CUBIC_A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((CUBIC_A * t - 5.0 * CUBIC_A) * t + 8.0 * CUBIC_A) * t - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

struct BandSampler<'a> {
    raster: &'a Raster,
    band: usize,
}

impl BandSampler<'_> {
    fn value(&self, col: usize, row: usize) -> Option<f64> {
        self.raster.value(self.band, col, row)
    }

    fn clamp_col(&self, c: i64) -> usize {
        c.clamp(0, self.raster.width() as i64 - 1) as usize
    }

    fn clamp_row(&self, r: i64) -> usize {
        r.clamp(0, self.raster.height() as i64 - 1) as usize
    }

    fn nearest(&self, sc: f64, sr: f64) -> AlignedSample {
        let col = self.clamp_col(sc.floor() as i64);
        let row = self.clamp_row(sr.floor() as i64);
        self.value(col, row)
            .map_or(AlignedSample::NoData, AlignedSample::Value)
    }

    /// Weighted sum over `(col_offsets, row_offsets)` around the anchor,
    /// skipping no-data neighbours and renormalising.
    fn convolve<const N: usize>(
        &self,
        sc: f64,
        sr: f64,
        kernel: fn(f64) -> f64,
        first: i64,
    ) -> AlignedSample {
        // Pixel centres sit at half-integers
        let x = sc - 0.5;
        let y = sr - 0.5;
        let (x0, y0) = (x.floor() as i64, y.floor() as i64);

        let mut acc = 0.0;
        let mut weight_sum = 0.0;
        for j in 0..N as i64 {
            let ry = y0 + first + j;
            let wy = kernel(y - ry as f64);
            if wy == 0.0 {
                continue;
            }
            for i in 0..N as i64 {
                let rx = x0 + first + i;
                let wx = kernel(x - rx as f64);
                let weight = wx * wy;
                if weight == 0.0 {
                    continue;
                }
                if let Some(v) = self.value(self.clamp_col(rx), self.clamp_row(ry)) {
                    acc += v * weight;
                    weight_sum += weight;
                }
            }
        }

        if weight_sum.abs() < MIN_WEIGHT {
            AlignedSample::NoData
        } else {
            AlignedSample::Value(acc / weight_sum)
        }
    }

    fn bilinear(&self, sc: f64, sr: f64) -> AlignedSample {
        self.convolve::<2>(sc, sr, |t| (1.0 - t.abs()).max(0.0), 0)
    }

    fn cubic(&self, sc: f64, sr: f64) -> AlignedSample {
        self.convolve::<4>(sc, sr, cubic_weight, -1)
    }

    fn aggregate(&self, kernel: ResamplingKernel, fp: &Footprint) -> AlignedSample {
        let mut values = Vec::new();
        let mut weights = Vec::new();
        for row in fp.rows.0..fp.rows.1 {
            for col in fp.cols.0..fp.cols.1 {
                if let Some(v) = self.value(col, row) {
                    values.push(v);
                    if kernel == ResamplingKernel::Average {
                        weights.push(fp.weight(col, row));
                    }
                }
            }
        }
        if values.is_empty() {
            return AlignedSample::NoData;
        }
        if values.len() == 1 {
            return AlignedSample::Value(values[0]);
        }

        let value = match kernel {
            ResamplingKernel::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            ResamplingKernel::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ResamplingKernel::Mode => mode(&mut values),
            _ => {
                let total: f64 = weights.iter().sum();
                if total < MIN_WEIGHT {
                    // Degenerate footprint: plain mean
                    values.iter().sum::<f64>() / values.len() as f64
                } else {
                    values.iter().zip(&weights).map(|(v, w)| v * w).sum::<f64>() / total
                }
            }
        };
        AlignedSample::Value(value)
    }
}

/// Most frequent value; ties resolve to the smallest.
fn mode(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mut best = values[0];
    let mut best_run = 0;
    let mut i = 0;
    while i < values.len() {
        let mut j = i;
        while j < values.len() && values[j] == values[i] {
            j += 1;
        }
        // Strictly greater keeps the earliest (smallest) value on ties
        if j - i > best_run {
            best_run = j - i;
            best = values[i];
        }
        i = j.max(i + 1);
    }
    best
}
