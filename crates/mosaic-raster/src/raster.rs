//! In-memory raster representations.

use crate::{AffineTransform, CrsToken, RasterError, Rect, Result, SampleType};

/// Metadata of a raster, available without decoding pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterHeader {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of bands.
    pub bands: usize,
    /// Sample type shared by all bands.
    pub sample_type: SampleType,
    /// No-data value (samples equal to this are treated as missing).
    pub nodata: Option<f64>,
    /// Pixel-to-world transform.
    pub transform: AffineTransform,
    /// Coordinate reference system.
    pub crs: CrsToken,
}

impl RasterHeader {
    /// World-space rectangle covered by the raster.
    pub fn footprint(&self) -> Rect {
        self.transform.footprint(self.width, self.height)
    }

    /// Mean absolute pixel size in world units.
    pub fn resolution(&self) -> f64 {
        self.transform.resolution()
    }

    /// Number of pixels per band.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of samples across all bands.
    pub fn sample_count(&self) -> usize {
        self.pixel_count() * self.bands
    }

    /// Whether `value` is this raster's no-data sentinel.
    ///
    /// Float sentinels are first narrowed to the sample type, so a rounded
    /// `-3.40282346638529e38` tag still matches `f32::MIN` samples. An integer
    /// sample type that cannot hold the sentinel (a `-9999` tag on `uint8`)
    /// never matches.
    pub fn is_nodata(&self, value: f64) -> bool {
        match self.nodata {
            Some(nodata) if nodata.is_nan() => value.is_nan(),
            Some(nodata) if self.sample_type.is_float() => self.sample_type.narrow(nodata) == value,
            Some(nodata) => self.sample_type.can_represent(nodata) && nodata == value,
            None => false,
        }
    }
}

/// A decoded raster: header plus band-major samples widened to `f64`.
///
/// Sample `(band, col, row)` lives at `band * width * height + row * width + col`.
#[derive(Debug, Clone)]
pub struct Raster {
    /// Raster metadata.
    pub header: RasterHeader,
    data: Vec<f64>,
}

impl Raster {
    /// Wrap decoded samples, checking their count against the header.
    pub fn new(header: RasterHeader, data: Vec<f64>) -> Result<Self> {
        let expected = header.sample_count();
        if data.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { header, data })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.header.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// All samples, band-major.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Samples of one band, row-major.
    pub fn band(&self, band: usize) -> &[f64] {
        let n = self.header.pixel_count();
        &self.data[band * n..(band + 1) * n]
    }

    /// Raw sample at a pixel, including no-data sentinels.
    pub fn raw(&self, band: usize, col: usize, row: usize) -> f64 {
        let n = self.header.pixel_count();
        self.data[band * n + row * self.header.width as usize + col]
    }

    /// Sample at a pixel, or `None` when it holds the no-data value.
    pub fn value(&self, band: usize, col: usize, row: usize) -> Option<f64> {
        let v = self.raw(band, col, row);
        if self.header.is_nodata(v) {
            None
        } else {
            Some(v)
        }
    }
}

/// Typed sample storage for writing, band-major like [`Raster`].
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    /// Unsigned 8-bit samples.
    U8(Vec<u8>),
    /// Unsigned 16-bit samples.
    U16(Vec<u16>),
    /// Unsigned 32-bit samples.
    U32(Vec<u32>),
    /// Signed 8-bit samples.
    I8(Vec<i8>),
    /// Signed 16-bit samples.
    I16(Vec<i16>),
    /// Signed 32-bit samples.
    I32(Vec<i32>),
    /// 32-bit float samples.
    F32(Vec<f32>),
    /// 64-bit float samples.
    F64(Vec<f64>),
}

impl SampleBuffer {
    /// Convert wide samples into `sample_type`, narrowing each with
    /// [`SampleType::narrow`].
    pub fn from_f64(sample_type: SampleType, values: &[f64]) -> Self {
        let narrowed = values.iter().map(|&v| sample_type.narrow(v));
        match sample_type {
            SampleType::U8 => SampleBuffer::U8(narrowed.map(|v| v as u8).collect()),
            SampleType::U16 => SampleBuffer::U16(narrowed.map(|v| v as u16).collect()),
            SampleType::U32 => SampleBuffer::U32(narrowed.map(|v| v as u32).collect()),
            SampleType::I8 => SampleBuffer::I8(narrowed.map(|v| v as i8).collect()),
            SampleType::I16 => SampleBuffer::I16(narrowed.map(|v| v as i16).collect()),
            SampleType::I32 => SampleBuffer::I32(narrowed.map(|v| v as i32).collect()),
            SampleType::F32 => SampleBuffer::F32(narrowed.map(|v| v as f32).collect()),
            SampleType::F64 => SampleBuffer::F64(narrowed.collect()),
        }
    }

    /// Sample type held by the buffer.
    pub fn sample_type(&self) -> SampleType {
        match self {
            SampleBuffer::U8(_) => SampleType::U8,
            SampleBuffer::U16(_) => SampleType::U16,
            SampleBuffer::U32(_) => SampleType::U32,
            SampleBuffer::I8(_) => SampleType::I8,
            SampleBuffer::I16(_) => SampleType::I16,
            SampleBuffer::I32(_) => SampleType::I32,
            SampleBuffer::F32(_) => SampleType::F32,
            SampleBuffer::F64(_) => SampleType::F64,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::U8(v) => v.len(),
            SampleBuffer::U16(v) => v.len(),
            SampleBuffer::U32(v) => v.len(),
            SampleBuffer::I8(v) => v.len(),
            SampleBuffer::I16(v) => v.len(),
            SampleBuffer::I32(v) => v.len(),
            SampleBuffer::F32(v) => v.len(),
            SampleBuffer::F64(v) => v.len(),
        }
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample `index` widened to `f64`.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            SampleBuffer::U8(v) => v.get(index).map(|&s| s as f64),
            SampleBuffer::U16(v) => v.get(index).map(|&s| s as f64),
            SampleBuffer::U32(v) => v.get(index).map(|&s| s as f64),
            SampleBuffer::I8(v) => v.get(index).map(|&s| s as f64),
            SampleBuffer::I16(v) => v.get(index).map(|&s| s as f64),
            SampleBuffer::I32(v) => v.get(index).map(|&s| s as f64),
            SampleBuffer::F32(v) => v.get(index).map(|&s| s as f64),
            SampleBuffer::F64(v) => v.get(index).copied(),
        }
    }

    /// Append sample `index` to `out` in native byte order.
    pub(crate) fn push_ne_bytes(&self, index: usize, out: &mut Vec<u8>) {
        match self {
            SampleBuffer::U8(v) => out.push(v[index]),
            SampleBuffer::U16(v) => out.extend_from_slice(&v[index].to_ne_bytes()),
            SampleBuffer::U32(v) => out.extend_from_slice(&v[index].to_ne_bytes()),
            SampleBuffer::I8(v) => out.extend_from_slice(&v[index].to_ne_bytes()),
            SampleBuffer::I16(v) => out.extend_from_slice(&v[index].to_ne_bytes()),
            SampleBuffer::I32(v) => out.extend_from_slice(&v[index].to_ne_bytes()),
            SampleBuffer::F32(v) => out.extend_from_slice(&v[index].to_ne_bytes()),
            SampleBuffer::F64(v) => out.extend_from_slice(&v[index].to_ne_bytes()),
        }
    }
}

/// A finished raster ready to be encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRaster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of bands.
    pub bands: usize,
    /// Pixel-to-world transform.
    pub transform: AffineTransform,
    /// Coordinate reference system.
    pub crs: CrsToken,
    /// No-data value to record in the file metadata.
    pub nodata: Option<f64>,
    /// Band-major typed samples.
    pub buffer: SampleBuffer,
}

impl OutputRaster {
    /// Sample type of the buffer.
    pub fn sample_type(&self) -> SampleType {
        self.buffer.sample_type()
    }

    /// Check the buffer length against the declared dimensions.
    pub fn check_size(&self) -> Result<()> {
        let expected = self.width as usize * self.height as usize * self.bands;
        if self.buffer.len() != expected || expected == 0 {
            return Err(RasterError::BufferSize {
                expected,
                actual: self.buffer.len(),
            });
        }
        Ok(())
    }

    /// Sample at a pixel widened to `f64`.
    pub fn sample(&self, band: usize, col: usize, row: usize) -> Option<f64> {
        let n = self.width as usize * self.height as usize;
        self.buffer.get(band * n + row * self.width as usize + col)
    }
}
