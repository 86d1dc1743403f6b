//! Georeferencing and sample-type primitives.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pixel sample type of a raster band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    /// Unsigned 8-bit integer.
    #[serde(rename = "uint8")]
    U8,
    /// Unsigned 16-bit integer.
    #[serde(rename = "uint16")]
    U16,
    /// Unsigned 32-bit integer.
    #[serde(rename = "uint32")]
    U32,
    /// Signed 8-bit integer.
    #[serde(rename = "int8")]
    I8,
    /// Signed 16-bit integer.
    #[serde(rename = "int16")]
    I16,
    /// Signed 32-bit integer.
    #[serde(rename = "int32")]
    I32,
    /// 32-bit IEEE float.
    #[serde(rename = "float32")]
    F32,
    /// 64-bit IEEE float.
    #[serde(rename = "float64")]
    F64,
}

impl SampleType {
    /// All supported sample types.
    pub const ALL: [SampleType; 8] = [
        SampleType::U8,
        SampleType::U16,
        SampleType::U32,
        SampleType::I8,
        SampleType::I16,
        SampleType::I32,
        SampleType::F32,
        SampleType::F64,
    ];

    /// Short lowercase name (`uint8`, `float32`, ...).
    pub const fn as_str(&self) -> &'static str {
        match self {
            SampleType::U8 => "uint8",
            SampleType::U16 => "uint16",
            SampleType::U32 => "uint32",
            SampleType::I8 => "int8",
            SampleType::I16 => "int16",
            SampleType::I32 => "int32",
            SampleType::F32 => "float32",
            SampleType::F64 => "float64",
        }
    }

    /// Bits per sample.
    pub const fn bits(&self) -> u16 {
        match self {
            SampleType::U8 | SampleType::I8 => 8,
            SampleType::U16 | SampleType::I16 => 16,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 32,
            SampleType::F64 => 64,
        }
    }

    /// TIFF SampleFormat tag value.
    pub const fn tiff_sample_format(&self) -> u16 {
        match self {
            SampleType::U8 | SampleType::U16 | SampleType::U32 => 1,
            SampleType::I8 | SampleType::I16 | SampleType::I32 => 2,
            SampleType::F32 | SampleType::F64 => 3,
        }
    }

    /// Map a TIFF SampleFormat / BitsPerSample pair to a sample type.
    pub fn from_tiff(format: u32, bits: u32) -> Option<Self> {
        match (format, bits) {
            (1, 8) => Some(SampleType::U8),
            (1, 16) => Some(SampleType::U16),
            (1, 32) => Some(SampleType::U32),
            (2, 8) => Some(SampleType::I8),
            (2, 16) => Some(SampleType::I16),
            (2, 32) => Some(SampleType::I32),
            (3, 32) => Some(SampleType::F32),
            (3, 64) => Some(SampleType::F64),
            _ => None,
        }
    }

    /// Whether this is a floating-point type.
    pub const fn is_float(&self) -> bool {
        matches!(self, SampleType::F32 | SampleType::F64)
    }

    /// Whether this is an unsigned integer type.
    pub const fn is_unsigned(&self) -> bool {
        matches!(self, SampleType::U8 | SampleType::U16 | SampleType::U32)
    }

    /// Inclusive value range of the type.
    pub fn range(&self) -> (f64, f64) {
        match self {
            SampleType::U8 => (0.0, u8::MAX as f64),
            SampleType::U16 => (0.0, u16::MAX as f64),
            SampleType::U32 => (0.0, u32::MAX as f64),
            SampleType::I8 => (i8::MIN as f64, i8::MAX as f64),
            SampleType::I16 => (i16::MIN as f64, i16::MAX as f64),
            SampleType::I32 => (i32::MIN as f64, i32::MAX as f64),
            SampleType::F32 => (f32::MIN as f64, f32::MAX as f64),
            SampleType::F64 => (f64::MIN, f64::MAX),
        }
    }

    /// Narrow a wide value into this type's domain.
    ///
    /// Integer targets truncate toward zero and saturate at the type bounds, so
    /// negative values become zero for unsigned types. NaN maps to zero for
    /// integer targets. `F32` saturates at `f32::MIN`/`f32::MAX` and keeps NaN.
    pub fn narrow(&self, value: f64) -> f64 {
        match self {
            SampleType::F64 => value,
            SampleType::F32 if value.is_nan() => value,
            SampleType::F32 => value.clamp(f32::MIN as f64, f32::MAX as f64) as f32 as f64,
            _ => {
                if value.is_nan() {
                    return 0.0;
                }
                let (lo, hi) = self.range();
                value.trunc().clamp(lo, hi)
            }
        }
    }

    /// Widen one stored sample (`bits() / 8` bytes) to `f64`.
    pub(crate) fn decode(&self, bytes: &[u8], big_endian: bool) -> f64 {
        let mut le = [0u8; 8];
        let n = bytes.len().min(8);
        le[..n].copy_from_slice(&bytes[..n]);
        if big_endian {
            le[..n].reverse();
        }
        let [b0, b1, b2, b3, ..] = le;
        match self {
            SampleType::U8 => b0 as f64,
            SampleType::I8 => b0 as i8 as f64,
            SampleType::U16 => u16::from_le_bytes([b0, b1]) as f64,
            SampleType::I16 => i16::from_le_bytes([b0, b1]) as f64,
            SampleType::U32 => u32::from_le_bytes([b0, b1, b2, b3]) as f64,
            SampleType::I32 => i32::from_le_bytes([b0, b1, b2, b3]) as f64,
            SampleType::F32 => f32::from_le_bytes([b0, b1, b2, b3]) as f64,
            SampleType::F64 => f64::from_le_bytes(le),
        }
    }

    /// Whether `value` survives [`SampleType::narrow`] unchanged.
    pub fn can_represent(&self, value: f64) -> bool {
        if value.is_nan() {
            return self.is_float();
        }
        self.narrow(value) == value
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        SampleType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| {
                format!(
                    "unknown sample type '{}' (expected one of uint8, uint16, uint32, \
                     int8, int16, int32, float32, float64)",
                    s
                )
            })
    }
}

/// Six-coefficient affine transform from pixel to world coordinates.
///
/// Coefficients follow GDAL order:
/// `x = origin_x + col * pixel_width + row * row_rotation`
/// `y = origin_y + col * col_rotation + row * pixel_height`
///
/// North-up rasters have zero rotation terms and a negative `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    /// World X of the top-left corner of pixel (0, 0).
    pub origin_x: f64,
    /// X step per column.
    pub pixel_width: f64,
    /// X step per row (rotation/shear).
    pub row_rotation: f64,
    /// World Y of the top-left corner of pixel (0, 0).
    pub origin_y: f64,
    /// Y step per column (rotation/shear).
    pub col_rotation: f64,
    /// Y step per row; negative for north-up rasters.
    pub pixel_height: f64,
}

impl AffineTransform {
    /// Build a north-up transform from the top-left corner and pixel size.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height: -pixel_height.abs(),
        }
    }

    /// Build from GDAL coefficient order `[x0, a, b, y0, d, e]`.
    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    /// Coefficients in GDAL order.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Map fractional pixel coordinates to world coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// The inverse mapping (world to fractional pixel), expressed as another
    /// affine transform. `None` if the pixels have zero area.
    pub fn invert(&self) -> Option<AffineTransform> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let a = self.pixel_height / det;
        let b = -self.row_rotation / det;
        let d = -self.col_rotation / det;
        let e = self.pixel_width / det;
        Some(AffineTransform {
            origin_x: -(a * self.origin_x + b * self.origin_y),
            pixel_width: a,
            row_rotation: b,
            origin_y: -(d * self.origin_x + e * self.origin_y),
            col_rotation: d,
            pixel_height: e,
        })
    }

    /// Whether the transform has no rotation terms.
    pub fn is_north_up(&self) -> bool {
        self.row_rotation == 0.0 && self.col_rotation == 0.0
    }

    /// Absolute pixel size `(width, height)` in world units.
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            self.pixel_width.hypot(self.col_rotation),
            self.row_rotation.hypot(self.pixel_height),
        )
    }

    /// Mean of the absolute pixel width and height.
    pub fn resolution(&self) -> f64 {
        let (w, h) = self.pixel_size();
        (w + h) / 2.0
    }

    /// World-space bounding rectangle of a `width` x `height` raster.
    pub fn footprint(&self, width: u32, height: u32) -> Rect {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(0.0, h),
            self.apply(w, h),
        ];
        let mut rect = Rect::new(corners[0].0, corners[0].1, corners[0].0, corners[0].1);
        for (x, y) in &corners[1..] {
            rect.min_x = rect.min_x.min(*x);
            rect.max_x = rect.max_x.max(*x);
            rect.min_y = rect.min_y.min(*y);
            rect.max_y = rect.max_y.max(*y);
        }
        rect
    }
}

/// Axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// West edge.
    pub min_x: f64,
    /// South edge.
    pub min_y: f64,
    /// East edge.
    pub max_x: f64,
    /// North edge.
    pub max_y: f64,
}

impl Rect {
    /// Create a rectangle; corners are normalised so min <= max.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// East-west extent.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// North-south extent.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Area in squared world units.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Whether the rectangle encloses no area.
    pub fn is_empty(&self) -> bool {
        !(self.min_x < self.max_x && self.min_y < self.max_y)
    }

    /// Intersection with another rectangle, `None` if they only touch or are
    /// disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let rect = Rect {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        };
        if rect.is_empty() {
            None
        } else {
            Some(rect)
        }
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.4}, {:.4}, {:.4}, {:.4})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Opaque coordinate reference system identity.
///
/// Tokens are only ever compared for equality (see [`crs_equals`]); no
/// transformation is ever derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrsToken(String);

impl CrsToken {
    /// Token for an EPSG code.
    pub fn epsg(code: u16) -> Self {
        CrsToken(format!("EPSG:{}", code))
    }

    /// Token for a raster with no CRS information.
    pub fn undefined() -> Self {
        CrsToken(String::new())
    }

    /// Token from free text (a citation, WKT or PROJ string).
    pub fn from_text(text: impl Into<String>) -> Self {
        CrsToken(text.into())
    }

    /// Whether any CRS information is present.
    pub fn is_defined(&self) -> bool {
        !self.0.trim().is_empty()
    }

    /// The EPSG code, if this token names one.
    pub fn epsg_code(&self) -> Option<u16> {
        let text = self.0.trim();
        let (authority, code) = text.split_once(':')?;
        if authority.eq_ignore_ascii_case("epsg") {
            code.trim().parse().ok()
        } else {
            None
        }
    }

    /// Raw token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn normalized(&self) -> String {
        self.0
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }
}

impl fmt::Display for CrsToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_defined() {
            f.write_str(&self.0)
        } else {
            f.write_str("No CRS")
        }
    }
}

/// CRS equality as used by the mosaic validator.
///
/// Comparison ignores ASCII case and whitespace, so `EPSG:32610` and
/// `epsg: 32610` are the same system. Two undefined tokens are equal.
pub fn crs_equals(a: &CrsToken, b: &CrsToken) -> bool {
    a.normalized() == b.normalized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_type_names_round_trip() {
        for t in SampleType::ALL {
            assert_eq!(t.as_str().parse::<SampleType>().unwrap(), t);
        }
        assert!("uint64".parse::<SampleType>().is_err());
        assert_eq!(" Float32 ".parse::<SampleType>().unwrap(), SampleType::F32);
    }

    #[test]
    fn test_narrow_unsigned_clamps_negative() {
        assert_eq!(SampleType::U8.narrow(-5.0), 0.0);
        assert_eq!(SampleType::U16.narrow(-0.7), 0.0);
        assert_eq!(SampleType::U8.narrow(12.9), 12.0);
    }

    #[test]
    fn test_narrow_saturates() {
        assert_eq!(SampleType::U8.narrow(300.0), 255.0);
        assert_eq!(SampleType::I16.narrow(-40_000.0), -32768.0);
        assert_eq!(SampleType::I8.narrow(-3.9), -3.0);
        assert_eq!(SampleType::U32.narrow(f64::NAN), 0.0);
        assert!(SampleType::F32.narrow(f64::NAN).is_nan());
        assert_eq!(SampleType::F32.narrow(1e300), f32::MAX as f64);
        assert_eq!(SampleType::F32.narrow(f64::NEG_INFINITY), f32::MIN as f64);
        assert_eq!(SampleType::F64.narrow(1e300), 1e300);
    }

    #[test]
    fn test_decode_honours_byte_order() {
        assert_eq!(SampleType::U16.decode(&[0x01, 0x02], false), 513.0);
        assert_eq!(SampleType::U16.decode(&[0x01, 0x02], true), 258.0);
        assert_eq!(SampleType::I8.decode(&[0xff], false), -1.0);
        assert_eq!(SampleType::I16.decode(&(-9999i16).to_be_bytes(), true), -9999.0);
        assert_eq!(SampleType::F32.decode(&1.5f32.to_le_bytes(), false), 1.5);
        assert_eq!(SampleType::F64.decode(&(-0.25f64).to_be_bytes(), true), -0.25);
    }

    #[test]
    fn test_can_represent() {
        assert!(SampleType::U8.can_represent(255.0));
        assert!(!SampleType::U8.can_represent(-9999.0));
        assert!(SampleType::I16.can_represent(-9999.0));
        assert!(!SampleType::I32.can_represent(1.5));
        assert!(SampleType::F32.can_represent(f64::NAN));
    }

    #[test]
    fn test_transform_invert() {
        let t = AffineTransform::north_up(500_000.0, 4_200_000.0, 10.0, 10.0);
        let inv = t.invert().unwrap();
        let (x, y) = t.apply(12.5, 7.25);
        let (col, row) = inv.apply(x, y);
        assert!((col - 12.5).abs() < 1e-9);
        assert!((row - 7.25).abs() < 1e-9);

        let rotated = AffineTransform::from_gdal([100.0, 2.0, 0.5, 200.0, 0.25, -3.0]);
        let inv = rotated.invert().unwrap();
        let (x, y) = rotated.apply(4.0, 9.0);
        let (col, row) = inv.apply(x, y);
        assert!((col - 4.0).abs() < 1e-9);
        assert!((row - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_transform_has_no_inverse() {
        let t = AffineTransform::from_gdal([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(t.invert().is_none());
    }

    #[test]
    fn test_footprint_and_resolution() {
        let t = AffineTransform::north_up(10.0, 50.0, 2.0, 4.0);
        let rect = t.footprint(5, 3);
        assert_eq!(rect, Rect::new(10.0, 38.0, 20.0, 50.0));
        assert_eq!(t.resolution(), 3.0);
    }

    #[test]
    fn test_rect_intersection_excludes_touching() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert!(a.intersection(&b).is_none());

        let c = Rect::new(5.0, 5.0, 15.0, 15.0);
        let i = a.intersection(&c).unwrap();
        assert_eq!(i, Rect::new(5.0, 5.0, 10.0, 10.0));
        assert_eq!(i.area(), 25.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn test_crs_equals() {
        assert!(crs_equals(&CrsToken::epsg(32610), &CrsToken::from_text("epsg: 32610")));
        assert!(!crs_equals(&CrsToken::epsg(32610), &CrsToken::epsg(32611)));
        assert!(crs_equals(&CrsToken::undefined(), &CrsToken::from_text("  ")));
        assert_eq!(CrsToken::from_text("EPSG:4326").epsg_code(), Some(4326));
        assert_eq!(CrsToken::from_text("WGS 84").epsg_code(), None);
    }
}
