//! Source descriptors.

use mosaic_raster::{AffineTransform, CrsToken, RasterHeader, Rect, SampleType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Read-only metadata snapshot of one input raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Where the raster lives; also its identity in the [`crate::RasterIo`].
    pub path: PathBuf,
    /// Coordinate reference system.
    pub crs: CrsToken,
    /// Pixel-to-world transform.
    pub transform: AffineTransform,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of bands.
    pub bands: usize,
    /// Sample type of every band.
    pub sample_type: SampleType,
    /// No-data value, if the raster declares one.
    pub nodata: Option<f64>,
}

impl SourceDescriptor {
    /// Single-band `float32` source without CRS or nodata; adjust with the
    /// `with_*` methods.
    pub fn new(
        path: impl Into<PathBuf>,
        transform: AffineTransform,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            path: path.into(),
            crs: CrsToken::undefined(),
            transform,
            width,
            height,
            bands: 1,
            sample_type: SampleType::F32,
            nodata: None,
        }
    }

    /// Descriptor for a raster whose header has already been read.
    pub fn from_header(path: impl AsRef<Path>, header: &RasterHeader) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            crs: header.crs.clone(),
            transform: header.transform,
            width: header.width,
            height: header.height,
            bands: header.bands,
            sample_type: header.sample_type,
            nodata: header.nodata,
        }
    }

    /// Set the CRS.
    pub fn with_crs(mut self, crs: CrsToken) -> Self {
        self.crs = crs;
        self
    }

    /// Set the band count.
    pub fn with_bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    /// Set the sample type.
    pub fn with_sample_type(mut self, sample_type: SampleType) -> Self {
        self.sample_type = sample_type;
        self
    }

    /// Set the no-data value.
    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    /// World-space rectangle the source covers.
    pub fn footprint(&self) -> Rect {
        self.transform.footprint(self.width, self.height)
    }

    /// Mean absolute pixel size in world units.
    pub fn resolution(&self) -> f64 {
        self.transform.resolution()
    }

    /// The header this descriptor was (or could have been) built from.
    pub fn header(&self) -> RasterHeader {
        RasterHeader {
            width: self.width,
            height: self.height,
            bands: self.bands,
            sample_type: self.sample_type,
            nodata: self.nodata,
            transform: self.transform,
            crs: self.crs.clone(),
        }
    }

    /// File name for display, falling back to the full path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_and_resolution() {
        let src = SourceDescriptor::new(
            "a.tif",
            AffineTransform::from_gdal([100.0, 2.0, 0.0, 50.0, 0.0, -4.0]),
            10,
            5,
        );
        assert_eq!(src.footprint(), Rect::new(100.0, 30.0, 120.0, 50.0));
        assert_eq!(src.resolution(), 3.0);
        assert_eq!(src.display_name(), "a.tif");
    }

    #[test]
    fn test_header_round_trip() {
        let transform = AffineTransform::north_up(0.0, 10.0, 1.0, 1.0);
        let src = SourceDescriptor::new("dir/b.tif", transform, 10, 10)
            .with_crs(CrsToken::epsg(3857))
            .with_bands(3)
            .with_sample_type(SampleType::U8)
            .with_nodata(Some(0.0));
        let again = SourceDescriptor::from_header("dir/b.tif", &src.header());
        assert_eq!(again, src);
        assert_eq!(again.display_name(), "b.tif");
    }
}
