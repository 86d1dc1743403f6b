//! GeoTIFF encoding.

use crate::reader::{
    geo_tag, GDAL_NODATA, GEOGRAPHIC_TYPE_KEY, GEO_ASCII_PARAMS, GEO_KEY_DIRECTORY,
    GT_CITATION_KEY, GT_MODEL_TYPE_KEY, GT_RASTER_TYPE_KEY, MODEL_PIXEL_SCALE, MODEL_TIEPOINT,
    MODEL_TRANSFORMATION, PROJECTED_CS_TYPE_KEY, RASTER_PIXEL_IS_AREA,
};
use crate::{CrsToken, OutputRaster, RasterError, Result};
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use std::str::FromStr;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

/// File extension used for GeoTIFF output.
pub const GEOTIFF_EXTENSION: &str = "tif";

/// Target size of one uncompressed strip.
const STRIP_BYTES: usize = 256 * 1024;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// Strip compression scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Uncompressed strips.
    None,
    /// LZW (TIFF compression 5).
    #[default]
    Lzw,
    /// zlib Deflate (TIFF compression 8).
    Deflate,
}

impl Compression {
    /// TIFF `Compression` tag value.
    pub const fn tiff_code(&self) -> u16 {
        match self {
            Compression::None => 1,
            Compression::Lzw => 5,
            Compression::Deflate => 8,
        }
    }

    fn compress(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data),
            Compression::Lzw => {
                weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
                    .encode(&data)
                    .map_err(|e| RasterError::Compression(e.to_string()))
            }
            Compression::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&data)?;
                Ok(encoder.finish()?)
            }
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compression::None => "none",
            Compression::Lzw => "lzw",
            Compression::Deflate => "deflate",
        })
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "lzw" => Ok(Compression::Lzw),
            "deflate" | "zlib" => Ok(Compression::Deflate),
            _ => Err(format!(
                "unknown compression '{}' (expected none, lzw or deflate)",
                s
            )),
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Strip compression.
    pub compression: Compression,
}

/// Encodes an [`OutputRaster`] as a single-image, strip-organised GeoTIFF.
///
/// Samples are stored pixel-interleaved. Georeferencing is written as
/// ModelTiepoint + ModelPixelScale for north-up transforms and as
/// ModelTransformation otherwise; the no-data value goes into the GDAL_NODATA
/// tag.
#[derive(Debug, Clone)]
pub struct GeoTiffWriter<'a> {
    raster: &'a OutputRaster,
    options: WriteOptions,
}

impl<'a> GeoTiffWriter<'a> {
    /// Writer with default options.
    pub fn new(raster: &'a OutputRaster) -> Self {
        Self {
            raster,
            options: WriteOptions::default(),
        }
    }

    /// Replace all options.
    pub fn options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the strip compression.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.options.compression = compression;
        self
    }

    /// Encode into a new file at `path`, replacing any existing file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let encode = || -> Result<()> {
            let mut out = BufWriter::new(File::create(path)?);
            self.write_to(&mut out)?;
            out.flush()?;
            Ok(())
        };
        encode().map_err(|e| RasterError::writing(path, e))?;
        debug!(
            path = %path.display(),
            width = self.raster.width,
            height = self.raster.height,
            compression = %self.options.compression,
            "wrote GeoTIFF"
        );
        Ok(())
    }

    /// Encode into any seekable sink.
    pub fn write_to<W: Write + Seek>(&self, sink: W) -> Result<()> {
        let raster = self.raster;
        raster.check_size()?;

        let sample_type = raster.sample_type();
        let bands = raster.bands;
        let bytes_per_sample = sample_type.bits() as usize / 8;
        let row_bytes = raster.width as usize * bands * bytes_per_sample;
        let rows_per_strip = (STRIP_BYTES / row_bytes.max(1)).clamp(1, raster.height as usize);

        let mut encoder = TiffEncoder::new(sink)?;
        let mut dir = encoder.new_directory()?;

        let mut offsets = Vec::new();
        let mut byte_counts = Vec::new();
        let pixels = raster.width as usize * raster.height as usize;
        let mut row = 0usize;
        while row < raster.height as usize {
            let rows = rows_per_strip.min(raster.height as usize - row);
            let first = row * raster.width as usize;
            let last = first + rows * raster.width as usize;

            let mut strip = Vec::with_capacity(rows * row_bytes);
            for pixel in first..last {
                for band in 0..bands {
                    raster.buffer.push_ne_bytes(band * pixels + pixel, &mut strip);
                }
            }
            let strip = self.options.compression.compress(strip)?;

            let offset = dir.write_data(strip.as_slice())?;
            offsets.push(to_u32(offset, "strip offset")?);
            byte_counts.push(to_u32(strip.len() as u64, "strip size")?);
            row += rows;
        }

        dir.write_tag(Tag::ImageWidth, raster.width)?;
        dir.write_tag(Tag::ImageLength, raster.height)?;
        dir.write_tag(Tag::BitsPerSample, &vec![sample_type.bits(); bands][..])?;
        dir.write_tag(Tag::Compression, self.options.compression.tiff_code())?;
        // MinIsBlack
        dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
        dir.write_tag(Tag::StripOffsets, offsets.as_slice())?;
        dir.write_tag(Tag::SamplesPerPixel, to_u16(bands)?)?;
        dir.write_tag(Tag::RowsPerStrip, to_u32(rows_per_strip as u64, "rows per strip")?)?;
        dir.write_tag(Tag::StripByteCounts, byte_counts.as_slice())?;
        // Chunky
        dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
        if bands > 1 {
            // Unspecified extra samples
            dir.write_tag(Tag::ExtraSamples, &vec![0u16; bands - 1][..])?;
        }
        dir.write_tag(
            Tag::SampleFormat,
            &vec![sample_type.tiff_sample_format(); bands][..],
        )?;

        let t = &raster.transform;
        if t.is_north_up() && t.pixel_width > 0.0 && t.pixel_height < 0.0 {
            dir.write_tag(
                geo_tag(MODEL_PIXEL_SCALE),
                &[t.pixel_width, -t.pixel_height, 0.0][..],
            )?;
            dir.write_tag(
                geo_tag(MODEL_TIEPOINT),
                &[0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0][..],
            )?;
        } else {
            #[rustfmt::skip]
            let matrix = [
                t.pixel_width, t.row_rotation, 0.0, t.origin_x,
                t.col_rotation, t.pixel_height, 0.0, t.origin_y,
                0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ];
            dir.write_tag(geo_tag(MODEL_TRANSFORMATION), &matrix[..])?;
        }

        let (directory, ascii) = geo_key_directory(&raster.crs);
        dir.write_tag(geo_tag(GEO_KEY_DIRECTORY), directory.as_slice())?;
        if let Some(ascii) = ascii {
            dir.write_tag(geo_tag(GEO_ASCII_PARAMS), ascii.as_str())?;
        }
        if let Some(nodata) = raster.nodata {
            dir.write_tag(geo_tag(GDAL_NODATA), format_nodata(nodata).as_str())?;
        }

        dir.finish()?;
        Ok(())
    }
}

/// GeoKeyDirectory contents plus the GeoAsciiParams string they reference.
fn geo_key_directory(crs: &CrsToken) -> (Vec<u16>, Option<String>) {
    let mut keys: Vec<[u16; 4]> = Vec::new();
    let mut ascii = None;

    match crs.epsg_code() {
        Some(code) if (4000..5000).contains(&code) => {
            keys.push([GT_MODEL_TYPE_KEY, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
            keys.push([GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.push([GEOGRAPHIC_TYPE_KEY, 0, 1, code]);
        }
        Some(code) => {
            keys.push([GT_MODEL_TYPE_KEY, 0, 1, MODEL_TYPE_PROJECTED]);
            keys.push([GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.push([PROJECTED_CS_TYPE_KEY, 0, 1, code]);
        }
        None if crs.is_defined() => {
            let text = format!("{}|", crs.as_str().trim());
            keys.push([GT_MODEL_TYPE_KEY, 0, 1, USER_DEFINED]);
            keys.push([GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.push([
                GT_CITATION_KEY,
                GEO_ASCII_PARAMS,
                u16::try_from(text.len()).unwrap_or(u16::MAX),
                0,
            ]);
            ascii = Some(text);
        }
        None => keys.push([GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA]),
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    (directory, ascii)
}

/// GDAL_NODATA text for a value; integral values print without a fraction.
fn format_nodata(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{}", value)
    }
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        RasterError::UnsupportedLayout(format!(
            "{} {} exceeds the classic TIFF 4 GiB limit",
            what, value
        ))
    })
}

fn to_u16(bands: usize) -> Result<u16> {
    u16::try_from(bands).map_err(|_| {
        RasterError::UnsupportedLayout(format!("{} bands is too many for TIFF", bands))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_parse_and_display() {
        assert_eq!("LZW".parse::<Compression>().unwrap(), Compression::Lzw);
        assert_eq!("deflate".parse::<Compression>().unwrap(), Compression::Deflate);
        assert_eq!("none".parse::<Compression>().unwrap(), Compression::None);
        assert!("jpeg".parse::<Compression>().is_err());
        assert_eq!(Compression::default(), Compression::Lzw);
        assert_eq!(Compression::Deflate.to_string(), "deflate");
    }

    #[test]
    fn test_geo_keys_for_projected_and_geographic() {
        let (dir, ascii) = geo_key_directory(&CrsToken::epsg(32633));
        assert_eq!(dir[3], 3);
        assert!(dir.chunks(4).any(|k| k == [PROJECTED_CS_TYPE_KEY, 0, 1, 32633]));
        assert!(ascii.is_none());

        let (dir, _) = geo_key_directory(&CrsToken::epsg(4326));
        assert!(dir.chunks(4).any(|k| k == [GEOGRAPHIC_TYPE_KEY, 0, 1, 4326]));
        assert!(dir.chunks(4).any(|k| k == [GT_MODEL_TYPE_KEY, 0, 1, MODEL_TYPE_GEOGRAPHIC]));
    }

    #[test]
    fn test_geo_keys_for_free_text_crs() {
        let (dir, ascii) = geo_key_directory(&CrsToken::from_text("Local grid"));
        assert_eq!(ascii.as_deref(), Some("Local grid|"));
        assert!(dir.chunks(4).any(|k| k == [GT_CITATION_KEY, GEO_ASCII_PARAMS, 11, 0]));
    }

    #[test]
    fn test_nodata_text() {
        assert_eq!(format_nodata(-9999.0), "-9999");
        assert_eq!(format_nodata(0.5), "0.5");
        assert_eq!(format_nodata(f64::NAN), "nan");
    }

    #[test]
    fn test_lzw_and_deflate_shrink_repetitive_data() {
        let data = vec![7u8; 4096];
        assert!(Compression::Lzw.compress(data.clone()).unwrap().len() < 4096);
        assert!(Compression::Deflate.compress(data.clone()).unwrap().len() < 4096);
        assert_eq!(Compression::None.compress(data.clone()).unwrap(), data);
    }
}
