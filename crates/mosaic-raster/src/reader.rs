//! GeoTIFF decoding.

use crate::{AffineTransform, CrsToken, Raster, RasterError, RasterHeader, Result, SampleType};
use flate2::read::ZlibDecoder;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tiff::decoder::{ChunkType, Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::debug;

// GeoTIFF tag IDs (not in the tiff crate's Tag enum)
pub(crate) const MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const MODEL_TIEPOINT: u16 = 33922;
pub(crate) const MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const GEO_ASCII_PARAMS: u16 = 34737;
pub(crate) const GDAL_NODATA: u16 = 42113;

/// Tag for a GeoTIFF/GDAL extension tag ID.
///
/// Goes through `from_u16_exhaustive` so IDs the tiff crate knows by name
/// resolve to their named variant and match decoded directory entries.
pub(crate) fn geo_tag(id: u16) -> Tag {
    Tag::from_u16_exhaustive(id)
}

// GeoKey IDs
pub(crate) const GT_MODEL_TYPE_KEY: u16 = 1024;
pub(crate) const GT_RASTER_TYPE_KEY: u16 = 1025;
pub(crate) const GT_CITATION_KEY: u16 = 1026;
pub(crate) const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
pub(crate) const PROJECTED_CS_TYPE_KEY: u16 = 3072;

// GeoKey values
pub(crate) const RASTER_PIXEL_IS_AREA: u16 = 1;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// Read only the metadata of a GeoTIFF file.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<RasterHeader> {
    let path = path.as_ref();
    open_decoder(path)
        .and_then(|mut decoder| decode_header(&mut decoder))
        .map_err(|e| RasterError::reading(path, e))
}

/// Read metadata and all pixels of a GeoTIFF file.
pub fn read_raster<P: AsRef<Path>>(path: P) -> Result<Raster> {
    let path = path.as_ref();
    let load = || -> Result<Raster> {
        let mut decoder = open_decoder(path)?;
        let header = decode_header(&mut decoder)?;
        let data = decode_samples(&mut decoder, path, &header)?;
        Raster::new(header, data)
    };
    let raster = load().map_err(|e| RasterError::reading(path, e))?;
    debug!(
        path = %path.display(),
        width = raster.width(),
        height = raster.height(),
        bands = raster.header.bands,
        sample_type = %raster.header.sample_type,
        "decoded raster"
    );
    Ok(raster)
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    let decoder = Decoder::new(BufReader::new(file))?;

    // Allow large mosaic sources; the tiff defaults stop at 256 MB
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.ifd_value_size = 1024 * 1024 * 1024;
    Ok(decoder.with_limits(limits))
}

fn decode_header<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<RasterHeader> {
    let (width, height) = decoder.dimensions()?;

    let bands = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1) as usize;
    if bands == 0 {
        return Err(RasterError::InvalidGeoTiff("SamplesPerPixel is zero".to_string()));
    }
    let planar = decoder.get_tag_u32(Tag::PlanarConfiguration).unwrap_or(1);
    if planar != 1 && bands > 1 {
        return Err(RasterError::UnsupportedLayout(
            "band-separate (planar) sample layout".to_string(),
        ));
    }

    let bits = first_or(decoder.get_tag_u32_vec(Tag::BitsPerSample).ok(), 8);
    let format = first_or(decoder.get_tag_u32_vec(Tag::SampleFormat).ok(), 1);
    let sample_type = SampleType::from_tiff(format, bits)
        .ok_or(RasterError::UnsupportedSampleType { format, bits })?;

    let geo_keys = decoder
        .get_tag_u16_vec(geo_tag(GEO_KEY_DIRECTORY))
        .map(|raw| GeoKeys::parse(&raw))
        .unwrap_or_default();

    let mut transform = read_transform(decoder)?;
    if geo_keys.get(GT_RASTER_TYPE_KEY) == Some(RASTER_PIXEL_IS_POINT) {
        // Tie points reference pixel centres; shift to the corner convention
        transform.origin_x -= 0.5 * (transform.pixel_width + transform.row_rotation);
        transform.origin_y -= 0.5 * (transform.col_rotation + transform.pixel_height);
    }

    let citation = decoder
        .get_tag_ascii_string(geo_tag(GEO_ASCII_PARAMS))
        .ok();
    let crs = geo_keys.crs(citation.as_deref());

    Ok(RasterHeader {
        width,
        height,
        bands,
        sample_type,
        nodata: read_nodata_value(decoder),
        transform,
        crs,
    })
}

fn first_or(values: Option<Vec<u32>>, default: u32) -> u32 {
    values.and_then(|v| v.first().copied()).unwrap_or(default)
}

/// Read the geotransform from ModelTransformation, falling back to
/// ModelTiepoint + ModelPixelScale.
fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<AffineTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(geo_tag(MODEL_TRANSFORMATION)) {
        if m.len() >= 8 {
            // Row-major 4x4 matrix; only the XY affine part is used
            return Ok(AffineTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
        }
    }

    let tiepoint = decoder.get_tag_f64_vec(geo_tag(MODEL_TIEPOINT));
    let pixel_scale = decoder.get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE));

    if let (Ok(tiepoint), Ok(scale)) = (tiepoint, pixel_scale) {
        if tiepoint.len() >= 6 && scale.len() >= 2 {
            // Tiepoint format: [i, j, k, x, y, z] where (i, j) is the raster
            // position tied to world (x, y)
            let (i, j) = (tiepoint[0], tiepoint[1]);
            let (x, y) = (tiepoint[3], tiepoint[4]);
            let (scale_x, scale_y) = (scale[0], scale[1]);
            return Ok(AffineTransform::north_up(
                x - i * scale_x,
                y + j * scale_y,
                scale_x,
                scale_y,
            ));
        }
    }

    Err(RasterError::InvalidGeoTiff(
        "missing ModelTransformation or ModelTiepoint/ModelPixelScale tags".to_string(),
    ))
}

/// Read the no-data value from the GDAL_NODATA ASCII tag.
fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(geo_tag(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\0').parse().ok())
}

/// Decode all samples and reorder them from pixel-interleaved to band-major.
fn decode_samples<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
    header: &RasterHeader,
) -> Result<Vec<f64>> {
    let interleaved = if header.bands == 1 {
        widen(decoder.read_image()?)
    } else {
        read_interleaved_strips(decoder, path, header)?
    };

    let expected = header.sample_count();
    if interleaved.len() != expected {
        return Err(RasterError::BufferSize {
            expected,
            actual: interleaved.len(),
        });
    }

    let bands = header.bands;
    if bands == 1 {
        return Ok(interleaved);
    }
    let pixels = header.pixel_count();
    let mut band_major = vec![0.0; expected];
    for (i, value) in interleaved.into_iter().enumerate() {
        let (pixel, band) = (i / bands, i % bands);
        band_major[band * pixels + pixel] = value;
    }
    Ok(band_major)
}

fn widen(result: DecodingResult) -> Vec<f64> {
    match result {
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F64(data) => data,
    }
}

/// Read multi-band chunky strips straight from the file.
///
/// The tiff decoder only expands multi-sample chunks for RGB, CMYK and YCbCr
/// photometrics, so grayscale rasters with extra samples (what GDAL and
/// [`crate::GeoTiffWriter`] produce) are decompressed and split here.
fn read_interleaved_strips<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
    header: &RasterHeader,
) -> Result<Vec<f64>> {
    if decoder.get_chunk_type() == ChunkType::Tile {
        return Err(RasterError::UnsupportedLayout(
            "tiled multi-band layout".to_string(),
        ));
    }
    let predictor = decoder.find_tag_unsigned::<u16>(Tag::Predictor)?.unwrap_or(1);
    if predictor != 1 {
        return Err(RasterError::UnsupportedLayout(format!(
            "predictor {} on a multi-band raster",
            predictor
        )));
    }
    let compression = decoder.find_tag_unsigned::<u16>(Tag::Compression)?.unwrap_or(1);
    let offsets = decoder.get_tag_u64_vec(Tag::StripOffsets)?;
    let byte_counts = decoder.get_tag_u64_vec(Tag::StripByteCounts)?;
    if offsets.len() != byte_counts.len() {
        return Err(RasterError::InvalidGeoTiff(format!(
            "{} strip offsets but {} strip byte counts",
            offsets.len(),
            byte_counts.len()
        )));
    }

    let sample_bytes = header.sample_type.bits() as usize / 8;
    let expected_bytes = header.sample_count() * sample_bytes;

    let mut file = BufReader::new(File::open(path)?);
    let mut magic = [0u8; 2];
    file.read_exact(&mut magic)?;
    let big_endian = match &magic {
        b"II" => false,
        b"MM" => true,
        _ => return Err(RasterError::InvalidGeoTiff("bad byte-order mark".to_string())),
    };

    let mut bytes = Vec::with_capacity(expected_bytes);
    for (&offset, &count) in offsets.iter().zip(&byte_counts) {
        let len = usize::try_from(count)
            .map_err(|_| RasterError::InvalidGeoTiff(format!("strip of {} bytes", count)))?;
        let mut raw = vec![0u8; len];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut raw)?;
        bytes.extend(decompress(compression, raw)?);
        if bytes.len() >= expected_bytes {
            break;
        }
    }
    if bytes.len() < expected_bytes {
        return Err(RasterError::BufferSize {
            expected: header.sample_count(),
            actual: bytes.len() / sample_bytes,
        });
    }
    bytes.truncate(expected_bytes);

    Ok(bytes
        .chunks_exact(sample_bytes)
        .map(|sample| header.sample_type.decode(sample, big_endian))
        .collect())
}

fn decompress(compression: u16, raw: Vec<u8>) -> Result<Vec<u8>> {
    match compression {
        1 => Ok(raw),
        5 => weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
            .decode(&raw)
            .map_err(|e| RasterError::Compression(e.to_string())),
        // Adobe Deflate and the old PKZIP code share zlib framing
        8 | 32946 => {
            let mut out = Vec::new();
            ZlibDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
            Ok(out)
        }
        other => Err(RasterError::UnsupportedLayout(format!(
            "compression {} on a multi-band raster",
            other
        ))),
    }
}

/// Parsed GeoKeyDirectory entries that carry inline SHORT values.
#[derive(Debug, Default)]
struct GeoKeys {
    entries: Vec<(u16, u16, u16, u16)>,
}

impl GeoKeys {
    fn parse(raw: &[u16]) -> Self {
        // Header: [version, revision, minor, count], then 4 SHORTs per key
        let count = raw.get(3).copied().unwrap_or(0) as usize;
        let entries = raw
            .get(4..)
            .unwrap_or(&[])
            .chunks_exact(4)
            .take(count)
            .map(|k| (k[0], k[1], k[2], k[3]))
            .collect();
        GeoKeys { entries }
    }

    /// Inline value of a key (TIFFTagLocation 0).
    fn get(&self, key: u16) -> Option<u16> {
        self.entries
            .iter()
            .find(|(id, location, _, _)| *id == key && *location == 0)
            .map(|(_, _, _, value)| *value)
    }

    /// ASCII citation referenced by a key, sliced out of GeoAsciiParams.
    fn ascii<'a>(&self, key: u16, params: &'a str) -> Option<&'a str> {
        let (_, _, count, offset) = self
            .entries
            .iter()
            .find(|(id, location, _, _)| *id == key && *location == GEO_ASCII_PARAMS)?;
        let start = *offset as usize;
        let end = (start + *count as usize).min(params.len());
        params
            .get(start..end)
            .map(|s| s.trim_end_matches(['|', '\0']).trim())
            .filter(|s| !s.is_empty())
    }

    fn crs(&self, ascii_params: Option<&str>) -> CrsToken {
        for key in [PROJECTED_CS_TYPE_KEY, GEOGRAPHIC_TYPE_KEY] {
            if let Some(code) = self.get(key) {
                if code != 0 && code != USER_DEFINED {
                    return CrsToken::epsg(code);
                }
            }
        }
        ascii_params
            .and_then(|params| self.ascii(GT_CITATION_KEY, params))
            .map(CrsToken::from_text)
            .unwrap_or_else(CrsToken::undefined)
    }
}
