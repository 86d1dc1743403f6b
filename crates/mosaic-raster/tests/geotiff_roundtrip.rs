//! Integration tests for GeoTIFF encoding and decoding.

use mosaic_raster::{
    read_header, read_raster, resample, AffineTransform, AlignedSample, Compression, CrsToken,
    GeoTiffWriter, GridSpec, OutputRaster, RasterError, ResamplingKernel, SampleBuffer,
    SampleType,
};
use tempfile::TempDir;

fn output(sample_type: SampleType, bands: usize, values: &[f64]) -> OutputRaster {
    OutputRaster {
        width: 3,
        height: 2,
        bands,
        transform: AffineTransform::north_up(500_000.0, 4_100_000.0, 30.0, 30.0),
        crs: CrsToken::epsg(32611),
        nodata: Some(-9999.0),
        buffer: SampleBuffer::from_f64(sample_type, values),
    }
}

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn test_header_round_trip() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("dem.tif");

    let raster = output(SampleType::I16, 1, &[1.0, 2.0, 3.0, 4.0, 5.0, -9999.0]);
    GeoTiffWriter::new(&raster)
        .write(&path)
        .expect("Failed to write GeoTIFF");

    let header = read_header(&path).expect("Failed to read header");
    assert_eq!(header.width, 3);
    assert_eq!(header.height, 2);
    assert_eq!(header.bands, 1);
    assert_eq!(header.sample_type, SampleType::I16);
    assert_eq!(header.nodata, Some(-9999.0));
    assert_eq!(header.crs, CrsToken::epsg(32611));
    assert_eq!(header.transform, raster.transform);
    assert_eq!(header.resolution(), 30.0);
}

#[test]
fn test_geographic_and_free_text_crs() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let mut raster = output(SampleType::U8, 1, &[0.0; 6]);
    raster.crs = CrsToken::epsg(4326);
    raster.nodata = None;
    let path = dir.path().join("wgs84.tif");
    GeoTiffWriter::new(&raster).write(&path).expect("write");
    let header = read_header(&path).expect("read");
    assert_eq!(header.crs, CrsToken::epsg(4326));
    assert_eq!(header.nodata, None);

    raster.crs = CrsToken::from_text("Site grid 7");
    let path = dir.path().join("local.tif");
    GeoTiffWriter::new(&raster).write(&path).expect("write");
    assert_eq!(read_header(&path).expect("read").crs, CrsToken::from_text("Site grid 7"));
}

#[test]
fn test_rotated_transform_uses_model_transformation() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("rotated.tif");

    let mut raster = output(SampleType::F32, 1, &[0.5; 6]);
    raster.transform = AffineTransform::from_gdal([100.0, 2.0, 0.5, 200.0, 0.25, -2.0]);
    GeoTiffWriter::new(&raster).write(&path).expect("write");

    let header = read_header(&path).expect("read");
    assert_eq!(header.transform, raster.transform);
}

// ============================================================================
// Pixels
// ============================================================================

#[test]
fn test_pixels_round_trip_for_every_compression() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let values = [10.5, -2.25, 3.0, 1.0e6, 0.0, -9999.0];

    for compression in [Compression::None, Compression::Lzw, Compression::Deflate] {
        let path = dir.path().join(format!("pixels_{}.tif", compression));
        let raster = output(SampleType::F64, 1, &values);
        GeoTiffWriter::new(&raster)
            .compression(compression)
            .write(&path)
            .expect("write");

        let decoded = read_raster(&path).expect("read");
        assert_eq!(decoded.data(), &values, "compression {}", compression);
        assert_eq!(decoded.value(0, 2, 1), None, "nodata should be masked");
    }
}

#[test]
fn test_multiband_layout_is_band_major() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("rgb.tif");

    // Band-major: three bands of six pixels
    let values: Vec<f64> = (0..18).map(|v| v as f64).collect();
    let raster = output(SampleType::U16, 3, &values);
    GeoTiffWriter::new(&raster).write(&path).expect("write");

    let decoded = read_raster(&path).expect("read");
    assert_eq!(decoded.header.bands, 3);
    assert_eq!(decoded.band(0), &values[0..6]);
    assert_eq!(decoded.band(2), &values[12..18]);
    assert_eq!(decoded.value(1, 1, 1), Some(10.0));
}

#[test]
fn test_multiband_pixels_for_every_type_and_compression() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let values: Vec<f64> = (0..12).map(|v| v as f64 * 3.0 - 7.0).collect();

    for sample_type in [SampleType::U8, SampleType::I16, SampleType::F32, SampleType::F64] {
        for compression in [Compression::None, Compression::Lzw, Compression::Deflate] {
            let path = dir
                .path()
                .join(format!("bands_{}_{}.tif", sample_type, compression));
            let raster = output(sample_type, 2, &values);
            GeoTiffWriter::new(&raster)
                .compression(compression)
                .write(&path)
                .expect("write");

            let decoded = read_raster(&path).expect("read");
            let expected: Vec<f64> = values.iter().map(|&v| sample_type.narrow(v)).collect();
            assert_eq!(decoded.header.bands, 2);
            assert_eq!(decoded.data(), expected.as_slice(), "{} {}", sample_type, compression);
        }
    }
}

#[test]
fn test_resample_decoded_raster() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("coarse.tif");

    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    GeoTiffWriter::new(&output(SampleType::U8, 1, &values))
        .write(&path)
        .expect("write");
    let raster = read_raster(&path).expect("read");

    // 90 x 60 m footprint at 60 m: 2 x 1 cells, the second overhanging east
    let grid = GridSpec::covering(&raster.header.footprint(), 60.0).expect("grid");
    assert_eq!((grid.width, grid.height), (2, 1));
    let aligned = resample(&raster, &grid, ResamplingKernel::Max).expect("resample");
    assert_eq!(aligned.get(0, 0, 0), AlignedSample::Value(5.0));
    // Cell centre sits on the eastern edge of the source
    assert_eq!(aligned.get(0, 1, 0), AlignedSample::Outside);
    assert_eq!(aligned.covered_pixels(), 1);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_file_carries_path() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("absent.tif");

    let err = read_header(&path).unwrap_err();
    match err {
        RasterError::Read { path: p, .. } => assert_eq!(p, path),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_wrong_buffer_size_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("short.tif");

    let raster = output(SampleType::U8, 1, &[1.0, 2.0]);
    let err = GeoTiffWriter::new(&raster).write(&path).unwrap_err();
    assert!(err.to_string().contains("expected 6"));
}
