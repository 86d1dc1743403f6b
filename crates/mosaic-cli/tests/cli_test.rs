//! Command-level tests: parse real argument lists and run them against
//! GeoTIFF files in a scratch directory.

use clap::Parser;
use mosaic_cli::{run, Cli, CliError};
use mosaic_engine::{CancelFlag, GeoTiffIo, MergeError};
use mosaic_raster::{
    read_raster, AffineTransform, CrsToken, GeoTiffWriter, OutputRaster, SampleBuffer, SampleType,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_tile(dir: &Path, name: &str, origin_x: f64, crs: CrsToken, values: &[f64]) -> PathBuf {
    let path = dir.join(name);
    let raster = OutputRaster {
        width: 2,
        height: values.len() as u32 / 2,
        bands: 1,
        transform: AffineTransform::north_up(origin_x, 200.0, 100.0, 100.0),
        crs,
        nodata: Some(0.0),
        buffer: SampleBuffer::from_f64(SampleType::U16, values),
    };
    GeoTiffWriter::new(&raster).write(&path).expect("Failed to write tile");
    path
}

fn tiles(dir: &Path) -> (PathBuf, PathBuf) {
    (
        write_tile(dir, "west.tif", 0.0, CrsToken::epsg(32633), &[1.0, 2.0, 3.0, 4.0]),
        write_tile(dir, "east.tif", 100.0, CrsToken::epsg(32633), &[10.0, 20.0, 30.0, 40.0]),
    )
}

fn run_args(args: &[&str]) -> (Result<(), CliError>, String) {
    let cli = Cli::try_parse_from(args).expect("Failed to parse arguments");
    let mut out = Vec::new();
    let result = run(&GeoTiffIo::new(), &cli, &CancelFlag::new(), &mut out);
    (result, String::from_utf8(out).expect("Output is not UTF-8"))
}

fn s(path: &Path) -> &str {
    path.to_str().expect("Non UTF-8 temp path")
}

#[test]
fn test_info_lists_sources() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (west, east) = tiles(dir.path());

    let (result, text) = run_args(&["mosaic", "info", s(&west), s(&east)]);
    result.expect("info failed");
    assert!(text.contains("CRS:         EPSG:32633"));
    assert!(text.contains("Sample type: uint16"));
    assert!(text.contains("Nodata:      0"));

    let (result, text) = run_args(&["mosaic", "info", "--json", s(&west)]);
    result.expect("info failed");
    let json: serde_json::Value = serde_json::from_str(&text).expect("Invalid JSON");
    assert_eq!(json[0]["width"], 2);
    assert_eq!(json[0]["resolution"], 100.0);
}

#[test]
fn test_analyze_reports_overlap() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (west, east) = tiles(dir.path());

    let (result, text) = run_args(&["mosaic", "analyze", s(&west), s(&east)]);
    result.expect("analyze failed");
    assert!(text.contains("Output size:    3 x 2 (6 pixels per band)"));
    assert!(text.contains("0 <-> 1"));

    let (result, text) = run_args(&["mosaic", "analyze", "--json", "--resolution", "50", s(&west)]);
    result.expect("analyze failed");
    let json: serde_json::Value = serde_json::from_str(&text).expect("Invalid JSON");
    assert_eq!(json["plan"]["width"], 4);
    assert_eq!(json["plan"]["height"], 4);
}

#[test]
fn test_analyze_sample_budget_flag() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (west, east) = tiles(dir.path());

    // 3 x 2 output, one band
    let (result, _) = run_args(&["mosaic", "analyze", "--max-samples", "5", s(&west), s(&east)]);
    assert!(matches!(
        result,
        Err(CliError::Merge(MergeError::OutputTooManySamples { samples: 6, max: 5 }))
    ));

    let (result, _) = run_args(&["mosaic", "analyze", "--max-samples", "6", s(&west), s(&east)]);
    result.expect("analyze failed");
}

#[test]
fn test_merge_writes_output_and_report() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (west, east) = tiles(dir.path());
    let output = dir.path().join("out").join("mosaic");
    let report = dir.path().join("report.json");

    let (result, text) = run_args(&[
        "mosaic",
        "merge",
        s(&west),
        s(&east),
        "--output",
        s(&output),
        "--rule",
        "max",
        "--dtype",
        "uint16",
        "--report",
        s(&report),
    ]);
    result.expect("merge failed");

    let written = dir.path().join("out").join("mosaic.tif");
    assert!(text.contains("Wrote"));
    let merged = read_raster(&written).expect("Failed to read output");
    assert_eq!((merged.header.width, merged.header.height), (3, 2));
    assert_eq!(merged.header.nodata, Some(0.0));
    assert_eq!(merged.data(), &[1.0, 10.0, 20.0, 3.0, 30.0, 40.0]);

    let text = std::fs::read_to_string(&report).expect("Missing report");
    let json: serde_json::Value = serde_json::from_str(&text).expect("Invalid JSON");
    assert_eq!(json["rule"], "max");
    assert_eq!(json["width"], 3);
    assert!(json["generated_at"].is_string());
    assert_eq!(json["coverage"]["overlaps"][0]["percent"], 50.0);
}

#[test]
fn test_merge_from_job_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (west, east) = tiles(dir.path());
    let job = dir.path().join("job.yaml");
    let output = dir.path().join("sum.tif");
    std::fs::write(
        &job,
        format!(
            "sources:\n  - {}\n  - {}\noutput: {}\nrule: sum\noutput_type: float32\nnodata: none\n",
            s(&west),
            s(&east),
            s(&output)
        ),
    )
    .expect("Failed to write job file");

    let (result, _) = run_args(&["mosaic", "merge", "--job", s(&job), "--compression", "none"]);
    result.expect("merge failed");
    let merged = read_raster(&output).expect("Failed to read output");
    assert_eq!(merged.header.sample_type, SampleType::F32);
    assert_eq!(merged.header.nodata, None);
    assert_eq!(merged.data(), &[1.0, 12.0, 20.0, 3.0, 34.0, 40.0]);
}

#[test]
fn test_crs_mismatch_fails_without_output() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let west = write_tile(dir.path(), "west.tif", 0.0, CrsToken::epsg(32633), &[1.0; 4]);
    let other = write_tile(dir.path(), "other.tif", 100.0, CrsToken::epsg(4326), &[1.0; 4]);
    let output = dir.path().join("bad.tif");

    let (result, _) = run_args(&["mosaic", "merge", s(&west), s(&other), "-o", s(&output)]);
    assert!(matches!(
        result,
        Err(CliError::Merge(MergeError::CrsMismatch { index: 1, .. }))
    ));
    assert!(!output.exists());
}

#[test]
fn test_missing_input_names_path() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let missing = dir.path().join("nope.tif");
    let (result, _) = run_args(&["mosaic", "info", s(&missing)]);
    let err = result.unwrap_err();
    assert!(err.to_string().contains("nope.tif"));
}
