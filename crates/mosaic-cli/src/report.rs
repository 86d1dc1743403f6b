//! Text and JSON renderings of engine results.

use chrono::{DateTime, Utc};
use mosaic_engine::{
    Compression, CoverageReport, MergeResult, MergeRule, MergeWarning, ResamplingKernel,
    ResolutionPolicy, SampleType, SourceDescriptor, SpatialPlan,
};
use mosaic_raster::Rect;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// One source as printed by `mosaic info`.
#[derive(Debug, Serialize)]
pub struct SourceSummary<'a> {
    pub path: &'a Path,
    pub crs: String,
    pub width: u32,
    pub height: u32,
    pub bands: usize,
    pub sample_type: SampleType,
    pub nodata: Option<f64>,
    pub resolution: f64,
    pub bounds: Rect,
}

impl<'a> From<&'a SourceDescriptor> for SourceSummary<'a> {
    fn from(source: &'a SourceDescriptor) -> Self {
        Self {
            path: &source.path,
            crs: source.crs.to_string(),
            width: source.width,
            height: source.height,
            bands: source.bands,
            sample_type: source.sample_type,
            nodata: source.nodata,
            resolution: source.resolution(),
            bounds: source.footprint(),
        }
    }
}

/// JSON document written by `mosaic merge --report`.
#[derive(Debug, Serialize)]
pub struct MergeReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub sources: Vec<&'a Path>,
    pub output: &'a Path,
    pub rule: MergeRule,
    pub kernel: ResamplingKernel,
    pub resolution: ResolutionPolicy,
    pub compression: Compression,
    pub sample_type: SampleType,
    pub width: u32,
    pub height: u32,
    pub bands: usize,
    pub nodata: Option<f64>,
    pub plan: &'a SpatialPlan,
    pub coverage: &'a CoverageReport,
    pub warnings: &'a [MergeWarning],
}

/// Settings echoed into a [`MergeReport`].
#[derive(Debug, Clone, Copy)]
pub struct ReportSettings {
    pub rule: MergeRule,
    pub kernel: ResamplingKernel,
    pub resolution: ResolutionPolicy,
    pub compression: Compression,
}

impl<'a> MergeReport<'a> {
    pub fn new(sources: &'a [PathBuf], settings: ReportSettings, result: &'a MergeResult) -> Self {
        Self {
            generated_at: Utc::now(),
            sources: sources.iter().map(PathBuf::as_path).collect(),
            output: &result.output,
            rule: settings.rule,
            kernel: settings.kernel,
            resolution: settings.resolution,
            compression: settings.compression,
            sample_type: result.sample_type,
            width: result.width,
            height: result.height,
            bands: result.bands,
            nodata: result.nodata,
            plan: &result.plan,
            coverage: &result.coverage,
            warnings: &result.warnings,
        }
    }
}

fn nodata_text(nodata: Option<f64>) -> String {
    nodata.map_or_else(|| "none".to_string(), |v| v.to_string())
}

pub fn write_source(out: &mut impl Write, summary: &SourceSummary<'_>) -> io::Result<()> {
    writeln!(out, "{}", summary.path.display())?;
    writeln!(out, "  CRS:         {}", summary.crs)?;
    writeln!(
        out,
        "  Size:        {} x {} pixels, {} band(s)",
        summary.width, summary.height, summary.bands
    )?;
    writeln!(out, "  Sample type: {}", summary.sample_type)?;
    writeln!(out, "  Nodata:      {}", nodata_text(summary.nodata))?;
    writeln!(out, "  Resolution:  {}", summary.resolution)?;
    writeln!(out, "  Bounds:      {}", summary.bounds)
}

pub fn write_coverage(
    out: &mut impl Write,
    sources: usize,
    report: &CoverageReport,
) -> io::Result<()> {
    let plan = &report.plan;
    writeln!(out, "Sources:        {}", sources)?;
    writeln!(out, "Output bounds:  {}", plan.bounds)?;
    writeln!(
        out,
        "Resolution:     {} (source range {} to {})",
        plan.resolution, report.finest_resolution, report.coarsest_resolution
    )?;
    writeln!(
        out,
        "Output size:    {} x {} ({} pixels per band)",
        plan.width,
        plan.height,
        report.estimated_pixels()
    )?;
    writeln!(out, "Coverage ratio: {:.3}", report.coverage_ratio)?;

    if report.overlaps.is_empty() {
        writeln!(out, "Overlaps:       none")?;
    } else {
        writeln!(out, "Overlaps:")?;
        for pair in &report.overlaps {
            writeln!(
                out,
                "  {} <-> {}: area {:.2} ({:.1}% of source {})",
                pair.first, pair.second, pair.area, pair.percent, pair.first
            )?;
        }
    }
    write_warnings(out, &report.warnings)
}

pub fn write_merge(out: &mut impl Write, result: &MergeResult) -> io::Result<()> {
    writeln!(out, "Wrote {}", result.output.display())?;
    writeln!(
        out,
        "  {} x {} pixels, {} band(s), {}, nodata {}",
        result.width,
        result.height,
        result.bands,
        result.sample_type,
        nodata_text(result.nodata)
    )?;
    write_warnings(out, &result.warnings)
}

fn write_warnings(out: &mut impl Write, warnings: &[MergeWarning]) -> io::Result<()> {
    if warnings.is_empty() {
        return Ok(());
    }
    writeln!(out, "Warnings:")?;
    for warning in warnings {
        let level = if warning.is_info() { "info" } else { "warning" };
        writeln!(out, "  [{}] {}", level, warning)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_engine::analyze;
    use mosaic_raster::AffineTransform;

    fn sources() -> Vec<SourceDescriptor> {
        vec![
            SourceDescriptor::new("a.tif", AffineTransform::north_up(0.0, 10.0, 1.0, 1.0), 10, 10),
            SourceDescriptor::new("b.tif", AffineTransform::north_up(5.0, 10.0, 1.0, 1.0), 10, 10),
        ]
    }

    #[test]
    fn test_coverage_text() {
        let sources = sources();
        let report = analyze(&sources, ResolutionPolicy::Finest).unwrap();
        let mut out = Vec::new();
        write_coverage(&mut out, sources.len(), &report).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Output size:    15 x 10 (150 pixels per band)"));
        assert!(text.contains("0 <-> 1: area 50.00 (50.0% of source 0)"));
        assert!(text.contains("Coverage ratio: 1.333"));
        assert!(text.contains("[info]"));
    }

    #[test]
    fn test_source_summary() {
        let sources = sources();
        let summary = SourceSummary::from(&sources[1]);
        assert_eq!(summary.bounds, Rect::new(5.0, 0.0, 15.0, 10.0));

        let mut out = Vec::new();
        write_source(&mut out, &summary).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("b.tif\n"));
        assert!(text.contains("Nodata:      none"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["sample_type"], "float32");
        assert_eq!(json["width"], 10);
    }
}
