//! Merge orchestration: validate, plan, align and analyse, combine, write.

use crate::{
    align_sources, analyze_coverage, combine, materialize, plan, resolve_nodata, validate,
    CancelFlag, CoverageReport, MergeError, MergeJob, MergeWarning, PlanLimits, RasterIo,
    ResolutionPolicy, Result, SourceDescriptor, SpatialPlan,
};
use mosaic_metrics::metric_defs;
use mosaic_metrics::metrics::{counter, gauge, histogram};
use mosaic_metrics::MergeLabels;
use mosaic_raster::{OutputRaster, SampleType, WriteOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

/// Outcome of a successful merge. The engine keeps no reference to it.
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// Path the output was written to.
    pub output: PathBuf,
    /// Achieved width in pixels.
    pub width: u32,
    /// Achieved height in pixels.
    pub height: u32,
    /// Number of bands.
    pub bands: usize,
    /// Output sample type.
    pub sample_type: SampleType,
    /// No-data value as written.
    pub nodata: Option<f64>,
    /// The output grid.
    pub plan: SpatialPlan,
    /// Coverage analysis computed alongside alignment.
    pub coverage: CoverageReport,
    /// Every warning, coverage findings first.
    pub warnings: Vec<MergeWarning>,
    /// The materialised output as handed to the writer.
    pub raster: OutputRaster,
}

/// Run `job` to completion.
pub fn run_merge<I: RasterIo + ?Sized>(io: &I, job: &MergeJob) -> Result<MergeResult> {
    run_merge_with_cancel(io, job, &CancelFlag::new())
}

/// Run `job`, checking `cancel` before each source is aligned.
pub fn run_merge_with_cancel<I: RasterIo + ?Sized>(
    io: &I,
    job: &MergeJob,
    cancel: &CancelFlag,
) -> Result<MergeResult> {
    let labels = MergeLabels::new(job.rule.as_str(), job.kernel.as_str());
    counter!(metric_defs::MERGES_STARTED.name, &labels.to_labels()).increment(1);

    let _span = info_span!(
        "merge",
        rule = %job.rule,
        kernel = %job.kernel,
        sources = job.sources.len()
    )
    .entered();

    match merge_inner(io, job, cancel) {
        Ok(result) => {
            counter!(metric_defs::MERGES_COMPLETED.name, &labels.to_labels()).increment(1);
            counter!(metric_defs::OUTPUT_PIXELS.name).increment(result.plan.pixel_count());
            for warning in &result.warnings {
                counter!(metric_defs::WARNINGS.name, "kind" => warning.kind()).increment(1);
            }
            info!(
                output = %result.output.display(),
                width = result.width,
                height = result.height,
                bands = result.bands,
                warnings = result.warnings.len(),
                "merge complete"
            );
            Ok(result)
        }
        Err(e) => {
            let stage = [("stage", e.stage().to_string())];
            counter!(metric_defs::MERGES_FAILED.name, &labels.with(&stage)).increment(1);
            warn!(stage = e.stage(), error = %e, "merge failed");
            Err(e)
        }
    }
}

fn merge_inner<I: RasterIo + ?Sized>(
    io: &I,
    job: &MergeJob,
    cancel: &CancelFlag,
) -> Result<MergeResult> {
    let sources = validate(&job.sources)?;
    let plan = plan(sources, job.resolution, &job.limits)?;
    let planned_samples = plan.pixel_count() * sources[0].bands as u64;
    gauge!(metric_defs::PLANNED_SAMPLES.name).set(planned_samples as f64);
    info!(
        width = plan.width,
        height = plan.height,
        resolution = plan.resolution,
        "planned output grid"
    );

    let (coverage, aligned) = rayon::join(
        || analyze_coverage(sources, &plan),
        || {
            let _span = info_span!("align").entered();
            let started = Instant::now();
            let aligned = align_sources(io, sources, &plan, job.kernel, cancel);
            histogram!(metric_defs::ALIGN_DURATION.name, "kernel" => job.kernel.as_str())
                .record(started.elapsed().as_secs_f64() * 1000.0);
            aligned
        },
    );
    let aligned = aligned?;

    let mut warnings = coverage.warnings.clone();
    let bands = sources[0].bands;
    if bands > 1 && job.rule.is_elementwise_numeric() {
        warnings.push(MergeWarning::MultiBandMergeCaution { bands, rule: job.rule });
    }

    // Empty pixels are filled with the value the file will declare as no-data
    let (fill, _) = resolve_nodata(job.requested_nodata(), job.output_type);
    let combined = {
        let _span = info_span!("combine").entered();
        let started = Instant::now();
        let combined = combine(&aligned, job.rule, fill);
        histogram!(metric_defs::COMBINE_DURATION.name, "rule" => job.rule.as_str())
            .record(started.elapsed().as_secs_f64() * 1000.0);
        combined
    };
    drop(aligned);

    let materialized = materialize(combined, job.output_type, job.requested_nodata());
    warnings.extend(materialized.warnings);

    let raster = OutputRaster {
        width: materialized.width,
        height: materialized.height,
        bands: materialized.bands,
        transform: plan.grid().transform(),
        crs: sources[0].crs.clone(),
        nodata: materialized.nodata,
        buffer: materialized.buffer,
    };

    let options = WriteOptions {
        compression: job.compression,
    };
    {
        let _span = info_span!("write", path = %job.output.display()).entered();
        io.write(&job.output, &raster, &options)
            .map_err(|source| MergeError::OutputWrite {
                path: job.output.clone(),
                source,
            })?;
    }

    for warning in &warnings {
        warn!(kind = warning.kind(), "{warning}");
    }

    Ok(MergeResult {
        output: job.output.clone(),
        width: raster.width,
        height: raster.height,
        bands: raster.bands,
        sample_type: job.output_type,
        nodata: raster.nodata,
        plan,
        coverage,
        warnings,
        raster,
    })
}

/// Validate, plan and analyse `sources` without reading any pixels.
pub fn analyze(sources: &[SourceDescriptor], policy: ResolutionPolicy) -> Result<CoverageReport> {
    analyze_with_limits(sources, policy, &PlanLimits::default())
}

/// [`analyze`] with an explicit dimension ceiling.
pub fn analyze_with_limits(
    sources: &[SourceDescriptor],
    policy: ResolutionPolicy,
    limits: &PlanLimits,
) -> Result<CoverageReport> {
    let _span = info_span!("analyze", sources = sources.len()).entered();
    counter!(metric_defs::ANALYSES.name).increment(1);

    let sources = validate(sources)?;
    let plan = plan(sources, policy, limits)?;
    Ok(analyze_coverage(sources, &plan))
}

/// Read the metadata of every path into descriptors, in order.
pub fn open_sources<I, P>(io: &I, paths: &[P]) -> Result<Vec<SourceDescriptor>>
where
    I: RasterIo + ?Sized,
    P: AsRef<Path>,
{
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let header = io.open(path).map_err(|source| MergeError::SourceRead {
                path: path.to_path_buf(),
                source,
            })?;
            debug!(
                path = %path.display(),
                width = header.width,
                height = header.height,
                "opened source"
            );
            Ok(SourceDescriptor::from_header(path, &header))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryRasterIo, MergeRule, NodataPolicy};
    use mosaic_raster::{AffineTransform, CrsToken, Raster, RasterHeader, SampleBuffer};

    fn raster(origin_x: f64, bands: usize, values: Vec<f64>) -> Raster {
        let header = RasterHeader {
            width: 2,
            height: 2,
            bands,
            sample_type: SampleType::F32,
            nodata: None,
            transform: AffineTransform::north_up(origin_x, 2.0, 1.0, 1.0),
            crs: CrsToken::epsg(32633),
        };
        Raster::new(header, values).unwrap()
    }

    #[test]
    fn test_merge_writes_output_with_grid_and_crs() {
        let io = MemoryRasterIo::new()
            .with_raster("a.tif", raster(0.0, 1, vec![1.0; 4]))
            .with_raster("b.tif", raster(1.0, 1, vec![2.0; 4]));
        let sources = open_sources(&io, &["a.tif", "b.tif"]).unwrap();
        let job = MergeJob::new(sources, "out.tif").with_nodata(NodataPolicy::None);

        let result = run_merge(&io, &job).unwrap();
        assert_eq!((result.width, result.height, result.bands), (3, 2, 1));
        assert_eq!(
            result.raster.buffer,
            SampleBuffer::F32(vec![1.0, 1.0, 2.0, 1.0, 1.0, 2.0])
        );
        assert_eq!(result.raster.crs, CrsToken::epsg(32633));
        assert_eq!(result.raster.transform, AffineTransform::north_up(0.0, 2.0, 1.0, 1.0));
        assert_eq!(io.written("out.tif"), Some(result.raster.clone()));
    }

    #[test]
    fn test_multiband_sum_cautions() {
        let io = MemoryRasterIo::new().with_raster("a.tif", raster(0.0, 2, vec![1.0; 8]));
        let sources = open_sources(&io, &["a.tif"]).unwrap();
        let job = MergeJob::new(sources, "out.tif").with_rule(MergeRule::Sum);
        let result = run_merge(&io, &job).unwrap();
        assert!(result
            .warnings
            .contains(&MergeWarning::MultiBandMergeCaution { bands: 2, rule: MergeRule::Sum }));
    }

    #[test]
    fn test_unrepresentable_nodata_fills_with_narrowed_value() {
        // The top-left pixel holds the source's no-data value, so nothing contributes there
        let mut a = raster(0.0, 1, vec![-1.0, 5.0, 6.0, 7.0]);
        a.header.nodata = Some(-1.0);
        let io = MemoryRasterIo::new().with_raster("a.tif", a);
        let sources = open_sources(&io, &["a.tif"]).unwrap();
        let job = MergeJob::new(sources, "out.tif")
            .with_output_type(SampleType::U8)
            .with_nodata(NodataPolicy::Explicit(-9999.0));

        let result = run_merge(&io, &job).unwrap();
        assert_eq!(result.nodata, Some(0.0));
        assert_eq!(result.raster.buffer, SampleBuffer::U8(vec![0, 5, 6, 7]));
        assert!(result.warnings.iter().any(|w| w.kind() == "nodata_not_representable"));
    }

    #[test]
    fn test_open_failure_names_path() {
        let io = MemoryRasterIo::new();
        let err = open_sources(&io, &["missing.tif"]).unwrap_err();
        assert!(matches!(
            err,
            MergeError::SourceRead { ref path, .. } if path == Path::new("missing.tif")
        ));
        assert_eq!(err.stage(), "open");
    }

    #[test]
    fn test_analyze_reports_plan() {
        let io = MemoryRasterIo::new()
            .with_raster("a.tif", raster(0.0, 1, vec![1.0; 4]))
            .with_raster("b.tif", raster(4.0, 1, vec![1.0; 4]));
        let sources = open_sources(&io, &["a.tif", "b.tif"]).unwrap();
        let report = analyze(&sources, ResolutionPolicy::Finest).unwrap();
        assert_eq!((report.plan.width, report.plan.height), (6, 2));
        assert_eq!(report.estimated_pixels(), 12);
        assert!(report.overlaps.is_empty());
        assert_eq!(io.resample_calls(), 0);

        assert!(matches!(analyze(&[], ResolutionPolicy::Finest), Err(MergeError::EmptySourceSet)));
    }
}
