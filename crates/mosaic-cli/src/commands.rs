//! Subcommand handlers.

use crate::args::{AnalyzeArgs, Cli, Command, InfoArgs, MergeArgs};
use crate::job_file::{JobFile, MergeSettings};
use crate::report::{self, MergeReport, ReportSettings, SourceSummary};
use crate::CliError;
use mosaic_engine::{
    analyze_with_limits, open_sources, run_merge_with_cancel, CancelFlag, MergeJob, PlanLimits,
    RasterIo,
};
use std::io::Write;
use tracing::info;

/// Run one parsed command against `io`, printing results to `out`.
pub fn run<I: RasterIo + ?Sized>(
    io: &I,
    cli: &Cli,
    cancel: &CancelFlag,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match &cli.command {
        Command::Info(args) => info_command(io, args, out),
        Command::Analyze(args) => analyze_command(io, args, out),
        Command::Merge(args) => merge_command(io, args, cancel, out),
    }
}

fn info_command<I: RasterIo + ?Sized>(
    io: &I,
    args: &InfoArgs,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let sources = open_sources(io, &args.files)?;
    let summaries: Vec<SourceSummary<'_>> = sources.iter().map(SourceSummary::from).collect();

    if args.json {
        serde_json::to_writer_pretty(&mut *out, &summaries)?;
        writeln!(out)?;
    } else {
        for summary in &summaries {
            report::write_source(out, summary)?;
        }
    }
    Ok(())
}

fn analyze_command<I: RasterIo + ?Sized>(
    io: &I,
    args: &AnalyzeArgs,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let sources = open_sources(io, &args.files)?;
    let defaults = PlanLimits::default();
    let limits = PlanLimits {
        max_dimension: args.max_dimension.unwrap_or(defaults.max_dimension),
        max_samples: args.max_samples.unwrap_or(defaults.max_samples),
    };
    let coverage = analyze_with_limits(&sources, args.resolution, &limits)?;

    if args.json {
        serde_json::to_writer_pretty(&mut *out, &coverage)?;
        writeln!(out)?;
    } else {
        report::write_coverage(out, sources.len(), &coverage)?;
    }
    Ok(())
}

fn merge_command<I: RasterIo + ?Sized>(
    io: &I,
    args: &MergeArgs,
    cancel: &CancelFlag,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let file = match &args.job {
        Some(path) => JobFile::load(path)?,
        None => JobFile::default(),
    };
    let settings = MergeSettings::resolve(args, file)?;

    if let Some(dir) = settings.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| CliError::OutputDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let sources = open_sources(io, &settings.sources)?;
    info!(sources = sources.len(), output = %settings.output.display(), "starting merge");

    let job = MergeJob::new(sources, settings.output.clone())
        .with_rule(settings.rule)
        .with_kernel(settings.kernel)
        .with_resolution(settings.resolution)
        .with_output_type(settings.output_type)
        .with_nodata(settings.nodata)
        .with_compression(settings.compression)
        .with_limits(settings.limits);
    let result = run_merge_with_cancel(io, &job, cancel)?;

    if let Some(path) = &args.report {
        let report_settings = ReportSettings {
            rule: settings.rule,
            kernel: settings.kernel,
            resolution: settings.resolution,
            compression: settings.compression,
        };
        let report = MergeReport::new(&settings.sources, report_settings, &result);
        let text = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, text).map_err(|source| CliError::Report {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "wrote merge report");
    }

    report::write_merge(out, &result)?;
    Ok(())
}
