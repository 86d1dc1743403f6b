//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use mosaic_engine::{
    Compression, MergeRule, NodataPolicy, ResamplingKernel, ResolutionPolicy, SampleType,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mosaic")]
#[command(
    about = "Merge georeferenced rasters that share a CRS into one GeoTIFF",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the metadata of each input raster
    Info(InfoArgs),
    /// Validate inputs and preview the output grid and coverage without merging
    Analyze(AnalyzeArgs),
    /// Merge inputs into one output raster
    Merge(MergeArgs),
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input rasters
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Input rasters, in merge order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output resolution: finest, coarsest or a pixel size in CRS units
    #[arg(long, default_value = "finest")]
    pub resolution: ResolutionPolicy,

    /// Largest allowed output width or height in pixels
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Largest allowed output width x height x bands
    #[arg(long)]
    pub max_samples: Option<u64>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Merge options. Every option left unset falls back to the job file, then
/// to the engine default.
#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Input rasters, in merge order (replaces the job file's sources)
    pub files: Vec<PathBuf>,

    /// Output file; `.tif` is appended when missing
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// YAML job file with defaults for every option
    #[arg(long)]
    pub job: Option<PathBuf>,

    /// Merge rule: first, last, min, max, sum, count
    #[arg(long)]
    pub rule: Option<MergeRule>,

    /// Resampling kernel: nearest, bilinear, cubic, average, mode, min, max
    #[arg(long)]
    pub kernel: Option<ResamplingKernel>,

    /// Output resolution: finest, coarsest or a pixel size in CRS units
    #[arg(long)]
    pub resolution: Option<ResolutionPolicy>,

    /// Output sample type (uint8, int16, float32, ...)
    #[arg(long)]
    pub dtype: Option<SampleType>,

    /// Output no-data: auto, none or a value
    #[arg(long, allow_hyphen_values = true)]
    pub nodata: Option<NodataPolicy>,

    /// Output compression: lzw, deflate, none
    #[arg(long)]
    pub compression: Option<Compression>,

    /// Largest allowed output width or height in pixels
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Largest allowed output width x height x bands
    #[arg(long)]
    pub max_samples: Option<u64>,

    /// Write a JSON report of the merge to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_merge_flags_parse() {
        let cli = Cli::try_parse_from([
            "mosaic", "merge", "a.tif", "b.tif", "-o", "out", "--rule", "max", "--kernel",
            "bilinear", "--resolution", "30", "--dtype", "int16", "--nodata", "-32768",
            "--compression", "deflate", "--max-samples", "1000000", "-v",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Command::Merge(args) = cli.command else {
            panic!("expected merge");
        };
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.rule, Some(MergeRule::Max));
        assert_eq!(args.kernel, Some(ResamplingKernel::Bilinear));
        assert_eq!(args.resolution, Some(ResolutionPolicy::Explicit(30.0)));
        assert_eq!(args.dtype, Some(SampleType::I16));
        assert_eq!(args.nodata, Some(NodataPolicy::Explicit(-32768.0)));
        assert_eq!(args.compression, Some(Compression::Deflate));
        assert_eq!(args.max_samples, Some(1_000_000));
    }

    #[test]
    fn test_bad_rule_is_rejected() {
        assert!(Cli::try_parse_from(["mosaic", "merge", "a.tif", "--rule", "median"]).is_err());
        assert!(Cli::try_parse_from(["mosaic", "info"]).is_err());
    }
}
