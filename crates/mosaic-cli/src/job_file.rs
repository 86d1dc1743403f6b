//! YAML job files and their merge with command-line flags.
//!
//! ```yaml
//! sources:
//!   - tiles/west.tif
//!   - tiles/east.tif
//! output: out/mosaic.tif
//! rule: max
//! kernel: bilinear
//! resolution: coarsest   # or a number
//! output_type: int16
//! nodata: -32768         # or auto / none
//! compression: deflate
//! max_dimension: 20000
//! max_samples: 100000000
//! ```

use crate::args::MergeArgs;
use crate::CliError;
use mosaic_engine::{
    Compression, MergeRule, NodataPolicy, PlanLimits, ResamplingKernel, ResolutionPolicy,
    SampleType,
};
use mosaic_raster::GEOTIFF_EXTENSION;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Job settings as written in a YAML file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobFile {
    pub sources: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub rule: Option<MergeRule>,
    pub kernel: Option<ResamplingKernel>,
    pub resolution: Option<ResolutionPolicy>,
    pub output_type: Option<SampleType>,
    pub nodata: Option<NodataPolicy>,
    pub compression: Option<Compression>,
    pub max_dimension: Option<u32>,
    pub max_samples: Option<u64>,
}

impl JobFile {
    /// Load a job file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::JobFileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| CliError::JobFileParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse job YAML.
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

/// Fully resolved merge request, before sources are opened.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSettings {
    pub sources: Vec<PathBuf>,
    pub output: PathBuf,
    pub rule: MergeRule,
    pub kernel: ResamplingKernel,
    pub resolution: ResolutionPolicy,
    pub output_type: SampleType,
    pub nodata: NodataPolicy,
    pub compression: Compression,
    pub limits: PlanLimits,
}

impl MergeSettings {
    /// Flags first, then the job file, then engine defaults.
    pub fn resolve(args: &MergeArgs, file: JobFile) -> Result<Self, CliError> {
        let sources = if args.files.is_empty() {
            file.sources
        } else {
            args.files.clone()
        };
        if sources.is_empty() {
            return Err(CliError::NoInputs);
        }
        let output = args.output.clone().or(file.output).ok_or(CliError::NoOutput)?;

        let defaults = PlanLimits::default();
        Ok(Self {
            sources,
            output: with_geotiff_extension(&output),
            rule: args.rule.or(file.rule).unwrap_or_default(),
            kernel: args.kernel.or(file.kernel).unwrap_or_default(),
            resolution: args.resolution.or(file.resolution).unwrap_or_default(),
            output_type: args.dtype.or(file.output_type).unwrap_or(SampleType::F32),
            nodata: args.nodata.or(file.nodata).unwrap_or_default(),
            compression: args.compression.or(file.compression).unwrap_or_default(),
            limits: PlanLimits {
                max_dimension: args
                    .max_dimension
                    .or(file.max_dimension)
                    .unwrap_or(defaults.max_dimension),
                max_samples: args
                    .max_samples
                    .or(file.max_samples)
                    .unwrap_or(defaults.max_samples),
            },
        })
    }
}

/// `path` with `.tif` appended unless it already ends in `.tif` or `.tiff`.
pub fn with_geotiff_extension(path: &Path) -> PathBuf {
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            e.eq_ignore_ascii_case(GEOTIFF_EXTENSION) || e.eq_ignore_ascii_case("tiff")
        });
    if has_extension {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(GEOTIFF_EXTENSION);
        PathBuf::from(name)
    }
}
