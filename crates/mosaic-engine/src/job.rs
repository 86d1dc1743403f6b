//! Merge job configuration.
//!
//! A [`MergeJob`] carries every policy decision for one invocation. It is
//! built once, validated, and never mutated while the merge runs.

use crate::SourceDescriptor;
use mosaic_raster::{Compression, ResamplingKernel, SampleType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default ceiling on output width and height, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 50_000;

/// Default ceiling on output samples (width x height x bands). Each source is
/// aligned into a full-size `f64` buffer, so this bounds that allocation at
/// 2 GB per source.
pub const DEFAULT_MAX_SAMPLES: u64 = 250_000_000;

/// No-data value used by [`NodataPolicy::FromFirstSource`] when source 0
/// declares none.
pub const DEFAULT_NODATA: f64 = -9999.0;

/// How the output pixel size is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "PolicyValue", into = "PolicyValue")]
pub enum ResolutionPolicy {
    /// Smallest source resolution.
    #[default]
    Finest,
    /// Largest source resolution.
    Coarsest,
    /// Caller-supplied pixel size in world units.
    Explicit(f64),
}

impl fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionPolicy::Finest => f.write_str("finest"),
            ResolutionPolicy::Coarsest => f.write_str("coarsest"),
            ResolutionPolicy::Explicit(v) => write!(f, "{}", v),
        }
    }
}

impl FromStr for ResolutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "finest" => Ok(ResolutionPolicy::Finest),
            "coarsest" => Ok(ResolutionPolicy::Coarsest),
            other => other
                .parse::<f64>()
                .map(ResolutionPolicy::Explicit)
                .map_err(|_| {
                    format!(
                        "invalid resolution '{}' (expected finest, coarsest or a number)",
                        s
                    )
                }),
        }
    }
}

/// How aligned source values are combined at each output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRule {
    /// Lowest-index contributing source.
    #[default]
    First,
    /// Highest-index contributing source.
    Last,
    /// Smallest contributing value.
    Min,
    /// Largest contributing value.
    Max,
    /// Sum of contributing values.
    Sum,
    /// Number of contributing sources.
    Count,
}

impl MergeRule {
    /// All rules.
    pub const ALL: [MergeRule; 6] = [
        MergeRule::First,
        MergeRule::Last,
        MergeRule::Min,
        MergeRule::Max,
        MergeRule::Sum,
        MergeRule::Count,
    ];

    /// Lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MergeRule::First => "first",
            MergeRule::Last => "last",
            MergeRule::Min => "min",
            MergeRule::Max => "max",
            MergeRule::Sum => "sum",
            MergeRule::Count => "count",
        }
    }

    /// Rules that compute on values rather than pick one source.
    pub const fn is_elementwise_numeric(&self) -> bool {
        matches!(self, MergeRule::Min | MergeRule::Max | MergeRule::Sum)
    }
}

impl fmt::Display for MergeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        MergeRule::ALL
            .into_iter()
            .find(|r| r.as_str() == lower)
            .ok_or_else(|| {
                format!(
                    "unknown merge rule '{}' (expected first, last, min, max, sum or count)",
                    s
                )
            })
    }
}

/// Which no-data value the output declares.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "PolicyValue", into = "PolicyValue")]
pub enum NodataPolicy {
    /// Source 0's value, or [`DEFAULT_NODATA`] when it has none.
    #[default]
    FromFirstSource,
    /// A fixed value.
    Explicit(f64),
    /// No no-data value; uncovered pixels become zero.
    None,
}

impl fmt::Display for NodataPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodataPolicy::FromFirstSource => f.write_str("auto"),
            NodataPolicy::Explicit(v) => write!(f, "{}", v),
            NodataPolicy::None => f.write_str("none"),
        }
    }
}

impl FromStr for NodataPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "first" | "from_first_source" => Ok(NodataPolicy::FromFirstSource),
            "none" => Ok(NodataPolicy::None),
            other => other
                .parse::<f64>()
                .map(NodataPolicy::Explicit)
                .map_err(|_| format!("invalid nodata '{}' (expected auto, none or a number)", s)),
        }
    }
}

/// Serialised form shared by the keyword-or-number policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PolicyValue {
    Number(f64),
    Keyword(String),
}

impl TryFrom<PolicyValue> for ResolutionPolicy {
    type Error = String;

    fn try_from(value: PolicyValue) -> Result<Self, Self::Error> {
        match value {
            PolicyValue::Number(v) => Ok(ResolutionPolicy::Explicit(v)),
            PolicyValue::Keyword(k) => k.parse(),
        }
    }
}

impl From<ResolutionPolicy> for PolicyValue {
    fn from(policy: ResolutionPolicy) -> Self {
        match policy {
            ResolutionPolicy::Explicit(v) => PolicyValue::Number(v),
            other => PolicyValue::Keyword(other.to_string()),
        }
    }
}

impl TryFrom<PolicyValue> for NodataPolicy {
    type Error = String;

    fn try_from(value: PolicyValue) -> Result<Self, Self::Error> {
        match value {
            PolicyValue::Number(v) => Ok(NodataPolicy::Explicit(v)),
            PolicyValue::Keyword(k) => k.parse(),
        }
    }
}

impl From<NodataPolicy> for PolicyValue {
    fn from(policy: NodataPolicy) -> Self {
        match policy {
            NodataPolicy::Explicit(v) => PolicyValue::Number(v),
            other => PolicyValue::Keyword(other.to_string()),
        }
    }
}

/// Sanity limits applied while planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanLimits {
    /// Largest allowed output width or height, in pixels.
    pub max_dimension: u32,
    /// Largest allowed width x height x bands.
    pub max_samples: u64,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

/// Everything one merge needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeJob {
    /// Ordered sources; order decides `first` and `last`.
    pub sources: Vec<SourceDescriptor>,
    /// Output file.
    pub output: PathBuf,
    /// Output pixel size policy.
    #[serde(default)]
    pub resolution: ResolutionPolicy,
    /// Resampling kernel used to align each source.
    #[serde(default)]
    pub kernel: ResamplingKernel,
    /// Pixel merge rule.
    #[serde(default)]
    pub rule: MergeRule,
    /// Output sample type.
    #[serde(default = "default_output_type")]
    pub output_type: SampleType,
    /// Output no-data policy.
    #[serde(default)]
    pub nodata: NodataPolicy,
    /// Output compression.
    #[serde(default)]
    pub compression: Compression,
    /// Planning limits.
    #[serde(default)]
    pub limits: PlanLimits,
}

fn default_output_type() -> SampleType {
    SampleType::F32
}

impl MergeJob {
    /// Job with default policies: finest resolution, nearest kernel, `first`
    /// rule, `float32` output, no-data from source 0, LZW compression.
    pub fn new(sources: Vec<SourceDescriptor>, output: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            output: output.into(),
            resolution: ResolutionPolicy::default(),
            kernel: ResamplingKernel::default(),
            rule: MergeRule::default(),
            output_type: default_output_type(),
            nodata: NodataPolicy::default(),
            compression: Compression::default(),
            limits: PlanLimits::default(),
        }
    }

    /// Set the resolution policy.
    pub fn with_resolution(mut self, resolution: ResolutionPolicy) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the resampling kernel.
    pub fn with_kernel(mut self, kernel: ResamplingKernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Set the merge rule.
    pub fn with_rule(mut self, rule: MergeRule) -> Self {
        self.rule = rule;
        self
    }

    /// Set the output sample type.
    pub fn with_output_type(mut self, output_type: SampleType) -> Self {
        self.output_type = output_type;
        self
    }

    /// Set the no-data policy.
    pub fn with_nodata(mut self, nodata: NodataPolicy) -> Self {
        self.nodata = nodata;
        self
    }

    /// Set the output compression.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the planning limits.
    pub fn with_limits(mut self, limits: PlanLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Resolve the no-data policy against the job's sources, before any
    /// narrowing to the output type.
    pub fn requested_nodata(&self) -> Option<f64> {
        match self.nodata {
            NodataPolicy::Explicit(v) => Some(v),
            NodataPolicy::None => None,
            NodataPolicy::FromFirstSource => Some(
                self.sources
                    .first()
                    .and_then(|s| s.nodata)
                    .unwrap_or(DEFAULT_NODATA),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_raster::AffineTransform;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("finest".parse::<ResolutionPolicy>().unwrap(), ResolutionPolicy::Finest);
        assert_eq!(" Coarsest ".parse::<ResolutionPolicy>().unwrap(), ResolutionPolicy::Coarsest);
        assert_eq!("2.5".parse::<ResolutionPolicy>().unwrap(), ResolutionPolicy::Explicit(2.5));
        assert!("fine".parse::<ResolutionPolicy>().is_err());

        assert_eq!("auto".parse::<NodataPolicy>().unwrap(), NodataPolicy::FromFirstSource);
        assert_eq!("none".parse::<NodataPolicy>().unwrap(), NodataPolicy::None);
        assert_eq!("-32768".parse::<NodataPolicy>().unwrap(), NodataPolicy::Explicit(-32768.0));

        for rule in MergeRule::ALL {
            assert_eq!(rule.to_string().parse::<MergeRule>().unwrap(), rule);
        }
        assert!("median".parse::<MergeRule>().is_err());
    }

    #[test]
    fn test_policies_serialize_as_keyword_or_number() {
        let json = serde_json::to_string(&ResolutionPolicy::Explicit(10.0)).unwrap();
        assert_eq!(json, "10.0");
        let json = serde_json::to_string(&ResolutionPolicy::Coarsest).unwrap();
        assert_eq!(json, "\"coarsest\"");
        let policy: NodataPolicy = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(policy, NodataPolicy::None);
        let policy: NodataPolicy = serde_json::from_str("0").unwrap();
        assert_eq!(policy, NodataPolicy::Explicit(0.0));
    }

    #[test]
    fn test_job_defaults_from_json() {
        let json = r#"{"sources": [], "output": "out.tif", "rule": "sum"}"#;
        let job: MergeJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.rule, MergeRule::Sum);
        assert_eq!(job.resolution, ResolutionPolicy::Finest);
        assert_eq!(job.output_type, SampleType::F32);
        assert_eq!(job.limits.max_dimension, DEFAULT_MAX_DIMENSION);
        assert_eq!(job.limits.max_samples, DEFAULT_MAX_SAMPLES);
        assert_eq!(job.compression, Compression::Lzw);
    }

    #[test]
    fn test_requested_nodata() {
        let transform = AffineTransform::north_up(0.0, 1.0, 1.0, 1.0);
        let src = SourceDescriptor::new("a.tif", transform, 1, 1);
        let job = MergeJob::new(vec![src.clone()], "out.tif");
        assert_eq!(job.requested_nodata(), Some(DEFAULT_NODATA));

        let job = MergeJob::new(vec![src.with_nodata(Some(255.0))], "out.tif");
        assert_eq!(job.requested_nodata(), Some(255.0));
        assert_eq!(job.clone().with_nodata(NodataPolicy::None).requested_nodata(), None);
        assert_eq!(
            job.with_nodata(NodataPolicy::Explicit(-1.0)).requested_nodata(),
            Some(-1.0)
        );
    }
}
