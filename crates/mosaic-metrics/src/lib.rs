//! Metrics infrastructure for the raster mosaic engine.
//!
//! Every metric the engine records is declared here as a structured [`Metric`]
//! constant, so names are never spelled twice and exporters can be given
//! descriptions and units up front. The `metrics` crate is re-exported; when no
//! recorder is installed, recording is a no-op.
//!
//! # Example
//!
//! ```rust
//! use mosaic_metrics::{describe_metrics, metric_defs, MergeLabels};
//!
//! // Once at startup, after installing a recorder
//! describe_metrics();
//!
//! let labels = MergeLabels::new("max", "bilinear");
//! metrics::counter!(metric_defs::MERGES_STARTED.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use mosaic_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const TILES_SKIPPED: Metric = Metric::counter("mosaic.tiles.skipped")
///     .with_description("Tiles skipped because they were empty")
///     .with_unit(Unit::Count)
///     .with_labels(&["reason"]);
///
/// assert_eq!(TILES_SKIPPED.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "mosaic.merge.started").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the mosaic engine.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Standard Label Keys
    // ========================================================================

    /// Labels present on every merge-scoped metric.
    pub const MERGE_LABELS: &[&str] = &["rule", "kernel"];

    // ========================================================================
    // Merge Lifecycle
    // ========================================================================

    /// Merges started.
    pub const MERGES_STARTED: Metric = Metric::counter("mosaic.merge.started")
        .with_description("Merge runs started")
        .with_unit(Unit::Count)
        .with_labels(MERGE_LABELS);

    /// Merges that wrote their output.
    pub const MERGES_COMPLETED: Metric = Metric::counter("mosaic.merge.completed")
        .with_description("Merge runs that wrote their output")
        .with_unit(Unit::Count)
        .with_labels(MERGE_LABELS);

    /// Merges that stopped with an error.
    ///
    /// Labels: rule, kernel, stage (`validate`, `plan`, `align`, `write`, ...)
    pub const MERGES_FAILED: Metric = Metric::counter("mosaic.merge.failed")
        .with_description("Merge runs that stopped with an error")
        .with_unit(Unit::Count)
        .with_labels(&["rule", "kernel", "stage"]);

    /// Coverage analyses run without merging.
    pub const ANALYSES: Metric = Metric::counter("mosaic.analyze.runs")
        .with_description("Coverage analyses run without merging")
        .with_unit(Unit::Count);

    // ========================================================================
    // Stages
    // ========================================================================

    /// Size of the most recently planned output grid.
    pub const PLANNED_SAMPLES: Metric = Metric::gauge("mosaic.plan.samples")
        .with_description("Samples (width x height x bands) in the last planned output grid")
        .with_unit(Unit::Count);

    /// Sources resampled onto the output grid.
    pub const SOURCES_ALIGNED: Metric = Metric::counter("mosaic.align.sources")
        .with_description("Sources resampled onto the output grid")
        .with_unit(Unit::Count)
        .with_labels(&["kernel"]);

    /// Wall time of the alignment stage.
    pub const ALIGN_DURATION: Metric = Metric::histogram("mosaic.align.duration_ms")
        .with_description("Wall time of the alignment stage")
        .with_unit(Unit::Milliseconds)
        .with_labels(&["kernel"]);

    /// Wall time of the combine stage.
    pub const COMBINE_DURATION: Metric = Metric::histogram("mosaic.combine.duration_ms")
        .with_description("Wall time of the combine stage")
        .with_unit(Unit::Milliseconds)
        .with_labels(&["rule"]);

    /// Advisory warnings emitted.
    ///
    /// Labels: kind (`possible_gaps`, `resolution_variance`, ...)
    pub const WARNINGS: Metric = Metric::counter("mosaic.warnings")
        .with_description("Advisory warnings emitted by analysis and merging")
        .with_unit(Unit::Count)
        .with_labels(&["kind"]);

    /// Output pixels written, per band.
    pub const OUTPUT_PIXELS: Metric = Metric::counter("mosaic.output.pixels")
        .with_description("Output pixels written, counted once per band")
        .with_unit(Unit::Count);

    /// Every metric above.
    pub const ALL: &[Metric] = &[
        MERGES_STARTED,
        MERGES_COMPLETED,
        MERGES_FAILED,
        ANALYSES,
        PLANNED_SAMPLES,
        SOURCES_ALIGNED,
        ALIGN_DURATION,
        COMBINE_DURATION,
        WARNINGS,
        OUTPUT_PIXELS,
    ];
}

/// Labels identifying one merge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeLabels {
    /// Merge rule name.
    pub rule: String,
    /// Resampling kernel name.
    pub kernel: String,
}

impl MergeLabels {
    /// Creates labels for a rule/kernel pair.
    pub fn new(rule: impl Into<String>, kernel: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            kernel: kernel.into(),
        }
    }

    /// Converts to the label format used by the `metrics` crate.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("rule", self.rule.clone()), ("kernel", self.kernel.clone())]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all metrics used by the engine.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_labels() {
        let labels = MergeLabels::new("sum", "average");
        let label_vec = labels.to_labels();
        assert_eq!(label_vec.len(), 2);
        assert!(label_vec.contains(&("rule", "sum".to_string())));
        assert!(label_vec.contains(&("kernel", "average".to_string())));
    }

    #[test]
    fn test_with_extra_labels() {
        let labels = MergeLabels::new("first", "nearest");
        let extended = labels.with(&[("stage", "write".to_string())]);
        assert_eq!(extended.len(), 3);
        assert!(extended.contains(&("stage", "write".to_string())));
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::MERGES_STARTED.name, "mosaic.merge.started");
        assert_eq!(metric_defs::MERGES_STARTED.labels, metric_defs::MERGE_LABELS);
        assert_eq!(metric_defs::ALIGN_DURATION.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::ALIGN_DURATION.unit, Some(Unit::Milliseconds));
        assert_eq!(metric_defs::PLANNED_SAMPLES.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::WARNINGS.labels, &["kind"]);
    }

    #[test]
    fn test_all_metrics_unique() {
        assert_eq!(metric_defs::ALL.len(), 10);
        let mut names: Vec<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), metric_defs::ALL.len());
        assert!(metric_defs::ALL.iter().all(|m| !m.description.is_empty()));
    }

    #[test]
    fn test_metric_minimal() {
        const MINIMAL: Metric = Metric::gauge("minimal");
        assert_eq!(MINIMAL.kind, MetricKind::Gauge);
        assert_eq!(MINIMAL.description, "");
        assert_eq!(MINIMAL.unit, None);
        assert_eq!(MINIMAL.labels, &[] as &[&str]);
    }

    #[test]
    fn test_describe_without_recorder_is_noop() {
        describe_metrics();
    }
}
