//! Narrowing the combined buffer into the output sample type.

use crate::{CombinedBuffer, MergeWarning};
use mosaic_raster::{SampleBuffer, SampleType};

/// A combined buffer narrowed and ready to encode.
#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of bands.
    pub bands: usize,
    /// Narrowed samples, band-major.
    pub buffer: SampleBuffer,
    /// No-data value as written, after narrowing.
    pub nodata: Option<f64>,
    /// Warnings raised while narrowing.
    pub warnings: Vec<MergeWarning>,
}

/// The no-data value as it will be stored in `sample_type`, plus a warning
/// when narrowing changed it.
pub fn resolve_nodata(
    requested: Option<f64>,
    sample_type: SampleType,
) -> (Option<f64>, Option<MergeWarning>) {
    let Some(requested) = requested else {
        return (None, None);
    };
    let written = sample_type.narrow(requested);
    let warning =
        (!sample_type.can_represent(requested)).then_some(MergeWarning::NodataNotRepresentable {
            requested,
            written,
            sample_type,
        });
    (Some(written), warning)
}

/// Narrow `combined` into `sample_type` and attach the output no-data value.
///
/// Narrowing saturates: integer targets truncate toward zero and clamp to the
/// type's range, so unsigned targets turn negatives into zero.
pub fn materialize(
    combined: CombinedBuffer,
    sample_type: SampleType,
    nodata: Option<f64>,
) -> Materialized {
    let (nodata, warning) = resolve_nodata(nodata, sample_type);
    Materialized {
        width: combined.width,
        height: combined.height,
        bands: combined.bands,
        buffer: SampleBuffer::from_f64(sample_type, &combined.values),
        nodata,
        warnings: warning.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combined(values: Vec<f64>) -> CombinedBuffer {
        CombinedBuffer {
            width: values.len() as u32,
            height: 1,
            bands: 1,
            values,
        }
    }

    #[test]
    fn test_unsigned_clamps_negatives_and_saturates() {
        let out = materialize(combined(vec![-5.0, 12.9, 70_000.0]), SampleType::U16, None);
        assert_eq!(out.buffer, SampleBuffer::U16(vec![0, 12, 65535]));
        assert_eq!(out.nodata, None);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_float_output_keeps_values() {
        let out = materialize(combined(vec![0.25, -1.5]), SampleType::F32, Some(-9999.0));
        assert_eq!(out.buffer, SampleBuffer::F32(vec![0.25, -1.5]));
        assert_eq!(out.nodata, Some(-9999.0));
    }

    #[test]
    fn test_unrepresentable_nodata_is_narrowed_with_warning() {
        let out = materialize(combined(vec![0.0, 3.0]), SampleType::U8, Some(-9999.0));
        assert_eq!(out.nodata, Some(0.0));
        assert_eq!(
            out.warnings,
            vec![MergeWarning::NodataNotRepresentable {
                requested: -9999.0,
                written: 0.0,
                sample_type: SampleType::U8,
            }]
        );

        let (written, warning) = resolve_nodata(Some(f64::NAN), SampleType::I16);
        assert_eq!(written, Some(0.0));
        assert!(warning.is_some());
        let (written, warning) = resolve_nodata(Some(255.0), SampleType::U8);
        assert_eq!(written, Some(255.0));
        assert!(warning.is_none());
    }
}
