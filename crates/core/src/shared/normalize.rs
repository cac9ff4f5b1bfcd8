//! Min-max rescaling of a frame into an encode-legal sample depth.

use crate::shared::error::PipelineError;
use crate::shared::frame::{Frame, SampleDepth, Samples};

/// Rescales every sample of `frame` linearly so the frame's minimum maps to 0
/// and its maximum maps to the top of `target` (255 for `U8`, 65535 for `U16`).
///
/// The extent is taken across the whole frame, all channels together, so the
/// relative balance between channels is kept. A flat frame has nothing to
/// stretch: its values are rounded and clamped into the target range as-is.
pub fn min_max(frame: &Frame, target: SampleDepth) -> Result<Frame, PipelineError> {
    let Some(top) = target.max_value() else {
        return Err(PipelineError::UnsupportedDepth {
            operation: "min-max normalization",
            depth: target,
        });
    };

    let map: Box<dyn Fn(f64) -> f64> = match frame.samples().extent() {
        Some((lo, hi)) if hi > lo => {
            let range = hi - lo;
            Box::new(move |v| ((v - lo) * top / range).round())
        }
        _ => Box::new(move |v| v.round().clamp(0.0, top)),
    };

    let samples = if target == SampleDepth::U8 {
        Samples::U8(convert(frame.samples(), |v| map(v) as u8))
    } else {
        Samples::U16(convert(frame.samples(), |v| map(v) as u16))
    };

    Ok(Frame::from_samples(
        samples,
        frame.width(),
        frame.height(),
        frame.channels(),
        frame.index(),
    ))
}

fn convert<T>(samples: &Samples, f: impl Fn(f64) -> T) -> Vec<T> {
    match samples {
        Samples::U8(v) => v.iter().map(|&s| f(f64::from(s))).collect(),
        Samples::U16(v) => v.iter().map(|&s| f(f64::from(s))).collect(),
        Samples::I64(v) => v.iter().map(|&s| f(s as f64)).collect(),
        Samples::F64(v) => v.iter().map(|&s| f(s)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn wide(values: Vec<i64>, width: u32) -> Frame {
        Frame::from_samples(Samples::I64(values), width, 1, 1, 7)
    }

    #[test]
    fn test_stretches_to_full_u8_range() {
        let out = min_max(&wide(vec![100, 150, 200], 3), SampleDepth::U8).unwrap();
        assert_eq!(out.samples(), &Samples::U8(vec![0, 128, 255]));
        assert_eq!(out.index(), 7);
    }

    #[test]
    fn test_stretches_to_full_u16_range() {
        let out = min_max(&wide(vec![-10, 10], 2), SampleDepth::U16).unwrap();
        assert_eq!(out.samples(), &Samples::U16(vec![0, 65535]));
    }

    #[test]
    fn test_flat_frame_keeps_values() {
        let flat = Frame::from_samples(Samples::F64(vec![25.5; 4]), 2, 2, 1, 0);
        let out = min_max(&flat, SampleDepth::U8).unwrap();
        assert_eq!(out.samples(), &Samples::U8(vec![26; 4]));
    }

    #[test]
    fn test_flat_frame_clamps_out_of_range_values() {
        let out = min_max(&wide(vec![2550, 2550], 2), SampleDepth::U8).unwrap();
        assert_eq!(out.samples(), &Samples::U8(vec![255, 255]));
    }

    #[test]
    fn test_normalizing_own_output_is_identity() {
        let once = min_max(&wide(vec![3, 9, 4, 12, 7], 5), SampleDepth::U8).unwrap();
        let twice = min_max(&once, SampleDepth::U8).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_channels_share_one_extent() {
        // 1 pixel RGB: channel balance must survive the rescale
        let frame = Frame::from_samples(Samples::U16(vec![0, 1000, 2000]), 1, 1, 3, 0);
        let out = min_max(&frame, SampleDepth::U8).unwrap();
        assert_eq!(out.samples(), &Samples::U8(vec![0, 128, 255]));
        assert_eq!(out.channels(), 3);
    }

    #[rstest]
    #[case(SampleDepth::I64)]
    #[case(SampleDepth::F64)]
    fn test_rejects_wide_targets(#[case] target: SampleDepth) {
        let result = min_max(&wide(vec![1, 2], 2), target);
        assert!(matches!(
            result,
            Err(PipelineError::UnsupportedDepth { .. })
        ));
    }
}
