use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;
use crate::transform::domain::frame_transform::{require_u8, FrameTransform};

/// Replaces each sample with its absolute difference from a fixed
/// background frame, leaving only what changed.
pub struct BackgroundSubtractTransform {
    background: Frame,
}

impl BackgroundSubtractTransform {
    pub fn new(background: Frame) -> Result<Self, PipelineError> {
        require_u8(&background, "background subtraction")?;
        Ok(Self { background })
    }
}

impl FrameTransform for BackgroundSubtractTransform {
    fn apply(&mut self, mut frame: Frame) -> Result<Frame, PipelineError> {
        require_u8(&frame, "background subtraction")?;
        if frame.dimensions() != self.background.dimensions() {
            return Err(PipelineError::ShapeMismatch {
                expected: self.background.dimensions(),
                actual: frame.dimensions(),
            });
        }
        if let (Some(data), Some(background)) = (frame.as_u8_mut(), self.background.as_u8()) {
            for (v, &b) in data.iter_mut().zip(background) {
                *v = v.abs_diff(b);
            }
        }
        Ok(frame)
    }

    fn name(&self) -> &str {
        "background"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_difference() {
        let background = Frame::new(vec![100, 100, 100], 3, 1, 1, 0);
        let mut t = BackgroundSubtractTransform::new(background).unwrap();
        let out = t.apply(Frame::new(vec![100, 40, 180], 3, 1, 1, 6)).unwrap();
        assert_eq!(out.as_u8().unwrap(), &[0, 60, 80]);
        assert_eq!(out.index(), 6);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut t = BackgroundSubtractTransform::new(Frame::filled(0, 2, 2, 1, 0)).unwrap();
        assert!(matches!(
            t.apply(Frame::filled(0, 2, 2, 3, 0)),
            Err(PipelineError::ShapeMismatch { .. })
        ));
    }
}
