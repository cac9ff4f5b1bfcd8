use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;
use crate::transform::domain::frame_transform::{require_u8, FrameTransform};

/// Binarizes an 8-bit frame: samples above `level` become 255, the rest 0.
///
/// With a mask (single-channel, frame-sized, non-zero = inside), every
/// sample of a pixel outside the mask becomes 0 regardless of its value.
pub struct ThresholdTransform {
    level: u8,
    mask: Option<Frame>,
}

impl ThresholdTransform {
    pub fn new(level: u8) -> Self {
        Self { level, mask: None }
    }

    /// Fails unless `mask` is an 8-bit single-channel frame.
    pub fn with_mask(level: u8, mask: Frame) -> Result<Self, PipelineError> {
        require_u8(&mask, "threshold mask")?;
        if mask.channels() != 1 {
            return Err(PipelineError::ShapeMismatch {
                expected: (mask.width(), mask.height(), 1),
                actual: mask.dimensions(),
            });
        }
        Ok(Self {
            level,
            mask: Some(mask),
        })
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}

impl FrameTransform for ThresholdTransform {
    fn apply(&mut self, mut frame: Frame) -> Result<Frame, PipelineError> {
        require_u8(&frame, "threshold")?;
        let channels = frame.channels() as usize;
        let (width, height) = (frame.width(), frame.height());

        let mask = match &self.mask {
            Some(mask) if (mask.width(), mask.height()) != (width, height) => {
                return Err(PipelineError::ShapeMismatch {
                    expected: (width, height, 1),
                    actual: mask.dimensions(),
                });
            }
            Some(mask) => mask.as_u8(),
            None => None,
        };

        let level = self.level;
        if let Some(data) = frame.as_u8_mut() {
            for (pixel, samples) in data.chunks_exact_mut(channels).enumerate() {
                let inside = mask.map_or(true, |m| m[pixel] != 0);
                for v in samples {
                    *v = if inside && *v > level { 255 } else { 0 };
                }
            }
        }
        Ok(frame)
    }

    fn name(&self) -> &str {
        "threshold"
    }
}
