use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;
use crate::transform::domain::frame_transform::{require_u8, FrameTransform};

/// Photographic negative of an 8-bit frame.
pub struct InvertTransform;

impl FrameTransform for InvertTransform {
    fn apply(&mut self, mut frame: Frame) -> Result<Frame, PipelineError> {
        require_u8(&frame, "invert")?;
        if let Some(data) = frame.as_u8_mut() {
            data.iter_mut().for_each(|v| *v = 255 - *v);
        }
        Ok(frame)
    }

    fn name(&self) -> &str {
        "invert"
    }
}
