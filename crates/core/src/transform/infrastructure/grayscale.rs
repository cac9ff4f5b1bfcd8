use crate::pipeline::color_converter::ColorConverter;
use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;
use crate::transform::domain::frame_transform::FrameTransform;

/// Converts color frames to single-channel luma at its position in a chain.
pub struct GrayscaleTransform;

impl FrameTransform for GrayscaleTransform {
    fn apply(&mut self, frame: Frame) -> Result<Frame, PipelineError> {
        Ok(ColorConverter::new().to_gray(frame))
    }

    fn name(&self) -> &str {
        "grayscale"
    }
}
