use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;
use crate::transform::domain::frame_transform::{require_u8, FrameTransform};

/// Remaps 8-bit samples through a 256-entry lookup table.
pub struct BrightnessMapTransform {
    table: [u8; 256],
}

impl BrightnessMapTransform {
    pub fn from_table(table: [u8; 256]) -> Self {
        Self { table }
    }

    /// `v * gain + offset`, rounded and clamped to 0..=255.
    pub fn linear(gain: f64, offset: f64) -> Self {
        let mut table = [0u8; 256];
        for (v, slot) in table.iter_mut().enumerate() {
            *slot = (v as f64 * gain + offset).round().clamp(0.0, 255.0) as u8;
        }
        Self { table }
    }

    pub fn table(&self) -> &[u8; 256] {
        &self.table
    }
}

impl FrameTransform for BrightnessMapTransform {
    fn apply(&mut self, mut frame: Frame) -> Result<Frame, PipelineError> {
        require_u8(&frame, "brightness map")?;
        if let Some(data) = frame.as_u8_mut() {
            data.iter_mut().for_each(|v| *v = self.table[*v as usize]);
        }
        Ok(frame)
    }

    fn name(&self) -> &str {
        "brightness"
    }
}
