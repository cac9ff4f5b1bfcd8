use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;

/// One stage of per-frame processing.
///
/// A stage takes ownership of the incoming frame and returns the frame to
/// hand to the next stage. Stateful stages (accumulators, sinks) keep their
/// state private and expose their own completion methods.
pub trait FrameTransform: Send {
    fn apply(&mut self, frame: Frame) -> Result<Frame, PipelineError>;

    /// Short label used in timing and debug output.
    fn name(&self) -> &str {
        "transform"
    }
}

/// Lets a chain borrow a stage so the caller keeps it after the run.
impl<T: FrameTransform + ?Sized> FrameTransform for &mut T {
    fn apply(&mut self, frame: Frame) -> Result<Frame, PipelineError> {
        (**self).apply(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: FrameTransform + ?Sized> FrameTransform for Box<T> {
    fn apply(&mut self, frame: Frame) -> Result<Frame, PipelineError> {
        (**self).apply(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Fails with `UnsupportedDepth` unless `frame` holds 8-bit samples.
pub(crate) fn require_u8(frame: &Frame, operation: &'static str) -> Result<(), PipelineError> {
    match frame.as_u8() {
        Some(_) => Ok(()),
        None => Err(PipelineError::UnsupportedDepth {
            operation,
            depth: frame.depth(),
        }),
    }
}
