use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;

use super::frame_transform::FrameTransform;

/// Ordered composition of transforms.
///
/// Stages run in insertion order. A chain is itself a [`FrameTransform`], so
/// nesting chains gives the same result as flattening them.
pub struct TransformChain<'a> {
    stages: Vec<Box<dyn FrameTransform + 'a>>,
}

impl<'a> TransformChain<'a> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends `stage` and returns the extended chain.
    pub fn and_then(mut self, stage: impl FrameTransform + 'a) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn FrameTransform + 'a>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage labels in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl Default for TransformChain<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTransform for TransformChain<'_> {
    fn apply(&mut self, frame: Frame) -> Result<Frame, PipelineError> {
        self.stages
            .iter_mut()
            .try_fold(frame, |frame, stage| stage.apply(frame))
    }

    fn name(&self) -> &str {
        "chain"
    }
}
