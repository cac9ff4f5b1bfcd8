use crate::shared::error::PipelineError;

/// Requested `[start, end)` frame span. `end <= 0` means "through the last
/// frame".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRange {
    pub start: i64,
    pub end: i64,
}

/// A range checked against a source's frame count: `0 <= start < end <= total`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedRange {
    start: i64,
    end: i64,
}

impl FrameRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Every frame of the source.
    pub fn all() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Clamps `end` to `total` when it is non-positive or past the end, then
    /// requires a non-empty span starting at or after frame 0.
    pub fn resolve(self, total: i64) -> Result<ResolvedRange, PipelineError> {
        let end = if self.end <= 0 || self.end > total {
            total
        } else {
            self.end
        };
        if self.start < 0 || self.start >= end {
            return Err(PipelineError::InvalidRange {
                start: self.start,
                end,
            });
        }
        Ok(ResolvedRange {
            start: self.start,
            end,
        })
    }
}

impl Default for FrameRange {
    fn default() -> Self {
        Self::all()
    }
}

impl ResolvedRange {
    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
