use ndarray::{Array3, ArrayView3, Zip};

use crate::shared::error::PipelineError;
use crate::shared::frame::{Frame, SampleDepth, Samples};
use crate::shared::normalize;
use crate::transform::domain::frame_transform::FrameTransform;

use super::projection_mode::ProjectionMode;

/// Running per-pixel buffer. Min/Max keep the input depth; Sum/Average use
/// `I64` (or `F64` for floating-point input).
enum Buffer {
    U8(Array3<u8>),
    U16(Array3<u16>),
    I64(Array3<i64>),
    F64(Array3<f64>),
}

impl Buffer {
    fn into_samples(self) -> Samples {
        match self {
            Buffer::U8(a) => Samples::U8(a.into_raw_vec_and_offset().0),
            Buffer::U16(a) => Samples::U16(a.into_raw_vec_and_offset().0),
            Buffer::I64(a) => Samples::I64(a.into_raw_vec_and_offset().0),
            Buffer::F64(a) => Samples::F64(a.into_raw_vec_and_offset().0),
        }
    }
}

enum State {
    Empty,
    Accumulating {
        buffer: Buffer,
        dimensions: (u32, u32, u8),
        first_index: usize,
    },
    Finalized,
}

/// Folds a stream of frames into one projected image.
///
/// Used as a pass-through stage: every frame is folded into the running
/// buffer and handed on unchanged. Call [`finalize`](Self::finalize) after
/// the run to take the result.
pub struct ProjectionAccumulator {
    mode: ProjectionMode,
    state: State,
    frames: usize,
}

impl ProjectionAccumulator {
    pub fn new(mode: ProjectionMode) -> Self {
        Self {
            mode,
            state: State::Empty,
            frames: 0,
        }
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    pub fn frames_processed(&self) -> usize {
        self.frames
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, State::Finalized)
    }

    /// Takes the projection. Min/Max/Sum come back at the buffer's depth;
    /// Average comes back min-max normalized to 8-bit.
    pub fn finalize(&mut self) -> Result<Frame, PipelineError> {
        self.finish(None)
    }

    /// Like [`finalize`](Self::finalize) but min-max normalizes into `depth`
    /// (U8 or U16) whenever the buffer depth differs from it.
    pub fn finalize_as(&mut self, depth: SampleDepth) -> Result<Frame, PipelineError> {
        if depth.max_value().is_none() {
            return Err(PipelineError::UnsupportedDepth {
                operation: "projection output",
                depth,
            });
        }
        self.finish(Some(depth))
    }

    fn finish(&mut self, target: Option<SampleDepth>) -> Result<Frame, PipelineError> {
        let (buffer, (width, height, channels), first_index) =
            match std::mem::replace(&mut self.state, State::Finalized) {
                State::Finalized => return Err(PipelineError::AlreadyFinalized),
                State::Empty => {
                    self.state = State::Empty;
                    return Err(PipelineError::NoFramesProcessed);
                }
                State::Accumulating {
                    buffer,
                    dimensions,
                    first_index,
                } => (buffer, dimensions, first_index),
            };

        let frames = self.frames;
        let samples = match (self.mode, buffer) {
            (ProjectionMode::Average, Buffer::I64(sum)) => {
                Samples::F64(sum.mapv(|v| v as f64 / frames as f64).into_raw_vec_and_offset().0)
            }
            (ProjectionMode::Average, Buffer::F64(sum)) => {
                Samples::F64((sum / frames as f64).into_raw_vec_and_offset().0)
            }
            (_, buffer) => buffer.into_samples(),
        };
        let result = Frame::from_samples(samples, width, height, channels, first_index);

        log::debug!(
            "Finalized {} projection over {} frames ({}x{}x{})",
            self.mode,
            frames,
            width,
            height,
            channels
        );

        let target = match (self.mode, target) {
            (_, Some(depth)) => depth,
            (ProjectionMode::Average, None) => SampleDepth::U8,
            (_, None) => return Ok(result),
        };
        if result.depth() == target {
            Ok(result)
        } else {
            normalize::min_max(&result, target)
        }
    }

    fn start_buffer(mode: ProjectionMode, frame: &Frame) -> Result<Buffer, PipelineError> {
        let shape = frame.shape();
        let buffer = match (mode.widens(), frame.samples()) {
            (false, Samples::U8(v)) => Buffer::U8(to_array(shape, v.clone())?),
            (false, Samples::U16(v)) => Buffer::U16(to_array(shape, v.clone())?),
            (false, Samples::I64(v)) => Buffer::I64(to_array(shape, v.clone())?),
            (_, Samples::F64(v)) => Buffer::F64(to_array(shape, v.clone())?),
            (true, Samples::U8(v)) => {
                Buffer::I64(to_array(shape, v.iter().map(|&s| i64::from(s)).collect())?)
            }
            (true, Samples::U16(v)) => {
                Buffer::I64(to_array(shape, v.iter().map(|&s| i64::from(s)).collect())?)
            }
            (true, Samples::I64(v)) => Buffer::I64(to_array(shape, v.clone())?),
        };
        Ok(buffer)
    }

    fn fold(mode: ProjectionMode, buffer: &mut Buffer, frame: &Frame) -> Result<(), PipelineError> {
        let shape = frame.shape();
        match (mode, buffer, frame.samples()) {
            (ProjectionMode::Min, Buffer::U8(acc), Samples::U8(v)) => {
                combine(acc, shape, v.as_slice(), |a, s| *a = (*a).min(s))
            }
            (ProjectionMode::Max, Buffer::U8(acc), Samples::U8(v)) => {
                combine(acc, shape, v.as_slice(), |a, s| *a = (*a).max(s))
            }
            (ProjectionMode::Min, Buffer::U16(acc), Samples::U16(v)) => {
                combine(acc, shape, v.as_slice(), |a, s| *a = (*a).min(s))
            }
            (ProjectionMode::Max, Buffer::U16(acc), Samples::U16(v)) => {
                combine(acc, shape, v.as_slice(), |a, s| *a = (*a).max(s))
            }
            (ProjectionMode::Min, Buffer::I64(acc), Samples::I64(v)) => {
                combine(acc, shape, v.as_slice(), |a, s| *a = (*a).min(s))
            }
            (ProjectionMode::Max, Buffer::I64(acc), Samples::I64(v)) => {
                combine(acc, shape, v.as_slice(), |a, s| *a = (*a).max(s))
            }
            (ProjectionMode::Min, Buffer::F64(acc), Samples::F64(v)) => {
                combine(acc, shape, v.as_slice(), |a, s| *a = (*a).min(s))
            }
            (ProjectionMode::Max, Buffer::F64(acc), Samples::F64(v)) => {
                combine(acc, shape, v.as_slice(), |a, s| *a = (*a).max(s))
            }
            (ProjectionMode::Sum | ProjectionMode::Average, Buffer::I64(acc), samples) => {
                match samples {
                    Samples::U8(v) => combine(acc, shape, v.as_slice(), |a, s| *a += i64::from(s)),
                    Samples::U16(v) => combine(acc, shape, v.as_slice(), |a, s| *a += i64::from(s)),
                    Samples::I64(v) => combine(acc, shape, v.as_slice(), |a, s| *a += s),
                    Samples::F64(_) => Err(depth_changed(frame)),
                }
            }
            (ProjectionMode::Sum | ProjectionMode::Average, Buffer::F64(acc), Samples::F64(v)) => {
                combine(acc, shape, v.as_slice(), |a, s| *a += s)
            }
            _ => Err(depth_changed(frame)),
        }
    }
}

impl FrameTransform for ProjectionAccumulator {
    fn apply(&mut self, frame: Frame) -> Result<Frame, PipelineError> {
        match &mut self.state {
            State::Finalized => return Err(PipelineError::AlreadyFinalized),
            State::Empty => {
                let buffer = Self::start_buffer(self.mode, &frame)?;
                log::debug!(
                    "Started {} projection at frame {} ({:?} samples)",
                    self.mode,
                    frame.index(),
                    frame.depth()
                );
                self.state = State::Accumulating {
                    buffer,
                    dimensions: frame.dimensions(),
                    first_index: frame.index(),
                };
            }
            State::Accumulating {
                buffer, dimensions, ..
            } => {
                if frame.dimensions() != *dimensions {
                    return Err(PipelineError::ShapeMismatch {
                        expected: *dimensions,
                        actual: frame.dimensions(),
                    });
                }
                Self::fold(self.mode, buffer, &frame)?;
            }
        }
        self.frames += 1;
        log::trace!("Projected frame {} ({} so far)", frame.index(), self.frames);
        Ok(frame)
    }

    fn name(&self) -> &str {
        "project"
    }
}

fn to_array<T>(shape: (usize, usize, usize), data: Vec<T>) -> Result<Array3<T>, PipelineError> {
    let len = data.len();
    Array3::from_shape_vec(shape, data).map_err(|_| shape_error(shape, len))
}

fn combine<A, S: Copy>(
    acc: &mut Array3<A>,
    shape: (usize, usize, usize),
    samples: &[S],
    f: impl Fn(&mut A, S),
) -> Result<(), PipelineError> {
    let view = ArrayView3::from_shape(shape, samples).map_err(|_| shape_error(shape, samples.len()))?;
    Zip::from(acc).and(&view).for_each(|a, &s| f(a, s));
    Ok(())
}

fn shape_error((h, w, c): (usize, usize, usize), len: usize) -> PipelineError {
    PipelineError::ShapeMismatch {
        expected: (w as u32, h as u32, c as u8),
        actual: (len as u32, 1, 1),
    }
}

fn depth_changed(frame: &Frame) -> PipelineError {
    PipelineError::UnsupportedDepth {
        operation: "projection after a depth change",
        depth: frame.depth(),
    }
}
