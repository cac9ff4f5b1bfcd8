use crate::shared::error::PipelineError;
use crate::shared::frame::{Frame, Samples};

/// Enlarges `frame` to `width` x `height` by adding a black (zero) border on
/// the right and bottom edges. Existing pixels keep their coordinates.
///
/// Fails with `ShapeMismatch` if the target is smaller than the frame.
pub fn pad_bottom_right(frame: &Frame, width: u32, height: u32) -> Result<Frame, PipelineError> {
    if width < frame.width() || height < frame.height() {
        return Err(PipelineError::ShapeMismatch {
            expected: (width, height, frame.channels()),
            actual: frame.dimensions(),
        });
    }

    let geometry = Geometry {
        src_row: frame.width() as usize * frame.channels() as usize,
        dst_row: width as usize * frame.channels() as usize,
        src_rows: frame.height() as usize,
        dst_rows: height as usize,
    };

    let samples = match frame.samples() {
        Samples::U8(v) => Samples::U8(geometry.pad(v)),
        Samples::U16(v) => Samples::U16(geometry.pad(v)),
        Samples::I64(v) => Samples::I64(geometry.pad(v)),
        Samples::F64(v) => Samples::F64(geometry.pad(v)),
    };

    Ok(Frame::from_samples(
        samples,
        width,
        height,
        frame.channels(),
        frame.index(),
    ))
}

struct Geometry {
    src_row: usize,
    dst_row: usize,
    src_rows: usize,
    dst_rows: usize,
}

impl Geometry {
    fn pad<T: Copy + Default>(&self, src: &[T]) -> Vec<T> {
        let mut out = vec![T::default(); self.dst_row * self.dst_rows];
        for row in 0..self.src_rows {
            let s = row * self.src_row;
            let d = row * self.dst_row;
            out[d..d + self.src_row].copy_from_slice(&src[s..s + self.src_row]);
        }
        out
    }
}
