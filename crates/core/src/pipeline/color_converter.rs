use crate::shared::frame::{Frame, Samples};

// ITU-R BT.601 luma weights.
const WEIGHT_R: f64 = 0.299;
const WEIGHT_G: f64 = 0.587;
const WEIGHT_B: f64 = 0.114;

/// Converts 3-channel frames to single-channel luma.
///
/// A converter is consumed by one conversion. The driver allocates a new one
/// per frame so no conversion state outlives the frame it served.
pub struct ColorConverter {
    scratch: Vec<f64>,
}

impl ColorConverter {
    pub fn new() -> Self {
        Self {
            scratch: Vec::new(),
        }
    }

    /// Returns `frame` unchanged when it already has one channel.
    pub fn to_gray(mut self, frame: Frame) -> Frame {
        if frame.channels() != 3 {
            return frame;
        }

        let (width, height, index) = (frame.width(), frame.height(), frame.index());
        let pixels = width as usize * height as usize;
        self.scratch.clear();
        self.scratch.reserve(pixels);

        match frame.samples() {
            Samples::U8(v) => self.luma(v, f64::from),
            Samples::U16(v) => self.luma(v, f64::from),
            Samples::I64(v) => self.luma(v, |s| s as f64),
            Samples::F64(v) => self.luma(v, |s| s),
        }

        let samples = match frame.samples() {
            Samples::U8(_) => Samples::U8(self.scratch.iter().map(|&y| y.round() as u8).collect()),
            Samples::U16(_) => {
                Samples::U16(self.scratch.iter().map(|&y| y.round() as u16).collect())
            }
            Samples::I64(_) => {
                Samples::I64(self.scratch.iter().map(|&y| y.round() as i64).collect())
            }
            Samples::F64(_) => Samples::F64(std::mem::take(&mut self.scratch)),
        };

        Frame::from_samples(samples, width, height, 1, index)
    }

    fn luma<T: Copy>(&mut self, rgb: &[T], to_f64: impl Fn(T) -> f64) {
        self.scratch.extend(rgb.chunks_exact(3).map(|px| {
            WEIGHT_R * to_f64(px[0]) + WEIGHT_G * to_f64(px[1]) + WEIGHT_B * to_f64(px[2])
        }));
    }
}

impl Default for ColorConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_and_black_survive() {
        let frame = Frame::new(vec![255, 255, 255, 0, 0, 0], 2, 1, 3, 9);
        let gray = ColorConverter::new().to_gray(frame);
        assert_eq!(gray.dimensions(), (2, 1, 1));
        assert_eq!(gray.index(), 9);
        assert_eq!(gray.as_u8().unwrap(), &[255, 0]);
    }

    #[test]
    fn test_green_weighs_most() {
        let red = ColorConverter::new().to_gray(Frame::new(vec![255, 0, 0], 1, 1, 3, 0));
        let green = ColorConverter::new().to_gray(Frame::new(vec![0, 255, 0], 1, 1, 3, 0));
        let blue = ColorConverter::new().to_gray(Frame::new(vec![0, 0, 255], 1, 1, 3, 0));
        assert_eq!(red.as_u8().unwrap(), &[76]);
        assert_eq!(green.as_u8().unwrap(), &[150]);
        assert_eq!(blue.as_u8().unwrap(), &[29]);
    }

    #[test]
    fn test_single_channel_passes_through() {
        let frame = Frame::filled(17, 3, 3, 1, 0);
        assert_eq!(ColorConverter::new().to_gray(frame.clone()), frame);
    }

    #[test]
    fn test_wide_samples_keep_depth() {
        let frame = Frame::from_samples(Samples::F64(vec![1.0, 1.0, 1.0]), 1, 1, 3, 0);
        let gray = ColorConverter::new().to_gray(frame);
        match gray.samples() {
            Samples::F64(v) => approx::assert_abs_diff_eq!(v[0], 1.0, epsilon = 1e-9),
            other => panic!("unexpected samples {other:?}"),
        }
    }
}
