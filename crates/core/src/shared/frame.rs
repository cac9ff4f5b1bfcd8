/// Numeric representation of a single sample.
///
/// Decoded video is always `U8`; wider depths only appear inside
/// accumulators or after explicit conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleDepth {
    U8,
    U16,
    I64,
    F64,
}

impl SampleDepth {
    /// Largest representable value for the unsigned integer depths.
    pub fn max_value(self) -> Option<f64> {
        match self {
            SampleDepth::U8 => Some(u8::MAX as f64),
            SampleDepth::U16 => Some(u16::MAX as f64),
            SampleDepth::I64 | SampleDepth::F64 => None,
        }
    }
}

/// Typed sample storage, row-major, channels interleaved.
#[derive(Clone, Debug, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I64(Vec<i64>),
    F64(Vec<f64>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::I64(v) => v.len(),
            Samples::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn depth(&self) -> SampleDepth {
        match self {
            Samples::U8(_) => SampleDepth::U8,
            Samples::U16(_) => SampleDepth::U16,
            Samples::I64(_) => SampleDepth::I64,
            Samples::F64(_) => SampleDepth::F64,
        }
    }

    /// Returns `(min, max)` over every sample, or `None` when empty.
    pub fn extent(&self) -> Option<(f64, f64)> {
        fn fold<T: Copy>(values: &[T], to_f64: impl Fn(T) -> f64) -> Option<(f64, f64)> {
            values.iter().fold(None, |acc, &v| {
                let v = to_f64(v);
                match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                }
            })
        }
        match self {
            Samples::U8(v) => fold(v, f64::from),
            Samples::U16(v) => fold(v, f64::from),
            Samples::I64(v) => fold(v, |s| s as f64),
            Samples::F64(v) => fold(v, |s| s),
        }
    }
}

/// A single video frame or derived image.
///
/// Pixel data is row-major with interleaved channels (1 = gray, 3 = RGB).
/// Frames move through the pipeline by value; a stage either forwards the
/// frame it received or drops it.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    samples: Samples,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    /// Creates an 8-bit frame.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        Self::from_samples(Samples::U8(data), width, height, channels, index)
    }

    pub fn from_samples(
        samples: Samples,
        width: u32,
        height: u32,
        channels: u8,
        index: usize,
    ) -> Self {
        debug_assert_eq!(
            samples.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            samples,
            width,
            height,
            channels,
            index,
        }
    }

    /// An 8-bit frame with every sample set to `value`.
    pub fn filled(value: u8, width: u32, height: u32, channels: u8, index: usize) -> Self {
        let len = (width as usize) * (height as usize) * (channels as usize);
        Self::new(vec![value; len], width, height, channels, index)
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn into_samples(self) -> Samples {
        self.samples
    }

    /// The 8-bit sample buffer, if this frame is 8-bit.
    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.samples {
            Samples::U8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u8_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.samples {
            Samples::U8(v) => Some(v),
            _ => None,
        }
    }

    pub fn depth(&self) -> SampleDepth {
        self.samples.depth()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// `(height, width, channels)`, the ndarray shape of the sample buffer.
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }

    /// `(width, height, channels)` for error reporting and comparisons.
    pub fn dimensions(&self) -> (u32, u32, u8) {
        (self.width, self.height, self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.depth(), SampleDepth::U8);
        assert_eq!(frame.as_u8(), Some(&data[..]));
    }

    #[test]
    fn test_as_u8_mut_allows_modification() {
        let mut frame = Frame::filled(0, 2, 1, 3, 0);
        frame.as_u8_mut().unwrap()[0] = 255;
        assert_eq!(frame.as_u8().unwrap()[0], 255);
    }

    #[test]
    fn test_wide_frame_has_no_u8_view() {
        let frame = Frame::from_samples(Samples::I64(vec![0; 4]), 2, 2, 1, 0);
        assert_eq!(frame.depth(), SampleDepth::I64);
        assert!(frame.as_u8().is_none());
    }

    #[test]
    fn test_clone_is_independent() {
        let frame = Frame::filled(100, 2, 2, 3, 0);
        let mut cloned = frame.clone();
        cloned.as_u8_mut().unwrap()[0] = 0;
        assert_eq!(frame.as_u8().unwrap()[0], 100);
        assert_eq!(cloned.as_u8().unwrap()[0], 0);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_shape_is_height_width_channels() {
        let frame = Frame::filled(0, 4, 2, 3, 0);
        assert_eq!(frame.shape(), (2, 4, 3));
        assert_eq!(frame.dimensions(), (4, 2, 3));
    }

    #[test]
    fn test_extent_over_all_samples() {
        let samples = Samples::I64(vec![-3, 7, 2, 0]);
        assert_eq!(samples.extent(), Some((-3.0, 7.0)));
        assert_eq!(Samples::U8(Vec::new()).extent(), None);
    }

    #[test]
    fn test_depth_max_value() {
        assert_eq!(SampleDepth::U8.max_value(), Some(255.0));
        assert_eq!(SampleDepth::U16.max_value(), Some(65535.0));
        assert_eq!(SampleDepth::F64.max_value(), None);
    }
}
