use std::fmt;
use std::path::Path;

use crate::shared::error::PipelineError;
use crate::shared::frame::SampleDepth;

/// Container/codec combination chosen from the target file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Motion JPEG in an AVI container. 8-bit, any dimensions.
    Avi,
    /// H.264 in an MP4 container. 8-bit, even width and height only.
    Mp4,
    /// Multi-page TIFF. 8- or 16-bit, lossless, any dimensions.
    TiffSequence,
}

impl OutputFormat {
    /// Resolves the format strictly from the path's extension.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "mp4" => Ok(OutputFormat::Mp4),
            "avi" => Ok(OutputFormat::Avi),
            "tif" | "tiff" => Ok(OutputFormat::TiffSequence),
            _ => Err(PipelineError::UnsupportedExtension {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }

    /// Sample depth frames are rescaled into before they reach the writer.
    pub fn target_depth(self) -> SampleDepth {
        match self {
            OutputFormat::Avi | OutputFormat::Mp4 => SampleDepth::U8,
            OutputFormat::TiffSequence => SampleDepth::U16,
        }
    }

    pub fn requires_even_dimensions(self) -> bool {
        self == OutputFormat::Mp4
    }

    /// Dimensions the writer is configured with for a requested frame size.
    ///
    /// H.264 with 4:2:0 chroma cannot encode odd sizes, so each odd MP4
    /// dimension is rounded up by one. Other formats take the request as-is.
    pub fn encoder_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        if self.requires_even_dimensions() {
            (round_up_even(width), round_up_even(height))
        } else {
            (width, height)
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Avi => write!(f, "AVI/MJPEG"),
            OutputFormat::Mp4 => write!(f, "MP4/H.264"),
            OutputFormat::TiffSequence => write!(f, "TIFF sequence"),
        }
    }
}

fn round_up_even(value: u32) -> u32 {
    value + (value & 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("out.mp4", OutputFormat::Mp4)]
    #[case("out.MP4", OutputFormat::Mp4)]
    #[case("/tmp/dir/out.avi", OutputFormat::Avi)]
    #[case("stack.tif", OutputFormat::TiffSequence)]
    #[case("stack.tiff", OutputFormat::TiffSequence)]
    fn test_format_from_extension(#[case] path: &str, #[case] expected: OutputFormat) {
        assert_eq!(OutputFormat::from_path(Path::new(path)).unwrap(), expected);
    }

    #[rstest]
    #[case("out.mkv")]
    #[case("out.png")]
    #[case("out")]
    fn test_unknown_extension_is_rejected(#[case] path: &str) {
        assert!(matches!(
            OutputFormat::from_path(Path::new(path)),
            Err(PipelineError::UnsupportedExtension { .. })
        ));
    }

    #[rstest]
    #[case(640, 480, (640, 480))]
    #[case(641, 480, (642, 480))]
    #[case(640, 481, (640, 482))]
    #[case(1, 1, (2, 2))]
    fn test_mp4_dimensions_are_even(
        #[case] w: u32,
        #[case] h: u32,
        #[case] expected: (u32, u32),
    ) {
        let (ew, eh) = OutputFormat::Mp4.encoder_dimensions(w, h);
        assert_eq!((ew, eh), expected);
        assert_eq!(ew % 2, 0);
        assert_eq!(eh % 2, 0);
        assert!(ew == w || ew == w + 1);
        assert!(eh == h || eh == h + 1);
    }

    #[rstest]
    #[case(OutputFormat::Avi)]
    #[case(OutputFormat::TiffSequence)]
    fn test_other_formats_keep_odd_dimensions(#[case] format: OutputFormat) {
        assert_eq!(format.encoder_dimensions(641, 481), (641, 481));
    }

    #[test]
    fn test_target_depths() {
        assert_eq!(OutputFormat::Avi.target_depth(), SampleDepth::U8);
        assert_eq!(OutputFormat::Mp4.target_depth(), SampleDepth::U8);
        assert_eq!(OutputFormat::TiffSequence.target_depth(), SampleDepth::U16);
    }
}
