use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::util::frame::video::Video as VideoFrame;

use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

/// Loads a still image (mask, background plate) as a single 8-bit frame.
///
/// Uses ffmpeg for decoding, which is significantly faster than the pure-Rust
/// `image` crate for large images and accepts the same files the video
/// source does.
pub struct ImageFileReader {
    grayscale: bool,
}

impl ImageFileReader {
    /// `grayscale` selects a 1-channel result; otherwise RGB.
    pub fn new(grayscale: bool) -> Self {
        Self { grayscale }
    }

    pub fn read(&self, path: &Path) -> Result<Frame, BoxError> {
        let mut ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| format!("no image data in {}", path.display()))?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let mut decoder = codec_ctx.decoder().video()?;

        let (pixel, channels) = if self.grayscale {
            (Pixel::GRAY8, 1u8)
        } else {
            (Pixel::RGB24, 3u8)
        };
        let width = decoder.width();
        let height = decoder.height();
        let mut scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            pixel,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let mut decoded = VideoFrame::empty();
        let mut got_frame = false;
        for (stream, packet) in ictx.packets() {
            if stream.index() != stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;
            if decoder.receive_frame(&mut decoded).is_ok() {
                got_frame = true;
                break;
            }
        }
        if !got_frame {
            // Flush decoder for formats that buffer the single frame
            let _ = decoder.send_eof();
            decoder
                .receive_frame(&mut decoded)
                .map_err(|_| format!("failed to decode {}", path.display()))?;
        }

        let mut converted = VideoFrame::empty();
        scaler.run(&decoded, &mut converted)?;

        let row_bytes = width as usize * channels as usize;
        let stride = converted.stride(0);
        let data = converted.data(0);
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&data[start..start + row_bytes]);
        }

        log::debug!(
            "Loaded {} ({}x{}, {} channel(s))",
            path.display(),
            width,
            height,
            channels
        );
        Ok(Frame::new(pixels, width, height, channels, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::infrastructure::media;
    use std::path::PathBuf;

    fn write_test_image(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("test.png");
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([50, 100, 200]);
        }
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_reads_rgb_pixels() {
        media::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), 100, 80);

        let frame = ImageFileReader::new(false).read(&path).unwrap();
        assert_eq!(frame.dimensions(), (100, 80, 3));
        assert_eq!(frame.index(), 0);
        assert_eq!(&frame.as_u8().unwrap()[..3], &[50, 100, 200]);
    }

    #[test]
    fn test_reads_gray_mask() {
        media::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        let mut img = image::GrayImage::new(4, 2);
        img.put_pixel(0, 0, image::Luma([255]));
        img.save(&path).unwrap();

        let frame = ImageFileReader::new(true).read(&path).unwrap();
        assert_eq!(frame.dimensions(), (4, 2, 1));
        assert_eq!(frame.as_u8().unwrap()[0], 255);
        assert_eq!(frame.as_u8().unwrap()[1], 0);
    }

    #[test]
    fn test_nonexistent_file_is_error() {
        media::init().unwrap();
        let reader = ImageFileReader::new(true);
        assert!(reader.read(Path::new("/nonexistent/test.png")).is_err());
    }
}
