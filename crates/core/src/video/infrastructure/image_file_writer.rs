use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma, Rgb};

use crate::shared::constants::SIXTEEN_BIT_IMAGE_EXTENSIONS;
use crate::shared::error::BoxError;
use crate::shared::frame::{Frame, Samples};
use crate::video::domain::image_writer::ImageWriter;

/// Writes a single frame to an image file using the `image` crate.
///
/// 8-bit frames can go to any format `image` knows by extension; 16-bit
/// frames only to PNG or TIFF.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), BoxError> {
        // Ensure parent directory exists (infrastructure concern)
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let img = to_dynamic_image(frame)?;
        if matches!(frame.samples(), Samples::U16(_)) && !supports_sixteen_bit(path) {
            return Err(format!("{} cannot hold 16-bit samples", path.display()).into());
        }

        img.save(path)?;
        Ok(())
    }
}

pub(crate) fn supports_sixteen_bit(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SIXTEEN_BIT_IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn to_dynamic_image(frame: &Frame) -> Result<DynamicImage, BoxError> {
    let (w, h) = (frame.width(), frame.height());
    let built = match (frame.samples(), frame.channels()) {
        (Samples::U8(data), 1) => {
            ImageBuffer::<Luma<u8>, _>::from_raw(w, h, data.clone()).map(DynamicImage::ImageLuma8)
        }
        (Samples::U8(data), 3) => {
            ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, data.clone()).map(DynamicImage::ImageRgb8)
        }
        (Samples::U16(data), 1) => ImageBuffer::<Luma<u16>, _>::from_raw(w, h, data.clone())
            .map(DynamicImage::ImageLuma16),
        (Samples::U16(data), 3) => ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, data.clone())
            .map(DynamicImage::ImageRgb16),
        (samples, channels) => {
            return Err(format!(
                "cannot save {:?} samples with {channels} channels as an image",
                samples.depth()
            )
            .into())
        }
    };
    built.ok_or_else(|| "Failed to create image from frame data".into())
}
