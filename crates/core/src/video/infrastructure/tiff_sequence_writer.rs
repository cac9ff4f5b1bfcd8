use std::fs::File;
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder};

use crate::shared::error::BoxError;
use crate::shared::frame::{Frame, Samples};
use crate::video::domain::video_writer::{VideoWriter, WriterSettings};

/// Writes every frame as one page of a multi-page TIFF.
///
/// Pages are lossless and keep the frame's depth: 8-bit frames become
/// Gray8/RGB8 pages, 16-bit frames Gray16/RGB16 pages.
pub struct TiffSequenceWriter {
    encoder: Option<TiffEncoder<File>>,
    width: u32,
    height: u32,
    pages: usize,
}

impl TiffSequenceWriter {
    pub fn new() -> Self {
        Self {
            encoder: None,
            width: 0,
            height: 0,
            pages: 0,
        }
    }
}

impl Default for TiffSequenceWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for TiffSequenceWriter {
    fn open(&mut self, path: &Path, settings: &WriterSettings) -> Result<(), BoxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        self.encoder = Some(TiffEncoder::new(file)?);
        self.width = settings.width;
        self.height = settings.height;
        self.pages = 0;
        log::info!(
            "Writing TIFF pages to {} ({}x{})",
            path.display(),
            settings.width,
            settings.height
        );
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), BoxError> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or("TiffSequenceWriter: not opened")?;
        if frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "frame is {}x{}, sequence expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )
            .into());
        }

        let (w, h) = (frame.width(), frame.height());
        match (frame.samples(), frame.channels()) {
            (Samples::U8(data), 1) => encoder.write_image::<colortype::Gray8>(w, h, data)?,
            (Samples::U8(data), 3) => encoder.write_image::<colortype::RGB8>(w, h, data)?,
            (Samples::U16(data), 1) => encoder.write_image::<colortype::Gray16>(w, h, data)?,
            (Samples::U16(data), 3) => encoder.write_image::<colortype::RGB16>(w, h, data)?,
            (samples, channels) => {
                return Err(format!(
                    "cannot store {:?} samples with {channels} channels in TIFF",
                    samples.depth()
                )
                .into())
            }
        }

        self.pages += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        if self.encoder.take().is_some() {
            log::debug!("TIFF sequence closed after {} pages", self.pages);
        }
        Ok(())
    }
}
