use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::shared::error::PipelineError;
use crate::shared::frame::{Frame, SampleDepth};
use crate::shared::{normalize, padding};
use crate::transform::domain::frame_transform::FrameTransform;
use crate::video::domain::video_writer::{VideoWriter, WriterSettings};
use crate::video::infrastructure::writer_factory;

use super::output_format::OutputFormat;

/// Builds the writer for a resolved output format.
pub type WriterFactory = Box<dyn Fn(OutputFormat) -> Box<dyn VideoWriter> + Send>;

struct RecorderState {
    format: OutputFormat,
    writer: Box<dyn VideoWriter>,
    path: PathBuf,
    requested: (u32, u32),
    encoder: (u32, u32),
    refit_needed: bool,
    frames_written: usize,
}

/// Terminal stage that writes every frame to a video file or TIFF sequence.
///
/// Frames wider than 8 bits are min-max normalized to the format's depth and,
/// when the format cannot encode the requested size, padded with black on
/// the right and bottom. The frame itself is passed on unchanged.
pub struct RecordingSink {
    factory: WriterFactory,
    state: Option<RecorderState>,
    closed: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::with_factory(Box::new(writer_factory::create_writer))
    }

    pub fn with_factory(factory: WriterFactory) -> Self {
        Self {
            factory,
            state: None,
            closed: false,
        }
    }

    /// Opens the output. The format comes strictly from the extension of
    /// `path`; nothing is created for an unsupported one.
    pub fn start(
        &mut self,
        path: &Path,
        width: u32,
        height: u32,
        frame_rate: f64,
    ) -> Result<(), PipelineError> {
        let format = OutputFormat::from_path(path)?;

        if self.state.is_some() {
            log::warn!("Recording sink restarted; closing previous output");
            self.close()?;
        }

        let encoder = format.encoder_dimensions(width, height);
        let refit_needed = encoder != (width, height);
        if refit_needed {
            log::info!(
                "{format} needs even dimensions: padding {width}x{height} to {}x{}",
                encoder.0,
                encoder.1
            );
        }

        let settings = WriterSettings {
            format,
            width: encoder.0,
            height: encoder.1,
            fps: frame_rate,
        };
        let mut writer = (self.factory)(format);
        writer
            .open(path, &settings)
            .map_err(|source| PipelineError::WriterOpen {
                path: path.to_path_buf(),
                source,
            })?;

        self.state = Some(RecorderState {
            format,
            writer,
            path: path.to_path_buf(),
            requested: (width, height),
            encoder,
            refit_needed,
            frames_written: 0,
        });
        self.closed = false;
        Ok(())
    }

    /// Flushes and releases the writer. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<(), PipelineError> {
        if self.closed {
            return Ok(());
        }
        let Some(mut state) = self.state.take() else {
            return Ok(());
        };
        self.closed = true;
        state.writer.close().map_err(PipelineError::EncoderFlush)?;
        log::info!(
            "Wrote {} frames to {}",
            state.frames_written,
            state.path.display()
        );
        Ok(())
    }

    pub fn format(&self) -> Option<OutputFormat> {
        self.state.as_ref().map(|s| s.format)
    }

    pub fn requested_dimensions(&self) -> Option<(u32, u32)> {
        self.state.as_ref().map(|s| s.requested)
    }

    pub fn encoder_dimensions(&self) -> Option<(u32, u32)> {
        self.state.as_ref().map(|s| s.encoder)
    }

    pub fn refit_needed(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.refit_needed)
    }

    pub fn frames_written(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.frames_written)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTransform for RecordingSink {
    fn apply(&mut self, frame: Frame) -> Result<Frame, PipelineError> {
        let state = self.state.as_mut().ok_or(PipelineError::NotStarted)?;

        let (width, height) = (frame.width(), frame.height());
        if (width, height) != state.requested {
            return Err(PipelineError::Encode {
                index: frame.index(),
                source: format!(
                    "frame {width}x{height}, sink expects {}x{}",
                    state.requested.0, state.requested.1
                )
                .into(),
            });
        }

        let target = state.format.target_depth();
        let mut prepared = if frame.depth() == SampleDepth::U8 || frame.depth() == target {
            Cow::Borrowed(&frame)
        } else {
            Cow::Owned(normalize::min_max(&frame, target)?)
        };
        if state.refit_needed {
            let (w, h) = state.encoder;
            prepared = Cow::Owned(padding::pad_bottom_right(&prepared, w, h)?);
        }

        state
            .writer
            .write(&prepared)
            .map_err(|source| PipelineError::Encode {
                index: frame.index(),
                source,
            })?;
        state.frames_written += 1;
        log::trace!("Recorded frame {}", frame.index());

        drop(prepared);
        Ok(frame)
    }

    fn name(&self) -> &str {
        "record"
    }
}

impl Drop for RecordingSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close recording on drop: {e}");
        }
    }
}
