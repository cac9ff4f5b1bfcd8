use std::path::Path;

use crate::recording::output_format::OutputFormat;
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

/// Parameters a writer is opened with. Dimensions are the encoder's, i.e.
/// already padded if the format required it.
#[derive(Clone, Debug, PartialEq)]
pub struct WriterSettings {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Abstracts video/image-sequence encoding so the pipeline can write output
/// without depending on a specific codec library.
pub trait VideoWriter: Send {
    fn open(&mut self, path: &Path, settings: &WriterSettings) -> Result<(), BoxError>;

    /// Frames arrive at the writer's configured size and a depth legal for
    /// its format.
    fn write(&mut self, frame: &Frame) -> Result<(), BoxError>;

    /// Flushes trailing encoder state and releases the output file.
    fn close(&mut self) -> Result<(), BoxError>;
}
