use crate::recording::output_format::OutputFormat;
use crate::video::domain::video_writer::VideoWriter;

use super::ffmpeg_writer::FfmpegWriter;
use super::tiff_sequence_writer::TiffSequenceWriter;

/// Creates the writer that handles `format`.
///
/// AVI and MP4 go through FFmpeg; TIFF sequences are written directly with
/// the `tiff` crate so 16-bit pages survive.
pub fn create_writer(format: OutputFormat) -> Box<dyn VideoWriter> {
    log::debug!("Creating writer for {format}");
    match format {
        OutputFormat::Avi | OutputFormat::Mp4 => Box::new(FfmpegWriter::new()),
        OutputFormat::TiffSequence => Box::new(TiffSequenceWriter::new()),
    }
}
