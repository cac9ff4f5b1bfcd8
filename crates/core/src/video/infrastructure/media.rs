//! One-time FFmpeg setup.
//!
//! The embedding application calls [`init`] once before constructing any
//! frame source or writer. Nothing in the pipeline initializes FFmpeg on its
//! own.

use crate::shared::error::BoxError;

/// Registers FFmpeg codecs/formats and quiets libav's own stderr logging
/// (errors are reported through the pipeline instead). Safe to call more
/// than once.
pub fn init() -> Result<(), BoxError> {
    ffmpeg_next::init()?;
    ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
    log::debug!("FFmpeg initialized");
    Ok(())
}
