use crate::shared::error::BoxError;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Decodes a video and yields its frames in order.
///
/// Implementations handle I/O details (codec, container format, etc.)
/// while the pipeline works with the abstract `Frame` and `VideoMetadata`
/// types. Frames are 8-bit; color sources yield 3-channel RGB.
pub trait FrameSource: Send {
    /// Opens the underlying media and returns its metadata.
    fn start(&mut self) -> Result<VideoMetadata, BoxError>;

    fn frame_rate(&self) -> f64;

    /// `(width, height)` of decoded frames; `(0, 0)` before `start`.
    fn dimensions(&self) -> (u32, u32);

    /// Frame count as reported by the container header. May be an estimate.
    fn total_frames(&self) -> i64;

    /// Positions the source so the next `grab_frame` returns `frame_index`.
    fn seek(&mut self, frame_index: i64) -> Result<(), BoxError>;

    /// Decodes the next frame, or `None` once the stream is exhausted.
    fn grab_frame(&mut self) -> Result<Option<Frame>, BoxError>;

    /// Exact frame count, if the source can determine one. Default: unknown.
    fn exact_frame_count(&mut self) -> Option<i64> {
        None
    }
}

/// Authoritative frame count for a started source: the exact count when the
/// source can supply one, otherwise the header estimate.
pub fn resolve_total_frames(source: &mut dyn FrameSource) -> i64 {
    match source.exact_frame_count() {
        Some(count) => count,
        None => {
            let estimate = source.total_frames();
            log::debug!("Exact frame count unavailable, using header estimate {estimate}");
            estimate
        }
    }
}
