use std::path::PathBuf;
use std::time::Duration;

/// Stream properties reported by a [`FrameSource`](crate::video::domain::frame_source::FrameSource)
/// when it starts.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Header estimate; see `resolve_total_frames` for the authoritative count.
    pub total_frames: i64,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Playback length implied by the header frame count, if the rate is known.
    pub fn estimated_duration(&self) -> Option<Duration> {
        if self.fps > 0.0 && self.total_frames > 0 {
            Some(Duration::from_secs_f64(self.total_frames as f64 / self.fps))
        } else {
            None
        }
    }

    /// Path for log lines; in-memory sources show as `<stream>`.
    pub fn source_label(&self) -> String {
        self.source_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stream>".into())
    }
}
