use std::path::{Path, PathBuf};

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::Rational;

use crate::shared::error::BoxError;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Converts each decoded frame to RGB24 and wraps it in a [`Frame`] whose
/// index is derived from the frame's presentation timestamp. Call
/// [`crate::video::infrastructure::media::init`] once before starting a
/// source.
pub struct FfmpegFrameSource {
    path: PathBuf,
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    decoder: Option<ffmpeg_next::decoder::Video>,
    scaler: Option<ScalingContext>,
    video_stream_index: usize,
    time_base: Rational,
    start_pts: i64,
    metadata: Option<VideoMetadata>,
    next_index: i64,
    skip_before: i64,
    flushing: bool,
    done: bool,
    exact_count: Option<i64>,
}

// Safety: FfmpegFrameSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            input_ctx: None,
            decoder: None,
            scaler: None,
            video_stream_index: 0,
            time_base: Rational(1, 1),
            start_pts: 0,
            metadata: None,
            next_index: 0,
            skip_before: 0,
            flushing: false,
            done: false,
            exact_count: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for FfmpegFrameSource {
    fn start(&mut self) -> Result<VideoMetadata, BoxError> {
        let ictx = ffmpeg_next::format::input(&self.path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let time_base = stream.time_base();
        let start_pts = match stream.start_time() {
            ffmpeg_next::ffi::AV_NOPTS_VALUE => 0,
            pts => pts,
        };
        let header_frames = stream.frames();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let total_frames = if header_frames > 0 {
            header_frames
        } else {
            estimate_from_duration(ictx.duration(), fps)
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(self.path.clone()),
        };

        log::debug!(
            "Opened {} ({}x{} @ {:.3} fps, ~{} frames, codec {})",
            self.path.display(),
            width,
            height,
            fps,
            total_frames,
            metadata.codec
        );

        self.video_stream_index = video_stream_index;
        self.time_base = time_base;
        self.start_pts = start_pts;
        self.metadata = Some(metadata.clone());
        self.decoder = Some(decoder);
        self.scaler = Some(scaler);
        self.input_ctx = Some(ictx);
        self.next_index = 0;
        self.skip_before = 0;
        self.flushing = false;
        self.done = false;

        Ok(metadata)
    }

    fn frame_rate(&self) -> f64 {
        self.metadata.as_ref().map(|m| m.fps).unwrap_or(0.0)
    }

    fn dimensions(&self) -> (u32, u32) {
        self.metadata
            .as_ref()
            .map(|m| (m.width, m.height))
            .unwrap_or((0, 0))
    }

    fn total_frames(&self) -> i64 {
        self.metadata.as_ref().map(|m| m.total_frames).unwrap_or(0)
    }

    fn seek(&mut self, frame_index: i64) -> Result<(), BoxError> {
        let (Some(ictx), Some(decoder)) = (self.input_ctx.as_mut(), self.decoder.as_mut()) else {
            return Err("FfmpegFrameSource: not started".into());
        };

        // Already positioned (e.g. a fresh context asked for frame 0): no
        // container seek, since that can fail on some platforms.
        if frame_index != self.next_index || self.done {
            let fps = self.metadata.as_ref().map(|m| m.fps).unwrap_or(0.0);
            let seek_ts = frame_index_to_seek_timestamp(frame_index, fps);
            ictx.seek(seek_ts, ..seek_ts)
                .map_err(|e| format!("seek to frame {frame_index} failed: {e}"))?;
            decoder.flush();
        }

        self.next_index = frame_index;
        self.skip_before = frame_index;
        self.flushing = false;
        self.done = false;
        Ok(())
    }

    fn grab_frame(&mut self) -> Result<Option<Frame>, BoxError> {
        let (Some(ictx), Some(decoder), Some(scaler)) = (
            self.input_ctx.as_mut(),
            self.decoder.as_mut(),
            self.scaler.as_mut(),
        ) else {
            return Err("FfmpegFrameSource: not started".into());
        };
        let fps = self.metadata.as_ref().map(|m| m.fps).unwrap_or(0.0);

        loop {
            if self.done {
                return Ok(None);
            }

            let mut decoded = VideoFrame::empty();
            if decoder.receive_frame(&mut decoded).is_ok() {
                let index = match decoded.timestamp().or(decoded.pts()) {
                    Some(pts) if fps > 0.0 => {
                        pts_to_frame_index(pts - self.start_pts, self.time_base, fps)
                    }
                    _ => self.next_index,
                };
                self.next_index = index + 1;

                // Pre-roll between the keyframe and the seek target
                if index < self.skip_before {
                    continue;
                }

                let mut rgb_frame = VideoFrame::empty();
                scaler.run(&decoded, &mut rgb_frame)?;
                let width = decoded.width();
                let height = decoded.height();
                let pixels = extract_rgb_pixels(&rgb_frame, width, height);
                return Ok(Some(Frame::new(
                    pixels,
                    width,
                    height,
                    3,
                    index.max(0) as usize,
                )));
            }

            if self.flushing {
                self.done = true;
                continue;
            }

            match ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.video_stream_index {
                        continue;
                    }
                    if let Err(e) = decoder.send_packet(&packet) {
                        log::debug!("Decoder rejected packet: {e}");
                    }
                }
                None => {
                    let _ = decoder.send_eof();
                    self.flushing = true;
                }
            }
        }
    }

    fn exact_frame_count(&mut self) -> Option<i64> {
        if let Some(count) = self.exact_count {
            return Some(count);
        }
        self.metadata.as_ref()?;

        match count_video_packets(&self.path, self.video_stream_index) {
            Ok(count) => {
                log::debug!("Exact frame count for {}: {count}", self.path.display());
                self.exact_count = Some(count);
                Some(count)
            }
            Err(e) => {
                log::warn!("Frame counting pass failed ({e}); using header estimate");
                None
            }
        }
    }
}

/// Counts the packets of one stream by demuxing the whole file. For video
/// streams every packet carries exactly one frame.
fn count_video_packets(path: &Path, stream_index: usize) -> Result<i64, BoxError> {
    let mut ictx = ffmpeg_next::format::input(path)?;
    let count = ictx
        .packets()
        .filter(|(stream, _)| stream.index() == stream_index)
        .count();
    Ok(count as i64)
}

/// `duration` is in `AV_TIME_BASE` units (microseconds).
fn estimate_from_duration(duration: i64, fps: f64) -> i64 {
    if duration <= 0 || fps <= 0.0 {
        return 0;
    }
    (duration as f64 / 1_000_000.0 * fps).round() as i64
}

/// Converts a frame index to a container-level seek timestamp.
///
/// `Input::seek` uses stream index -1, which expects `AV_TIME_BASE`
/// (microseconds) rather than the stream's own time base.
fn frame_index_to_seek_timestamp(frame_index: i64, fps: f64) -> i64 {
    if fps <= 0.0 {
        return 0;
    }
    (frame_index as f64 / fps * 1_000_000.0) as i64
}

fn pts_to_frame_index(pts: i64, time_base: Rational, fps: f64) -> i64 {
    let seconds = pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    (seconds * fps).round() as i64
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
/// This function strips that padding to produce a tightly-packed pixel buffer.
fn extract_rgb_pixels(rgb_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
