use std::path::Path;

use ffmpeg_next::codec::Id as CodecId;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::util::frame::video::Video as VideoFrame;

use crate::recording::output_format::OutputFormat;
use crate::shared::constants::{DEFAULT_FPS, H264_CRF, H264_PRESET};
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;
use crate::video::domain::video_writer::{VideoWriter, WriterSettings};

/// Encodes frames into an MP4 (H.264) or AVI (MJPEG) file via ffmpeg-next.
///
/// Accepts 8-bit gray or RGB frames at exactly the configured size; the
/// recording sink is responsible for depth conversion and padding.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<(Pixel, ScalingContext)>,
    encoder_format: Pixel,
    width: u32,
    height: u32,
    fps_i: i32,
    frame_count: usize,
    video_stream_index: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            encoder_format: Pixel::YUV420P,
            width: 0,
            height: 0,
            fps_i: DEFAULT_FPS,
            frame_count: 0,
            video_stream_index: 0,
        }
    }

    /// Returns a scaler converting `source` pixels into the encoder format,
    /// rebuilt only when the incoming layout changes.
    fn scaler_for(&mut self, source: Pixel) -> Result<&mut ScalingContext, BoxError> {
        let stale = !matches!(&self.scaler, Some((pixel, _)) if *pixel == source);
        if stale {
            let ctx = ScalingContext::get(
                source,
                self.width,
                self.height,
                self.encoder_format,
                self.width,
                self.height,
                ScalingFlags::BILINEAR,
            )?;
            self.scaler = Some((source, ctx));
        }
        match self.scaler.as_mut() {
            Some((_, ctx)) => Ok(ctx),
            None => Err("FfmpegWriter: scaler unavailable".into()),
        }
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(&mut self, path: &Path, settings: &WriterSettings) -> Result<(), BoxError> {
        let (codec, encoder_format, options) = select_codec(settings.format)?;

        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(settings.width);
        encoder_ctx.set_height(settings.height);
        encoder_ctx.set_format(encoder_format);

        let fps_i = settings.fps.round() as i32;
        let fps_i = if fps_i <= 0 { DEFAULT_FPS } else { fps_i };

        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps_i));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps_i, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(options)?;
        ost.set_parameters(&encoder);

        self.video_stream_index = 0; // first stream

        octx.write_header()?;

        log::info!(
            "Encoding {} as {} ({}x{} @ {} fps)",
            path.display(),
            settings.format,
            settings.width,
            settings.height,
            fps_i
        );

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = None;
        self.encoder_format = encoder_format;
        self.width = settings.width;
        self.height = settings.height;
        self.fps_i = fps_i;
        self.frame_count = 0;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), BoxError> {
        if self.encoder.is_none() {
            return Err("FfmpegWriter: not opened".into());
        }
        if frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )
            .into());
        }
        let src = frame
            .as_u8()
            .ok_or_else(|| format!("encoder needs 8-bit samples, got {:?}", frame.depth()))?;
        let (source_pixel, bytes_per_pixel) = match frame.channels() {
            1 => (Pixel::GRAY8, 1),
            3 => (Pixel::RGB24, 3),
            n => return Err(format!("unsupported channel count {n}").into()),
        };

        let mut input = VideoFrame::new(source_pixel, self.width, self.height);
        let stride = input.stride(0);
        let data = input.data_mut(0);
        let row_bytes = self.width as usize * bytes_per_pixel;

        // Copy pixel data, respecting stride
        for row in 0..self.height as usize {
            let src_start = row * row_bytes;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }

        let mut yuv_frame = VideoFrame::empty();
        self.scaler_for(source_pixel)?.run(&input, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        encoder.send_frame(&yuv_frame)?;
        drain_packets(encoder, octx, self.video_stream_index, self.fps_i)?;

        self.frame_count += 1;
        Ok(())
    }

    /// Flushes and releases the encoder. The handles are released even when
    /// flushing fails, so a second call is always a no-op.
    fn close(&mut self) -> Result<(), BoxError> {
        let encoder = self.encoder.take();
        let octx = self.octx.take();
        self.scaler = None;

        if let (Some(mut encoder), Some(mut octx)) = (encoder, octx) {
            encoder.send_eof()?;
            drain_packets(&mut encoder, &mut octx, self.video_stream_index, self.fps_i)?;
            octx.write_trailer()?;
            log::debug!("Encoder flushed after {} frames", self.frame_count);
        }
        Ok(())
    }
}

fn drain_packets(
    encoder: &mut ffmpeg_next::codec::encoder::video::Encoder,
    octx: &mut ffmpeg_next::format::context::Output,
    stream_index: usize,
    fps_i: i32,
) -> Result<(), BoxError> {
    let ost_time_base = octx
        .stream(stream_index)
        .ok_or("output stream missing")?
        .time_base();

    let mut encoded = ffmpeg_next::Packet::empty();
    while encoder.receive_packet(&mut encoded).is_ok() {
        encoded.set_stream(stream_index);
        encoded.rescale_ts(ffmpeg_next::Rational(1, fps_i), ost_time_base);
        encoded.write_interleaved(octx)?;
    }
    Ok(())
}

/// Picks the encoder, its pixel format and open options for a container.
///
/// MP4 prefers H.264 and falls back to MPEG-4 Part 2 when FFmpeg was built
/// without libx264.
fn select_codec(
    format: OutputFormat,
) -> Result<(ffmpeg_next::Codec, Pixel, ffmpeg_next::Dictionary<'static>), BoxError> {
    match format {
        OutputFormat::Mp4 => {
            if let Some(h264) = ffmpeg_next::encoder::find(CodecId::H264) {
                let mut opts = ffmpeg_next::Dictionary::new();
                opts.set("crf", H264_CRF);
                opts.set("preset", H264_PRESET);
                return Ok((h264, Pixel::YUV420P, opts));
            }
            log::warn!("H.264 encoder not found, falling back to MPEG-4");
            let mpeg4 = ffmpeg_next::encoder::find(CodecId::MPEG4)
                .ok_or("neither H.264 nor MPEG-4 encoder available")?;
            Ok((mpeg4, Pixel::YUV420P, ffmpeg_next::Dictionary::new()))
        }
        OutputFormat::Avi => {
            let mjpeg =
                ffmpeg_next::encoder::find(CodecId::MJPEG).ok_or("MJPEG encoder not found")?;
            Ok((mjpeg, Pixel::YUVJ420P, ffmpeg_next::Dictionary::new()))
        }
        OutputFormat::TiffSequence => {
            Err("TIFF sequences are written by TiffSequenceWriter, not FFmpeg".into())
        }
    }
}
