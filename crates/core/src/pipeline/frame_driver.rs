use std::time::{Duration, Instant};

use crate::shared::constants::{DEFAULT_PROGRESS_LABEL, WARM_UP_FRAMES};
use crate::shared::error::PipelineError;
use crate::transform::domain::frame_transform::FrameTransform;
use crate::video::domain::frame_source::{resolve_total_frames, FrameSource};

use super::color_converter::ColorConverter;
use super::frame_range::{FrameRange, ResolvedRange};
use super::pipeline_logger::PipelineLogger;

/// Knobs for one driver run.
#[derive(Clone, Debug, PartialEq)]
pub struct DriverConfig {
    /// Convert color frames to single-channel luma before the chain.
    pub force_grayscale: bool,
    /// Decode and discard a couple of frames before `start` so inter-frame
    /// codecs have reference state when the range begins.
    pub warm_up: bool,
    pub progress_label: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            force_grayscale: false,
            warm_up: false,
            progress_label: DEFAULT_PROGRESS_LABEL.to_string(),
        }
    }
}

/// What a completed run covered.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub start: i64,
    pub end: i64,
    pub frames_processed: usize,
    pub elapsed: Duration,
}

/// Pulls frames from a source across a frame range and pushes each one
/// through a transform chain.
///
/// The final stage of the chain owns the frame; whatever the chain returns
/// is dropped here. Any error stops the run immediately.
pub struct FrameDriver {
    config: DriverConfig,
}

impl FrameDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Checks `range` against the source's frame count without decoding.
    pub fn resolve(
        &self,
        source: &mut dyn FrameSource,
        range: FrameRange,
    ) -> Result<ResolvedRange, PipelineError> {
        let total = resolve_total_frames(source);
        range.resolve(total)
    }

    /// Resolves `range` and runs it.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        range: FrameRange,
        chain: &mut dyn FrameTransform,
        logger: &mut dyn PipelineLogger,
    ) -> Result<RunSummary, PipelineError> {
        let resolved = self.resolve(source, range)?;
        self.run_range(source, resolved, chain, logger)
    }

    pub fn run_range(
        &self,
        source: &mut dyn FrameSource,
        range: ResolvedRange,
        chain: &mut dyn FrameTransform,
        logger: &mut dyn PipelineLogger,
    ) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let (start, end) = (range.start(), range.end());
        let total = range.len();
        let label = self.config.progress_label.as_str();

        log::info!(
            "{label}: frames {start}..{end} through '{}'",
            chain.name()
        );

        self.position(source, start, end)?;

        for index in start..end {
            let t_decode = Instant::now();
            let frame = source
                .grab_frame()
                .map_err(PipelineError::Source)?
                .ok_or(PipelineError::PrematureEndOfStream { index, end })?;
            logger.timing("decode", elapsed_ms(t_decode));

            let frame = if self.config.force_grayscale && frame.channels() > 1 {
                // Fresh per frame; never cached across iterations.
                let converter = ColorConverter::new();
                converter.to_gray(frame)
            } else {
                frame
            };

            let t_chain = Instant::now();
            let _ = chain.apply(frame)?;
            logger.timing("transform", elapsed_ms(t_chain));

            logger.progress((index - start + 1) as usize, total, label);
        }

        let summary = RunSummary {
            start,
            end,
            frames_processed: total,
            elapsed: started.elapsed(),
        };
        logger.info(&format!(
            "{label}: done, {} frames in {:.1}s",
            summary.frames_processed,
            summary.elapsed.as_secs_f64()
        ));
        Ok(summary)
    }

    /// Seeks to `start`, optionally priming the decoder with frames that are
    /// decoded and thrown away.
    fn position(
        &self,
        source: &mut dyn FrameSource,
        start: i64,
        end: i64,
    ) -> Result<(), PipelineError> {
        if !self.config.warm_up || start == 0 {
            return source.seek(start).map_err(PipelineError::Source);
        }

        let warm_start = (start - WARM_UP_FRAMES).max(0);
        source.seek(warm_start).map_err(PipelineError::Source)?;
        for index in warm_start..start {
            source
                .grab_frame()
                .map_err(PipelineError::Source)?
                .ok_or(PipelineError::PrematureEndOfStream { index, end })?;
        }
        log::debug!("Warmed up decoder on frames {warm_start}..{start}");
        Ok(())
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
