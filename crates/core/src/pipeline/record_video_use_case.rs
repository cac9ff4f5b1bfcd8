use std::path::Path;

use crate::recording::output_format::OutputFormat;
use crate::recording::recording_sink::RecordingSink;
use crate::shared::error::PipelineError;
use crate::transform::domain::transform_chain::TransformChain;
use crate::video::domain::frame_source::FrameSource;

use super::frame_driver::{DriverConfig, FrameDriver, RunSummary};
use super::frame_range::FrameRange;
use super::pipeline_logger::PipelineLogger;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordingConfig {
    pub range: FrameRange,
    pub driver: DriverConfig,
    /// Output frame rate; the source's rate when `None`.
    pub frame_rate: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordingOutcome {
    pub summary: RunSummary,
    pub format: OutputFormat,
    pub encoder_dimensions: (u32, u32),
    pub frames_written: usize,
}

/// Re-encodes a frame range of a video through a transform chain.
///
/// The sink is closed on every exit path once it has been started. When
/// both the run and the close fail, the run's error is returned. This is a
/// single-use struct: calling `execute` twice fails with `AlreadyExecuted`.
pub struct RecordVideoUseCase<'a> {
    source: Option<Box<dyn FrameSource>>,
    chain: Option<TransformChain<'a>>,
    sink: Option<RecordingSink>,
    config: RecordingConfig,
}

impl<'a> RecordVideoUseCase<'a> {
    pub fn new(
        source: Box<dyn FrameSource>,
        chain: TransformChain<'a>,
        sink: RecordingSink,
        config: RecordingConfig,
    ) -> Self {
        Self {
            source: Some(source),
            chain: Some(chain),
            sink: Some(sink),
            config,
        }
    }

    pub fn execute(
        &mut self,
        output: &Path,
        logger: &mut dyn PipelineLogger,
    ) -> Result<RecordingOutcome, PipelineError> {
        let mut source = self.source.take().ok_or(PipelineError::AlreadyExecuted)?;
        let mut chain = self.chain.take().ok_or(PipelineError::AlreadyExecuted)?;
        let mut sink = self.sink.take().ok_or(PipelineError::AlreadyExecuted)?;

        // Fail on a bad extension or range before the output file exists.
        let format = OutputFormat::from_path(output)?;
        let metadata = source.start().map_err(PipelineError::Source)?;
        let driver = FrameDriver::new(self.config.driver.clone());
        let range = driver.resolve(source.as_mut(), self.config.range)?;

        if let Some(duration) = metadata.estimated_duration() {
            log::debug!(
                "Source {} runs about {:.1}s",
                metadata.source_label(),
                duration.as_secs_f64()
            );
        }
        let frame_rate = self.config.frame_rate.unwrap_or(metadata.fps);
        log::info!(
            "Recording {} frames to {} as {format} at {frame_rate:.2} fps",
            range.len(),
            output.display()
        );
        sink.start(output, metadata.width, metadata.height, frame_rate)?;
        let encoder_dimensions = sink
            .encoder_dimensions()
            .unwrap_or((metadata.width, metadata.height));

        let run_result = {
            let mut stages = TransformChain::new()
                .and_then(&mut chain)
                .and_then(&mut sink);
            driver.run_range(source.as_mut(), range, &mut stages, logger)
        };
        let frames_written = sink.frames_written();
        logger.metric("frames_written", frames_written as f64);
        let close_result = sink.close();

        match (run_result, close_result) {
            (Ok(summary), Ok(())) => Ok(RecordingOutcome {
                summary,
                format,
                encoder_dimensions,
                frames_written,
            }),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(run_err), Ok(())) => Err(run_err),
            (Err(run_err), Err(close_err)) => {
                log::warn!("Also failed to close output after error: {close_err}");
                Err(run_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::frame_driver::tests::MemorySource;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::error::BoxError;
    use crate::shared::frame::Frame;
    use crate::transform::domain::frame_transform::FrameTransform;
    use crate::video::domain::video_writer::{VideoWriter, WriterSettings};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Log {
        opened: usize,
        written: Vec<usize>,
        closed: usize,
    }

    struct StubWriter {
        log: Arc<Mutex<Log>>,
        fail_close: bool,
    }

    impl VideoWriter for StubWriter {
        fn open(&mut self, _path: &Path, _settings: &WriterSettings) -> Result<(), BoxError> {
            self.log.lock().unwrap().opened += 1;
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), BoxError> {
            self.log.lock().unwrap().written.push(frame.index());
            Ok(())
        }

        fn close(&mut self) -> Result<(), BoxError> {
            self.log.lock().unwrap().closed += 1;
            if self.fail_close {
                return Err("flush failed".into());
            }
            Ok(())
        }
    }

    fn stub_sink(fail_close: bool) -> (RecordingSink, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let shared = log.clone();
        let sink = RecordingSink::with_factory(Box::new(move |_| -> Box<dyn VideoWriter> {
            Box::new(StubWriter {
                log: shared.clone(),
                fail_close,
            })
        }));
        (sink, log)
    }

    struct FailAt(usize);

    impl FrameTransform for FailAt {
        fn apply(&mut self, frame: Frame) -> Result<Frame, PipelineError> {
            if frame.index() == self.0 {
                return Err(PipelineError::ShapeMismatch {
                    expected: (1, 1, 1),
                    actual: frame.dimensions(),
                });
            }
            Ok(frame)
        }
    }

    #[test]
    fn test_records_every_frame_in_range_and_closes() {
        let (sink, log) = stub_sink(false);
        let mut use_case = RecordVideoUseCase::new(
            Box::new(MemorySource::new(100)),
            TransformChain::new(),
            sink,
            RecordingConfig {
                range: FrameRange::new(90, 0),
                ..RecordingConfig::default()
            },
        );
        let outcome = use_case
            .execute(Path::new("out.avi"), &mut NullPipelineLogger)
            .unwrap();
        assert_eq!(outcome.frames_written, 10);
        assert_eq!(outcome.format, OutputFormat::Avi);
        assert_eq!(outcome.encoder_dimensions, (2, 2));

        let log = log.lock().unwrap();
        assert_eq!(log.written, (90..100).collect::<Vec<_>>());
        assert_eq!(log.closed, 1);
    }

    #[test]
    fn test_closes_sink_when_a_transform_fails() {
        let (sink, log) = stub_sink(false);
        let mut use_case = RecordVideoUseCase::new(
            Box::new(MemorySource::new(10)),
            TransformChain::new().and_then(FailAt(4)),
            sink,
            RecordingConfig::default(),
        );
        let result = use_case.execute(Path::new("out.mp4"), &mut NullPipelineLogger);
        assert!(matches!(result, Err(PipelineError::ShapeMismatch { .. })));

        let log = log.lock().unwrap();
        assert_eq!(log.written, vec![0, 1, 2, 3]);
        assert_eq!(log.closed, 1);
    }

    #[test]
    fn test_run_error_wins_over_close_error() {
        let (sink, _) = stub_sink(true);
        let mut use_case = RecordVideoUseCase::new(
            Box::new(MemorySource::new(10)),
            TransformChain::new().and_then(FailAt(0)),
            sink,
            RecordingConfig::default(),
        );
        let result = use_case.execute(Path::new("out.mp4"), &mut NullPipelineLogger);
        assert!(matches!(result, Err(PipelineError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_close_error_is_reported_after_clean_run() {
        let (sink, _) = stub_sink(true);
        let mut use_case = RecordVideoUseCase::new(
            Box::new(MemorySource::new(3)),
            TransformChain::new(),
            sink,
            RecordingConfig::default(),
        );
        let result = use_case.execute(Path::new("out.tif"), &mut NullPipelineLogger);
        assert!(matches!(result, Err(PipelineError::EncoderFlush(_))));
    }

    #[test]
    fn test_bad_range_opens_nothing() {
        let (sink, log) = stub_sink(false);
        let mut use_case = RecordVideoUseCase::new(
            Box::new(MemorySource::new(10)),
            TransformChain::new(),
            sink,
            RecordingConfig {
                range: FrameRange::new(5, 5),
                ..RecordingConfig::default()
            },
        );
        let result = use_case.execute(Path::new("out.mp4"), &mut NullPipelineLogger);
        assert!(matches!(result, Err(PipelineError::InvalidRange { .. })));
        assert_eq!(log.lock().unwrap().opened, 0);
    }

    #[test]
    fn test_bad_extension_opens_nothing() {
        let (sink, log) = stub_sink(false);
        let mut use_case = RecordVideoUseCase::new(
            Box::new(MemorySource::new(10)),
            TransformChain::new(),
            sink,
            RecordingConfig::default(),
        );
        let result = use_case.execute(Path::new("out.webm"), &mut NullPipelineLogger);
        assert!(matches!(
            result,
            Err(PipelineError::UnsupportedExtension { .. })
        ));
        assert_eq!(log.lock().unwrap().opened, 0);
    }

    #[test]
    fn test_execute_twice_fails() {
        let (sink, _) = stub_sink(false);
        let mut use_case = RecordVideoUseCase::new(
            Box::new(MemorySource::new(2)),
            TransformChain::new(),
            sink,
            RecordingConfig::default(),
        );
        use_case
            .execute(Path::new("a.avi"), &mut NullPipelineLogger)
            .unwrap();
        assert!(matches!(
            use_case.execute(Path::new("a.avi"), &mut NullPipelineLogger),
            Err(PipelineError::AlreadyExecuted)
        ));
    }

    #[test]
    fn test_video_to_tiff_end_to_end() {
        use crate::video::infrastructure::ffmpeg_source::FfmpegFrameSource;
        use crate::video::infrastructure::media;
        use crate::video::infrastructure::test_video::create_test_video;

        media::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("in.mp4");
        create_test_video(&video, 5, 64, 48, 25.0);
        let output = dir.path().join("out.tif");

        let mut use_case = RecordVideoUseCase::new(
            Box::new(FfmpegFrameSource::new(&video)),
            TransformChain::new(),
            RecordingSink::new(),
            RecordingConfig {
                range: FrameRange::new(1, 4),
                driver: DriverConfig {
                    warm_up: true,
                    ..DriverConfig::default()
                },
                ..RecordingConfig::default()
            },
        );
        let outcome = use_case
            .execute(&output, &mut NullPipelineLogger)
            .unwrap();
        assert_eq!(outcome.frames_written, 3);
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }
}
