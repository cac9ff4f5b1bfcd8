use std::borrow::Cow;
use std::path::Path;

use crate::projection::projection_accumulator::ProjectionAccumulator;
use crate::projection::projection_mode::ProjectionMode;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::error::PipelineError;
use crate::shared::frame::{Frame, SampleDepth};
use crate::shared::normalize;
use crate::transform::domain::transform_chain::TransformChain;
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::infrastructure::image_file_writer::supports_sixteen_bit;

use super::frame_driver::{DriverConfig, FrameDriver, RunSummary};
use super::frame_range::FrameRange;
use super::pipeline_logger::PipelineLogger;

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionConfig {
    pub mode: ProjectionMode,
    pub range: FrameRange,
    pub driver: DriverConfig,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            mode: ProjectionMode::Max,
            range: FrameRange::all(),
            driver: DriverConfig::default(),
        }
    }
}

#[derive(Debug)]
pub struct ProjectionOutcome {
    /// The projection as finalized, before any narrowing for the image file.
    pub frame: Frame,
    pub summary: RunSummary,
}

/// Reduces a frame range of a video to one projected image.
///
/// The user's transform chain runs first and the accumulator last. This is
/// a single-use struct: `execute` consumes the owned components, so calling
/// it twice fails with `AlreadyExecuted`.
pub struct ProjectVideoUseCase<'a> {
    source: Option<Box<dyn FrameSource>>,
    chain: Option<TransformChain<'a>>,
    image_writer: Option<Box<dyn ImageWriter>>,
    config: ProjectionConfig,
}

impl<'a> ProjectVideoUseCase<'a> {
    pub fn new(
        source: Box<dyn FrameSource>,
        chain: TransformChain<'a>,
        image_writer: Option<Box<dyn ImageWriter>>,
        config: ProjectionConfig,
    ) -> Self {
        Self {
            source: Some(source),
            chain: Some(chain),
            image_writer,
            config,
        }
    }

    /// Runs the projection. With `output` set, the result is also written as
    /// an image: 16-bit for PNG/TIFF when the result is wider than 8 bits,
    /// otherwise 8-bit.
    pub fn execute(
        &mut self,
        output: Option<&Path>,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ProjectionOutcome, PipelineError> {
        if let Some(path) = output {
            check_image_extension(path)?;
        }

        let mut source = self.source.take().ok_or(PipelineError::AlreadyExecuted)?;
        let mut chain = self.chain.take().ok_or(PipelineError::AlreadyExecuted)?;

        let metadata = source.start().map_err(PipelineError::Source)?;
        log::info!(
            "Projecting {} ({}x{}, {:.2} fps) with mode {}",
            metadata.source_label(),
            metadata.width,
            metadata.height,
            metadata.fps,
            self.config.mode
        );

        let driver = FrameDriver::new(self.config.driver.clone());
        let mut accumulator = ProjectionAccumulator::new(self.config.mode);
        let summary = {
            let mut stages = TransformChain::new()
                .and_then(&mut chain)
                .and_then(&mut accumulator);
            driver.run(source.as_mut(), self.config.range, &mut stages, logger)?
        };

        let frame = accumulator.finalize()?;

        if let Some(path) = output {
            let writer = self
                .image_writer
                .as_ref()
                .ok_or_else(|| PipelineError::Output("no image writer configured".into()))?;
            let encodable = encodable_for(&frame, path)?;
            writer
                .write(path, &encodable)
                .map_err(PipelineError::Output)?;
            logger.info(&format!(
                "Saved {} projection to {} ({:?})",
                self.config.mode,
                path.display(),
                encodable.depth()
            ));
        }

        Ok(ProjectionOutcome { frame, summary })
    }
}

fn check_image_extension(path: &Path) -> Result<(), PipelineError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(PipelineError::UnsupportedExtension {
            path: path.to_path_buf(),
            extension,
        })
    }
}

/// Narrows `frame` to a depth the image format at `path` can hold.
fn encodable_for<'f>(frame: &'f Frame, path: &Path) -> Result<Cow<'f, Frame>, PipelineError> {
    let target = match frame.depth() {
        SampleDepth::U8 => return Ok(Cow::Borrowed(frame)),
        SampleDepth::U16 if supports_sixteen_bit(path) => return Ok(Cow::Borrowed(frame)),
        _ if supports_sixteen_bit(path) => SampleDepth::U16,
        _ => SampleDepth::U8,
    };
    Ok(Cow::Owned(normalize::min_max(frame, target)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::frame_driver::tests::{MemorySource, Probe};
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::error::BoxError;
    use crate::shared::frame::Samples;
    use crate::transform::infrastructure::invert::InvertTransform;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturingImageWriter {
        saved: Arc<Mutex<Vec<(PathBuf, Frame)>>>,
    }

    impl ImageWriter for CapturingImageWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), BoxError> {
            self.saved
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

    fn spike_source() -> MemorySource {
        MemorySource::from_frames(
            (0..10)
                .map(|i| Frame::filled(if i == 5 { 255 } else { 0 }, 2, 2, 1, i))
                .collect(),
        )
    }

    fn config(mode: ProjectionMode) -> ProjectionConfig {
        ProjectionConfig {
            mode,
            ..ProjectionConfig::default()
        }
    }

    #[test]
    fn test_max_projection_of_spike() {
        let mut use_case = ProjectVideoUseCase::new(
            Box::new(spike_source()),
            TransformChain::new(),
            None,
            config(ProjectionMode::Max),
        );
        let outcome = use_case.execute(None, &mut NullPipelineLogger).unwrap();
        assert_eq!(outcome.frame.samples(), &Samples::U8(vec![255; 4]));
        assert_eq!(outcome.summary.frames_processed, 10);
    }

    #[test]
    fn test_user_chain_runs_before_accumulator() {
        let mut use_case = ProjectVideoUseCase::new(
            Box::new(spike_source()),
            TransformChain::new().and_then(InvertTransform),
            None,
            config(ProjectionMode::Min),
        );
        let outcome = use_case.execute(None, &mut NullPipelineLogger).unwrap();
        // Inverted spike: min over nine white frames and one black frame
        assert_eq!(outcome.frame.samples(), &Samples::U8(vec![0; 4]));
    }

    #[test]
    fn test_borrowed_stage_sees_every_frame() {
        let mut probe = Probe::default();
        {
            let mut use_case = ProjectVideoUseCase::new(
                Box::new(MemorySource::new(20)),
                TransformChain::new().and_then(&mut probe),
                None,
                ProjectionConfig {
                    mode: ProjectionMode::Sum,
                    range: FrameRange::new(5, 15),
                    ..ProjectionConfig::default()
                },
            );
            use_case.execute(None, &mut NullPipelineLogger).unwrap();
        }
        assert_eq!(probe.seen, (5..15).collect::<Vec<_>>());
    }

    #[test]
    fn test_sum_saved_as_sixteen_bit_png() {
        let writer = CapturingImageWriter::default();
        let mut use_case = ProjectVideoUseCase::new(
            Box::new(MemorySource::new(4)),
            TransformChain::new(),
            Some(Box::new(writer.clone())),
            config(ProjectionMode::Sum),
        );
        let outcome = use_case
            .execute(Some(Path::new("sum.png")), &mut NullPipelineLogger)
            .unwrap();
        assert_eq!(outcome.frame.depth(), SampleDepth::I64);

        let saved = writer.saved.lock().unwrap();
        assert_eq!(saved[0].0, PathBuf::from("sum.png"));
        assert_eq!(saved[0].1.depth(), SampleDepth::U16);
    }

    #[test]
    fn test_sum_saved_as_eight_bit_jpeg() {
        let writer = CapturingImageWriter::default();
        let mut use_case = ProjectVideoUseCase::new(
            Box::new(MemorySource::new(4)),
            TransformChain::new(),
            Some(Box::new(writer.clone())),
            config(ProjectionMode::Sum),
        );
        use_case
            .execute(Some(Path::new("sum.jpg")), &mut NullPipelineLogger)
            .unwrap();
        assert_eq!(writer.saved.lock().unwrap()[0].1.depth(), SampleDepth::U8);
    }

    #[test]
    fn test_unknown_image_extension_fails_before_decoding() {
        let mut use_case = ProjectVideoUseCase::new(
            Box::new(MemorySource::new(4)),
            TransformChain::new(),
            Some(Box::new(CapturingImageWriter::default())),
            config(ProjectionMode::Max),
        );
        assert!(matches!(
            use_case.execute(Some(Path::new("out.mp4")), &mut NullPipelineLogger),
            Err(PipelineError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn test_invalid_range() {
        let mut use_case = ProjectVideoUseCase::new(
            Box::new(MemorySource::new(10)),
            TransformChain::new(),
            None,
            ProjectionConfig {
                range: FrameRange::new(5, 5),
                ..ProjectionConfig::default()
            },
        );
        assert!(matches!(
            use_case.execute(None, &mut NullPipelineLogger),
            Err(PipelineError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_execute_twice_fails() {
        let mut use_case = ProjectVideoUseCase::new(
            Box::new(MemorySource::new(2)),
            TransformChain::new(),
            None,
            ProjectionConfig::default(),
        );
        use_case.execute(None, &mut NullPipelineLogger).unwrap();
        assert!(matches!(
            use_case.execute(None, &mut NullPipelineLogger),
            Err(PipelineError::AlreadyExecuted)
        ));
    }

    #[test]
    fn test_average_end_to_end_png() {
        use crate::video::infrastructure::ffmpeg_source::FfmpegFrameSource;
        use crate::video::infrastructure::image_file_writer::ImageFileWriter;
        use crate::video::infrastructure::media;
        use crate::video::infrastructure::test_video::create_test_video;

        media::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("in.mp4");
        create_test_video(&video, 6, 64, 48, 25.0);
        let output = dir.path().join("avg.png");

        let mut use_case = ProjectVideoUseCase::new(
            Box::new(FfmpegFrameSource::new(&video)),
            TransformChain::new(),
            Some(Box::new(ImageFileWriter::new())),
            ProjectionConfig {
                mode: ProjectionMode::Average,
                driver: DriverConfig {
                    force_grayscale: true,
                    ..DriverConfig::default()
                },
                ..ProjectionConfig::default()
            },
        );
        let outcome = use_case
            .execute(Some(&output), &mut NullPipelineLogger)
            .unwrap();
        assert_eq!(outcome.summary.frames_processed, 6);
        assert_eq!(outcome.frame.dimensions(), (64, 48, 1));

        let img = image::open(&output).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
    }
}
