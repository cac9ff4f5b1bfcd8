use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use framestack_core::pipeline::frame_driver::{DriverConfig, RunSummary};
use framestack_core::pipeline::frame_range::FrameRange;
use framestack_core::pipeline::infrastructure::background_run::spawn_pipeline;
use framestack_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use framestack_core::pipeline::project_video_use_case::{ProjectVideoUseCase, ProjectionConfig};
use framestack_core::pipeline::record_video_use_case::{RecordVideoUseCase, RecordingConfig};
use framestack_core::projection::projection_mode::ProjectionMode;
use framestack_core::recording::recording_sink::RecordingSink;
use framestack_core::shared::error::PipelineError;
use framestack_core::shared::frame::Frame;
use framestack_core::transform::domain::transform_chain::TransformChain;
use framestack_core::transform::infrastructure::background_subtract::BackgroundSubtractTransform;
use framestack_core::transform::infrastructure::brightness_map::BrightnessMapTransform;
use framestack_core::transform::infrastructure::invert::InvertTransform;
use framestack_core::transform::infrastructure::threshold::ThresholdTransform;
use framestack_core::video::infrastructure::ffmpeg_source::FfmpegFrameSource;
use framestack_core::video::infrastructure::image_file_reader::ImageFileReader;
use framestack_core::video::infrastructure::image_file_writer::ImageFileWriter;
use framestack_core::video::infrastructure::media;

/// Frame projections and transformed re-encoding for videos.
#[derive(Parser)]
#[command(name = "framestack")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reduce a frame range to one image (min, max, sum or average).
    Project {
        #[command(flatten)]
        run: RunArgs,

        /// Projection mode: min, max, sum or average.
        #[arg(long, default_value = "max")]
        mode: ProjectionMode,
    },
    /// Re-encode a frame range to .avi, .mp4 or a multi-page .tif.
    Record {
        #[command(flatten)]
        run: RunArgs,

        /// Output frame rate (defaults to the input's).
        #[arg(long)]
        fps: Option<f64>,
    },
}

#[derive(Args, Clone)]
struct RunArgs {
    /// Input video file.
    input: PathBuf,

    /// Output file; its extension selects the format.
    output: PathBuf,

    /// First frame index.
    #[arg(long, default_value = "0")]
    start: i64,

    /// End frame index (exclusive, 0 = through the last frame).
    #[arg(long, default_value = "0")]
    end: i64,

    /// Convert frames to grayscale before any transform.
    #[arg(long)]
    grayscale: bool,

    /// Subtract this image (absolute difference) from every frame.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Brightness gain applied through a lookup table.
    #[arg(long, default_value = "1.0")]
    gain: f64,

    /// Brightness offset applied after the gain.
    #[arg(long, default_value = "0.0")]
    offset: f64,

    /// Invert every frame.
    #[arg(long)]
    invert: bool,

    /// Binarize frames: samples above N become 255, the rest 0.
    #[arg(long)]
    threshold: Option<u8>,

    /// Grayscale mask limiting --threshold to its non-zero region.
    #[arg(long, requires = "threshold")]
    mask: Option<PathBuf>,

    /// Decode two frames before --start to prime the decoder.
    #[arg(long)]
    warm_up: bool,

    /// Overwrite the output if it already exists.
    #[arg(long)]
    force: bool,

    /// Print a JSON run report on stdout.
    #[arg(long)]
    json: bool,
}

/// Machine-readable result of one run.
#[derive(Serialize)]
struct RunReport {
    command: &'static str,
    input: PathBuf,
    output: PathBuf,
    start: i64,
    end: i64,
    frames_processed: usize,
    elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoder_dimensions: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames_written: Option<usize>,
}

impl RunReport {
    fn new(command: &'static str, run: &RunArgs, summary: &RunSummary) -> Self {
        Self {
            command,
            input: run.input.clone(),
            output: run.output.clone(),
            start: summary.start,
            end: summary.end,
            frames_processed: summary.frames_processed,
            elapsed_secs: summary.elapsed.as_secs_f64(),
            mode: None,
            format: None,
            encoder_dimensions: None,
            frames_written: None,
        }
    }
}

/// Images loaded up front so a bad path fails before decoding starts.
struct LoadedImages {
    background: Option<Frame>,
    mask: Option<Frame>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    media::init()?;

    match cli.command {
        Command::Project { run, mode } => {
            validate(&run)?;
            run_projection(run, mode)
        }
        Command::Record { run, fps } => {
            validate(&run)?;
            if let Some(rate) = fps {
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(format!("Frame rate must be positive, got {rate}").into());
                }
            }
            run_recording(run, fps)
        }
    }
}

fn run_projection(run: RunArgs, mode: ProjectionMode) -> Result<(), Box<dyn std::error::Error>> {
    let images = load_images(&run)?;
    let config = ProjectionConfig {
        mode,
        range: FrameRange::new(run.start, run.end),
        driver: driver_config(&run, "Projecting"),
    };

    let job_args = run.clone();
    let handle = spawn_pipeline("projection", move |logger| {
        let chain = build_chain(&job_args, images)?;
        let mut use_case = ProjectVideoUseCase::new(
            Box::new(FfmpegFrameSource::new(&job_args.input)),
            chain,
            Some(Box::new(ImageFileWriter::new())),
            config,
        );
        use_case.execute(Some(job_args.output.as_path()), logger)
    })?;

    let mut logger = StdoutPipelineLogger::default();
    let outcome = handle.forward_to(&mut logger)?;
    logger.summary();
    log::info!("Projection written to {}", run.output.display());

    if run.json {
        let mut report = RunReport::new("project", &run, &outcome.summary);
        report.mode = Some(mode.to_string());
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn run_recording(run: RunArgs, fps: Option<f64>) -> Result<(), Box<dyn std::error::Error>> {
    let images = load_images(&run)?;
    let config = RecordingConfig {
        range: FrameRange::new(run.start, run.end),
        driver: driver_config(&run, "Recording"),
        frame_rate: fps,
    };

    let job_args = run.clone();
    let handle = spawn_pipeline("recording", move |logger| {
        let chain = build_chain(&job_args, images)?;
        let mut use_case = RecordVideoUseCase::new(
            Box::new(FfmpegFrameSource::new(&job_args.input)),
            chain,
            RecordingSink::new(),
            config,
        );
        use_case.execute(&job_args.output, logger)
    })?;

    let mut logger = StdoutPipelineLogger::default();
    let outcome = handle.forward_to(&mut logger)?;
    logger.summary();
    log::info!(
        "Recorded {} frames to {}",
        outcome.frames_written,
        run.output.display()
    );

    if run.json {
        let mut report = RunReport::new("record", &run, &outcome.summary);
        report.format = Some(outcome.format.to_string());
        report.encoder_dimensions = Some(outcome.encoder_dimensions);
        report.frames_written = Some(outcome.frames_written);
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn driver_config(run: &RunArgs, label: &str) -> DriverConfig {
    DriverConfig {
        force_grayscale: run.grayscale,
        warm_up: run.warm_up,
        progress_label: label.to_string(),
    }
}

fn load_images(run: &RunArgs) -> Result<LoadedImages, Box<dyn std::error::Error>> {
    let background = match &run.background {
        Some(path) => Some(read_image(path, run.grayscale)?),
        None => None,
    };
    let mask = match &run.mask {
        Some(path) => Some(read_image(path, true)?),
        None => None,
    };
    Ok(LoadedImages { background, mask })
}

fn read_image(path: &Path, grayscale: bool) -> Result<Frame, Box<dyn std::error::Error>> {
    ImageFileReader::new(grayscale)
        .read(path)
        .map_err(|e| format!("Failed to read image {}: {e}", path.display()).into())
}

/// Stage order: background subtraction, brightness map, invert, threshold.
fn build_chain(
    run: &RunArgs,
    images: LoadedImages,
) -> Result<TransformChain<'static>, PipelineError> {
    let mut chain = TransformChain::new();
    if let Some(background) = images.background {
        chain.push(Box::new(BackgroundSubtractTransform::new(background)?));
    }
    if run.gain != 1.0 || run.offset != 0.0 {
        chain.push(Box::new(BrightnessMapTransform::linear(run.gain, run.offset)));
    }
    if run.invert {
        chain.push(Box::new(InvertTransform));
    }
    if let Some(level) = run.threshold {
        let threshold = match images.mask {
            Some(mask) => ThresholdTransform::with_mask(level, mask)?,
            None => ThresholdTransform::new(level),
        };
        chain.push(Box::new(threshold));
    }
    log::debug!("Transform chain: {:?}", chain.stage_names());
    Ok(chain)
}

fn validate(run: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !run.input.exists() {
        return Err(format!("Input file not found: {}", run.input.display()).into());
    }
    if run.output.exists() && !run.force {
        return Err(format!(
            "Output already exists: {} (use --force to overwrite)",
            run.output.display()
        )
        .into());
    }
    if run.start < 0 {
        return Err(format!("Start frame must be non-negative, got {}", run.start).into());
    }
    if !run.gain.is_finite() || run.gain < 0.0 {
        return Err(format!("Gain must be a non-negative number, got {}", run.gain).into());
    }
    if !run.offset.is_finite() {
        return Err(format!("Offset must be a finite number, got {}", run.offset).into());
    }
    Ok(())
}
