use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::SampleDepth;

/// Error type returned by collaborators (sources, writers) at I/O boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every way a pipeline run can fail.
///
/// All variants are fatal to the run that produced them; there is no
/// skip-and-continue path.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid frame range: start {start} must be before end {end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("source ran out of frames at index {index} (range ends at {end})")]
    PrematureEndOfStream { index: i64, end: i64 },

    #[error("unsupported output extension {extension:?} for {}", path.display())]
    UnsupportedExtension { path: PathBuf, extension: String },

    #[error("failed to open writer for {}: {source}", path.display())]
    WriterOpen {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("encoder rejected frame {index}: {source}")]
    Encode {
        index: usize,
        #[source]
        source: BoxError,
    },

    #[error("failed to flush encoder: {0}")]
    EncoderFlush(#[source] BoxError),

    #[error("no frames were processed before finalize")]
    NoFramesProcessed,

    #[error("frame source failed: {0}")]
    Source(#[source] BoxError),

    #[error("{operation} does not support {depth:?} samples")]
    UnsupportedDepth {
        operation: &'static str,
        depth: SampleDepth,
    },

    #[error("frame shape mismatch: expected {expected:?}, got {actual:?} (width, height, channels)")]
    ShapeMismatch {
        expected: (u32, u32, u8),
        actual: (u32, u32, u8),
    },

    #[error("recording sink used before start")]
    NotStarted,

    #[error("accumulator already finalized")]
    AlreadyFinalized,

    #[error("pipeline already executed")]
    AlreadyExecuted,

    #[error("failed to write output image: {0}")]
    Output(#[source] BoxError),

    #[error("pipeline worker panicked")]
    WorkerPanicked,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
