use serde::Serialize;

use crate::frame::Sequence;
use crate::noise::NoiseParams;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Reading,
    MedianFiltering,
    HotPixelCorrection,
    Denoising,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reading => write!(f, "Reading frames"),
            Self::MedianFiltering => write!(f, "Median filtering"),
            Self::HotPixelCorrection => write!(f, "Correcting hot pixels"),
            Self::Denoising => write!(f, "Denoising"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations. `advance`
/// is called from worker threads.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// `items_done` work items within the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `denoise_sequence` delegates.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// What happened to a single frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: usize,
    pub noise: NoiseParams,
    pub lambda: f64,
    pub evaluations: usize,
    pub converged: bool,
    /// The window had no positive maximum and the frame was passed through.
    pub degenerate: bool,
    pub seconds: f64,
}

/// Totals of a denoising run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DenoiseReport {
    pub frames: Vec<FrameReport>,
    pub hot_pixels_corrected: usize,
    pub non_converged: usize,
    pub degenerate_windows: usize,
    pub elapsed_secs: f64,
}

#[derive(Clone, Debug)]
pub struct DenoiseOutput {
    pub sequence: Sequence,
    pub report: DenoiseReport,
}
