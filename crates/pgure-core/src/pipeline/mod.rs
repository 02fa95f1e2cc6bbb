pub mod config;
mod collaborators;
mod frame_task;
mod orchestrator;
mod preprocess;
mod types;
mod window;

pub use collaborators::Collaborators;
pub use orchestrator::{denoise_buffer, denoise_sequence, denoise_sequence_reported};
pub use preprocess::{preprocess, Preprocessed};
pub use types::{
    DenoiseOutput, DenoiseReport, FrameReport, NoOpReporter, PipelineStage, ProgressReporter,
};
pub use window::{normalize, window_for, NormalizedWindow, WindowPlacement};
