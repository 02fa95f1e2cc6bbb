use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::error::{PgureError, Result};
use crate::frame::{FrameSlots, Sequence, SequenceShape};
use crate::parallel::ParallelExecutor;

use super::collaborators::Collaborators;
use super::config::DenoiseConfig;
use super::frame_task::WindowPipeline;
use super::preprocess::preprocess;
use super::types::{DenoiseOutput, DenoiseReport, NoOpReporter, PipelineStage, ProgressReporter};

/// Denoise a sequence with a thread-safe progress reporter and explicit
/// collaborators.
///
/// The configuration is validated first. Preprocessing then runs to
/// completion before any window is denoised.
pub fn denoise_sequence_reported(
    input: &Sequence,
    config: &DenoiseConfig,
    collaborators: &Collaborators,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<DenoiseOutput> {
    let shape = input.shape();
    config.validate(shape)?;
    let started = Instant::now();
    let executor = ParallelExecutor::new(config.worker_threads());
    info!(
        shape = %shape,
        threads = executor.workers(),
        window = config.window_length,
        mode = %config.threshold,
        "Denoising sequence"
    );

    let pre = preprocess(
        input,
        &config.preprocess,
        collaborators,
        &executor,
        &reporter,
    )?;

    reporter.begin_stage(PipelineStage::Denoising, Some(shape.frames));
    let slots = FrameSlots::new(shape);
    let pipeline = WindowPipeline::new(&pre.raw, &pre.filtered, config, collaborators);
    let done = AtomicUsize::new(0);
    executor.try_run(
        |t| {
            pipeline.process(t, &slots)?;
            reporter.advance(done.fetch_add(1, Ordering::Relaxed) + 1);
            Ok(())
        },
        0,
        shape.frames,
    )?;
    reporter.finish_stage();

    let totals = pipeline.finish()?;
    let sequence = slots.into_sequence()?;
    let report = DenoiseReport {
        frames: totals.frames,
        hot_pixels_corrected: pre.hot_pixels,
        non_converged: totals.non_converged,
        degenerate_windows: totals.degenerate,
        elapsed_secs: started.elapsed().as_secs_f64(),
    };
    info!(
        elapsed = report.elapsed_secs,
        non_converged = report.non_converged,
        degenerate = report.degenerate_windows,
        "Denoising complete"
    );
    Ok(DenoiseOutput { sequence, report })
}

/// Denoise a sequence with the default collaborators.
pub fn denoise_sequence(input: &Sequence, config: &DenoiseConfig) -> Result<DenoiseOutput> {
    let collaborators = Collaborators::from_config(config);
    denoise_sequence_reported(input, config, &collaborators, Arc::new(NoOpReporter))
}

/// Flat-buffer entry point.
///
/// `input` and `output` use the layout
/// `index = frame * height * width + row * width + col` and must both hold
/// exactly `shape.len()` samples.
pub fn denoise_buffer(
    input: &[f64],
    output: &mut [f64],
    shape: SequenceShape,
    config: &DenoiseConfig,
) -> Result<DenoiseReport> {
    let shape = SequenceShape::new(shape.width, shape.height, shape.frames)?;
    if output.len() != shape.len() {
        return Err(PgureError::BufferSizeMismatch {
            expected: shape.len(),
            actual: output.len(),
        });
    }
    let sequence = Sequence::from_flat(input.to_vec(), shape)?;
    let result = denoise_sequence(&sequence, config)?;
    result.sequence.copy_into(output)?;
    Ok(result.report)
}
