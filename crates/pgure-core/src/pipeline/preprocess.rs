use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::frame::{FrameSlots, Sequence};
use crate::parallel::ParallelExecutor;

use super::collaborators::Collaborators;
use super::config::PreprocessConfig;
use super::types::{PipelineStage, ProgressReporter};

/// The two sequences the window pipeline reads from.
pub struct Preprocessed {
    /// Copy of the input with hot pixels replaced.
    pub raw: Sequence,
    /// Median-filtered input, used only for motion estimation.
    pub filtered: Sequence,
    pub hot_pixels: usize,
}

/// Median-filter every frame, then correct hot pixels in a copy of the input.
///
/// Both passes complete before this returns. Intra-frame rayon work in both
/// passes runs on a pool sized to the executor's worker count, never on the
/// global pool.
pub fn preprocess(
    input: &Sequence,
    config: &PreprocessConfig,
    collaborators: &Collaborators,
    executor: &ParallelExecutor,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<Preprocessed> {
    let shape = input.shape();
    let frames = shape.frames;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(executor.workers())
        .build()?;

    reporter.begin_stage(PipelineStage::MedianFiltering, Some(frames));
    let slots = FrameSlots::new(shape);
    let done = AtomicUsize::new(0);
    executor.try_run(
        |i| {
            let filtered = pool.install(|| collaborators.median.filter(input.frame(i)));
            slots.write(i, filtered)?;
            reporter.advance(done.fetch_add(1, Ordering::Relaxed) + 1);
            Ok(())
        },
        0,
        frames,
    )?;
    let filtered = slots.into_sequence()?;
    reporter.finish_stage();
    debug!(median_size = config.median_size, "Median filtering complete");

    reporter.begin_stage(PipelineStage::HotPixelCorrection, None);
    let mut raw = input.clone();
    let threshold = config.hot_pixel_threshold;
    let hot_pixels = pool.install(|| collaborators.hot_pixel.correct(&mut raw, threshold));
    reporter.finish_stage();
    info!(hot_pixels, threshold, "Hot pixel correction complete");

    Ok(Preprocessed {
        raw,
        filtered,
        hot_pixels,
    })
}
