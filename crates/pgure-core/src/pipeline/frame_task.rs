use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use ndarray::{Array3, Axis};
use tracing::{debug, warn};

use crate::error::{PgureError, Result};
use crate::frame::{FrameSlots, Sequence};
use crate::svt::{LambdaSearch, ThresholdSession};

use super::collaborators::Collaborators;
use super::config::{DenoiseConfig, ThresholdMode};
use super::types::FrameReport;
use super::window::{normalize, window_for, NormalizedWindow};

/// Per-frame denoising over shared, read-only preprocessed sequences.
///
/// [`process`](Self::process) may run concurrently for distinct frames.
/// Each call writes only its own output slot, report slot and lambda hint.
pub(super) struct WindowPipeline<'a> {
    raw: &'a Sequence,
    filtered: &'a Sequence,
    config: &'a DenoiseConfig,
    collaborators: &'a Collaborators,
    /// Resolved lambda per frame, read as a warm start by the next frame.
    hints: Vec<OnceLock<f64>>,
    reports: Vec<OnceLock<FrameReport>>,
    non_converged: AtomicUsize,
    degenerate: AtomicUsize,
}

/// Per-frame reports and counters collected after the last frame.
pub(super) struct PipelineTotals {
    pub frames: Vec<FrameReport>,
    pub non_converged: usize,
    pub degenerate: usize,
}

impl<'a> WindowPipeline<'a> {
    pub fn new(
        raw: &'a Sequence,
        filtered: &'a Sequence,
        config: &'a DenoiseConfig,
        collaborators: &'a Collaborators,
    ) -> Self {
        let frames = raw.frame_count();
        Self {
            raw,
            filtered,
            config,
            collaborators,
            hints: (0..frames).map(|_| OnceLock::new()).collect(),
            reports: (0..frames).map(|_| OnceLock::new()).collect(),
            non_converged: AtomicUsize::new(0),
            degenerate: AtomicUsize::new(0),
        }
    }

    /// Denoise frame `target` and store it in `slots`.
    pub fn process(&self, target: usize, slots: &FrameSlots) -> Result<()> {
        let started = Instant::now();
        let num_frames = self.raw.frame_count();
        let t_len = self.config.window_length;
        let placement = window_for(target, num_frames, t_len);

        let raw_window = normalize(self.raw.window(placement.start, t_len));
        let mut noise = self.config.noise.params();

        if raw_window.is_degenerate() {
            warn!(frame = target, "Window has no positive maximum, frame passed through");
            slots.write(target, self.raw.frame(target).to_owned())?;
            self.degenerate.fetch_add(1, Ordering::Relaxed);
            return self.record(FrameReport {
                frame: target,
                noise,
                lambda: 0.0,
                evaluations: 0,
                converged: true,
                degenerate: true,
                seconds: started.elapsed().as_secs_f64(),
            });
        }

        let filtered_window = normalize(self.filtered.window(placement.start, t_len));

        if self.config.threshold.is_adaptive() && self.config.noise.estimate {
            self.collaborators.noise.estimate(
                raw_window.view(),
                &mut noise,
                self.config.noise.bins,
                self.config.noise.method,
            );
        }

        let motion = self.collaborators.motion.estimate(
            filtered_window.view(),
            target,
            t_len / 2,
            num_frames,
            self.config.patch.size,
            self.config.motion.search_radius,
        );

        let mut session = self.collaborators.optimizer.initialize(
            raw_window.view(),
            &motion,
            self.config.patch.size,
            self.config.patch.overlap,
            &noise,
        );
        let (reconstructed, search) =
            self.resolve_and_reconstruct(target, session.as_mut(), &raw_window);
        let _ = self.hints[target].set(search.lambda);

        if !search.converged {
            self.non_converged.fetch_add(1, Ordering::Relaxed);
            warn!(
                frame = target,
                lambda = search.lambda,
                evaluations = search.evaluations,
                "Lambda search hit the evaluation cap"
            );
        }

        let frame = reconstructed
            .index_axis(Axis(0), placement.local_index)
            .mapv(|v| v * raw_window.scale);
        slots.write(target, frame)?;

        let seconds = started.elapsed().as_secs_f64();
        debug!(
            frame = target,
            gain = noise.gain,
            offset = noise.offset,
            sigma = noise.sigma,
            lambda = search.lambda,
            evaluations = search.evaluations,
            seconds,
            "Frame denoised"
        );
        self.record(FrameReport {
            frame: target,
            noise,
            lambda: search.lambda,
            evaluations: search.evaluations,
            converged: search.converged,
            degenerate: false,
            seconds,
        })
    }

    /// Pick lambda according to the threshold mode and reconstruct with it.
    fn resolve_and_reconstruct(
        &self,
        target: usize,
        session: &mut dyn ThresholdSession,
        window: &NormalizedWindow,
    ) -> (Array3<f64>, LambdaSearch) {
        let search = match self.config.threshold {
            ThresholdMode::Fixed { lambda } => LambdaSearch {
                lambda,
                evaluations: 0,
                converged: true,
            },
            ThresholdMode::Adaptive {
                tolerance,
                max_evaluations,
                warm_start,
            } => {
                let hint = if warm_start && target > 0 {
                    self.hints[target - 1].get().copied()
                } else {
                    None
                };
                let initial = hint.unwrap_or_else(|| window.mean());
                session.optimize(tolerance, initial, window.max(), max_evaluations)
            }
        };
        (session.reconstruct(search.lambda), search)
    }

    fn record(&self, report: FrameReport) -> Result<()> {
        let frame = report.frame;
        self.reports[frame]
            .set(report)
            .map_err(|_| PgureError::SlotAlreadyWritten(frame))
    }

    pub fn finish(self) -> Result<PipelineTotals> {
        let frames = self
            .reports
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.into_inner().ok_or(PgureError::SlotNotWritten(i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(PipelineTotals {
            frames,
            non_converged: self.non_converged.into_inner(),
            degenerate: self.degenerate.into_inner(),
        })
    }
}
