use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use pgure_core::pipeline::{PipelineStage, ProgressReporter};

/// Progress reporter that drives a single terminal progress bar.
///
/// Workers may report completions out of order; the bar only moves forward.
pub struct BarReporter {
    bar: ProgressBar,
    done: AtomicUsize,
}

impl BarReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(bar_style());
        Self {
            bar,
            done: AtomicUsize::new(0),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for BarReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg:24} [{bar:40}] {pos}/{len} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.done.store(0, Ordering::Relaxed);
        match total_items {
            Some(total) => {
                self.bar.set_style(bar_style());
                self.bar.set_length(total as u64);
            }
            None => {
                self.bar.set_style(ProgressStyle::default_spinner());
                self.bar.enable_steady_tick(std::time::Duration::from_millis(100));
            }
        }
        self.bar.set_position(0);
        self.bar.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        let previous = self.done.fetch_max(items_done, Ordering::Relaxed);
        if items_done > previous {
            self.bar.set_position(items_done as u64);
        }
    }

    fn finish_stage(&self) {
        self.bar.disable_steady_tick();
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
    }
}
