use std::num::NonZeroUsize;
use std::sync::OnceLock;
use std::thread;

use crate::consts::DEFAULT_PARALLEL_THRESHOLD;
use crate::error::Result;

/// Fixed-range concurrent `for` over an index range.
///
/// Every index in the range is visited exactly once and all visits finish
/// before [`run`](Self::run) returns. Visits are unordered; tasks must write
/// disjoint state.
#[derive(Clone, Copy, Debug)]
pub struct ParallelExecutor {
    workers: usize,
    threshold: usize,
}

impl ParallelExecutor {
    /// Executor with an explicit worker count. Zero is treated as one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// Executor sized to the hardware parallelism of this machine.
    pub fn available() -> Self {
        Self::new(hardware_threads())
    }

    /// Ranges of at most `threshold` indices run inline on the calling thread.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Invoke `task(i)` for every `i` in `[start, end)`.
    ///
    /// A panicking task fails the whole call: the panic is re-raised after
    /// the remaining workers have been joined.
    pub fn run<F>(&self, task: F, start: usize, end: usize)
    where
        F: Fn(usize) + Sync,
    {
        if end <= start {
            return;
        }
        let n = end - start;
        let cores = self.workers;

        if cores <= 1 || n <= self.threshold {
            (start..end).for_each(&task);
            return;
        }

        let task = &task;
        if n <= cores {
            thread::scope(|scope| {
                for index in start..end {
                    scope.spawn(move || task(index));
                }
            });
            return;
        }

        let per_worker = n.div_ceil(cores);
        let chunk = move |first: usize, last: usize| (first..last).for_each(task);
        thread::scope(|scope| {
            for worker in 0..cores - 1 {
                let first = (start + per_worker * worker).min(end);
                let last = (first + per_worker).min(end);
                if first < last {
                    scope.spawn(move || chunk(first, last));
                }
            }
            let tail = (start + per_worker * (cores - 1)).min(end);
            chunk(tail, end);
        });
    }

    /// Fallible variant of [`run`](Self::run).
    ///
    /// Every index is still visited exactly once; the first error recorded
    /// by any task is returned after the barrier.
    pub fn try_run<F>(&self, task: F, start: usize, end: usize) -> Result<()>
    where
        F: Fn(usize) -> Result<()> + Sync,
    {
        let first_error = OnceLock::new();
        self.run(
            |i| {
                if let Err(e) = task(i) {
                    let _ = first_error.set(e);
                }
            },
            start,
            end,
        );
        match first_error.into_inner() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::available()
    }
}

/// Hardware parallelism reported by the OS, falling back to one.
pub fn hardware_threads() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
