//! Progress tracking and the reporting loop.
//!
//! [`ProgressTracker`] holds the latest published result and a short ring
//! of recent ones for throughput estimation. [`run_with_reporting`] runs an
//! optimizer alongside a loop that hands snapshots to a sink on a fixed
//! interval and turns an external halt signal into a pause request.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::optimizer::OptimizeError;
use crate::result::OptimizationResult;

/// Lower bound on the estimation ring, whatever the thread count.
pub const MIN_HISTORY: usize = 5;

/// Minimum spacing between throttled progress reports from a search loop.
pub(crate) const PUBLISH_SPACING: Duration = Duration::from_millis(50);

/// Receives progress snapshots. Closures work directly.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, result: &OptimizationResult);
}

impl<F> ProgressSink for F
where
    F: Fn(&OptimizationResult) + Send + Sync,
{
    fn publish(&self, result: &OptimizationResult) {
        self(result)
    }
}

struct TrackerState {
    current: OptimizationResult,
    recent: VecDeque<OptimizationResult>,
}

pub struct ProgressTracker {
    state: Mutex<TrackerState>,
    capacity: usize,
    pause: AtomicBool,
}

impl ProgressTracker {
    /// `threads` sizes the estimation ring so one burst of completions from
    /// every worker still spans a measurable interval.
    pub fn new(initial: OptimizationResult, threads: usize) -> Self {
        let capacity = threads.max(MIN_HISTORY);
        Self {
            state: Mutex::new(TrackerState {
                current: initial,
                recent: VecDeque::with_capacity(capacity),
            }),
            capacity,
            pause: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        // A poisoned tracker still holds a complete snapshot.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish `result`, attaching time estimates when the recent history
    /// shows measurable progress. Returns what was published.
    pub fn update_progress(&self, result: OptimizationResult) -> OptimizationResult {
        let mut state = self.lock();
        if state.recent.len() == self.capacity {
            state.recent.pop_front();
        }
        state.recent.push_back(result.clone());

        let published = match (state.recent.front(), state.recent.back()) {
            (Some(oldest), Some(newest)) => {
                let done = newest.count_completed.saturating_sub(oldest.count_completed);
                let elapsed = newest.elapsed_ms.saturating_sub(oldest.elapsed_ms);
                if done > 0 && elapsed > 0 && !result.status.is_terminal() {
                    let scaled = result.remaining() as u128 * elapsed as u128;
                    let remaining_ms =
                        u64::try_from(scaled.div_ceil(done as u128)).unwrap_or(u64::MAX);
                    let total_ms = result.elapsed_ms.saturating_add(remaining_ms);
                    result.with_estimates(Some(remaining_ms), Some(total_ms))
                } else {
                    result
                }
            }
            _ => result,
        };
        state.current = published.clone();
        published
    }

    pub fn current(&self) -> OptimizationResult {
        self.lock().current.clone()
    }

    pub fn request_pause(&self) {
        self.pause.store(true, Ordering::Relaxed);
    }

    pub fn pause_requested(&self) -> bool {
        self.pause.load(Ordering::Relaxed)
    }
}

/// Granularity of the reporting loop's sleep, so a finished job is noticed
/// without waiting out a whole interval.
const POLL_STEP: Duration = Duration::from_millis(25);

/// Run `job` while reporting the tracker's snapshot to `sink` every
/// `interval`. When `halt` is raised the tracker receives a pause request
/// and the job is expected to wind down and return a paused result. The
/// job's final result is published once more before it is returned.
pub fn run_with_reporting<F>(
    tracker: &ProgressTracker,
    sink: &dyn ProgressSink,
    halt: &AtomicBool,
    interval: Duration,
    job: F,
) -> Result<OptimizationResult, OptimizeError>
where
    F: FnOnce() -> Result<OptimizationResult, OptimizeError> + Send,
{
    let finished = AtomicBool::new(false);
    let outcome = thread::scope(|scope| {
        let worker = scope.spawn(|| {
            let outcome = job();
            finished.store(true, Ordering::Release);
            outcome
        });

        let mut since_report = Duration::ZERO;
        while !finished.load(Ordering::Acquire) {
            let step = POLL_STEP.min(interval);
            thread::sleep(step);
            since_report += step;
            if halt.load(Ordering::Relaxed) && !tracker.pause_requested() {
                tracing::info!(event = "pause_requested");
                tracker.request_pause();
            }
            if since_report >= interval {
                since_report = Duration::ZERO;
                sink.publish(&tracker.current());
            }
        }

        worker
            .join()
            .unwrap_or_else(|_| Err(OptimizeError::Worker("optimizer thread panicked".into())))
    });

    if let Ok(result) = &outcome {
        sink.publish(result);
    }
    outcome
}

// ─── Tests ───────────────────────────────────────────────────────────
