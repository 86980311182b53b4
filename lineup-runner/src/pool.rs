//! Fixed-size worker pool with FIFO result handles.
//!
//! Tasks run on a private Rayon pool. Each submission returns a handle the
//! aggregation loop waits on in submission order, so a task that finishes
//! early still waits behind slower, earlier ones. A panicking task surfaces
//! as [`OptimizeError::Worker`] instead of unwinding through the caller.
//!
//! When a run fails, [`TaskPool::cancel`] marks the pool cancelled so queued
//! tasks return without running, then waits out the ones already started.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use crate::optimizer::OptimizeError;

pub(crate) struct TaskPool {
    pool: rayon::ThreadPool,
    threads: usize,
    cancelled: Arc<AtomicBool>,
}

pub(crate) struct TaskHandle<T> {
    rx: mpsc::Receiver<std::thread::Result<T>>,
}

impl TaskPool {
    pub(crate) fn new(threads: usize, name: &'static str) -> Result<Self, OptimizeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{name}-{i}"))
            .build()?;
        Ok(Self {
            pool,
            threads,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub(crate) fn threads(&self) -> usize {
        self.threads
    }

    pub(crate) fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let cancelled = Arc::clone(&self.cancelled);
        self.pool.spawn(move || {
            if cancelled.load(Ordering::Acquire) {
                return;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            // The receiver is gone only when the run already failed.
            let _ = tx.send(outcome);
        });
        TaskHandle { rx }
    }

    /// Skip every task that has not started yet and block until the running
    /// ones finish. Their outcomes are discarded.
    pub(crate) fn cancel<T>(&self, pending: impl IntoIterator<Item = TaskHandle<T>>) {
        self.cancelled.store(true, Ordering::Release);
        let mut discarded = 0usize;
        for handle in pending {
            // A skipped task drops its sender, which also ends the wait.
            let _ = handle.rx.recv();
            discarded += 1;
        }
        tracing::debug!(event = "tasks_cancelled", discarded);
    }

    /// Pass `outcome` through, cancelling everything in `pending` first when
    /// it is an error.
    pub(crate) fn or_cancel<T, R>(
        &self,
        pending: &mut VecDeque<TaskHandle<T>>,
        outcome: Result<R, OptimizeError>,
    ) -> Result<R, OptimizeError> {
        if outcome.is_err() {
            self.cancel(pending.drain(..));
        }
        outcome
    }
}

impl<T> TaskHandle<T> {
    /// Block until the task finishes.
    pub(crate) fn wait(self) -> Result<T, OptimizeError> {
        match self.rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(event = "worker_panicked", message = %message);
                Err(OptimizeError::Worker(message))
            }
            Err(_) => Err(OptimizeError::Worker(
                "worker exited without reporting a result".into(),
            )),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn results_come_back_in_submission_order() {
        let pool = TaskPool::new(4, "test-worker").unwrap();
        let mut handles = VecDeque::new();
        for i in 0..20u64 {
            handles.push_back(pool.submit(move || {
                // Earlier tasks take longer.
                std::thread::sleep(std::time::Duration::from_millis(20 - i));
                i
            }));
        }
        let mut seen = Vec::new();
        while let Some(handle) = handles.pop_front() {
            seen.push(handle.wait().unwrap());
        }
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn panics_become_worker_errors() {
        let pool = TaskPool::new(1, "test-worker").unwrap();
        let handle = pool.submit(|| -> u32 { panic!("boom") });
        match handle.wait() {
            Err(OptimizeError::Worker(message)) => assert!(message.contains("boom")),
            other => panic!("expected a worker error, got {other:?}"),
        }
    }

    #[test]
    fn cancel_skips_queued_tasks_and_waits_for_running_ones() {
        let pool = TaskPool::new(1, "test-worker").unwrap();
        let started = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let queued_runs = Arc::new(AtomicUsize::new(0));

        let mut handles = VecDeque::new();
        {
            let started = Arc::clone(&started);
            let finished = Arc::clone(&finished);
            handles.push_back(pool.submit(move || {
                started.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                finished.store(true, Ordering::SeqCst);
            }));
        }
        for _ in 0..10 {
            let queued_runs = Arc::clone(&queued_runs);
            handles.push_back(pool.submit(move || {
                queued_runs.fetch_add(1, Ordering::SeqCst);
            }));
        }
        while !started.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }

        pool.cancel(handles);
        assert!(finished.load(Ordering::SeqCst), "running task was waited for");
        assert_eq!(queued_runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancelled_pool_reports_skipped_tasks_as_errors() {
        let pool = TaskPool::new(1, "test-worker").unwrap();
        pool.cancel(Vec::<TaskHandle<u32>>::new());
        let handle = pool.submit(|| 7u32);
        assert!(matches!(handle.wait(), Err(OptimizeError::Worker(_))));
    }

    #[test]
    fn failed_outcome_cancels_pending_tasks() {
        let pool = TaskPool::new(1, "test-worker").unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let started = Arc::new(AtomicBool::new(false));
        let gate = {
            let started = Arc::clone(&started);
            pool.submit(move || {
                started.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(30));
            })
        };
        let mut pending: VecDeque<_> = (0..5)
            .map(|_| {
                let runs = Arc::clone(&runs);
                pool.submit(move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        while !started.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }

        let ok: Result<u8, OptimizeError> = pool.or_cancel(&mut pending, Ok(1));
        assert_eq!(ok.unwrap(), 1);
        assert_eq!(pending.len(), 5);

        let failed: Result<u8, OptimizeError> =
            pool.or_cancel(&mut pending, Err(OptimizeError::Worker("boom".into())));
        assert!(failed.is_err());
        assert!(pending.is_empty());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(matches!(gate.wait(), Ok(())));
    }
}
