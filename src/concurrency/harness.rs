//! Bounded multi-worker runs for stress tests, demos and benches.
//!
//! The primitives in this crate never retry and never time out on their own.
//! This module holds the caller-side pieces that do: a run configuration that
//! can be loaded from JSON, a scoped runner that starts all workers together,
//! and a bounded `try_acquire` retry loop.

use crate::concurrency::sync::{ReentrantMutex, ReentrantMutexGuard};
use anyhow::{bail, Context, Result};
use crossbeam_utils::Backoff;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};

/// When a worker stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunBound {
    /// A fixed number of iterations per worker.
    Iterations(u64),
    /// Wall-clock milliseconds from the common start.
    Duration(u64),
}

/// How many workers to run and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Worker threads, all released at once.
    pub workers: usize,
    /// Per-worker stop condition.
    pub bound: RunBound,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            bound: RunBound::Iterations(1_000),
        }
    }
}

impl HarnessConfig {
    /// `workers` threads running `iterations` each.
    pub fn iterations(workers: usize, iterations: u64) -> Self {
        Self {
            workers,
            bound: RunBound::Iterations(iterations),
        }
    }

    /// `workers` threads running for `millis` milliseconds.
    pub fn timed(workers: usize, millis: u64) -> Self {
        Self {
            workers,
            bound: RunBound::Duration(millis),
        }
    }

    /// Parses and validates a JSON document such as
    /// `{"workers": 8, "bound": {"iterations": 500}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("malformed harness config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("loading {}", path.display()))
    }

    /// Rejects configs that would run nothing.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("harness needs at least one worker");
        }
        match self.bound {
            RunBound::Iterations(0) => bail!("iteration bound must be non-zero"),
            RunBound::Duration(0) => bail!("duration bound must be non-zero"),
            _ => Ok(()),
        }
    }
}

/// Per-worker view of the run handed to the worker closure.
pub struct WorkerContext {
    index: usize,
    bound: RunBound,
    started: Instant,
    completed: u64,
}

impl WorkerContext {
    /// Worker number in `0..workers`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Iterations this worker has started so far.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Whether the worker should run another iteration; counts it if so.
    pub fn should_continue(&mut self) -> bool {
        let go = match self.bound {
            RunBound::Iterations(n) => self.completed < n,
            RunBound::Duration(ms) => self.started.elapsed() < Duration::from_millis(ms),
        };
        if go {
            self.completed += 1;
        }
        go
    }
}

/// Runs `work` on `config.workers` scoped threads released by a common barrier.
///
/// Results come back in worker order. A panicking worker's payload is re-raised
/// on the calling thread after every worker has been joined.
pub fn run_workers<T, F>(config: &HarnessConfig, work: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&mut WorkerContext) -> T + Sync,
{
    config.validate()?;
    let start = Barrier::new(config.workers);
    let began = Instant::now();
    tracing::debug!(workers = config.workers, bound = ?config.bound, "harness start");

    let outcomes: Vec<thread::Result<T>> = thread::scope(|s| {
        let handles: Vec<_> = (0..config.workers)
            .map(|index| {
                let (start, work) = (&start, &work);
                s.spawn(move || {
                    start.wait();
                    let mut ctx = WorkerContext {
                        index,
                        bound: config.bound,
                        started: Instant::now(),
                        completed: 0,
                    };
                    work(&mut ctx)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    let mut results = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(value) => results.push(value),
            Err(payload) => {
                tracing::warn!("harness worker panicked");
                std::panic::resume_unwind(payload);
            }
        }
    }
    tracing::debug!(elapsed = ?began.elapsed(), "harness finish");
    Ok(results)
}

fn retry_until<R>(timeout: Duration, mut attempt: impl FnMut() -> Option<R>) -> Option<R> {
    let deadline = Instant::now() + timeout;
    let backoff = Backoff::new();
    loop {
        if let Some(won) = attempt() {
            return Some(won);
        }
        if Instant::now() >= deadline {
            return None;
        }
        if backoff.is_completed() {
            thread::sleep(Duration::from_micros(100));
        } else {
            backoff.snooze();
        }
    }
}

/// Retries [`ReentrantMutex::try_acquire`] until it succeeds or `timeout` passes.
///
/// On `true` the caller holds the lock and must [`release`](ReentrantMutex::release) it.
pub fn try_acquire_for<T>(mutex: &ReentrantMutex<T>, timeout: Duration) -> bool {
    retry_until(timeout, || mutex.try_acquire().then_some(())).is_some()
}

/// Guard-returning form of [`try_acquire_for`].
pub fn try_lock_for<T>(mutex: &ReentrantMutex<T>, timeout: Duration) -> Option<ReentrantMutexGuard<'_, T>> {
    retry_until(timeout, || mutex.try_lock())
}
