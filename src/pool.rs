use crossbeam_deque::{Injector, Steal};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use crate::trace::trace;

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub num_workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus(),
        }
    }
}

impl PoolConfig {
    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
        }
    }
}

/// Get number of CPUs (fallback to 1).
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Pool statistics.
#[derive(Debug, Default)]
pub struct PoolStats {
    pub jobs_submitted: AtomicUsize,
    pub jobs_completed: AtomicUsize,
}

impl PoolStats {
    pub fn record_submitted(&self) {
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn submitted(&self) -> usize {
        self.jobs_submitted.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> usize {
        self.jobs_completed.load(Ordering::Relaxed)
    }
}

/// Runs independent jobs on scoped threads fed from a shared injector.
///
/// Results come back in submission order regardless of which worker ran
/// each job. The first failing job stops the others from taking new work.
pub struct WorkerPool {
    config: PoolConfig,
    stats: PoolStats,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            config,
            stats: PoolStats::default(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Apply `job` to every input.
    pub fn run<I, O, E, F>(&self, inputs: Vec<I>, job: F) -> Result<Vec<O>, E>
    where
        I: Send,
        O: Send,
        E: Send,
        F: Fn(I) -> Result<O, E> + Sync,
    {
        let total = inputs.len();
        let workers = self.config.num_workers.min(total);
        if workers <= 1 {
            let mut out = Vec::with_capacity(total);
            for input in inputs {
                self.stats.record_submitted();
                out.push(job(input)?);
                self.stats.record_completed();
            }
            return Ok(out);
        }

        let injector = Injector::new();
        for (idx, input) in inputs.into_iter().enumerate() {
            injector.push((idx, input));
            self.stats.record_submitted();
        }
        let stop = AtomicBool::new(false);
        let results: Mutex<Vec<(usize, O)>> = Mutex::new(Vec::with_capacity(total));
        let failure: Mutex<Option<E>> = Mutex::new(None);

        thread::scope(|scope| {
            for _ in 0..workers {
                let (injector, stop, results, failure, job) =
                    (&injector, &stop, &results, &failure, &job);
                scope.spawn(move || {
                    while !stop.load(Ordering::SeqCst) {
                        match injector.steal() {
                            Steal::Success((idx, input)) => match job(input) {
                                Ok(out) => {
                                    results.lock().push((idx, out));
                                    self.stats.record_completed();
                                }
                                Err(err) => {
                                    stop.store(true, Ordering::SeqCst);
                                    failure.lock().get_or_insert(err);
                                }
                            },
                            Steal::Retry => continue,
                            Steal::Empty => break,
                        }
                    }
                });
            }
        });

        trace!(jobs = total, workers, "pool run finished");
        if let Some(err) = failure.into_inner() {
            return Err(err);
        }
        let mut results = results.into_inner();
        results.sort_by_key(|(idx, _)| *idx);
        Ok(results.into_iter().map(|(_, out)| out).collect())
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/pool.rs"]
mod tests;
