//! Persistent worker pool for fitness evaluation.
//!
//! # Protocol
//!
//! For each generation the coordinator:
//! 1. publishes an immutable snapshot (chromosomes plus the shared
//!    [`FitnessEvaluator`]) and resets the work counter, under one lock;
//! 2. posts one work signal per chromosome;
//! 3. collects exactly one result per chromosome index from the results
//!    channel, waiting at most `result_timeout` for each.
//!
//! A worker woken by a work signal claims the next index under the same
//! lock, scores that chromosome and sends `(generation, index, fitness)`
//! back. Results are tagged with the generation id so stragglers from an
//! abandoned generation are ignored.
//!
//! Threads cannot be killed. [`WorkerPool::shutdown`] raises the shutdown
//! flag, posts one terminate signal per worker, reaps finished threads for
//! a bounded time and detaches whatever is still running. Detached threads
//! keep counting as live until they actually exit.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::error::{RescueError, Result};
use crate::ga::{Chromosome, FitnessEvaluator};

/// Default wait for a single result before the generation is abandoned.
pub const DEFAULT_RESULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default bound on reaping workers at shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

const REAP_INTERVAL: Duration = Duration::from_millis(5);

enum Signal {
    Work,
    Terminate,
}

enum WorkerEvent {
    Scored {
        generation: u64,
        index: usize,
        fitness: f64,
        worker: usize,
    },
    Fault {
        worker: usize,
        index: usize,
        reason: String,
    },
}

struct GenerationJob {
    id: u64,
    fitness: Arc<FitnessEvaluator>,
    chromosomes: Vec<Chromosome>,
}

#[derive(Default)]
struct JobState {
    job: Option<Arc<GenerationJob>>,
    next_index: usize,
}

struct Shared {
    state: Mutex<JobState>,
    shutdown: AtomicBool,
}

struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

/// A generation that could not be fully evaluated by the pool.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("worker pool fault: {reason}")]
pub struct PoolFault {
    /// Results that did arrive, indexed like the population.
    pub partial: Vec<Option<f64>>,
    /// What went wrong.
    pub reason: String,
}

impl PoolFault {
    /// Number of chromosomes left without a result.
    pub fn missing(&self) -> usize {
        self.partial.iter().filter(|r| r.is_none()).count()
    }
}

/// Running totals for a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Worker threads spawned.
    pub workers: usize,
    /// Generations evaluated completely.
    pub generations: u64,
    /// Individual results received.
    pub evaluations: u64,
    /// Generations abandoned after a fault.
    pub faults: u64,
}

impl PoolStats {
    /// Adds another pool's counters to this one.
    pub fn absorb(&mut self, other: PoolStats) {
        self.workers += other.workers;
        self.generations += other.generations;
        self.evaluations += other.evaluations;
        self.faults += other.faults;
    }
}

/// Outcome of [`WorkerPool::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Workers that exited and were joined.
    pub joined: usize,
    /// Workers still running at the deadline, left detached.
    pub detached: usize,
}

/// Fixed set of long-lived threads scoring chromosomes in parallel.
pub struct WorkerPool {
    workers: Vec<Worker>,
    detached: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
    work_tx: Option<Sender<Signal>>,
    results: Receiver<WorkerEvent>,
    result_timeout: Duration,
    shutdown_timeout: Duration,
    generation: u64,
    stats: PoolStats,
    last_per_worker: Vec<usize>,
}

impl WorkerPool {
    /// Spawns `size` workers (at least one).
    ///
    /// If any spawn fails the already started workers are shut down and the
    /// error is returned.
    pub fn new(size: usize, result_timeout: Duration) -> Result<Self> {
        let size = size.max(1);
        let (work_tx, work_rx) = mpsc::channel();
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (result_tx, results) = mpsc::channel();
        let shared = Arc::new(Shared {
            state: Mutex::new(JobState::default()),
            shutdown: AtomicBool::new(false),
        });

        let mut pool = Self {
            workers: Vec::with_capacity(size),
            detached: Vec::new(),
            shared,
            work_tx: Some(work_tx),
            results,
            result_timeout,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            generation: 0,
            stats: PoolStats::default(),
            last_per_worker: vec![0; size],
        };

        for id in 0..size {
            let work_rx = Arc::clone(&work_rx);
            let result_tx = result_tx.clone();
            let shared = Arc::clone(&pool.shared);
            let spawned = thread::Builder::new()
                .name(format!("rescue-worker-{id}"))
                .spawn(move || worker_loop(id, work_rx, result_tx, shared));
            match spawned {
                Ok(handle) => pool.workers.push(Worker {
                    id,
                    handle: Some(handle),
                }),
                Err(source) => {
                    pool.shutdown();
                    return Err(RescueError::PoolSpawn { worker: id, source });
                }
            }
        }

        pool.stats.workers = size;
        info!(workers = size, "worker pool started");
        Ok(pool)
    }

    /// Sets the bound on reaping workers at shutdown.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Worker threads that have not finished, detached ones included.
    pub fn live_workers(&self) -> usize {
        let attached = self
            .workers
            .iter()
            .filter(|w| w.handle.as_ref().is_some_and(|h| !h.is_finished()))
            .count();
        attached + self.detached.iter().filter(|h| !h.is_finished()).count()
    }

    /// Running totals.
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Results delivered per worker in the last complete generation.
    pub fn last_generation_share(&self) -> &[usize] {
        &self.last_per_worker
    }

    /// Whether [`WorkerPool::shutdown`] has run.
    pub fn is_shut_down(&self) -> bool {
        self.work_tx.is_none()
    }

    /// Scores every chromosome of `population` on the workers.
    ///
    /// Returns fitness values in population order, or a [`PoolFault`] with
    /// whatever results arrived if a worker failed, the pool was shut down,
    /// or no result arrived within the result timeout.
    pub fn evaluate(
        &mut self,
        fitness: &Arc<FitnessEvaluator>,
        population: &[Chromosome],
    ) -> std::result::Result<Vec<f64>, PoolFault> {
        let total = population.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let Some(work_tx) = self.work_tx.as_ref() else {
            return Err(PoolFault {
                partial: vec![None; total],
                reason: "worker pool is shut down".to_string(),
            });
        };

        self.generation += 1;
        let generation = self.generation;
        {
            let mut state = lock(&self.shared.state);
            state.job = Some(Arc::new(GenerationJob {
                id: generation,
                fitness: Arc::clone(fitness),
                chromosomes: population.to_vec(),
            }));
            state.next_index = 0;
        }

        let mut reason = None;
        for _ in 0..total {
            if work_tx.send(Signal::Work).is_err() {
                reason = Some("all workers have exited".to_string());
                break;
            }
        }

        let mut results: Vec<Option<f64>> = vec![None; total];
        let mut per_worker = vec![0; self.workers.len()];
        let mut received = 0;
        let mut lost = 0;

        while reason.is_none() && received + lost < total {
            match self.results.recv_timeout(self.result_timeout) {
                Ok(WorkerEvent::Scored {
                    generation: tag,
                    index,
                    fitness,
                    worker,
                }) => {
                    if tag != generation {
                        continue;
                    }
                    match results.get_mut(index) {
                        Some(slot) if slot.is_none() => {
                            *slot = Some(fitness);
                            received += 1;
                            if let Some(count) = per_worker.get_mut(worker) {
                                *count += 1;
                            }
                        }
                        Some(_) => reason = Some(format!("duplicate result for chromosome {index}")),
                        None => reason = Some(format!("result index {index} out of range")),
                    }
                }
                Ok(WorkerEvent::Fault {
                    worker,
                    index,
                    reason: cause,
                }) => {
                    error!(worker, index, reason = %cause, "worker failed");
                    lost += 1;
                    if received + lost == total {
                        reason = Some(format!("worker {worker} failed: {cause}"));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    reason = Some(format!(
                        "no result within {:?} ({received} of {total} received)",
                        self.result_timeout
                    ));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    reason = Some("all workers have exited".to_string());
                }
            }
        }

        self.stats.evaluations += received as u64;
        match reason {
            None => {
                self.stats.generations += 1;
                self.last_per_worker = per_worker;
                debug!(generation, evaluated = total, "generation evaluated");
                Ok(results.into_iter().flatten().collect())
            }
            Some(reason) => {
                self.stats.faults += 1;
                warn!(generation, received, total, %reason, "generation abandoned");
                Err(PoolFault {
                    partial: results,
                    reason,
                })
            }
        }
    }

    /// Stops every worker.
    ///
    /// Idempotent; a second call reports nothing.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        let Some(work_tx) = self.work_tx.take() else {
            return report;
        };

        self.shared.shutdown.store(true, Ordering::Release);
        for _ in 0..self.workers.len() {
            let _ = work_tx.send(Signal::Terminate);
        }
        drop(work_tx);

        let deadline = Instant::now() + self.shutdown_timeout;
        loop {
            for worker in &mut self.workers {
                let finished = worker.handle.as_ref().is_some_and(|h| h.is_finished());
                if !finished {
                    continue;
                }
                if let Some(handle) = worker.handle.take() {
                    if handle.join().is_err() {
                        warn!(worker = worker.id, "worker thread panicked");
                    }
                    report.joined += 1;
                }
            }
            if self.workers.iter().all(|w| w.handle.is_none()) || Instant::now() >= deadline {
                break;
            }
            thread::sleep(REAP_INTERVAL);
        }

        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                error!(worker = worker.id, "worker did not stop in time; detaching");
                self.detached.push(handle);
                report.detached += 1;
            }
        }

        lock(&self.shared.state).job = None;
        info!(
            joined = report.joined,
            detached = report.detached,
            "worker pool shut down"
        );
        report
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("detached", &self.detached.len())
            .field("generation", &self.generation)
            .field("stats", &self.stats)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn worker_loop(
    id: usize,
    work_rx: Arc<Mutex<Receiver<Signal>>>,
    results: Sender<WorkerEvent>,
    shared: Arc<Shared>,
) {
    debug!(worker = id, "worker started");
    loop {
        let signal = lock(&*work_rx).recv();
        match signal {
            Ok(Signal::Work) => {}
            Ok(Signal::Terminate) | Err(_) => break,
        }
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }

        let claimed = {
            let mut state = lock(&shared.state);
            let index = state.next_index;
            state.next_index += 1;
            state.job.clone().map(|job| (job, index))
        };
        let Some((job, index)) = claimed else {
            continue;
        };
        let Some(chromosome) = job.chromosomes.get(index) else {
            continue;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| job.fitness.score(chromosome))) {
            Ok(fitness) => {
                let event = WorkerEvent::Scored {
                    generation: job.id,
                    index,
                    fitness,
                    worker: id,
                };
                if results.send(event).is_err() {
                    break;
                }
            }
            Err(payload) => {
                let _ = results.send(WorkerEvent::Fault {
                    worker: id,
                    index,
                    reason: panic_message(payload.as_ref()),
                });
                break;
            }
        }
    }
    debug!(worker = id, "worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::testing::{fixture, panicking_fixture, stalled_fixture};

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_every_chromosome_scored_once() {
        let (fitness, population) = fixture(37);
        let mut pool = WorkerPool::new(4, TIMEOUT).unwrap();

        let values = pool.evaluate(&fitness, &population).unwrap();
        let expected: Vec<f64> = population.iter().map(|c| fitness.score(c)).collect();
        assert_eq!(values, expected);

        assert_eq!(pool.stats().evaluations, 37);
        assert_eq!(pool.last_generation_share().iter().sum::<usize>(), 37);
    }

    #[test]
    fn test_pool_reused_across_generations() {
        let (fitness, population) = fixture(20);
        let mut pool = WorkerPool::new(3, TIMEOUT).unwrap();
        for _ in 0..5 {
            let values = pool.evaluate(&fitness, &population).unwrap();
            assert_eq!(values.len(), 20);
        }
        let stats = pool.stats();
        assert_eq!(stats.generations, 5);
        assert_eq!(stats.evaluations, 100);
        assert_eq!(stats.faults, 0);
        assert_eq!(stats.workers, 3);
    }

    #[test]
    fn test_more_workers_than_chromosomes() {
        let (fitness, population) = fixture(2);
        let mut pool = WorkerPool::new(8, TIMEOUT).unwrap();
        let values = pool.evaluate(&fitness, &population).unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_empty_population() {
        let (fitness, _) = fixture(1);
        let mut pool = WorkerPool::new(2, TIMEOUT).unwrap();
        assert_eq!(pool.evaluate(&fitness, &[]).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_zero_size_spawns_one_worker() {
        let pool = WorkerPool::new(0, TIMEOUT).unwrap();
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_shutdown_joins_all_workers() {
        let (fitness, population) = fixture(10);
        let mut pool = WorkerPool::new(4, TIMEOUT).unwrap();
        pool.evaluate(&fitness, &population).unwrap();

        let report = pool.shutdown();
        assert_eq!(report.joined, 4);
        assert_eq!(report.detached, 0);
        assert_eq!(pool.live_workers(), 0);
        assert!(pool.is_shut_down());

        assert_eq!(pool.shutdown(), ShutdownReport::default());
        let fault = pool.evaluate(&fitness, &population).unwrap_err();
        assert_eq!(fault.missing(), 10);
    }

    #[test]
    fn test_worker_panic_reported_as_fault() {
        let (fitness, population) = panicking_fixture(6);
        let mut pool = WorkerPool::new(2, Duration::from_secs(5)).unwrap();

        let fault = pool.evaluate(&fitness, &population).unwrap_err();
        assert_eq!(fault.partial.len(), 6);
        assert_eq!(fault.missing(), 6);
        assert_eq!(pool.stats().faults, 1);

        let report = pool.shutdown();
        assert_eq!(report.detached, 0);
    }

    #[test]
    fn test_stalled_workers_time_out_and_stay_live_after_detach() {
        let (fitness, population, held) = stalled_fixture(2);
        let mut pool = WorkerPool::new(2, Duration::from_millis(50))
            .unwrap()
            .with_shutdown_timeout(Duration::from_millis(100));

        let started = Instant::now();
        let fault = pool.evaluate(&fitness, &population).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(fault.reason.starts_with("no result within"), "{}", fault.reason);
        assert_eq!(fault.missing(), 2);
        assert_eq!(pool.stats().faults, 1);

        let started = Instant::now();
        let report = pool.shutdown();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(
            report,
            ShutdownReport {
                joined: 0,
                detached: 2
            }
        );
        assert_eq!(pool.live_workers(), 2);

        held.store(false, Ordering::Release);
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.live_workers() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(pool.live_workers(), 0);
    }
}
