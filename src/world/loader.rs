//! Chunk synthesis backends.
//!
//! `ChunkLoader` runs synthesis on background worker threads fed by bounded
//! crossbeam channels. `InlineSynthesizer` does the same work on the calling
//! thread, for constrained targets and deterministic tests. The store talks
//! to either through `SynthesisBackend`.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded};
use parking_lot::RwLock;

use crate::core::ChunkCoord;
use crate::error::SynthesisError;
use crate::render::pool::GeometryBuffer;
use crate::world::generator::TerrainGenerator;

/// One chunk to build. The buffer moves into the job and back out with the result.
pub struct SynthesisJob {
    pub ticket: u64,
    pub coord: ChunkCoord,
    pub tier: usize,
    pub buffer: GeometryBuffer,
}

/// Completed job. `outcome` is `Err` when the buffer contents are unusable.
pub struct SynthesisResult {
    pub ticket: u64,
    pub coord: ChunkCoord,
    pub tier: usize,
    pub buffer: GeometryBuffer,
    pub outcome: Result<(), SynthesisError>,
    pub elapsed: Duration,
}

/// A job the backend could not accept. The buffer is handed back.
pub struct RejectedJob {
    pub job: SynthesisJob,
    pub reason: SynthesisError,
}

pub trait SynthesisBackend: Send {
    fn submit(&mut self, job: SynthesisJob) -> Result<(), RejectedJob>;

    /// Completed results, at most `max` of them, stopping once `budget` has elapsed.
    fn poll(&mut self, max: usize, budget: Duration) -> Vec<SynthesisResult>;

    /// Jobs submitted whose results have not been polled yet.
    fn in_flight(&self) -> usize;

    /// Block until every in-flight job has completed and return all results.
    fn drain(&mut self) -> Vec<SynthesisResult>;

    /// Swap the generator used for jobs submitted from now on.
    fn set_generator(&mut self, generator: Arc<TerrainGenerator>);

    fn worker_count(&self) -> usize;
}

fn synthesize(generator: &TerrainGenerator, job: SynthesisJob) -> SynthesisResult {
    let SynthesisJob {
        ticket,
        coord,
        tier,
        mut buffer,
    } = job;

    let start = Instant::now();
    let outcome = match catch_unwind(AssertUnwindSafe(|| generator.generate_chunk(coord, &mut buffer))) {
        Ok(outcome) => outcome,
        Err(_) => Err(SynthesisError::WorkerPanicked { coord }),
    };

    SynthesisResult {
        ticket,
        coord,
        tier,
        buffer,
        outcome,
        elapsed: start.elapsed(),
    }
}

/// Synthesizes on submit, on the calling thread.
pub struct InlineSynthesizer {
    generator: Arc<TerrainGenerator>,
    completed: VecDeque<SynthesisResult>,
}

impl InlineSynthesizer {
    pub fn new(generator: Arc<TerrainGenerator>) -> Self {
        InlineSynthesizer {
            generator,
            completed: VecDeque::new(),
        }
    }
}

impl SynthesisBackend for InlineSynthesizer {
    fn submit(&mut self, job: SynthesisJob) -> Result<(), RejectedJob> {
        let result = synthesize(&self.generator, job);
        self.completed.push_back(result);
        Ok(())
    }

    // Budget is ignored: the work already happened in `submit`
    fn poll(&mut self, max: usize, _budget: Duration) -> Vec<SynthesisResult> {
        let count = max.min(self.completed.len());
        self.completed.drain(..count).collect()
    }

    fn in_flight(&self) -> usize {
        self.completed.len()
    }

    fn drain(&mut self) -> Vec<SynthesisResult> {
        self.completed.drain(..).collect()
    }

    fn set_generator(&mut self, generator: Arc<TerrainGenerator>) {
        self.generator = generator;
    }

    fn worker_count(&self) -> usize {
        0
    }
}

/// Background synthesis on a fixed pool of worker threads
pub struct ChunkLoader {
    request_tx: Option<Sender<SynthesisJob>>,
    result_rx: Receiver<SynthesisResult>,
    generator: Arc<RwLock<Arc<TerrainGenerator>>>,
    workers: Vec<JoinHandle<()>>,
    in_flight: usize,
}

impl ChunkLoader {
    pub fn new(
        generator: Arc<TerrainGenerator>,
        worker_count: usize,
        request_capacity: usize,
        result_capacity: usize,
    ) -> Self {
        let worker_count = worker_count.max(1);

        // Bounded channels prevent unbounded memory growth
        let (request_tx, request_rx) = bounded::<SynthesisJob>(request_capacity.max(1));
        let (result_tx, result_rx) = bounded::<SynthesisResult>(result_capacity.max(1));
        let shared = Arc::new(RwLock::new(generator));

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            let shared = Arc::clone(&shared);

            let handle = thread::Builder::new()
                .name(format!("terrain-gen-{}", worker_id))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        let generator = Arc::clone(&*shared.read());
                        let result = synthesize(&generator, job);
                        if tx.send(result).is_err() {
                            // Main thread has closed, exit
                            break;
                        }
                    }
                    tracing::debug!(worker_id, "synthesis worker exiting");
                })
                .expect("Failed to spawn chunk synthesis worker");
            workers.push(handle);
        }

        tracing::info!(worker_count, request_capacity, result_capacity, "chunk loader started");

        ChunkLoader {
            request_tx: Some(request_tx),
            result_rx,
            generator: shared,
            workers,
            in_flight: 0,
        }
    }
}

impl SynthesisBackend for ChunkLoader {
    fn submit(&mut self, job: SynthesisJob) -> Result<(), RejectedJob> {
        let Some(tx) = &self.request_tx else {
            return Err(RejectedJob {
                job,
                reason: SynthesisError::Disconnected,
            });
        };

        // Non-blocking send; a full queue is retried next frame
        match tx.try_send(job) {
            Ok(()) => {
                self.in_flight += 1;
                Ok(())
            }
            Err(TrySendError::Full(job)) => Err(RejectedJob {
                job,
                reason: SynthesisError::QueueFull,
            }),
            Err(TrySendError::Disconnected(job)) => Err(RejectedJob {
                job,
                reason: SynthesisError::Disconnected,
            }),
        }
    }

    fn poll(&mut self, max: usize, budget: Duration) -> Vec<SynthesisResult> {
        let start = Instant::now();
        let mut results = Vec::new();

        while results.len() < max {
            match self.result_rx.try_recv() {
                Ok(result) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    results.push(result);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
            if start.elapsed() >= budget {
                break;
            }
        }

        results
    }

    fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn drain(&mut self) -> Vec<SynthesisResult> {
        let mut results = Vec::with_capacity(self.in_flight);
        while self.in_flight > 0 {
            match self.result_rx.recv_timeout(Duration::from_secs(5)) {
                Ok(result) => {
                    self.in_flight -= 1;
                    results.push(result);
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(in_flight = self.in_flight, "still waiting on synthesis workers");
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.in_flight = 0;
                    break;
                }
            }
        }
        results
    }

    fn set_generator(&mut self, generator: Arc<TerrainGenerator>) {
        *self.generator.write() = generator;
    }

    fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for ChunkLoader {
    fn drop(&mut self) {
        // Closing the request channel lets workers finish their current job and exit
        self.request_tx = None;
        while self.result_rx.recv().is_ok() {}
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("synthesis worker panicked during shutdown");
            }
        }
    }
}
