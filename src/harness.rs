//! Producer/consumer driver for a shared [`BoundedQueue`](crate::BoundedQueue).
//!
//! Spawns a set of producer threads that insert random values and a set of
//! consumer threads that remove them, each sleeping a random interval
//! between calls. Threads never touch the queue's internals; they only hold
//! a [`Producer`] or [`Consumer`] handle.
//!
//! Every thread owns its own [`SmallRng`], so the random delays add no
//! shared state beyond the queue itself.

use crate::bounded::{BoundedQueueChannel, Consumer, Producer};
use crate::error::QueueError;
use crate::trace::{info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Default number of producer threads.
pub const DEFAULT_PRODUCERS: usize = 10;

/// Default number of consumer threads.
pub const DEFAULT_CONSUMERS: usize = 10;

/// Default queue capacity.
pub const DEFAULT_CAPACITY: usize = 5;

/// Default upper bound for the sleep between two calls.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(100);

/// How long a blocked worker waits before re-checking the stop flag.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors raised while configuring or running a [`Harness`].
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{iterations} iterations across {producers} producers overflows the item count")]
    TooManyItems { iterations: u64, producers: usize },

    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("thread {0} panicked")]
    Panicked(String),
}

/// Harness configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub producers: usize,
    pub consumers: usize,
    pub capacity: usize,
    pub producer_max_delay: Duration,
    pub consumer_max_delay: Duration,
    /// Inserts per producer. `None` runs forever.
    pub iterations: Option<u64>,
    /// Base seed for the per-thread generators. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            producers: DEFAULT_PRODUCERS,
            consumers: DEFAULT_CONSUMERS,
            capacity: DEFAULT_CAPACITY,
            producer_max_delay: DEFAULT_MAX_DELAY,
            consumer_max_delay: DEFAULT_MAX_DELAY,
            iterations: None,
            seed: None,
        }
    }
}

impl HarnessConfig {
    /// Rejects zero thread counts, capacity, iteration budgets and delays,
    /// and item totals that do not fit in a `u64`.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.producers == 0 {
            return Err(HarnessError::Zero("producer count"));
        }
        if self.consumers == 0 {
            return Err(HarnessError::Zero("consumer count"));
        }
        if self.capacity == 0 {
            return Err(QueueError::ZeroCapacity.into());
        }
        if self.producer_max_delay.is_zero() {
            return Err(HarnessError::Zero("producer max delay"));
        }
        if self.consumer_max_delay.is_zero() {
            return Err(HarnessError::Zero("consumer max delay"));
        }
        if let Some(iterations) = self.iterations {
            if iterations == 0 {
                return Err(HarnessError::Zero("iteration count"));
            }
            if iterations.checked_mul(self.producers as u64).is_none() {
                return Err(HarnessError::TooManyItems {
                    iterations,
                    producers: self.producers,
                });
            }
        }
        Ok(())
    }

    /// Number of removes assigned to the consumer at `index` (zero-based).
    ///
    /// The total equals the total number of inserts, split as evenly as
    /// possible with the remainder going to the lowest indices. Relies on
    /// [`validate`](Self::validate) having ruled out overflow.
    fn consumer_budget(&self, index: usize) -> Option<u64> {
        let total = self.iterations? * self.producers as u64;
        let consumers = self.consumers as u64;
        let extra = ((index as u64) < total % consumers) as u64;
        Some(total / consumers + extra)
    }

    fn rng_for(&self, thread_num: usize) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed ^ (thread_num as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            None => SmallRng::from_os_rng(),
        }
    }
}

/// Totals reported by a finished [`Harness::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarnessReport {
    pub produced: u64,
    pub consumed: u64,
}

/// Owns the queue handles and spawns the worker threads.
pub struct Harness {
    config: HarnessConfig,
    producer: Producer<u64>,
    consumer: Consumer<u64>,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        let (producer, consumer) = BoundedQueueChannel::split(config.capacity)?;
        Ok(Self {
            config,
            producer,
            consumer,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Spawns all workers and waits for them.
    ///
    /// Producers are numbered `1..=producers` and consumers continue from
    /// `producers + 1`. With `iterations == None` this never returns.
    ///
    /// If a thread cannot be spawned, the workers already running are told
    /// to stop and are joined before the error is returned.
    pub fn run(self) -> Result<HarnessReport, HarnessError> {
        let stop = Arc::new(AtomicBool::new(false));
        let mut producers = Vec::with_capacity(self.config.producers);
        let mut consumers = Vec::with_capacity(self.config.consumers);

        if let Err(e) = self.spawn_workers(&stop, &mut producers, &mut consumers) {
            warn!("aborting harness: {}", e);
            stop.store(true, Ordering::Relaxed);
            for handle in producers.into_iter().chain(consumers) {
                let _ = handle.join();
            }
            return Err(e);
        }

        let mut report = HarnessReport::default();
        for handle in producers {
            report.produced += join(handle)?;
        }
        for handle in consumers {
            report.consumed += join(handle)?;
        }
        info!(produced = report.produced, consumed = report.consumed, "harness finished");
        Ok(report)
    }

    fn spawn_workers(
        &self,
        stop: &Arc<AtomicBool>,
        producers: &mut Vec<JoinHandle<u64>>,
        consumers: &mut Vec<JoinHandle<u64>>,
    ) -> Result<(), HarnessError> {
        let config = &self.config;

        for thread_num in 1..=config.producers {
            let producer = self.producer.clone();
            let worker = Worker {
                thread_num,
                max_delay: config.producer_max_delay,
                rng: config.rng_for(thread_num),
                budget: config.iterations,
                stop: Arc::clone(stop),
            };
            let handle = spawn(format!("producer-{thread_num}"), move || producer_task(producer, worker))?;
            info!("created producer: thread {}", thread_num);
            producers.push(handle);
        }

        for index in 0..config.consumers {
            let thread_num = config.producers + index + 1;
            let consumer = self.consumer.clone();
            let worker = Worker {
                thread_num,
                max_delay: config.consumer_max_delay,
                rng: config.rng_for(thread_num),
                budget: config.consumer_budget(index),
                stop: Arc::clone(stop),
            };
            let handle = spawn(format!("consumer-{thread_num}"), move || consumer_task(consumer, worker))?;
            info!("created consumer: thread {}", thread_num);
            consumers.push(handle);
        }
        Ok(())
    }
}

/// Per-thread state of a producer or consumer loop.
struct Worker {
    thread_num: usize,
    max_delay: Duration,
    rng: SmallRng,
    /// Operations left to perform. `None` loops forever.
    budget: Option<u64>,
    stop: Arc<AtomicBool>,
}

impl Worker {
    fn has_budget(&self, done: u64) -> bool {
        self.budget.is_none_or(|budget| done < budget)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn pause(&mut self) {
        thread::sleep(random_delay(&mut self.rng, self.max_delay));
    }
}

fn spawn<F>(name: String, task: F) -> Result<JoinHandle<u64>, HarnessError>
where
    F: FnOnce() -> u64 + Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(task)
        .map_err(|source| HarnessError::Spawn { name, source })
}

fn join(handle: JoinHandle<u64>) -> Result<u64, HarnessError> {
    let name = handle.thread().name().unwrap_or("<unnamed>").to_owned();
    handle.join().map_err(|_| HarnessError::Panicked(name))
}

/// Returns a delay in `[0, max_delay)` at millisecond granularity.
fn random_delay(rng: &mut SmallRng, max_delay: Duration) -> Duration {
    let max_ms = max_delay.as_millis().min(u64::MAX as u128) as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.random_range(0..max_ms))
}

/// Inserts random values until the budget runs out or `stop` is raised.
fn producer_task(producer: Producer<u64>, mut worker: Worker) -> u64 {
    let mut produced = 0;
    while worker.has_budget(produced) {
        let mut item = worker.rng.random();
        let position = loop {
            if worker.stopped() {
                return produced;
            }
            match producer.insert_timeout(item, STOP_POLL_INTERVAL) {
                Ok(position) => break position,
                Err(rejected) => item = rejected,
            }
        };
        info!("item {:2} produced by thread {}", position + 1, worker.thread_num);
        produced += 1;
        worker.pause();
    }
    produced
}

/// Removes values until the budget runs out or `stop` is raised.
fn consumer_task(consumer: Consumer<u64>, mut worker: Worker) -> u64 {
    let mut consumed = 0;
    while worker.has_budget(consumed) {
        let position = loop {
            if worker.stopped() {
                return consumed;
            }
            if let Some((_item, position)) = consumer.remove_timeout(STOP_POLL_INTERVAL) {
                break position;
            }
        };
        info!("item {:2} consumed by thread {}", position + 1, worker.thread_num);
        consumed += 1;
        worker.pause();
    }
    consumed
}
