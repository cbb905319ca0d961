use std::ops::RangeInclusive;
use std::time::Duration;

use crate::policy::Policy;
use crate::Error;

/// Default number of pending jobs the queue holds.
pub const DEFAULT_CAPACITY: usize = 15;

/// Parameters of a run.
///
/// Built with chained setters, then checked with [`Config::validate`] before any
/// worker starts.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use printshop::{Config, Policy};
///
/// let config = Config::new(2, 3)
///     .capacity(4)
///     .policy(Policy::Sjf)
///     .service_unit(Duration::from_micros(10))
///     .seed(7);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of producer workers.
    pub producers: usize,
    /// Number of consumer workers.
    pub consumers: usize,
    /// Maximum number of pending jobs.
    pub capacity: usize,
    /// Dequeue ordering.
    pub policy: Policy,
    /// Range the number of jobs of each producer is drawn from.
    pub jobs_per_producer: RangeInclusive<usize>,
    /// Range job sizes are drawn from, in service units.
    pub job_size: RangeInclusive<u32>,
    /// Range the pause of a producer between two submissions is drawn from.
    pub think_time: RangeInclusive<Duration>,
    /// Service time of one unit of job size.
    pub service_unit: Duration,
    /// Seed of the workers' random generators, entropy if `None`.
    pub seed: Option<u64>,
    /// CPU IDs worker threads are pinned to, round-robin. Empty leaves them unpinned.
    pub cores: Vec<usize>,
    /// Whether `SIGINT`/`SIGTERM` cancel the run.
    pub graceful_shutdown: bool,
}

impl Config {
    /// Returns the default configuration for `producers` producers and `consumers` consumers.
    pub fn new(producers: usize, consumers: usize) -> Self {
        Self {
            producers,
            consumers,
            capacity: DEFAULT_CAPACITY,
            policy: Policy::Fcfs,
            jobs_per_producer: 1..=20,
            job_size: 100..=1000,
            think_time: Duration::from_millis(100)..=Duration::from_secs(1),
            service_unit: Duration::from_millis(10),
            seed: None,
            cores: Vec::new(),
            graceful_shutdown: false,
        }
    }

    /// Sets the queue capacity.
    pub fn capacity(self, capacity: usize) -> Self {
        Self { capacity, ..self }
    }

    /// Sets the scheduling policy.
    pub fn policy(self, policy: Policy) -> Self {
        Self { policy, ..self }
    }

    /// Sets the range of jobs per producer.
    pub fn jobs_per_producer(self, jobs_per_producer: RangeInclusive<usize>) -> Self {
        Self {
            jobs_per_producer,
            ..self
        }
    }

    /// Sets the range of job sizes.
    pub fn job_size(self, job_size: RangeInclusive<u32>) -> Self {
        Self { job_size, ..self }
    }

    /// Sets the range of producer think times.
    pub fn think_time(self, think_time: RangeInclusive<Duration>) -> Self {
        Self { think_time, ..self }
    }

    /// Sets the service time of one unit of job size.
    pub fn service_unit(self, service_unit: Duration) -> Self {
        Self {
            service_unit,
            ..self
        }
    }

    /// Seeds the workers' random generators.
    pub fn seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    /// Pins worker threads to `cores`.
    pub fn cores<C: IntoIterator<Item = usize>>(self, cores: C) -> Self {
        Self {
            cores: cores.into_iter().collect(),
            ..self
        }
    }

    /// Lets termination signals cancel the run.
    pub fn graceful_shutdown(self, graceful_shutdown: bool) -> Self {
        Self {
            graceful_shutdown,
            ..self
        }
    }

    /// Returns the CPU IDs the `nth` worker thread is pinned to.
    pub(crate) fn cores_for(&self, nth: usize) -> Vec<usize> {
        match self.cores.len() {
            0 => Vec::new(),
            len => vec![self.cores[nth % len]],
        }
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid parameter.
    pub fn validate(&self) -> Result<(), Error> {
        if self.producers == 0 {
            return Err(Error::config("the number of producers must be positive"));
        }
        if self.consumers == 0 {
            return Err(Error::config("the number of consumers must be positive"));
        }
        if self.capacity == 0 {
            return Err(Error::config("the queue capacity must be positive"));
        }
        if self.jobs_per_producer.is_empty() {
            return Err(Error::config("the range of jobs per producer is empty"));
        }
        if self.job_size.is_empty() || *self.job_size.start() == 0 {
            return Err(Error::config("job sizes must be a non-empty positive range"));
        }
        if self.think_time.is_empty() {
            return Err(Error::config("the think time range is empty"));
        }

        Ok(())
    }
}

/* ---------- */
