use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::{Config, Context, ControlFlow, Error, Job, JobQueue, Worker};

/* ---------- */

pub(crate) struct SpinningWorker;

impl Worker for SpinningWorker {
    fn on_update(&mut self) -> Result<ControlFlow, Error> {
        std::thread::sleep(Duration::from_millis(1));
        Ok(ControlFlow::Continue)
    }
}

/* ---------- */

pub(crate) struct TimedWorker {
    timeout: Duration,
    now: Instant,
}

impl TimedWorker {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            now: Instant::now(),
        }
    }
}

impl Worker for TimedWorker {
    fn on_start(&mut self) {
        self.now = Instant::now();
    }

    fn on_update(&mut self) -> Result<ControlFlow, Error> {
        if self.now.elapsed() >= self.timeout {
            return Ok(ControlFlow::Break);
        }

        Ok(ControlFlow::Continue)
    }
}

/* ---------- */

pub(crate) struct PanickingWorker;

impl Worker for PanickingWorker {
    fn on_update(&mut self) -> Result<ControlFlow, Error> {
        panic!("panicking on purpose")
    }
}

/* ---------- */

/// Counts its updates, fails on `fail_at` if set, and records how it stopped.
pub(crate) struct RecordingWorker {
    pub(crate) updates: usize,
    limit: usize,
    fail_at: Option<usize>,
    outcome: Arc<Mutex<Option<Result<(), String>>>>,
}

impl RecordingWorker {
    pub(crate) fn new(
        limit: usize,
        fail_at: Option<usize>,
        outcome: Arc<Mutex<Option<Result<(), String>>>>,
    ) -> Self {
        Self {
            updates: 0,
            limit,
            fail_at,
            outcome,
        }
    }
}

impl Worker for RecordingWorker {
    fn on_update(&mut self) -> Result<ControlFlow, Error> {
        self.updates += 1;

        if self.fail_at == Some(self.updates) {
            return Err(Error::protocol("boom"));
        }
        if self.updates >= self.limit {
            return Ok(ControlFlow::Break);
        }

        Ok(ControlFlow::Continue)
    }

    fn on_stop(&mut self, outcome: Result<(), Error>) {
        *self.outcome.lock().unwrap() = Some(outcome.map_err(|err| err.to_string()));
    }
}

/* ---------- */

pub(crate) struct BadWorker;

impl Worker for BadWorker {}

pub(crate) struct BadWorkerContext;

impl Context for BadWorkerContext {
    type Target = BadWorker;

    fn into_worker(self) -> Result<Self::Target, Error> {
        Err(Error::context("bad context"))
    }
}

/* ---------- */

/// Takes everything out of `queue`, acknowledging sentinels, until it's drained.
///
/// Real jobs show up as their size, sentinels as `None`.
pub(crate) fn drain_sizes(queue: &JobQueue) -> Vec<Option<u32>> {
    let mut sizes = Vec::new();

    while let Some(job) = queue.try_take_next().unwrap() {
        if let Job::Done { .. } = job {
            queue.mark_producer_done().unwrap();
        }
        sizes.push(job.size());
    }

    sizes
}

/// A configuration with no think time and no service time.
pub(crate) fn fast_config(producers: usize, consumers: usize) -> Config {
    Config::new(producers, consumers)
        .jobs_per_producer(1..=8)
        .think_time(Duration::ZERO..=Duration::ZERO)
        .service_unit(Duration::ZERO)
}
