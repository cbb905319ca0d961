use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::job::Job;
use crate::queue::JobQueue;
use crate::report::{Collector, ConsumedJob, ConsumerReport, Connect, Outcome, WorkerReport};
use crate::{Context, ControlFlow, Error, Settings, Worker};

/* ---------- */

/// Builds a [`Consumer`].
///
/// The context must be registered with the run's [`Collector`] before being launched.
#[derive(Debug)]
pub struct ConsumerContext {
    id: usize,
    queue: Arc<JobQueue>,
    service_unit: Duration,
    cores: Vec<usize>,
    reports: Option<Sender<WorkerReport>>,
}

impl ConsumerContext {
    /// Returns the context of consumer `id`, serving jobs out of `queue`.
    pub fn new(id: usize, queue: Arc<JobQueue>) -> Self {
        Self {
            id,
            queue,
            service_unit: Duration::ZERO,
            cores: Vec::new(),
            reports: None,
        }
    }

    /// Sets the service time of one unit of job size.
    pub fn service_unit(self, service_unit: Duration) -> Self {
        Self {
            service_unit,
            ..self
        }
    }

    /// Pins the consumer's thread to `cores`.
    pub fn cores(self, cores: Vec<usize>) -> Self {
        Self { cores, ..self }
    }
}

impl Context for ConsumerContext {
    type Target = Consumer;

    fn into_worker(self) -> Result<Self::Target, Error> {
        let reports = self
            .reports
            .ok_or_else(|| Error::context(format!("consumer {} has no report endpoint", self.id)))?;

        Ok(Consumer {
            id: self.id,
            queue: self.queue,
            service_unit: self.service_unit,
            jobs: Vec::new(),
            sentinels: 0,
            reports,
        })
    }

    fn settings(&self) -> Settings {
        Settings::new()
            .name(format!("consumer-{}", self.id))
            .pinned(self.cores.clone())
    }
}

impl Connect<Collector> for ConsumerContext {
    fn on_connection(&mut self, endpoint: Sender<WorkerReport>) {
        let _ = self.reports.insert(endpoint);
    }
}

/* ---------- */

/// Takes jobs out of the queue and serves them until the queue is drained.
///
/// Serving a job means sleeping for a time proportional to its size. Sentinels are
/// acknowledged to the queue once they have been taken out of it, which is what
/// eventually lets every consumer see the queue as drained.
pub struct Consumer {
    id: usize,
    queue: Arc<JobQueue>,
    service_unit: Duration,
    jobs: Vec<ConsumedJob>,
    sentinels: usize,
    reports: Sender<WorkerReport>,
}

impl Worker for Consumer {
    fn on_start(&mut self) {
        tracing::info!(consumer = self.id, policy = self.queue.policy(), "starting consumer");
    }

    fn on_update(&mut self) -> Result<ControlFlow, Error> {
        let Some(job) = self.queue.try_take_next()? else {
            return Ok(ControlFlow::Break);
        };
        job.validate()?;

        match job {
            Job::Done { producer } => {
                let done = self.queue.mark_producer_done()?;
                self.sentinels += 1;
                tracing::debug!(
                    consumer = self.id,
                    producer,
                    done,
                    of = self.queue.producers(),
                    "producer finished"
                );
            }
            Job::Work(job) => {
                let wait = job.wait_time();
                self.jobs.try_reserve(1)?;
                self.jobs.push(ConsumedJob {
                    size: job.size(),
                    wait,
                });
                tracing::debug!(consumer = self.id, size = job.size(), ?wait, "consumed job");

                if !self
                    .queue
                    .shutdown()
                    .sleep(job.service_time(self.service_unit))
                {
                    return Err(Error::Cancelled);
                }
            }
        }

        Ok(ControlFlow::Continue)
    }

    fn on_stop(&mut self, outcome: Result<(), Error>) {
        let outcome = Outcome::from(outcome);
        tracing::info!(
            consumer = self.id,
            consumed = self.jobs.len(),
            ?outcome,
            "consumer exiting"
        );

        let report = ConsumerReport {
            id: self.id,
            jobs: std::mem::take(&mut self.jobs),
            sentinels: self.sentinels,
            outcome,
        };

        if self.reports.send(WorkerReport::Consumer(report)).is_err() {
            tracing::warn!(consumer = self.id, "results collector is gone");
        }
    }
}

/* ---------- */
