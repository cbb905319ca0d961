use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::job::Job;
use crate::queue::JobQueue;
use crate::report::{Collector, Connect, Outcome, ProducerReport, WorkerReport};
use crate::{Context, ControlFlow, Error, Settings, Worker};

/* ---------- */

/// The jobs a producer will submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Draw a job count from `jobs`, then each size from `sizes`, when the producer starts.
    Random {
        /// Range of the number of jobs.
        jobs: RangeInclusive<usize>,
        /// Range of job sizes, in service units.
        sizes: RangeInclusive<u32>,
    },
    /// Submit exactly these sizes, in order.
    Scripted(Vec<u32>),
}

impl Plan {
    fn draw(&self, rng: &mut StdRng) -> VecDeque<u32> {
        match self {
            Self::Random { jobs, sizes } => {
                let count = rng.gen_range(jobs.clone());
                (0..count).map(|_| rng.gen_range(sizes.clone())).collect()
            }
            Self::Scripted(sizes) => sizes.iter().copied().collect(),
        }
    }
}

/* ---------- */

/// Builds a [`Producer`].
///
/// The context must be registered with the run's [`Collector`] before being launched.
#[derive(Debug)]
pub struct ProducerContext {
    id: usize,
    queue: Arc<JobQueue>,
    plan: Plan,
    think_time: RangeInclusive<Duration>,
    seed: Option<u64>,
    cores: Vec<usize>,
    reports: Option<Sender<WorkerReport>>,
}

impl ProducerContext {
    /// Returns the context of producer `id`, feeding `queue` with `plan`.
    pub fn new(id: usize, queue: Arc<JobQueue>, plan: Plan) -> Self {
        Self {
            id,
            queue,
            plan,
            think_time: Duration::ZERO..=Duration::ZERO,
            seed: None,
            cores: Vec::new(),
            reports: None,
        }
    }

    /// Sets the range of the pause between two submissions.
    pub fn think_time(self, think_time: RangeInclusive<Duration>) -> Self {
        Self { think_time, ..self }
    }

    /// Seeds the producer's random generator.
    pub fn seed(self, seed: Option<u64>) -> Self {
        Self { seed, ..self }
    }

    /// Pins the producer's thread to `cores`.
    pub fn cores(self, cores: Vec<usize>) -> Self {
        Self { cores, ..self }
    }
}

impl Context for ProducerContext {
    type Target = Producer;

    fn into_worker(self) -> Result<Self::Target, Error> {
        let reports = self
            .reports
            .ok_or_else(|| Error::context(format!("producer {} has no report endpoint", self.id)))?;

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.id as u64)),
            None => StdRng::from_entropy(),
        };

        Ok(Producer {
            id: self.id,
            queue: self.queue,
            plan: self.plan,
            jobs: VecDeque::new(),
            think_time: self.think_time,
            rng,
            sizes: Vec::new(),
            reports,
        })
    }

    fn settings(&self) -> Settings {
        Settings::new()
            .name(format!("producer-{}", self.id))
            .pinned(self.cores.clone())
    }
}

impl Connect<Collector> for ProducerContext {
    fn on_connection(&mut self, endpoint: Sender<WorkerReport>) {
        let _ = self.reports.insert(endpoint);
    }
}

/* ---------- */

/// Submits its planned jobs, one think time apart, then its sentinel.
pub struct Producer {
    id: usize,
    queue: Arc<JobQueue>,
    plan: Plan,
    jobs: VecDeque<u32>,
    think_time: RangeInclusive<Duration>,
    rng: StdRng,
    sizes: Vec<u32>,
    reports: Sender<WorkerReport>,
}

impl Worker for Producer {
    fn on_start(&mut self) {
        self.jobs = self.plan.draw(&mut self.rng);
        tracing::info!(producer = self.id, jobs = self.jobs.len(), "starting producer");
    }

    fn on_update(&mut self) -> Result<ControlFlow, Error> {
        let Some(size) = self.jobs.pop_front() else {
            self.queue.submit(Job::done(self.id))?;
            tracing::debug!(producer = self.id, "submitted sentinel");

            return Ok(ControlFlow::Break);
        };

        // Reserve first so a failed allocation never leaves an admitted job unaccounted for.
        self.sizes.try_reserve(1)?;
        self.queue.submit(Job::work(size))?;
        self.sizes.push(size);
        tracing::debug!(producer = self.id, size, "produced job");

        let pause = self.rng.gen_range(self.think_time.clone());
        if !self.queue.shutdown().sleep(pause) {
            return Err(Error::Cancelled);
        }

        Ok(ControlFlow::Continue)
    }

    fn on_stop(&mut self, outcome: Result<(), Error>) {
        let outcome = Outcome::from(outcome);
        tracing::info!(
            producer = self.id,
            produced = self.sizes.len(),
            ?outcome,
            "producer exiting"
        );

        let report = ProducerReport {
            id: self.id,
            sizes: std::mem::take(&mut self.sizes),
            outcome,
        };

        if self.reports.send(WorkerReport::Producer(report)).is_err() {
            tracing::warn!(producer = self.id, "results collector is gone");
        }
    }
}

/* ---------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Register;
    use crate::test_utils::*;
    use crate::utils::Shutdown;
    use crate::Policy;

    #[test]
    fn unconnected_context_is_invalid() {
        let queue = JobQueue::new(1, 1, Policy::Fcfs).unwrap();
        let ctx = ProducerContext::new(1, queue, Plan::Scripted(vec![100]));

        assert!(matches!(ctx.into_worker(), Err(Error::InvalidContext(_))));
    }

    #[test]
    fn random_plan_respects_ranges() {
        let plan = Plan::Random {
            jobs: 1..=20,
            sizes: 100..=1000,
        };
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let jobs = plan.draw(&mut rng);
            assert!((1..=20).contains(&jobs.len()));
            assert!(jobs.iter().all(|size| (100..=1000).contains(size)));
        }
    }

    #[test]
    fn seeded_plans_are_reproducible() {
        let plan = Plan::Random {
            jobs: 1..=20,
            sizes: 100..=1000,
        };

        let first = plan.draw(&mut StdRng::seed_from_u64(7));
        let second = plan.draw(&mut StdRng::seed_from_u64(7));
        assert_eq!(first, second);
    }

    #[test]
    fn submits_plan_then_sentinel() {
        let queue = JobQueue::new(4, 1, Policy::Fcfs).unwrap();
        let mut collector = Collector::new();
        let mut ctx = ProducerContext::new(1, queue.clone(), Plan::Scripted(vec![150, 300]));
        collector.register(&mut ctx);

        let mut producer = ctx.into_worker().unwrap();
        producer.run(Shutdown::new());

        assert_eq!(drain_sizes(&queue), vec![Some(150), Some(300), None]);

        let report = collector.collect(false);
        assert_eq!(report.producers.len(), 1);
        assert_eq!(report.producers[0].sizes, vec![150, 300]);
        assert_eq!(report.producers[0].outcome, Outcome::Completed);
    }

    #[test]
    fn cancelled_producer_reports_what_it_submitted() {
        let queue = JobQueue::new(1, 1, Policy::Fcfs).unwrap();
        let mut collector = Collector::new();
        let mut ctx = ProducerContext::new(2, queue.clone(), Plan::Scripted(vec![100, 200]));
        collector.register(&mut ctx);

        let mut producer = ctx.into_worker().unwrap();
        let q = queue.clone();
        let handle = std::thread::spawn(move || producer.run(q.shutdown().clone()));

        // The second job can't fit until the first one is taken.
        std::thread::sleep(Duration::from_millis(100));
        queue.cancel();
        handle.join().unwrap();

        let report = collector.collect(true);
        assert_eq!(report.producers[0].sizes, vec![100]);
        assert_eq!(report.producers[0].outcome, Outcome::Cancelled);
    }
}
