use std::sync::Arc;

use crate::config::Config;
use crate::consumer::ConsumerContext;
use crate::producer::{Plan, ProducerContext};
use crate::queue::JobQueue;
use crate::report::{Collector, Register, RunReport};
use crate::runtime::Runtime;
use crate::utils::Shutdown;
use crate::Error;

/* ---------- */

/// Runs a whole print-shop simulation.
///
/// Producers and consumers each get their own runtime, nested under the coordinator's
/// [`Shutdown`] token: producers are joined first, then consumers, and the report is
/// only aggregated once every worker returned.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use printshop::{Config, Coordinator, Policy};
///
/// let config = Config::new(2, 2)
///     .policy(Policy::Sjf)
///     .think_time(Duration::ZERO..=Duration::ZERO)
///     .service_unit(Duration::ZERO)
///     .seed(1);
///
/// let report = Coordinator::new(config).unwrap().run().unwrap();
/// assert_eq!(report.total_produced(), report.total_consumed());
/// ```
#[derive(Debug)]
pub struct Coordinator {
    config: Config,
    plans: Option<Vec<Vec<u32>>>,
    shutdown: Shutdown,
}

impl Coordinator {
    /// Returns a coordinator for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            config,
            plans: None,
            shutdown: Shutdown::new(),
        })
    }

    /// Replaces the random job plans with fixed ones, one list of sizes per producer.
    ///
    /// # Errors
    ///
    /// There must be exactly one plan per producer, with positive sizes only.
    pub fn with_plans(self, plans: Vec<Vec<u32>>) -> Result<Self, Error> {
        if plans.len() != self.config.producers {
            return Err(Error::config(format!(
                "{} plans for {} producers",
                plans.len(),
                self.config.producers
            )));
        }
        if plans.iter().flatten().any(|size| *size == 0) {
            return Err(Error::config("planned job sizes must be positive"));
        }

        Ok(Self {
            plans: Some(plans),
            ..self
        })
    }

    /// Returns the token that cancels the run.
    ///
    /// Stopping it makes every worker give up at its next blocking point.
    #[inline]
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Runs the simulation to completion, or until cancelled.
    ///
    /// A coordinator drives a single run: its [`Shutdown`] token can't be rearmed once
    /// stopped. A cancelled run still returns the report of what was done so far, flagged
    /// as such.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: a worker that couldn't be launched, or a worker
    /// that failed while running. All other workers are stopped and joined first.
    pub fn run(self) -> Result<RunReport, Error> {
        let config = &self.config;

        if config.graceful_shutdown {
            crate::utils::enable_graceful_shutdown(&self.shutdown)?;
        }

        let queue = JobQueue::with_policy(
            config.capacity,
            config.producers,
            config.policy.boxed(),
            self.shutdown.clone(),
        )?;
        let mut collector = Collector::new();

        tracing::info!(
            producers = config.producers,
            consumers = config.consumers,
            capacity = config.capacity,
            policy = %config.policy,
            "starting run"
        );

        let mut producers = Runtime::nested(self.shutdown.clone());
        let mut consumers = Runtime::nested(self.shutdown.clone());

        let launched = self
            .launch_producers(&mut producers, &queue, &mut collector)
            .and_then(|()| self.launch_consumers(&mut consumers, &queue, &mut collector));

        if let Err(err) = &launched {
            tracing::error!("failed to launch workers: {err}");
            queue.cancel();
        }

        let panicked = producers.wait();
        tracing::info!("all producers finished");
        let panicked = panicked + consumers.wait();
        tracing::info!("all consumers finished");

        launched?;

        let report = collector.collect(!self.shutdown.is_running());
        if let Some((worker, reason)) = report.failure() {
            return Err(Error::WorkerFailed {
                worker,
                reason: reason.to_owned(),
            });
        }
        if panicked > 0 {
            return Err(Error::Panicked(panicked));
        }

        let stats = queue.stats();
        tracing::info!(
            admitted = stats.admitted,
            removed = stats.removed,
            cancelled = report.cancelled,
            "run finished"
        );

        Ok(report)
    }

    fn launch_producers(
        &self,
        runtime: &mut Runtime,
        queue: &Arc<JobQueue>,
        collector: &mut Collector,
    ) -> Result<(), Error> {
        let config = &self.config;

        for nth in 0..config.producers {
            let plan = match &self.plans {
                Some(plans) => Plan::Scripted(plans[nth].clone()),
                None => Plan::Random {
                    jobs: config.jobs_per_producer.clone(),
                    sizes: config.job_size.clone(),
                },
            };

            let mut ctx = ProducerContext::new(nth + 1, queue.clone(), plan)
                .think_time(config.think_time.clone())
                .seed(config.seed)
                .cores(config.cores_for(nth));
            collector.register(&mut ctx);

            runtime.launch_from_context(ctx)?;
        }

        Ok(())
    }

    fn launch_consumers(
        &self,
        runtime: &mut Runtime,
        queue: &Arc<JobQueue>,
        collector: &mut Collector,
    ) -> Result<(), Error> {
        let config = &self.config;

        for nth in 0..config.consumers {
            let mut ctx = ConsumerContext::new(nth + 1, queue.clone())
                .service_unit(config.service_unit)
                .cores(config.cores_for(config.producers + nth));
            collector.register(&mut ctx);

            runtime.launch_from_context(ctx)?;
        }

        Ok(())
    }
}

/* ---------- */

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::test_utils::*;
    use crate::Policy;

    #[test]
    fn invalid_config_never_starts() {
        assert!(matches!(Coordinator::new(Config::new(0, 1)), Err(Error::Config(_))));
    }

    #[test]
    fn plans_must_match_producers() {
        let coordinator = Coordinator::new(fast_config(2, 1)).unwrap();
        assert!(coordinator.with_plans(vec![vec![100]]).is_err());

        let coordinator = Coordinator::new(fast_config(1, 1)).unwrap();
        assert!(coordinator.with_plans(vec![vec![0]]).is_err());
    }

    #[test]
    fn single_producer_single_consumer() {
        let config = fast_config(1, 1)
            .capacity(2)
            .service_unit(Duration::from_micros(20));
        let report = Coordinator::new(config)
            .unwrap()
            .with_plans(vec![vec![150, 300]])
            .unwrap()
            .run()
            .unwrap();

        let sizes = report.consumers[0]
            .jobs
            .iter()
            .map(|job| job.size)
            .collect::<Vec<_>>();

        assert_eq!(sizes, vec![150, 300]);
        assert_eq!(report.consumers[0].sentinels, 1);
        assert!(report.average_wait().is_some_and(|wait| wait > Duration::ZERO));
        assert!(!report.cancelled);
    }

    #[test]
    fn two_producers_one_consumer() {
        let report = Coordinator::new(fast_config(2, 1))
            .unwrap()
            .with_plans(vec![vec![400], vec![200]])
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.total_produced(), 2);
        assert_eq!(report.consumers[0].jobs.len(), 2);
        assert_eq!(report.consumers[0].sentinels, 2);
    }

    #[test]
    fn every_job_is_consumed_exactly_once() {
        for policy in [Policy::Fcfs, Policy::Sjf] {
            let config = fast_config(4, 3).capacity(3).policy(policy).seed(99);
            let report = Coordinator::new(config).unwrap().run().unwrap();

            assert!(report.total_produced() > 0);
            assert_eq!(report.total_produced(), report.total_consumed());
            assert_eq!(report.total_sentinels(), 4);
            assert!(report.is_balanced(), "{policy} run lost or duplicated jobs");
        }
    }

    #[test]
    fn more_consumers_than_jobs_still_terminates() {
        let report = Coordinator::new(fast_config(1, 8).capacity(1))
            .unwrap()
            .with_plans(vec![vec![100]])
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.consumers.len(), 8);
        assert_eq!(report.total_consumed(), 1);
        assert_eq!(report.total_sentinels(), 1);
    }

    #[test]
    fn cancellation_returns_a_partial_report() {
        let config = Config::new(2, 2)
            .capacity(2)
            .think_time(Duration::from_millis(10)..=Duration::from_millis(20))
            .service_unit(Duration::from_millis(10))
            .jobs_per_producer(20..=20);
        let coordinator = Coordinator::new(config).unwrap();

        let shutdown = coordinator.shutdown().clone();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            shutdown.stop();
        });

        let now = Instant::now();
        let report = coordinator.run().unwrap();
        stopper.join().unwrap();

        assert!(report.cancelled);
        assert!(now.elapsed() < Duration::from_secs(10));
        assert_eq!(report.producers.len(), 2);
        assert_eq!(report.consumers.len(), 2);
        assert!(report.total_consumed() <= report.total_produced());
    }

    #[test]
    fn cancelled_coordinator_does_not_leak_into_the_next_one() {
        let config = fast_config(1, 1);

        let cancelled = Coordinator::new(config.clone())
            .unwrap()
            .with_plans(vec![vec![100]])
            .unwrap();
        cancelled.shutdown().stop();
        assert!(cancelled.run().unwrap().cancelled);

        let report = Coordinator::new(config)
            .unwrap()
            .with_plans(vec![vec![100]])
            .unwrap()
            .run()
            .unwrap();

        assert!(!report.cancelled);
        assert_eq!(report.total_consumed(), 1);
    }

    #[test]
    fn interrupt_signal_cancels_the_run() {
        let config = Config::new(1, 1)
            .capacity(2)
            .think_time(Duration::ZERO..=Duration::ZERO)
            .service_unit(Duration::from_millis(10))
            .graceful_shutdown(true);
        let coordinator = Coordinator::new(config)
            .unwrap()
            .with_plans(vec![vec![1000, 1000]])
            .unwrap();

        // The handlers are registered as the run starts.
        let signaller = std::thread::spawn(|| {
            std::thread::sleep(Duration::from_millis(200));
            signal_hook::low_level::raise(signal_hook::consts::SIGINT).unwrap();
        });

        let now = Instant::now();
        let report = coordinator.run().unwrap();
        signaller.join().unwrap();

        assert!(report.cancelled);
        assert!(now.elapsed() < Duration::from_secs(10));
        assert!(report.total_consumed() < 2);
    }
}
