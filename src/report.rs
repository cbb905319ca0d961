//! Per-worker results and the final run report.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

/* ---------- */

/// A type implementing this trait hands out an endpoint to the [`Connect`] types wired to it.
///
/// The run's [`Collector`] registers every producer and consumer context so that each
/// worker gets a [`Sender`] to report its results through once it stops.
pub trait Register {
    /// The type handed to connected workers.
    type Endpoint;

    /// Connects `other` to `self` by calling [`Connect::on_connection`] with a new endpoint.
    fn register(&mut self, other: &mut impl Connect<Self>);
}

/// A type implementing this trait can be connected to some [`Register`].
pub trait Connect<S: Register + ?Sized> {
    /// Stores the endpoint handed out by `S`.
    fn on_connection(&mut self, endpoint: S::Endpoint);
}

/* ---------- */

/// How a worker's loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The worker ran to completion.
    Completed,
    /// The run was cancelled before the worker was done.
    Cancelled,
    /// The worker failed, the message is the error it failed with.
    Failed(String),
}

impl From<Result<(), crate::Error>> for Outcome {
    fn from(result: Result<(), crate::Error>) -> Self {
        match result {
            Ok(()) => Self::Completed,
            Err(err) if err.is_cancelled() => Self::Cancelled,
            Err(err) => Self::Failed(err.to_string()),
        }
    }
}

/// What a producer submitted, sentinel excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
    /// Producer ID, starting at 1.
    pub id: usize,
    /// Sizes of the jobs admitted into the queue, in submission order.
    pub sizes: Vec<u32>,
    /// How the producer stopped.
    pub outcome: Outcome,
}

/// A job served by a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumedJob {
    /// Size of the job, in service units.
    pub size: u32,
    /// Time between the job's arrival and its removal from the queue.
    pub wait: Duration,
}

/// What a consumer served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Consumer ID, starting at 1.
    pub id: usize,
    /// Served jobs, in service order.
    pub jobs: Vec<ConsumedJob>,
    /// Number of producer sentinels this consumer took.
    pub sentinels: usize,
    /// How the consumer stopped.
    pub outcome: Outcome,
}

/// Message sent by a worker through its [`Collector`] endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerReport {
    /// Sent once by each producer.
    Producer(ProducerReport),
    /// Sent once by each consumer.
    Consumer(ConsumerReport),
}

/* ---------- */

/// Collects the reports of every worker of a run.
///
/// Workers only ever send, the collector is read once every worker has been joined.
#[derive(Debug)]
pub struct Collector {
    sender: Sender<WorkerReport>,
    recver: Receiver<WorkerReport>,
}

impl Collector {
    /// Returns a collector with no report yet.
    pub fn new() -> Self {
        let (sender, recver) = unbounded();
        Self { sender, recver }
    }

    /// Builds the run report out of everything received so far.
    ///
    /// Reports are sorted by worker ID.
    pub fn collect(&self, cancelled: bool) -> RunReport {
        let mut report = RunReport {
            producers: Vec::new(),
            consumers: Vec::new(),
            cancelled,
        };

        for msg in self.recver.try_iter() {
            match msg {
                WorkerReport::Producer(producer) => report.producers.push(producer),
                WorkerReport::Consumer(consumer) => report.consumers.push(consumer),
            }
        }

        report.producers.sort_by_key(|producer| producer.id);
        report.consumers.sort_by_key(|consumer| consumer.id);
        report
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Register for Collector {
    type Endpoint = Sender<WorkerReport>;

    fn register(&mut self, other: &mut impl Connect<Self>) {
        other.on_connection(self.sender.clone())
    }
}

/* ---------- */

/// Aggregated results of a run, built after every worker returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// One report per producer.
    pub producers: Vec<ProducerReport>,
    /// One report per consumer.
    pub consumers: Vec<ConsumerReport>,
    /// Whether the run was cancelled before completion.
    pub cancelled: bool,
}

impl RunReport {
    /// Returns the number of real jobs produced.
    pub fn total_produced(&self) -> usize {
        self.producers.iter().map(|p| p.sizes.len()).sum()
    }

    /// Returns the number of real jobs consumed.
    pub fn total_consumed(&self) -> usize {
        self.consumers.iter().map(|c| c.jobs.len()).sum()
    }

    /// Returns the number of sentinels consumed.
    pub fn total_sentinels(&self) -> usize {
        self.consumers.iter().map(|c| c.sentinels).sum()
    }

    /// Returns the mean time consumed jobs waited in the queue, `None` if nothing was consumed.
    pub fn average_wait(&self) -> Option<Duration> {
        const NANOS_PER_SEC: u128 = 1_000_000_000;

        let consumed = self.total_consumed();
        if consumed == 0 {
            return None;
        }

        let total = self
            .consumers
            .iter()
            .flat_map(|c| c.jobs.iter())
            .map(|job| job.wait.as_nanos())
            .sum::<u128>();

        // Never above the longest wait, so it fits back into a `Duration`.
        let mean = total / consumed as u128;
        Some(Duration::new(
            (mean / NANOS_PER_SEC) as u64,
            (mean % NANOS_PER_SEC) as u32,
        ))
    }

    /// Returns whether every real job produced was consumed exactly once.
    pub fn is_balanced(&self) -> bool {
        let mut produced = self
            .producers
            .iter()
            .flat_map(|p| p.sizes.iter().copied())
            .collect::<Vec<_>>();
        let mut consumed = self
            .consumers
            .iter()
            .flat_map(|c| c.jobs.iter().map(|job| job.size))
            .collect::<Vec<_>>();

        produced.sort_unstable();
        consumed.sort_unstable();
        produced == consumed
    }

    /// Returns the first failed worker and its error message, if any.
    pub fn failure(&self) -> Option<(String, &str)> {
        let producers = self
            .producers
            .iter()
            .map(|p| (format!("producer {}", p.id), &p.outcome));
        let consumers = self
            .consumers
            .iter()
            .map(|c| (format!("consumer {}", c.id), &c.outcome));

        producers
            .chain(consumers)
            .find_map(|(worker, outcome)| match outcome {
                Outcome::Failed(msg) => Some((worker, msg.as_str())),
                _ => None,
            })
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for producer in &self.producers {
            writeln!(
                f,
                "Producer {} produced {} jobs:",
                producer.id,
                producer.sizes.len()
            )?;
            for (nth, size) in producer.sizes.iter().enumerate() {
                writeln!(f, "\tJob {}: {} bytes", nth + 1, size)?;
            }
        }

        for consumer in &self.consumers {
            writeln!(
                f,
                "Consumer {} consumed {} jobs:",
                consumer.id,
                consumer.jobs.len()
            )?;
            for (nth, job) in consumer.jobs.iter().enumerate() {
                writeln!(
                    f,
                    "\tJob {}: {} bytes, waited for {} microseconds",
                    nth + 1,
                    job.size,
                    job.wait.as_micros()
                )?;
            }
        }

        match self.average_wait() {
            Some(wait) => write!(
                f,
                "Average wait time: {} microseconds => {:.6} seconds",
                wait.as_micros(),
                wait.as_secs_f64()
            )?,
            None => write!(f, "Average wait time: n/a, no job consumed")?,
        }

        if self.cancelled {
            write!(f, "\nRun cancelled before completion")?;
        }

        Ok(())
    }
}

/* ---------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn consumed(size: u32, wait_ms: u64) -> ConsumedJob {
        ConsumedJob {
            size,
            wait: Duration::from_millis(wait_ms),
        }
    }

    fn report() -> RunReport {
        RunReport {
            producers: vec![
                ProducerReport {
                    id: 1,
                    sizes: vec![150, 300],
                    outcome: Outcome::Completed,
                },
                ProducerReport {
                    id: 2,
                    sizes: vec![700],
                    outcome: Outcome::Completed,
                },
            ],
            consumers: vec![ConsumerReport {
                id: 1,
                jobs: vec![consumed(150, 10), consumed(700, 20), consumed(300, 60)],
                sentinels: 2,
                outcome: Outcome::Completed,
            }],
            cancelled: false,
        }
    }

    #[test]
    fn totals_and_average() {
        let report = report();

        assert_eq!(report.total_produced(), 3);
        assert_eq!(report.total_consumed(), 3);
        assert_eq!(report.total_sentinels(), 2);
        assert_eq!(report.average_wait(), Some(Duration::from_millis(30)));
        assert!(report.is_balanced());
        assert_eq!(report.failure(), None);
    }

    #[test]
    fn average_of_huge_waits_does_not_overflow() {
        let mut report = report();
        report.consumers[0].jobs = vec![
            ConsumedJob {
                size: 100,
                wait: Duration::MAX,
            },
            ConsumedJob {
                size: 200,
                wait: Duration::MAX,
            },
        ];

        assert_eq!(report.average_wait(), Some(Duration::MAX));
    }

    #[test]
    fn average_keeps_nanosecond_precision() {
        let mut report = report();
        report.consumers[0].jobs = [3, 4]
            .map(|nanos| ConsumedJob {
                size: 100,
                wait: Duration::from_nanos(nanos),
            })
            .to_vec();

        assert_eq!(report.average_wait(), Some(Duration::from_nanos(3)));
    }

    #[test]
    fn nothing_consumed_has_no_average() {
        let mut report = report();
        report.consumers[0].jobs.clear();

        assert_eq!(report.average_wait(), None);
        assert!(!report.is_balanced());
        assert!(report.to_string().contains("n/a"));
    }

    #[test]
    fn first_failure_is_reported() {
        let mut report = report();
        report.consumers[0].outcome = Outcome::Failed("protocol violation: job of size 0".into());

        assert_eq!(
            report.failure(),
            Some((
                "consumer 1".to_owned(),
                "protocol violation: job of size 0"
            ))
        );
    }

    #[test]
    fn collector_sorts_by_worker() {
        #[derive(Default)]
        struct Endpoint(Option<Sender<WorkerReport>>);

        impl Connect<Collector> for Endpoint {
            fn on_connection(&mut self, endpoint: Sender<WorkerReport>) {
                self.0 = Some(endpoint)
            }
        }

        let mut collector = Collector::new();
        let mut endpoint = Endpoint::default();
        collector.register(&mut endpoint);

        let sender = endpoint.0.expect("endpoint should be connected");
        for id in [3, 1, 2] {
            sender
                .send(WorkerReport::Producer(ProducerReport {
                    id,
                    sizes: vec![100],
                    outcome: Outcome::Completed,
                }))
                .unwrap();
        }

        let report = collector.collect(false);
        let ids = report.producers.iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn display_lists_every_job() {
        let text = report().to_string();

        assert!(text.contains("Producer 1 produced 2 jobs:"));
        assert!(text.contains("\tJob 2: 300 bytes"));
        assert!(text.contains("Consumer 1 consumed 3 jobs:"));
        assert!(text.contains("waited for 60000 microseconds"));
        assert!(text.contains("Average wait time: 30000 microseconds"));
    }
}
