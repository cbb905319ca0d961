//! Dequeue ordering of the job queue.

use std::collections::VecDeque;
use std::fmt;

use crate::job::Job;

/* ---------- */

/// A job sitting in the queue, tagged with its admission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    seq: u64,
    job: Job,
}

impl Pending {
    #[inline]
    pub(crate) fn new(seq: u64, job: Job) -> Self {
        Self { seq, job }
    }

    /// Returns the admission sequence number; lower means earlier.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Returns the queued job.
    #[inline]
    pub fn job(&self) -> &Job {
        &self.job
    }

    #[inline]
    pub(crate) fn into_job(self) -> Job {
        self.job
    }
}

/* ---------- */

/// Picks the next job to remove from a set of pending jobs.
///
/// Implementations are pure: they never block and never touch the set, the
/// queue removes the selected job itself while still holding its lock.
pub trait SchedulingPolicy: Send + Sync {
    /// Returns the index of the job to remove, `None` only when `pending` is empty.
    fn select(&self, pending: &VecDeque<Pending>) -> Option<usize>;

    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;
}

/// First-come-first-served: the earliest admitted job goes first.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fcfs;

impl SchedulingPolicy for Fcfs {
    fn select(&self, pending: &VecDeque<Pending>) -> Option<usize> {
        pending
            .iter()
            .enumerate()
            .min_by_key(|(_, pending)| pending.seq())
            .map(|(idx, _)| idx)
    }

    fn name(&self) -> &'static str {
        "FCFS"
    }
}

/// Shortest-job-first: the smallest job goes first, the earliest admitted one on ties.
///
/// Sentinels are selected before any real job.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sjf;

impl SchedulingPolicy for Sjf {
    fn select(&self, pending: &VecDeque<Pending>) -> Option<usize> {
        // `None < Some(_)`, which puts sentinels first.
        pending
            .iter()
            .enumerate()
            .min_by_key(|(_, pending)| (pending.job().size(), pending.seq()))
            .map(|(idx, _)| idx)
    }

    fn name(&self) -> &'static str {
        "SJF"
    }
}

/* ---------- */

/// The scheduling policies a run can be configured with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Policy {
    /// First-come-first-served.
    #[default]
    Fcfs,
    /// Shortest-job-first.
    Sjf,
}

impl Policy {
    /// Builds the policy the queue dispatches to.
    pub fn boxed(self) -> Box<dyn SchedulingPolicy> {
        match self {
            Self::Fcfs => Box::new(Fcfs),
            Self::Sjf => Box::new(Sjf),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fcfs => f.write_str(Fcfs.name()),
            Self::Sjf => f.write_str(Sjf.name()),
        }
    }
}

/* ---------- */
