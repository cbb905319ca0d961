use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::job::Job;
use crate::policy::{Pending, Policy, SchedulingPolicy};
use crate::utils::{Shutdown, POLL_INTERVAL};
use crate::Error;

/* ---------- */

/// A thread-safe, bounded, blocking job queue implemented with a monitor pattern.
///
/// One mutex guards the pending jobs *and* the completion counter, so "room available",
/// "job available" and "every producer is done" are always observed together. Every
/// state change notifies the matching condition variable while the lock is still held.
///
/// Removal order is decided by the [`SchedulingPolicy`] the queue was built with.
///
/// # Termination
///
/// [`JobQueue::try_take_next`] only reports that there is no more work once the queue
/// is empty *and* every producer's sentinel has been taken and acknowledged with
/// [`JobQueue::mark_producer_done`].
///
/// # Cancellation
///
/// Once the run's [`Shutdown`] token is stopped, or [`JobQueue::cancel`] is called,
/// blocked and future calls to [`JobQueue::submit`] and [`JobQueue::try_take_next`]
/// return [`Error::Cancelled`]. The queue itself is never torn down while shared.
///
/// # Example
///
/// ```
/// use printshop::{Job, JobQueue, Policy};
///
/// let queue = JobQueue::new(2, 1, Policy::Sjf).unwrap();
/// queue.submit(Job::work(300)).unwrap();
/// queue.submit(Job::work(150)).unwrap();
///
/// assert_eq!(queue.try_take_next().unwrap().and_then(|job| job.size()), Some(150));
/// ```
pub struct JobQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    producers: usize,
    policy: Box<dyn SchedulingPolicy>,
    shutdown: Shutdown,
}

/// Shared state of the queue, protected by the mutex.
#[derive(Debug)]
struct Inner {
    pending: VecDeque<Pending>,
    admitted: u64,
    removed: u64,
    completed: usize,
    cancelled: bool,
}

/// Counters of a [`JobQueue`], sampled under its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Jobs, sentinels included, that entered the queue.
    pub admitted: u64,
    /// Jobs, sentinels included, that left the queue.
    pub removed: u64,
    /// Jobs currently pending.
    pub pending: usize,
    /// Producers whose sentinel was consumed.
    pub completed: usize,
}

impl JobQueue {
    /// Creates a queue holding at most `capacity` jobs, fed by `producers` producers.
    ///
    /// # Errors
    ///
    /// Both `capacity` and `producers` must be positive.
    pub fn new(
        capacity: usize,
        producers: usize,
        policy: Policy,
    ) -> Result<Arc<Self>, Error> {
        Self::with_policy(capacity, producers, policy.boxed(), Shutdown::new())
    }

    /// Creates a queue with a custom policy whose waits are cancelled by `shutdown`.
    ///
    /// # Errors
    ///
    /// Both `capacity` and `producers` must be positive.
    pub fn with_policy(
        capacity: usize,
        producers: usize,
        policy: Box<dyn SchedulingPolicy>,
        shutdown: Shutdown,
    ) -> Result<Arc<Self>, Error> {
        if capacity == 0 {
            return Err(Error::config("queue capacity must be positive"));
        }
        if producers == 0 {
            return Err(Error::config("at least one producer is required"));
        }

        Ok(Arc::new(Self {
            inner: Mutex::new(Inner {
                pending: VecDeque::with_capacity(capacity),
                admitted: 0,
                removed: 0,
                completed: 0,
                cancelled: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            producers,
            policy,
            shutdown,
        }))
    }

    /// Adds a job to the queue, blocking while the queue is full.
    ///
    /// Submissions are never dropped nor reordered: jobs are tagged with their
    /// admission order, which is what the policy compares.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the run is cancelled before the job is admitted;
    /// the job is dropped in that case.
    pub fn submit(&self, job: Job) -> Result<(), Error> {
        let mut inner = self.lock();

        loop {
            self.check_cancelled(&mut inner)?;

            if inner.pending.len() < self.capacity {
                break;
            }

            inner = self.wait(&self.not_full, inner);
        }

        let seq = inner.admitted;
        inner.admitted += 1;
        inner.pending.push_back(Pending::new(seq, job));
        debug_assert!(inner.pending.len() <= self.capacity);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes and returns the next job according to the policy, blocking while there's none.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(job))` - if a job was removed.
    /// * `Ok(None)` - if the queue is drained: empty with every producer done.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the run is cancelled before a job could be taken.
    pub fn try_take_next(&self) -> Result<Option<Job>, Error> {
        let mut inner = self.lock();

        loop {
            self.check_cancelled(&mut inner)?;

            if let Some(idx) = self.policy.select(&inner.pending) {
                let pending = inner
                    .pending
                    .remove(idx)
                    .ok_or_else(|| Error::protocol("policy selected a job out of bounds"))?;
                inner.removed += 1;

                self.not_full.notify_one();
                return Ok(Some(pending.into_job()));
            }

            if inner.completed == self.producers {
                return Ok(None);
            }

            inner = self.wait(&self.not_empty, inner);
        }
    }

    /// Records that one more producer's sentinel was fully taken out of the queue.
    ///
    /// Wakes every blocked taker so they can notice the queue may now be drained.
    /// Returns the number of producers done so far.
    ///
    /// # Errors
    ///
    /// More completions than producers is a protocol violation.
    pub fn mark_producer_done(&self) -> Result<usize, Error> {
        let mut inner = self.lock();

        if inner.completed == self.producers {
            return Err(Error::protocol(format!(
                "more sentinels than the {} producers",
                self.producers
            )));
        }

        inner.completed += 1;
        self.not_empty.notify_all();

        Ok(inner.completed)
    }

    /// Returns whether the queue is empty and every producer is done.
    #[inline]
    pub fn drained(&self) -> bool {
        let inner = self.lock();
        inner.pending.is_empty() && inner.completed == self.producers
    }

    /// Cancels the queue and stops its [`Shutdown`] token, waking every blocked producer
    /// and consumer.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        inner.cancelled = true;
        self.shutdown.stop();

        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Returns whether the queue was cancelled, directly or through its [`Shutdown`] token.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled || !self.shutdown.is_running()
    }

    /// Returns the token that cancels this queue's waits.
    #[inline]
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Returns the number of pending jobs.
    #[inline]
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns whether no job is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Returns the maximum number of pending jobs.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of producers feeding the queue.
    #[inline]
    pub fn producers(&self) -> usize {
        self.producers
    }

    /// Returns the number of producers done so far.
    #[inline]
    pub fn completed(&self) -> usize {
        self.lock().completed
    }

    /// Returns the name of the scheduling policy.
    #[inline]
    pub fn policy(&self) -> &'static str {
        self.policy.name()
    }

    /// Returns a consistent snapshot of the queue's counters.
    pub fn stats(&self) -> QueueStats {
        let inner = self.lock();

        QueueStats {
            admitted: inner.admitted,
            removed: inner.removed,
            pending: inner.pending.len(),
            completed: inner.completed,
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Nothing in the critical sections can panic half-way through a mutation.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Folds the shutdown token into the queue's own flag, waking everybody the first time.
    fn check_cancelled(&self, inner: &mut MutexGuard<'_, Inner>) -> Result<(), Error> {
        if !inner.cancelled && !self.shutdown.is_running() {
            inner.cancelled = true;
            self.not_empty.notify_all();
            self.not_full.notify_all();
        }

        if inner.cancelled {
            return Err(Error::Cancelled);
        }

        Ok(())
    }

    /// Waits on `condvar`, waking up at least every [`POLL_INTERVAL`] to look at the
    /// shutdown token, which signal handlers can only flip.
    #[inline]
    fn wait<'a>(
        &self,
        condvar: &Condvar,
        inner: MutexGuard<'a, Inner>,
    ) -> MutexGuard<'a, Inner> {
        match condvar.wait_timeout(inner, POLL_INTERVAL) {
            Ok((inner, _)) => inner,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("capacity", &self.capacity)
            .field("producers", &self.producers)
            .field("policy", &self.policy.name())
            .field("stats", &self.stats())
            .finish()
    }
}

/* ---------- */
