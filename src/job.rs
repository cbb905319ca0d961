use std::time::{Duration, Instant};

use crate::Error;

/* ---------- */

/// A print job waiting for, or going through, service.
///
/// A job never changes once created; it moves by value from its producer to the
/// queue and from the queue to exactly one consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintJob {
    size: u32,
    arrival: Instant,
}

impl PrintJob {
    /// Returns a job of `size` service units, arriving now.
    #[inline]
    pub fn new(size: u32) -> Self {
        Self::arrived_at(size, Instant::now())
    }

    /// Returns a job of `size` service units that arrived at `arrival`.
    #[inline]
    pub fn arrived_at(size: u32, arrival: Instant) -> Self {
        Self { size, arrival }
    }

    /// Returns the number of service units this job needs.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns when the job was created.
    #[inline]
    pub fn arrival(&self) -> Instant {
        self.arrival
    }

    /// Returns how long the job has been waiting since it arrived.
    #[inline]
    pub fn wait_time(&self) -> Duration {
        self.arrival.elapsed()
    }

    /// Returns how long serving this job takes, at `unit` per service unit.
    #[inline]
    pub fn service_time(&self, unit: Duration) -> Duration {
        unit.saturating_mul(self.size)
    }
}

/* ---------- */

/// What a producer hands to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// A real job, to be served and accounted for.
    Work(PrintJob),
    /// The sentinel telling consumers that `producer` won't submit anything else.
    Done {
        /// ID of the producer that finished.
        producer: usize,
    },
}

impl Job {
    /// Returns a real job of `size` service units, arriving now.
    #[inline]
    pub fn work(size: u32) -> Self {
        Self::Work(PrintJob::new(size))
    }

    /// Returns the sentinel of `producer`.
    #[inline]
    pub fn done(producer: usize) -> Self {
        Self::Done { producer }
    }

    /// Returns whether this is a producer's sentinel.
    #[inline]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Returns the size of a real job, `None` for a sentinel.
    #[inline]
    pub fn size(&self) -> Option<u32> {
        match self {
            Self::Work(job) => Some(job.size()),
            Self::Done { .. } => None,
        }
    }

    /// Checks that a real job asks for some service.
    ///
    /// # Errors
    ///
    /// A zero-sized job can't come out of a well-behaved producer, it's a protocol violation.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Self::Work(job) if job.size() == 0 => Err(Error::protocol("job of size 0")),
            _ => Ok(()),
        }
    }
}

/* ---------- */
