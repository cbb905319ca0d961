//! A print-shop workload simulation built on plain threads.
//!
//! # Overview
//!
//! A configurable number of *producers* generate print jobs of random size and submit them to a
//! shared, bounded [`JobQueue`]. A configurable number of *consumers* take jobs out of that queue,
//! following a [`Policy`], and "service" them by sleeping for a time proportional to their size.
//! When a producer is done, it submits a sentinel; once every sentinel has been taken and the
//! queue is empty, consumers stop and the [`Coordinator`] aggregates a [`RunReport`].
//!
//! Producers and consumers are [`Workers`]: each one runs on its own thread, launched by a
//! [`Runtime`] from a [`Context`] that wires it to the queue and to the results [`Collector`].
//!
//! [`Workers`]: crate::Worker
//!
//! # Usage
//!
//! ```
//! # use std::time::Duration;
//! use printshop::{Config, Coordinator, Policy};
//!
//! let config = Config::new(1, 1)
//!     .capacity(2)
//!     .policy(Policy::Fcfs)
//!     .think_time(Duration::ZERO..=Duration::ZERO)
//!     .service_unit(Duration::ZERO);
//!
//! let report = Coordinator::new(config)?
//!     .with_plans(vec![vec![150, 300]])?
//!     .run()?;
//!
//! assert_eq!(report.total_consumed(), 2);
//! println!("{report}");
//! # Ok::<(), printshop::Error>(())
//! ```
//!
//! # The queue protocol
//!
//! [`JobQueue`] is a monitor: one mutex guards the pending jobs and the number of producers
//! done, and two condition variables signal "room available" and "job available".
//!
//! * [`JobQueue::submit`] blocks while the queue is full.
//! * [`JobQueue::try_take_next`] blocks while the queue is empty, unless every producer is done,
//!   in which case it returns `Ok(None)`: there's no more work.
//! * [`JobQueue::mark_producer_done`] is called by the consumer that took a sentinel, once the
//!   sentinel is out of the queue.
//!
//! # Cancellation
//!
//! A run is cancelled by stopping its [`Shutdown`] token, either from code or from a `SIGINT`/
//! `SIGTERM` when the configuration enables graceful shutdown. Cancellation is cooperative: every
//! blocking point gives up, every worker reports what it did so far, and nothing shared is torn
//! down before every worker thread has been joined.

#![warn(missing_docs)]

mod config;
mod consumer;
mod coordinator;
mod error;
mod job;
mod policy;
mod producer;
mod queue;
mod report;
mod runtime;
mod settings;
#[cfg(test)]
mod test_utils;
mod utils;
mod worker;

pub use config::*;
pub use consumer::*;
pub use coordinator::*;
pub use error::*;
pub use job::*;
pub use policy::*;
pub use producer::*;
pub use queue::*;
pub use report::*;
pub use runtime::*;
pub use settings::*;
pub use utils::Shutdown;
pub use worker::*;
