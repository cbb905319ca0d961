use std::ops::DerefMut;

use crate::settings::Settings;
use crate::utils::Shutdown;
use crate::Error;

/* ---------- */

/// A worker is a thread that takes part in a run: producers and consumers are both workers.
///
/// Workers are defined by one main method, [`Worker::run`], which drives the worker loop. Its default
/// implementation calls [`Worker::on_start`] once, then [`Worker::on_update`] until it returns
/// [`ControlFlow::Break`], an error, or the run is cancelled, and finally hands the outcome to
/// [`Worker::on_stop`].
///
/// An error returned by [`Worker::on_update`] is fatal for the whole run: the default loop stops the
/// shared [`Shutdown`] token so every other worker gives up at its next blocking point.
///
/// # Examples
///
/// ```
/// # use printshop::{Runtime, Worker, ControlFlow, Error};
/// #[derive(Default)]
/// struct Counter {
///     count: usize,
/// }
///
/// impl Worker for Counter {
///     fn on_update(&mut self) -> Result<ControlFlow, Error> {
///         self.count += 1;
///         if self.count == 10 {
///             return Ok(ControlFlow::Break);
///         }
///
///         Ok(ControlFlow::Continue)
///     }
///
///     fn on_stop(&mut self, outcome: Result<(), Error>) {
///         assert!(outcome.is_ok());
///     }
/// }
///
/// let mut runtime = Runtime::new();
/// runtime.launch(Counter::default()).unwrap();
/// runtime.wait();
/// ```
pub trait Worker: Send {
    /// Called once on the worker thread before the loop starts.
    #[inline]
    fn on_start(&mut self) {}

    /// One iteration of the worker loop.
    ///
    /// By default, this method just returns [`ControlFlow::Break`].
    #[inline]
    fn on_update(&mut self) -> Result<ControlFlow, Error> {
        Ok(ControlFlow::Break)
    }

    /// Called once after the loop with the way it ended.
    ///
    /// `Err(Error::Cancelled)` means the run was cancelled, any other error is the failure
    /// that ended this worker.
    #[inline]
    fn on_stop(&mut self, _outcome: Result<(), Error>) {}

    /// Main worker loop, spawned in a new thread by the [`Runtime`].
    ///
    /// [`Runtime`]: crate::Runtime
    fn run(&mut self, shutdown: Shutdown) {
        self.on_start();

        let outcome = loop {
            if !shutdown.is_running() {
                break Err(Error::Cancelled);
            }

            match self.on_update() {
                Ok(ControlFlow::Continue) => (),
                Ok(ControlFlow::Break) => break Ok(()),
                Err(err) if err.is_cancelled() => break Err(err),
                Err(err) => {
                    tracing::error!("worker failed, stopping the run: {err}");
                    shutdown.stop();
                    break Err(err);
                }
            }
        };

        self.on_stop(outcome);
    }
}

impl<T: Worker + ?Sized> Worker for Box<T> {
    #[inline]
    fn on_start(&mut self) {
        self.deref_mut().on_start()
    }

    #[inline]
    fn on_update(&mut self) -> Result<ControlFlow, Error> {
        self.deref_mut().on_update()
    }

    #[inline]
    fn on_stop(&mut self, outcome: Result<(), Error>) {
        self.deref_mut().on_stop(outcome)
    }

    #[inline]
    fn run(&mut self, shutdown: Shutdown) {
        self.deref_mut().run(shutdown)
    }
}

/* ---------- */

/// Builds a [`Worker`] before launching it with [`Runtime::launch_from_context`].
///
/// Contexts are where a worker gets wired to the shared queue and to the results
/// collector; [`Context::into_worker`] fails if some of that wiring is missing.
///
/// [`Runtime::launch_from_context`]: crate::Runtime::launch_from_context
pub trait Context {
    /// The type of [`Worker`] built from this context.
    type Target: Worker;

    /// Consumes `self` to build the targeted [`Worker`].
    fn into_worker(self) -> Result<Self::Target, Error>;

    /// Returns the [`Settings`] of the worker's thread.
    #[inline]
    fn settings(&self) -> Settings {
        Settings::default()
    }
}

/* ---------- */

/// Defines the control flow of [`Workers`].
///
/// [`Workers`]: crate::Worker
#[derive(Debug, PartialEq)]
pub enum ControlFlow {
    /// Tells the runtime to continue the main worker loop.
    Continue,
    /// Tells the runtime to break the main worker loop.
    Break,
}

/* ---------- */
