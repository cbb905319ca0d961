use std::thread::JoinHandle;

use crate::settings::Settings;
use crate::utils::Shutdown;
use crate::worker::{Context, Worker};
use crate::Error;

/* ---------- */

/// A runtime that manages [`Workers`] threads.
///
/// The coordinator keeps one runtime per worker role so producers can be joined
/// before consumers. When dropped, a runtime waits for all its workers to return;
/// a root runtime also stops its [`Shutdown`] token first.
///
/// [`Workers`]: crate::Worker
pub struct Runtime {
    shutdown: Shutdown,
    threads: Vec<JoinHandle<()>>,
    nested: bool,
}

impl Runtime {
    /// Returns a new runtime.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new runtime whose stopping condition is shared with the owner of `shutdown`.
    ///
    /// Dropping a nested runtime joins its workers but leaves the token untouched.
    #[inline]
    pub fn nested(shutdown: Shutdown) -> Self {
        Self::from(shutdown)
    }

    /// Returns the token the runtime's workers observe.
    #[inline]
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Asks every worker of this runtime, and of runtimes sharing its token, to stop.
    #[inline]
    pub fn stop(&self) {
        self.shutdown.stop()
    }

    /// Returns how many workers were launched and not joined yet.
    #[inline]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Returns whether no worker is waiting to be joined.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Runs a [`Worker`] in a new thread.
    ///
    /// # Errors
    ///
    /// If the thread can't be spawned, the error is returned and the runtime is stopped.
    #[inline]
    pub fn launch<W: Worker + 'static>(&mut self, worker: W) -> Result<(), Error> {
        self.launch_with_settings(worker, Settings::default())
    }

    /// Runs a [`Worker`] in a new thread configured with `settings`.
    ///
    /// # Errors
    ///
    /// If the thread can't be spawned, the error is returned and the runtime is stopped.
    #[inline]
    pub fn launch_with_settings<W: Worker + 'static>(
        &mut self,
        worker: W,
        settings: Settings,
    ) -> Result<(), Error> {
        let thread = crate::utils::spawn_thread(worker, settings, &self.shutdown)
            .inspect_err(|_| self.shutdown.stop())?;

        self.threads.push(thread);
        Ok(())
    }

    /// Runs a [`Worker`] built from a [`Context`] in a new thread.
    ///
    /// The thread is configured with [`Context::settings`].
    ///
    /// # Errors
    ///
    /// If the context is invalid or the thread can't be spawned, the error is returned
    /// and the runtime is stopped.
    #[inline]
    pub fn launch_from_context<W, C>(&mut self, ctx: C) -> Result<(), Error>
    where
        W: Worker + 'static,
        C: Context<Target = W>,
    {
        let settings = ctx.settings();
        let worker = ctx.into_worker().inspect_err(|_| self.shutdown.stop())?;

        self.launch_with_settings(worker, settings)
    }

    /// Blocks the calling thread until all the runtime's workers return.
    ///
    /// Returns how many of them panicked.
    pub fn wait(&mut self) -> usize {
        let mut panicked = 0;

        for thread in self.threads.drain(..) {
            let name = thread.thread().name().map(ToOwned::to_owned);
            if thread.join().is_err() {
                tracing::error!(worker = ?name, "worker thread panicked");
                panicked += 1;
            }
        }

        panicked
    }
}

impl Default for Runtime {
    #[inline]
    fn default() -> Self {
        Self {
            shutdown: Shutdown::new(),
            threads: Vec::new(),
            nested: false,
        }
    }
}

impl From<Shutdown> for Runtime {
    #[inline]
    fn from(shutdown: Shutdown) -> Self {
        Self {
            shutdown,
            threads: Vec::new(),
            nested: true,
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if !self.nested {
            self.shutdown.stop()
        }

        self.wait();
    }
}

/* ---------- */

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::test_utils::*;

    #[test]
    fn drop_stops_and_joins() {
        let now = Instant::now();

        {
            let mut rt = Runtime::new();
            rt.launch(SpinningWorker)
                .expect("failed to launch the test worker");
            std::thread::sleep(Duration::from_millis(50));
        }

        assert!(now.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn wait() {
        let mut rt = Runtime::new();
        let now = Instant::now();
        let timeout = Duration::from_millis(200);

        rt.launch(TimedWorker::new(timeout))
            .expect("failed to launch the test worker");

        assert_eq!(rt.len(), 1);
        assert_eq!(rt.wait(), 0);
        assert!(rt.is_empty());
        assert!(now.elapsed() >= timeout);
    }

    #[test]
    fn nested_runtimes_share_the_token() {
        let mut root = Runtime::new();
        let mut nested = Runtime::nested(root.shutdown().clone());

        nested
            .launch(SpinningWorker)
            .expect("failed to launch the test worker");
        root.stop();

        assert_eq!(nested.wait(), 0);
        assert_eq!(root.wait(), 0);
    }

    #[test]
    fn dropping_a_nested_runtime_keeps_the_token_running() {
        let root = Runtime::new();
        drop(Runtime::nested(root.shutdown().clone()));

        assert!(root.shutdown().is_running());
    }

    #[test]
    fn pinned_worker_runs() {
        let mut rt = Runtime::new();
        let settings = Settings::new().name("pinned").pinned([0]);

        rt.launch_with_settings(TimedWorker::new(Duration::from_millis(1)), settings)
            .expect("failed to launch the test worker");
        assert_eq!(rt.wait(), 0);
    }

    #[test]
    fn panics_are_counted() {
        let mut rt = Runtime::new();

        rt.launch(PanickingWorker)
            .expect("failed to launch the test worker");
        assert_eq!(rt.wait(), 1);
    }

    #[test]
    fn stop_on_err() {
        let mut rt = Runtime::new();

        rt.launch_from_context(BadWorkerContext)
            .expect_err("launching this worker should fail");
        assert!(!rt.shutdown().is_running());
        assert_eq!(rt.wait(), 0);
    }
}
