use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;

use crate::settings::Settings;
use crate::worker::Worker;
use crate::Error;

/// Longest stretch a cancellable sleep or wait goes without looking at the [`Shutdown`] token.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(25);

/* ---------- */

/// Lets `SIGINT`/`SIGTERM` cancel the run behind `shutdown`.
///
/// The first signal only flips the token, workers notice it at their next
/// blocking point. A second signal terminates the process.
pub(crate) fn enable_graceful_shutdown(shutdown: &Shutdown) -> Result<(), Error> {
    for sig in TERM_SIGNALS {
        flag::register_conditional_shutdown(*sig, 1, shutdown.as_ref().clone())?;
        flag::register(*sig, shutdown.as_ref().clone())?;
    }

    Ok(())
}

/// Spawns `worker` on a new thread configured by `settings`.
pub(crate) fn spawn_thread<W>(
    mut worker: W,
    settings: Settings,
    shutdown: &Shutdown,
) -> Result<JoinHandle<()>, Error>
where
    W: Worker + 'static,
{
    let shutdown = shutdown.clone();
    let (builder, cores) = settings.into_parts();

    let thread = builder.spawn(move || {
        if let Some(cores) = cores {
            if let Err(err) = affinity::set_thread_affinity(&cores) {
                tracing::warn!(?cores, "failed to pin worker thread: {err}");
            }
        }

        worker.run(shutdown)
    })?;

    Ok(thread)
}

/* ---------- */

/// Cooperative cancellation token shared by the coordinator, the queue and every worker.
///
/// Stopping never tears anything down: it only asks every blocking point to
/// give up at its next check.
#[derive(Debug, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Asks every holder of this token to stop.
    #[inline]
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    /// Returns whether or not the run is still going.
    #[inline]
    pub fn is_running(&self) -> bool {
        !self.0.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` unless the token is stopped first.
    ///
    /// Returns `false` if the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;

        loop {
            if !self.is_running() {
                return false;
            }

            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return true;
            }

            std::thread::sleep(left.min(POLL_INTERVAL));
        }
    }
}

impl AsRef<Arc<AtomicBool>> for Shutdown {
    #[inline]
    fn as_ref(&self) -> &Arc<AtomicBool> {
        &self.0
    }
}

impl Clone for Shutdown {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/* ---------- */
