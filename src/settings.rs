use std::fmt::{Debug, Formatter, Result};
use std::thread::Builder;

/* ---------- */

/// Configures the thread a producer or consumer runs on.
///
/// Besides the thread name, settings may carry a list of CPU
/// IDs the worker thread is pinned to once spawned.
pub struct Settings {
    builder: Builder,
    cores: Option<Vec<usize>>,
}

impl Settings {
    /// Returns the base [`Settings`] with default parameters.
    #[inline]
    pub fn new() -> Self {
        Self {
            builder: Builder::new(),
            cores: None,
        }
    }

    /// Sets the thread's name, e.g. `producer-3`.
    ///
    /// The name must not contain null bytes (`\0`).
    #[inline]
    pub fn name<T: ToString>(self, name: T) -> Self {
        Self {
            builder: self.builder.name(name.to_string()),
            ..self
        }
    }

    /// Pins the thread to the given CPU IDs.
    ///
    /// An empty list leaves the thread unpinned.
    #[inline]
    pub fn pinned<C: IntoIterator<Item = usize>>(self, cores: C) -> Self {
        let cores = cores.into_iter().collect::<Vec<_>>();

        Self {
            cores: (!cores.is_empty()).then_some(cores),
            ..self
        }
    }

    /// Returns the CPU IDs this thread will be pinned to, if any.
    #[inline]
    pub fn cores(&self) -> Option<&[usize]> {
        self.cores.as_deref()
    }

    #[inline]
    pub(crate) fn into_parts(self) -> (Builder, Option<Vec<usize>>) {
        (self.builder, self.cores)
    }
}

impl Default for Settings {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Settings {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("Settings")
            .field("builder", &self.builder)
            .field("cores", &self.cores)
            .finish()
    }
}

/* ---------- */
