//! Process-wide runtime environment with run-once initialization.

use once_cell::sync::OnceCell;

use crate::error::{EnvironmentError, OnnxError};

/// Runtime environment state. Keep one per runtime for the whole process.
///
/// The first call to [`Environment::ensure_initialized`] runs the setup
/// step; concurrent callers block until it finishes. The outcome, success or
/// failure, is memoized and returned to every later caller. A failed setup is
/// never retried.
#[derive(Debug)]
pub struct Environment {
    state: OnceCell<Result<(), EnvironmentError>>,
}

impl Environment {
    /// Creates an uninitialized environment. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            state: OnceCell::new(),
        }
    }

    /// Runs `init` if no caller has done so yet, then returns the memoized
    /// outcome.
    pub fn ensure_initialized<F>(&self, init: F) -> Result<(), EnvironmentError>
    where
        F: FnOnce() -> Result<(), OnnxError>,
    {
        self.state
            .get_or_init(|| init().map_err(EnvironmentError::from))
            .clone()
    }

    /// Reports whether setup has run, regardless of its outcome.
    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
