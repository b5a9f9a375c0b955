//! Named OS thread handle for pipeline execution units.

use std::any::Any;
use std::thread::{self, JoinHandle};

use crate::placement::pin_to_core;
use crate::trace::{debug, error, info, warn};

use super::PipelineError;

/// Handle to a running producer or consumer thread.
///
/// Dropping the handle detaches the thread. Use [`Worker::join`] to wait for
/// it and collect its result.
#[derive(Debug)]
pub struct Worker<R> {
    name: String,
    handle: JoinHandle<R>,
}

impl<R: Send + 'static> Worker<R> {
    /// Spawns `body` on a new thread named `name`, optionally pinned to `core`.
    pub(crate) fn spawn<F>(name: String, core: Option<usize>, body: F) -> Result<Self, PipelineError>
    where
        F: FnOnce() -> R + Send + 'static,
    {
        debug!(name = %name, core = ?core, "spawning worker thread");
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                if let Some(core) = core
                    && !pin_to_core(core)
                {
                    warn!(core, "failed to pin worker thread, running unpinned");
                }
                info!("worker started");
                let result = body();
                info!("worker exiting");
                result
            })
            .map_err(|source| {
                error!(name = %name, error = %source, "failed to spawn worker thread");
                PipelineError::Spawn {
                    name: name.clone(),
                    source,
                }
            })?;

        Ok(Self { name, handle })
    }
}

impl<R> Worker<R> {
    /// Returns the thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` once the thread body has returned or unwound.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the thread to exit and returns its result.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Panicked`] if the thread unwound.
    pub fn join(self) -> Result<R, PipelineError> {
        self.handle.join().map_err(|payload| {
            let message = panic_message(payload.as_ref());
            error!(name = %self.name, message = %message, "worker panicked");
            PipelineError::Panicked {
                name: self.name,
                message,
            }
        })
    }
}

/// Extracts the message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
