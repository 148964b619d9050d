use std::future::Future;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::error::BackendError;

/// Current-thread runtime that owns one connection's background task.
///
/// Dropping a tokio runtime from inside another runtime's context panics, so this wrapper shuts
/// its runtime down in the background instead; pending tasks are cancelled without a wait.
pub(crate) struct PrivateRuntime {
    runtime: Option<Runtime>,
}

impl PrivateRuntime {
    fn get(&self) -> Result<&Runtime, BackendError> {
        self.runtime
            .as_ref()
            .ok_or_else(|| BackendError::new("postgres runtime is shut down"))
    }

    /// Start `future` on this runtime.
    ///
    /// # Errors
    /// Fails only once the runtime has been shut down.
    pub(crate) fn spawn<F>(&self, future: F) -> Result<JoinHandle<F::Output>, BackendError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        Ok(self.get()?.spawn(future))
    }
}

impl Drop for PrivateRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Build the private runtime for one connection.
///
/// # Errors
/// Returns the I/O error message if the runtime cannot be built.
pub(crate) fn build_runtime() -> Result<PrivateRuntime, BackendError> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| BackendError::new(format!("failed to create postgres runtime: {e}")))?;
    Ok(PrivateRuntime {
        runtime: Some(runtime),
    })
}

/// Drive `future` to completion on `runtime` from synchronous code.
///
/// A runtime cannot be blocked on from inside another runtime's context, so when the caller is
/// already on a tokio thread the wait happens on a scoped helper thread instead.
pub(crate) fn run_blocking<F>(runtime: &PrivateRuntime, future: F) -> Result<F::Output, BackendError>
where
    F: Future + Send,
    F::Output: Send,
{
    let runtime = runtime.get()?;
    if Handle::try_current().is_ok() {
        std::thread::scope(|s| {
            s.spawn(|| runtime.block_on(future))
                .join()
                .map_err(|_| BackendError::new("postgres worker thread panicked"))
        })
    } else {
        Ok(runtime.block_on(future))
    }
}
