//! Execution contexts for caller callbacks.
//!
//! Provider results arrive on whatever thread the host delivers them on. Callers never observe
//! that thread: every callback is wrapped in a [`CallbackTask`] and handed to the [`Executor`] the
//! caller supplied with the request.

use std::sync::{Arc, Mutex, PoisonError};

/// A caller-chosen execution context, e.g. the main thread or a background pool.
#[uniffi::export(with_foreign)]
pub trait Executor: Send + Sync {
    /// Schedules `task` to run. Implementations must eventually call [`CallbackTask::run`].
    fn execute(&self, task: Arc<CallbackTask>);
}

type Job = Box<dyn FnOnce() + Send>;

/// A unit of work scheduled on an [`Executor`]. Runs at most once.
#[derive(uniffi::Object)]
pub struct CallbackTask {
    job: Mutex<Option<Job>>,
}

impl std::fmt::Debug for CallbackTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackTask").finish_non_exhaustive()
    }
}

impl CallbackTask {
    pub(crate) fn new(job: impl FnOnce() + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            job: Mutex::new(Some(Box::new(job))),
        })
    }
}

#[uniffi::export]
impl CallbackTask {
    /// Runs the task. Subsequent calls do nothing.
    pub fn run(&self) {
        let job = self
            .job
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(job) = job {
            job();
        }
    }
}

/// Runs tasks on the calling thread as soon as they are scheduled.
///
/// Used by the async entry points, where the awaiting task is the execution context.
#[derive(Debug, Default, uniffi::Object)]
pub struct InlineExecutor;

#[uniffi::export]
impl InlineExecutor {
    /// Creates an inline executor.
    #[uniffi::constructor]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Executor for InlineExecutor {
    fn execute(&self, task: Arc<CallbackTask>) {
        task.run();
    }
}
