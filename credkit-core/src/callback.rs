//! Caller callbacks and their binding to an execution context.

use std::sync::Arc;

use crate::{
    error::{CreateCredentialError, GetCredentialError},
    executor::{CallbackTask, Executor},
    response::{CreateCredentialResponse, GetCredentialResponse},
};

/// Receives the outcome of a create-credential request.
///
/// Exactly one of the two methods is called, once, on the executor supplied with the request.
#[uniffi::export(with_foreign)]
pub trait CreateCredentialCallback: Send + Sync {
    /// The credential was created.
    fn on_result(&self, response: CreateCredentialResponse);

    /// The request failed.
    fn on_error(&self, error: CreateCredentialError);
}

/// Receives the outcome of a get-credential request.
///
/// Exactly one of the two methods is called, once, on the executor supplied with the request.
#[uniffi::export(with_foreign)]
pub trait GetCredentialCallback: Send + Sync {
    /// A credential was returned.
    fn on_result(&self, response: GetCredentialResponse);

    /// The request failed.
    fn on_error(&self, error: GetCredentialError);
}

type Deliver<R, E> = Box<dyn FnOnce(Result<R, E>) + Send>;

/// A callback paired with the execution context it must be invoked on.
///
/// Consumed by [`CallbackBinding::deliver`], so an outcome can be delivered at most once.
pub(crate) struct CallbackBinding<R, E> {
    deliver: Deliver<R, E>,
    executor: Arc<dyn Executor>,
}

impl<R: Send + 'static, E: Send + 'static> CallbackBinding<R, E> {
    pub(crate) fn new(
        deliver: impl FnOnce(Result<R, E>) + Send + 'static,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            deliver: Box::new(deliver),
            executor,
        }
    }

    /// Schedules the callback with `outcome` on the bound executor.
    pub(crate) fn deliver(self, outcome: Result<R, E>) {
        let deliver = self.deliver;
        self.executor
            .execute(CallbackTask::new(move || deliver(outcome)));
    }
}

impl CallbackBinding<CreateCredentialResponse, CreateCredentialError> {
    pub(crate) fn for_create(
        callback: Arc<dyn CreateCredentialCallback>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self::new(
            move |outcome| match outcome {
                Ok(response) => callback.on_result(response),
                Err(error) => callback.on_error(error),
            },
            executor,
        )
    }
}

impl CallbackBinding<GetCredentialResponse, GetCredentialError> {
    pub(crate) fn for_get(
        callback: Arc<dyn GetCredentialCallback>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self::new(
            move |outcome| match outcome {
                Ok(response) => callback.on_result(response),
                Err(error) => callback.on_error(error),
            },
            executor,
        )
    }
}
