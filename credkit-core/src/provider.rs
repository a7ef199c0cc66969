//! The caller-facing entry point.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::{
    callback::{CallbackBinding, CreateCredentialCallback, GetCredentialCallback},
    cancellation::{already_cancelled, CancellationSignal},
    config::ProviderConfig,
    correlator::RequestCode,
    error::{CreateCredentialError, GetCredentialError, ProviderFailure},
    executor::{Executor, InlineExecutor},
    host::ProviderHost,
    registry::{ControllerRegistry, HostControllers},
    request::{CreateCredentialRequest, GetCredentialRequest},
    response::{CreateCredentialResponse, GetCredentialResponse},
};

/// A launched invocation the async entry points may have to abandon.
type Launched = Option<(Arc<HostControllers>, RequestCode)>;

/// Routes credential requests to the provider and their results back to the caller.
///
/// One instance serves any number of provider hosts. Controllers are built lazily per host (see
/// [`ProviderHost::host_id`]) and dropped by [`CredentialProvider::on_host_destroyed`].
///
/// # Example
///
/// ```rust,ignore
/// let provider = CredentialProvider::new_with_defaults();
/// provider.on_create_credential(
///     CreatePasswordRequest { id: "alice".into(), password: "pw123".into() }.into(),
///     host,
///     None,
///     executor,
///     callback,
/// );
/// ```
#[derive(uniffi::Object)]
pub struct CredentialProvider {
    config: ProviderConfig,
    registry: ControllerRegistry,
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl CredentialProvider {
    /// Creates a provider with the given configuration.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            registry: ControllerRegistry::new(config.clone()),
            config,
        }
    }

    /// Creates a provider with [`ProviderConfig::default`].
    #[uniffi::constructor]
    #[must_use]
    pub fn new_with_defaults() -> Self {
        Self::new(ProviderConfig::default())
    }

    /// Whether the provider can serve requests on this device.
    #[must_use]
    pub const fn is_available_on_device(&self) -> bool {
        true
    }

    /// Starts a create-credential flow and returns immediately.
    ///
    /// `callback` is invoked exactly once on `executor`, unless `cancellation` is already
    /// cancelled, in which case nothing is launched and the callback is never invoked.
    pub fn on_create_credential(
        &self,
        request: CreateCredentialRequest,
        host: Arc<dyn ProviderHost>,
        cancellation: Option<Arc<CancellationSignal>>,
        executor: Arc<dyn Executor>,
        callback: Arc<dyn CreateCredentialCallback>,
    ) {
        if already_cancelled(cancellation.as_ref()) {
            return;
        }
        self.dispatch_create(
            &request,
            host,
            cancellation.as_ref(),
            CallbackBinding::for_create(callback, executor),
        );
    }

    /// Starts a get-credential flow and returns immediately.
    ///
    /// `callback` is invoked exactly once on `executor`, unless `cancellation` is already
    /// cancelled, in which case nothing is launched and the callback is never invoked.
    pub fn on_get_credential(
        &self,
        request: GetCredentialRequest,
        host: Arc<dyn ProviderHost>,
        cancellation: Option<Arc<CancellationSignal>>,
        executor: Arc<dyn Executor>,
        callback: Arc<dyn GetCredentialCallback>,
    ) {
        if already_cancelled(cancellation.as_ref()) {
            return;
        }
        self.dispatch_get(
            &request,
            host,
            cancellation.as_ref(),
            CallbackBinding::for_get(callback, executor),
        );
    }

    /// Creates a credential and waits for the provider's answer.
    ///
    /// # Errors
    /// Returns the typed failure of the flow. A signal that is already cancelled yields
    /// [`CreateCredentialError::Cancelled`] without launching anything, and an expired
    /// `response_timeout_ms` yields [`CreateCredentialError::Interrupted`].
    pub async fn create_credential(
        &self,
        request: CreateCredentialRequest,
        host: Arc<dyn ProviderHost>,
        cancellation: Option<Arc<CancellationSignal>>,
    ) -> Result<CreateCredentialResponse, CreateCredentialError> {
        if already_cancelled(cancellation.as_ref()) {
            return Err(CreateCredentialError::cancelled(
                "the request was cancelled before it started",
            ));
        }
        let (binding, receiver) = oneshot_binding();
        let launched = self.dispatch_create(&request, host, cancellation.as_ref(), binding);
        self.await_outcome(launched, receiver).await
    }

    /// Gets a credential and waits for the provider's answer.
    ///
    /// # Errors
    /// Returns the typed failure of the flow. A signal that is already cancelled yields
    /// [`GetCredentialError::Cancelled`] without launching anything, and an expired
    /// `response_timeout_ms` yields [`GetCredentialError::Interrupted`].
    pub async fn get_credential(
        &self,
        request: GetCredentialRequest,
        host: Arc<dyn ProviderHost>,
        cancellation: Option<Arc<CancellationSignal>>,
    ) -> Result<GetCredentialResponse, GetCredentialError> {
        if already_cancelled(cancellation.as_ref()) {
            return Err(GetCredentialError::cancelled(
                "the request was cancelled before it started",
            ));
        }
        let (binding, receiver) = oneshot_binding();
        let launched = self.dispatch_get(&request, host, cancellation.as_ref(), binding);
        self.await_outcome(launched, receiver).await
    }

    /// Tears down the controllers of a destroyed host.
    ///
    /// Every invocation still pending on that host is answered with an interrupted error. Returns
    /// how many there were.
    pub fn on_host_destroyed(&self, host_id: &str) -> u64 {
        self.registry.destroy(host_id) as u64
    }

    /// Number of invocations on `host_id` still waiting for the provider.
    #[must_use]
    pub fn live_invocations(&self, host_id: &str) -> u64 {
        self.registry
            .get(host_id)
            .map_or(0, |controllers| controllers.live_invocations() as u64)
    }
}

impl CredentialProvider {
    fn dispatch_create(
        &self,
        request: &CreateCredentialRequest,
        host: Arc<dyn ProviderHost>,
        cancellation: Option<&Arc<CancellationSignal>>,
        binding: CallbackBinding<CreateCredentialResponse, CreateCredentialError>,
    ) -> Launched {
        let controllers = self.registry.controllers_for(host);
        let code = match request {
            CreateCredentialRequest::Password { request } => {
                controllers
                    .create_password
                    .invoke(request, cancellation, binding)
            }
            CreateCredentialRequest::PublicKeyCredential { request } => {
                controllers
                    .create_public_key
                    .invoke(request, cancellation, binding)
            }
        }?;
        Some((controllers, code))
    }

    fn dispatch_get(
        &self,
        request: &GetCredentialRequest,
        host: Arc<dyn ProviderHost>,
        cancellation: Option<&Arc<CancellationSignal>>,
        binding: CallbackBinding<GetCredentialResponse, GetCredentialError>,
    ) -> Launched {
        let controllers = self.registry.controllers_for(host);
        let code = controllers
            .get_credential
            .invoke(request, cancellation, binding)?;
        Some((controllers, code))
    }

    async fn await_outcome<R, E: ProviderFailure>(
        &self,
        launched: Launched,
        mut receiver: oneshot::Receiver<Result<R, E>>,
    ) -> Result<R, E> {
        let mut waiting = AbandonOnDrop(launched);
        let outcome = match self.config.response_timeout_ms {
            Some(timeout_ms) => {
                match tokio::time::timeout(Duration::from_millis(timeout_ms), &mut receiver).await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        waiting.abandon(&format!("no provider result after {timeout_ms} ms"));
                        // Abandoning delivers through the same binding, so the answer is queued.
                        receiver.await
                    }
                }
            }
            None => receiver.await,
        };
        waiting.0 = None;
        outcome.unwrap_or_else(|_| Err(dropped()))
    }
}

/// Abandons a launched invocation if the caller stops waiting for it.
struct AbandonOnDrop(Launched);

impl AbandonOnDrop {
    fn abandon(&mut self, reason: &str) {
        if let Some((controllers, code)) = self.0.take() {
            if controllers.abandon(code, reason) {
                log::warn!("abandoned provider invocation {code}: {reason}");
            }
        }
    }
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.abandon("the caller stopped waiting for the provider result");
    }
}

fn oneshot_binding<R: Send + 'static, E: Send + 'static>(
) -> (CallbackBinding<R, E>, oneshot::Receiver<Result<R, E>>) {
    let (sender, receiver) = oneshot::channel();
    let binding = CallbackBinding::new(
        move |outcome| {
            if sender.send(outcome).is_err() {
                log::debug!("caller stopped waiting for a provider result");
            }
        },
        Arc::new(InlineExecutor::new()),
    );
    (binding, receiver)
}

fn dropped<E: ProviderFailure>() -> E {
    E::interrupted("the provider result was dropped")
}
