//! The provider invocation channel.
//!
//! A [`ProviderHost`] is the out-of-process UI surface (on Android, a hidden activity) that shows
//! the provider's consent screens. The core hands it a [`ProviderLaunch`] and a
//! [`ProviderResultReceiver`]; the host answers exactly once through the receiver.

use std::sync::{Arc, Weak};

use crate::{
    correlator::{RawProviderResult, RequestCode, ResultCorrelator},
    error::HostError,
};

/// Activity result code for a successful provider flow.
pub const RESULT_OK: i32 = -1;
/// Activity result code for a provider flow the user backed out of.
pub const RESULT_CANCELED: i32 = 0;

/// The provider flow a launch should start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum ProviderOperation {
    /// Save a password.
    CreatePassword,
    /// Register a passkey.
    CreatePublicKeyCredential,
    /// Sign in with a password or passkey.
    BeginSignIn,
}

/// Everything the host needs to show provider UI for one request.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ProviderLaunch {
    /// Which provider flow to start.
    pub operation: ProviderOperation,
    /// Correlation token the host must echo back in its result.
    pub request_code: u32,
    /// Provider-native request, CBOR encoded.
    pub payload: Vec<u8>,
}

/// The result a host sends back for one launch.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ProviderResultMessage {
    /// Whether the host failed before the provider produced a result.
    pub failure: bool,
    /// On failure, the exception-type tag (see [`crate::error::exception_type`]).
    pub exception_type: Option<String>,
    /// The request code from the originating [`ProviderLaunch`].
    pub request_code: u32,
    /// On success, the provider-native response bytes.
    pub data: Option<Vec<u8>>,
}

/// Host UI collaborator that shows provider screens.
#[uniffi::export(with_foreign)]
pub trait ProviderHost: Send + Sync {
    /// Stable identity of this UI host. Controllers are shared per identity.
    fn host_id(&self) -> String;

    /// Shows provider UI for `launch` and answers later through `receiver`.
    ///
    /// Must return without waiting for the user.
    ///
    /// # Errors
    /// Returns an error if the UI cannot be shown; the caller is then answered with an unknown
    /// provider failure.
    fn launch(
        &self,
        launch: ProviderLaunch,
        receiver: Arc<ProviderResultReceiver>,
    ) -> Result<(), HostError>;

    /// Tears down the provider UI for `request_code`, if it is still showing.
    fn dismiss(&self, request_code: u32);
}

/// Listener the host reports results to.
#[derive(Debug, uniffi::Object)]
pub struct ProviderResultReceiver {
    correlator: Weak<ResultCorrelator>,
}

impl ProviderResultReceiver {
    pub(crate) fn new(correlator: &Arc<ResultCorrelator>) -> Arc<Self> {
        Arc::new(Self {
            correlator: Arc::downgrade(correlator),
        })
    }
}

#[uniffi::export]
impl ProviderResultReceiver {
    /// Delivers the result of one launch.
    ///
    /// Returns `true` if it answered a pending request, `false` if it was dropped as stale,
    /// duplicate, or belonging to a destroyed host.
    pub fn on_receive_result(&self, result_code: i32, message: ProviderResultMessage) -> bool {
        let Some(correlator) = self.correlator.upgrade() else {
            log::warn!(
                "dropping provider result {} for a destroyed host",
                message.request_code
            );
            return false;
        };
        let code = RequestCode::new(message.request_code);
        let result = if message.failure {
            log::info!("provider failure for {code}: {:?}", message.exception_type);
            RawProviderResult::Failed {
                exception_type: message.exception_type,
            }
        } else {
            log::info!("provider result for {code}: result code {result_code}");
            RawProviderResult::Completed {
                result_code,
                data: message.data,
            }
        };
        correlator.fire(code, result)
    }
}

/// Launches provider UI and routes the answers through a correlator.
pub(crate) struct ProviderChannel {
    host: Arc<dyn ProviderHost>,
    correlator: Arc<ResultCorrelator>,
    receiver: Arc<ProviderResultReceiver>,
}

impl ProviderChannel {
    pub(crate) fn new(host: Arc<dyn ProviderHost>, first_request_code: u32) -> Self {
        let correlator = Arc::new(ResultCorrelator::new(first_request_code));
        let receiver = ProviderResultReceiver::new(&correlator);
        Self {
            host,
            correlator,
            receiver,
        }
    }

    /// Arms `completion` under a fresh request code and asks the host to show UI.
    ///
    /// `completion` runs exactly once, possibly before this returns if the host refuses the launch.
    /// Returns `None` without launching if the channel was already closed; `completion` has then
    /// been interrupted.
    pub(crate) fn launch(
        &self,
        operation: ProviderOperation,
        payload: Vec<u8>,
        completion: impl FnOnce(RawProviderResult) + Send + 'static,
    ) -> Option<RequestCode> {
        let code = self.correlator.arm(completion)?;
        let launch = ProviderLaunch {
            operation,
            request_code: code.value(),
            payload,
        };
        log::info!("launching provider UI for {operation:?} {code}");
        if let Err(err) = self.host.launch(launch, Arc::clone(&self.receiver)) {
            log::warn!("provider host refused launch {code}: {err}");
            self.correlator.fire(
                code,
                RawProviderResult::LaunchFailed {
                    reason: err.to_string(),
                },
            );
        }
        Some(code)
    }

    /// Cancels the invocation under `code` and tears its UI down.
    ///
    /// Returns `false` if the provider already answered.
    pub(crate) fn cancel(&self, code: RequestCode) -> bool {
        if self.correlator.fire(code, RawProviderResult::Cancelled) {
            self.host.dismiss(code.value());
            true
        } else {
            false
        }
    }

    /// Ends the invocation under `code` as interrupted and tears its UI down.
    ///
    /// Returns `false` if the provider already answered.
    pub(crate) fn abandon(&self, code: RequestCode, reason: &str) -> bool {
        if self.correlator.fire(
            code,
            RawProviderResult::Interrupted {
                reason: reason.to_string(),
            },
        ) {
            self.host.dismiss(code.value());
            true
        } else {
            false
        }
    }

    /// Interrupts every pending invocation and refuses later launches, e.g. because the host is
    /// being destroyed.
    pub(crate) fn close(&self, reason: &str) -> usize {
        self.correlator.close(reason).len()
    }

    pub(crate) fn is_pending(&self, code: RequestCode) -> bool {
        self.correlator.is_armed(code)
    }

    pub(crate) fn live_invocations(&self) -> usize {
        self.correlator.live()
    }
}
