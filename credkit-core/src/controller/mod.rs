//! Per-operation controllers.
//!
//! Every credential operation follows the same lifecycle: convert the caller's request to the
//! provider's shape, launch provider UI through the host's [`ProviderChannel`], and turn the single
//! raw result into a typed response or error on the caller's executor. [`Controller`] owns that
//! lifecycle; a [`CredentialController`] only supplies the conversions for one operation.

mod create_password;
mod create_public_key;
mod get_credential;

pub(crate) use create_password::CreatePassword;
pub(crate) use create_public_key::CreatePublicKey;
pub(crate) use get_credential::GetCredential;

use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, Weak};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    callback::CallbackBinding,
    cancellation::CancellationSignal,
    codec,
    correlator::{RawProviderResult, RequestCode},
    error::{CodecError, DomErrorKind, ProviderFailure},
    host::{ProviderChannel, ProviderOperation, RESULT_CANCELED, RESULT_OK},
};

/// The conversions that make up one credential operation.
pub(crate) trait CredentialController: Send + Sync + 'static {
    /// What the caller asks for.
    type Request;
    /// What the provider is sent.
    type ProviderRequest: Serialize + Send + 'static;
    /// What the provider answers with.
    type ProviderResponse: DeserializeOwned;
    /// What the caller receives on success.
    type Response: Send + 'static;
    /// What the caller receives on failure.
    type Error: ProviderFailure + Send + 'static;

    /// The provider flow this operation launches.
    const OPERATION: ProviderOperation;

    fn convert_request_to_provider(
        request: &Self::Request,
    ) -> Result<Self::ProviderRequest, CodecError>;

    /// Decodes the success payload. Most operations require one.
    fn decode_response(data: Option<&[u8]>) -> Result<Self::ProviderResponse, CodecError> {
        let bytes = data.ok_or_else(|| {
            CodecError::MalformedResponse("missing result payload".to_string())
        })?;
        codec::from_cbor(bytes)
    }

    /// Why `response` does not answer `request`, if it does not.
    fn unexpected_response(
        _request: &Self::ProviderRequest,
        _response: &Self::ProviderResponse,
    ) -> Option<String> {
        None
    }

    /// A failure the provider reported inside an otherwise successful response.
    fn semantic_error(
        _response: &Self::ProviderResponse,
    ) -> Option<(DomErrorKind, Option<String>)> {
        None
    }

    fn convert_response_to_domain(
        response: Self::ProviderResponse,
    ) -> Result<Self::Response, CodecError>;
}

/// Drives one [`CredentialController`] against one provider host.
pub(crate) struct Controller<C> {
    channel: Arc<ProviderChannel>,
    cancel_in_flight: bool,
    operation: PhantomData<fn() -> C>,
}

impl<C: CredentialController> Controller<C> {
    pub(crate) const fn new(channel: Arc<ProviderChannel>, cancel_in_flight: bool) -> Self {
        Self {
            channel,
            cancel_in_flight,
            operation: PhantomData,
        }
    }

    /// Starts one invocation and returns without waiting for the provider.
    ///
    /// `binding` receives exactly one outcome. If nothing could be launched (the request cannot be
    /// converted, or the host is already gone) it receives the error right away and `None` is
    /// returned.
    pub(crate) fn invoke(
        &self,
        request: &C::Request,
        cancellation: Option<&Arc<CancellationSignal>>,
        binding: CallbackBinding<C::Response, C::Error>,
    ) -> Option<RequestCode> {
        let (provider_request, payload) = match C::convert_request_to_provider(request)
            .and_then(|provider_request| {
                codec::to_cbor(&provider_request).map(|payload| (provider_request, payload))
            }) {
            Ok(converted) => converted,
            Err(err) => {
                log::warn!("rejecting {:?} request: {err}", C::OPERATION);
                binding.deliver(Err(request_error(err)));
                return None;
            }
        };

        let signal = cancellation.filter(|_| self.cancel_in_flight);
        // The listener is registered before launching so that the completion can always remove
        // it again; it only learns the request code once the launch went through.
        let launched: Arc<OnceLock<RequestCode>> = Arc::default();
        let listener = signal.and_then(|signal| {
            let channel = Arc::downgrade(&self.channel);
            let launched = Arc::clone(&launched);
            signal
                .on_cancel(move || {
                    if let Some(code) = launched.get() {
                        cancel_launched(&channel, *code);
                    }
                })
                .map(|id| (Arc::downgrade(signal), id))
        });

        let code = self.channel.launch(C::OPERATION, payload, move |raw| {
            if let Some((signal, id)) = listener {
                if let Some(signal) = signal.upgrade() {
                    signal.remove_listener(id);
                }
            }
            binding.deliver(Self::handle_result(&provider_request, raw));
        })?;

        if launched.set(code).is_ok() && signal.is_some_and(|signal| signal.is_canceled()) {
            // Cancelled while launching, before the listener knew the code.
            cancel_launched(&Arc::downgrade(&self.channel), code);
        }
        Some(code)
    }

    /// Maps the single raw result of an invocation to the caller's outcome.
    fn handle_result(
        request: &C::ProviderRequest,
        raw: RawProviderResult,
    ) -> Result<C::Response, C::Error> {
        match raw {
            RawProviderResult::Completed { result_code, data } => {
                match result_code {
                    RESULT_OK => {}
                    RESULT_CANCELED => {
                        return Err(C::Error::cancelled("the user cancelled the provider UI"));
                    }
                    other => {
                        return Err(C::Error::unknown(format!(
                            "the provider finished with result code {other}"
                        )));
                    }
                }
                let response = C::decode_response(data.as_deref())
                    .map_err(|err| C::Error::unknown(err.to_string()))?;
                if let Some(reason) = C::unexpected_response(request, &response) {
                    return Err(C::Error::unknown(reason));
                }
                if let Some((dom_error, message)) = C::semantic_error(&response) {
                    return Err(C::Error::dom(dom_error, message));
                }
                C::convert_response_to_domain(response)
                    .map_err(|err| C::Error::unknown(err.to_string()))
            }
            RawProviderResult::Failed { exception_type } => {
                Err(C::Error::from_exception_type(exception_type.as_deref()))
            }
            RawProviderResult::Cancelled => {
                Err(C::Error::cancelled("the request was cancelled by the caller"))
            }
            RawProviderResult::Interrupted { reason } => Err(C::Error::interrupted(reason)),
            RawProviderResult::LaunchFailed { reason } => Err(C::Error::unknown(format!(
                "the provider UI could not be launched: {reason}"
            ))),
        }
    }
}

fn cancel_launched(channel: &Weak<ProviderChannel>, code: RequestCode) {
    if let Some(channel) = channel.upgrade() {
        if channel.is_pending(code) && channel.cancel(code) {
            log::info!("cancelled provider invocation {code}");
        }
    }
}

fn request_error<E: ProviderFailure>(err: CodecError) -> E {
    match err {
        CodecError::InvalidRequestJson(_) | CodecError::InvalidBase64 { .. } => {
            E::dom(DomErrorKind::Encoding, Some(err.to_string()))
        }
        CodecError::InvalidRequest(_)
        | CodecError::Serialization(_)
        | CodecError::MalformedResponse(_) => E::unknown(err.to_string()),
    }
}
