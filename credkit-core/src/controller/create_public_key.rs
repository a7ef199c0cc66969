use crate::{
    codec::public_key::{PublicKeyCredential, RegistrationRequest},
    error::{CodecError, CreateCredentialError, DomErrorKind},
    host::ProviderOperation,
    request::CreatePublicKeyCredentialRequest,
    response::CreateCredentialResponse,
};

use super::CredentialController;

/// Registers a passkey with the provider.
pub(crate) struct CreatePublicKey;

impl CredentialController for CreatePublicKey {
    type Request = CreatePublicKeyCredentialRequest;
    type ProviderRequest = RegistrationRequest;
    type ProviderResponse = PublicKeyCredential;
    type Response = CreateCredentialResponse;
    type Error = CreateCredentialError;

    const OPERATION: ProviderOperation = ProviderOperation::CreatePublicKeyCredential;

    fn convert_request_to_provider(
        request: &CreatePublicKeyCredentialRequest,
    ) -> Result<RegistrationRequest, CodecError> {
        RegistrationRequest::try_from(request)
    }

    fn semantic_error(response: &PublicKeyCredential) -> Option<(DomErrorKind, Option<String>)> {
        response.error()
    }

    fn convert_response_to_domain(
        response: PublicKeyCredential,
    ) -> Result<CreateCredentialResponse, CodecError> {
        Ok(CreateCredentialResponse::PublicKeyCredential {
            registration_response_json: response.to_registration_json()?,
        })
    }
}
