use crate::{
    codec::password::SavePasswordRequest,
    error::{CodecError, CreateCredentialError},
    host::ProviderOperation,
    request::CreatePasswordRequest,
    response::CreateCredentialResponse,
};

use super::CredentialController;

/// Saves a password with the provider.
pub(crate) struct CreatePassword;

impl CredentialController for CreatePassword {
    type Request = CreatePasswordRequest;
    type ProviderRequest = SavePasswordRequest;
    type ProviderResponse = ();
    type Response = CreateCredentialResponse;
    type Error = CreateCredentialError;

    const OPERATION: ProviderOperation = ProviderOperation::CreatePassword;

    fn convert_request_to_provider(
        request: &CreatePasswordRequest,
    ) -> Result<SavePasswordRequest, CodecError> {
        SavePasswordRequest::try_from(request)
    }

    // A successful save carries nothing the caller needs.
    fn decode_response(_data: Option<&[u8]>) -> Result<(), CodecError> {
        Ok(())
    }

    fn convert_response_to_domain(_response: ()) -> Result<CreateCredentialResponse, CodecError> {
        Ok(CreateCredentialResponse::Password)
    }
}
