use crate::{
    codec::sign_in::{BeginSignInRequest, SignInCredential},
    error::{CodecError, DomErrorKind, GetCredentialError},
    host::ProviderOperation,
    request::GetCredentialRequest,
    response::{Credential, GetCredentialResponse},
};

use super::CredentialController;

/// Retrieves a password or passkey assertion for sign-in.
pub(crate) struct GetCredential;

impl CredentialController for GetCredential {
    type Request = GetCredentialRequest;
    type ProviderRequest = BeginSignInRequest;
    type ProviderResponse = SignInCredential;
    type Response = GetCredentialResponse;
    type Error = GetCredentialError;

    const OPERATION: ProviderOperation = ProviderOperation::BeginSignIn;

    fn convert_request_to_provider(
        request: &GetCredentialRequest,
    ) -> Result<BeginSignInRequest, CodecError> {
        BeginSignInRequest::try_from(request)
    }

    fn unexpected_response(
        request: &BeginSignInRequest,
        response: &SignInCredential,
    ) -> Option<String> {
        match response {
            SignInCredential::Password(_) if !request.password_supported => {
                Some("the provider returned a password that was not requested".to_string())
            }
            SignInCredential::PublicKeyCredential(_) if request.passkey_options.is_none() => {
                Some("the provider returned a passkey that was not requested".to_string())
            }
            _ => None,
        }
    }

    fn semantic_error(response: &SignInCredential) -> Option<(DomErrorKind, Option<String>)> {
        match response {
            SignInCredential::PublicKeyCredential(credential) => credential.error(),
            SignInCredential::Password(_) => None,
        }
    }

    fn convert_response_to_domain(
        response: SignInCredential,
    ) -> Result<GetCredentialResponse, CodecError> {
        let credential = match response {
            SignInCredential::Password(password) => Credential::Password {
                id: password.id,
                password: password.password,
            },
            SignInCredential::PublicKeyCredential(credential) => Credential::PublicKeyCredential {
                authentication_response_json: credential.to_authentication_json()?,
            },
        };
        Ok(GetCredentialResponse { credential })
    }
}
