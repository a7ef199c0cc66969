//! Sign-in request and credential.

use serde::{Deserialize, Serialize};

use super::password::SignInPassword;
use super::public_key::{PublicKeyCredential, RequestOptions};
use crate::error::CodecError;
use crate::request::{CredentialOption, GetCredentialRequest};

/// Provider request to pick a credential for sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginSignInRequest {
    /// Whether saved passwords may be offered.
    pub password_supported: bool,
    /// Passkey request, if passkeys may be offered.
    pub passkey_options: Option<RequestOptions>,
}

impl TryFrom<&GetCredentialRequest> for BeginSignInRequest {
    type Error = CodecError;

    fn try_from(request: &GetCredentialRequest) -> Result<Self, Self::Error> {
        if request.options.is_empty() {
            return Err(CodecError::InvalidRequest(
                "at least one credential option is required".to_string(),
            ));
        }

        let mut sign_in = Self {
            password_supported: false,
            passkey_options: None,
        };
        for option in &request.options {
            match option {
                CredentialOption::Password => sign_in.password_supported = true,
                CredentialOption::PublicKeyCredential { request_json } => {
                    if sign_in.passkey_options.is_some() {
                        return Err(CodecError::InvalidRequest(
                            "only one public key credential option is supported".to_string(),
                        ));
                    }
                    sign_in.passkey_options = Some(RequestOptions::from_json(request_json)?);
                }
            }
        }
        Ok(sign_in)
    }
}

/// Provider response carrying the credential the user picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignInCredential {
    /// A saved password.
    Password(SignInPassword),
    /// A passkey assertion.
    PublicKeyCredential(PublicKeyCredential),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_and_passkey_options() {
        let request = GetCredentialRequest {
            options: vec![
                CredentialOption::Password,
                CredentialOption::PublicKeyCredential {
                    request_json: r#"{"challenge": "AQID", "rpId": "example.com"}"#.to_string(),
                },
            ],
        };
        let sign_in = BeginSignInRequest::try_from(&request).unwrap();
        assert!(sign_in.password_supported);
        assert_eq!(sign_in.passkey_options.unwrap().rp_id, "example.com");
    }

    #[test]
    fn test_empty_options_are_rejected() {
        let request = GetCredentialRequest { options: vec![] };
        assert!(matches!(
            BeginSignInRequest::try_from(&request),
            Err(CodecError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_second_passkey_option_is_rejected() {
        let option = CredentialOption::PublicKeyCredential {
            request_json: r#"{"challenge": "AQID", "rpId": "example.com"}"#.to_string(),
        };
        let request = GetCredentialRequest {
            options: vec![option.clone(), option],
        };
        assert!(matches!(
            BeginSignInRequest::try_from(&request),
            Err(CodecError::InvalidRequest(_))
        ));
    }
}
