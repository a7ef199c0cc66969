//! Caller-facing credential responses.

/// Result of a successful create-credential request.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum CreateCredentialResponse {
    /// The password was saved.
    Password,
    /// The passkey was registered.
    PublicKeyCredential {
        /// `RegistrationResponseJSON` to forward to the relying party.
        registration_response_json: String,
    },
}

/// A credential returned for sign-in.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum Credential {
    /// A saved password.
    Password {
        /// The account identifier.
        id: String,
        /// The password.
        password: String,
    },
    /// A passkey assertion.
    PublicKeyCredential {
        /// `AuthenticationResponseJSON` to forward to the relying party.
        authentication_response_json: String,
    },
}

/// Result of a successful get-credential request.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct GetCredentialResponse {
    /// The credential the user picked.
    pub credential: Credential,
}
