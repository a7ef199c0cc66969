//! Caller-facing credential requests.

/// Saves a username/password pair with the provider.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct CreatePasswordRequest {
    /// The account identifier, usually a username or email address.
    pub id: String,
    /// The password to save. Must not be empty.
    pub password: String,
}

/// Registers a new passkey with the provider.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct CreatePublicKeyCredentialRequest {
    /// `PublicKeyCredentialCreationOptions` in the `WebAuthn` JSON serialization.
    pub request_json: String,
    /// Only succeed if the provider can create the credential without further setup.
    pub prefer_immediately_available_credentials: bool,
}

/// A create-credential request. The variant selects the controller that services it.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum CreateCredentialRequest {
    /// Save a password.
    Password {
        /// The password request.
        request: CreatePasswordRequest,
    },
    /// Register a passkey.
    PublicKeyCredential {
        /// The passkey request.
        request: CreatePublicKeyCredentialRequest,
    },
}

impl From<CreatePasswordRequest> for CreateCredentialRequest {
    fn from(request: CreatePasswordRequest) -> Self {
        Self::Password { request }
    }
}

impl From<CreatePublicKeyCredentialRequest> for CreateCredentialRequest {
    fn from(request: CreatePublicKeyCredentialRequest) -> Self {
        Self::PublicKeyCredential { request }
    }
}

/// One kind of credential the caller is willing to sign in with.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum CredentialOption {
    /// A saved password.
    Password,
    /// A passkey assertion.
    PublicKeyCredential {
        /// `PublicKeyCredentialRequestOptions` in the `WebAuthn` JSON serialization.
        request_json: String,
    },
}

/// Retrieves a credential from the provider for sign-in.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct GetCredentialRequest {
    /// Acceptable credential kinds. At least one is required.
    pub options: Vec<CredentialOption>,
}
