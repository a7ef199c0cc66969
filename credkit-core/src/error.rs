use strum::{Display, EnumString};
use thiserror::Error;

/// Exception-type tags a provider host attaches to a failure result.
///
/// These travel as plain strings on the wire (see [`crate::ProviderResultMessage`]).
pub mod exception_type {
    /// The user dismissed the create flow.
    pub const CREATE_CANCELED: &str = "CREATE_CANCELED";
    /// The create flow was interrupted before it could complete.
    pub const CREATE_INTERRUPTED: &str = "CREATE_INTERRUPTED";
    /// The create flow failed for an unspecified reason.
    pub const CREATE_UNKNOWN: &str = "CREATE_UNKNOWN";
    /// The user dismissed the get flow.
    pub const GET_CANCELED: &str = "GET_CANCELED";
    /// The get flow was interrupted before it could complete.
    pub const GET_INTERRUPTED: &str = "GET_INTERRUPTED";
    /// The provider has no credential matching the request.
    pub const GET_NO_CREDENTIALS: &str = "GET_NO_CREDENTIALS";
    /// The get flow failed for an unspecified reason.
    pub const GET_UNKNOWN: &str = "GET_UNKNOWN";
}

/// `WebAuthn` DOM error names surfaced for public key credential failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, uniffi::Enum)]
pub enum DomErrorKind {
    /// The requested operation or algorithm is not supported.
    #[strum(serialize = "NotSupportedError")]
    NotSupported,
    /// The authenticator is in a state that does not allow the operation, e.g. an excluded credential exists.
    #[strum(serialize = "InvalidStateError")]
    InvalidState,
    /// The relying party is not valid for the calling origin.
    #[strum(serialize = "SecurityError")]
    Security,
    /// The provider could not reach a required network resource.
    #[strum(serialize = "NetworkError")]
    Network,
    /// The operation was aborted.
    #[strum(serialize = "AbortError")]
    Abort,
    /// The operation timed out.
    #[strum(serialize = "TimeoutError")]
    Timeout,
    /// The request could not be encoded or decoded.
    #[strum(serialize = "EncodingError")]
    Encoding,
    /// The authenticator reported an unknown failure.
    #[strum(serialize = "UnknownError")]
    Unknown,
    /// A mandatory constraint could not be satisfied.
    #[strum(serialize = "ConstraintError")]
    Constraint,
    /// The supplied data is inconsistent.
    #[strum(serialize = "DataError")]
    Data,
    /// The user or platform did not allow the operation.
    #[strum(serialize = "NotAllowedError")]
    NotAllowed,
    /// The attestation could not be made private.
    #[strum(serialize = "AttestationNotPrivateError")]
    AttestationNotPrivate,
}

impl DomErrorKind {
    /// Maps a FIDO2 authenticator error code to its DOM error name.
    ///
    /// Codes outside the known set map to [`DomErrorKind::Unknown`].
    #[must_use]
    pub const fn from_authenticator_code(code: u32) -> Self {
        match code {
            9 => Self::NotSupported,
            11 => Self::InvalidState,
            18 => Self::Security,
            19 => Self::Network,
            20 => Self::Abort,
            23 => Self::Timeout,
            27 => Self::Encoding,
            29 => Self::Constraint,
            30 => Self::Data,
            35 => Self::NotAllowed,
            36 => Self::AttestationNotPrivate,
            _ => Self::Unknown,
        }
    }
}

/// Errors delivered to callers of the create-credential operations.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum CreateCredentialError {
    /// The user or caller cancelled the flow.
    #[error("create credential cancelled: {message}")]
    Cancelled {
        /// Human readable reason.
        message: String,
    },
    /// The flow was interrupted (provider UI torn down, timed out) before it answered.
    #[error("create credential interrupted: {message}")]
    Interrupted {
        /// Human readable reason.
        message: String,
    },
    /// The provider failed or violated its result contract.
    #[error("create credential failed: {message}")]
    Unknown {
        /// Human readable reason.
        message: String,
    },
    /// The provider decoded fine but flagged a public key credential failure.
    #[error("public key credential error {dom_error}: {message:?}")]
    PublicKeyDom {
        /// The DOM error name.
        dom_error: DomErrorKind,
        /// Optional message from the authenticator.
        message: Option<String>,
    },
}

/// Errors delivered to callers of the get-credential operation.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum GetCredentialError {
    /// The user or caller cancelled the flow.
    #[error("get credential cancelled: {message}")]
    Cancelled {
        /// Human readable reason.
        message: String,
    },
    /// The flow was interrupted (provider UI torn down, timed out) before it answered.
    #[error("get credential interrupted: {message}")]
    Interrupted {
        /// Human readable reason.
        message: String,
    },
    /// The provider has no credential that satisfies the request.
    #[error("no credential available: {message}")]
    NoCredential {
        /// Human readable reason.
        message: String,
    },
    /// The provider failed or violated its result contract.
    #[error("get credential failed: {message}")]
    Unknown {
        /// Human readable reason.
        message: String,
    },
    /// The provider decoded fine but flagged a public key credential failure.
    #[error("public key credential error {dom_error}: {message:?}")]
    PublicKeyDom {
        /// The DOM error name.
        dom_error: DomErrorKind,
        /// Optional message from the authenticator.
        message: Option<String>,
    },
}

/// Builds the members of the error taxonomy for one operation family.
///
/// Controllers are generic over their error type and only ever construct errors
/// through this trait, so every family maps provider failures the same way.
pub trait ProviderFailure: Sized {
    /// The user or caller cancelled the flow.
    fn cancelled(message: impl Into<String>) -> Self;

    /// The provider UI went away without answering.
    fn interrupted(message: impl Into<String>) -> Self;

    /// Catch-all for unmapped provider failures and contract violations.
    fn unknown(message: impl Into<String>) -> Self;

    /// The provider decoded fine but flagged a domain-specific failure.
    fn dom(dom_error: DomErrorKind, message: Option<String>) -> Self;

    /// Maps an exception-type tag from a failure result.
    ///
    /// Unrecognised or missing tags become [`ProviderFailure::unknown`].
    fn from_exception_type(tag: Option<&str>) -> Self;

    /// Stable tag identifying the error kind, suitable for telemetry and foreign `when` arms.
    fn error_type(&self) -> &'static str;
}

impl ProviderFailure for CreateCredentialError {
    fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted {
            message: message.into(),
        }
    }

    fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    fn dom(dom_error: DomErrorKind, message: Option<String>) -> Self {
        // The provider reports a user backing out of account selection as an
        // unknown authenticator error with this message.
        if dom_error == DomErrorKind::Unknown
            && message
                .as_deref()
                .is_some_and(|m| m.contains("Unable to get sync account"))
        {
            return Self::cancelled("passkey registration was cancelled by the user");
        }
        Self::PublicKeyDom { dom_error, message }
    }

    fn from_exception_type(tag: Option<&str>) -> Self {
        match tag {
            Some(exception_type::CREATE_CANCELED) => {
                Self::cancelled("the user cancelled the provider UI")
            }
            Some(exception_type::CREATE_INTERRUPTED) => {
                Self::interrupted("the provider UI was interrupted")
            }
            Some(exception_type::CREATE_UNKNOWN) => {
                Self::unknown("the provider reported an unknown failure")
            }
            Some(other) => Self::unknown(format!("unrecognised provider failure: {other}")),
            None => Self::unknown("the provider reported a failure without a type"),
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::Cancelled { .. } => exception_type::CREATE_CANCELED,
            Self::Interrupted { .. } => exception_type::CREATE_INTERRUPTED,
            Self::Unknown { .. } => exception_type::CREATE_UNKNOWN,
            Self::PublicKeyDom { .. } => "CREATE_PUBLIC_KEY_DOM",
        }
    }
}

impl ProviderFailure for GetCredentialError {
    fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted {
            message: message.into(),
        }
    }

    fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    fn dom(dom_error: DomErrorKind, message: Option<String>) -> Self {
        Self::PublicKeyDom { dom_error, message }
    }

    fn from_exception_type(tag: Option<&str>) -> Self {
        match tag {
            Some(exception_type::GET_CANCELED) => {
                Self::cancelled("the user cancelled the provider UI")
            }
            Some(exception_type::GET_INTERRUPTED) => {
                Self::interrupted("the provider UI was interrupted")
            }
            Some(exception_type::GET_NO_CREDENTIALS) => Self::NoCredential {
                message: "the provider has no matching credential".to_string(),
            },
            Some(exception_type::GET_UNKNOWN) => {
                Self::unknown("the provider reported an unknown failure")
            }
            Some(other) => Self::unknown(format!("unrecognised provider failure: {other}")),
            None => Self::unknown("the provider reported a failure without a type"),
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::Cancelled { .. } => exception_type::GET_CANCELED,
            Self::Interrupted { .. } => exception_type::GET_INTERRUPTED,
            Self::NoCredential { .. } => exception_type::GET_NO_CREDENTIALS,
            Self::Unknown { .. } => exception_type::GET_UNKNOWN,
            Self::PublicKeyDom { .. } => "GET_PUBLIC_KEY_DOM",
        }
    }
}

/// Errors raised by a provider host while launching its UI.
#[derive(Debug, Error, uniffi::Error)]
pub enum HostError {
    /// The host cannot show provider UI right now.
    #[error("host unavailable: {0}")]
    Unavailable(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for HostError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

/// Errors raised while converting between domain and provider encodings.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The caller's request is structurally invalid for the operation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The caller supplied request JSON that is not valid for the operation.
    #[error("invalid request json: {0}")]
    InvalidRequestJson(String),

    /// A binary field was not valid base64url.
    #[error("invalid base64url in `{field}`: {reason}")]
    InvalidBase64 {
        /// The JSON field that failed to decode.
        field: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// CBOR encoding of a provider payload failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The provider returned bytes that do not decode to the expected shape.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Errors raised while loading a [`crate::ProviderConfig`].
#[derive(Debug, Error, uniffi::Error)]
pub enum ConfigError {
    /// The configuration is not valid JSON or has the wrong shape.
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// Parser message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some("CREATE_CANCELED"), "CREATE_CANCELED" ; "cancelled")]
    #[test_case(Some("CREATE_INTERRUPTED"), "CREATE_INTERRUPTED" ; "interrupted")]
    #[test_case(Some("CREATE_UNKNOWN"), "CREATE_UNKNOWN" ; "unknown")]
    #[test_case(Some("SOMETHING_NEW"), "CREATE_UNKNOWN" ; "unrecognised tag")]
    #[test_case(None, "CREATE_UNKNOWN" ; "missing tag")]
    fn test_create_exception_type_mapping(tag: Option<&str>, expected: &str) {
        let error = CreateCredentialError::from_exception_type(tag);
        assert_eq!(error.error_type(), expected);
    }

    #[test_case(Some("GET_CANCELED"), "GET_CANCELED" ; "cancelled")]
    #[test_case(Some("GET_INTERRUPTED"), "GET_INTERRUPTED" ; "interrupted")]
    #[test_case(Some("GET_NO_CREDENTIALS"), "GET_NO_CREDENTIALS" ; "no credentials")]
    #[test_case(Some("CREATE_CANCELED"), "GET_UNKNOWN" ; "create tag on get flow")]
    #[test_case(None, "GET_UNKNOWN" ; "missing tag")]
    fn test_get_exception_type_mapping(tag: Option<&str>, expected: &str) {
        let error = GetCredentialError::from_exception_type(tag);
        assert_eq!(error.error_type(), expected);
    }

    #[test]
    fn test_authenticator_codes_map_to_dom_names() {
        assert_eq!(
            DomErrorKind::from_authenticator_code(35).to_string(),
            "NotAllowedError"
        );
        assert_eq!(
            DomErrorKind::from_authenticator_code(11).to_string(),
            "InvalidStateError"
        );
        assert_eq!(
            DomErrorKind::from_authenticator_code(1000),
            DomErrorKind::Unknown
        );
        assert_eq!(
            "TimeoutError".parse::<DomErrorKind>().unwrap(),
            DomErrorKind::Timeout
        );
    }

    #[test]
    fn test_sync_account_failure_is_a_cancellation() {
        let error = CreateCredentialError::dom(
            DomErrorKind::Unknown,
            Some("Unable to get sync account".to_string()),
        );
        assert!(matches!(error, CreateCredentialError::Cancelled { .. }));

        let error = CreateCredentialError::dom(
            DomErrorKind::NotAllowed,
            Some("Unable to get sync account".to_string()),
        );
        assert!(matches!(
            error,
            CreateCredentialError::PublicKeyDom {
                dom_error: DomErrorKind::NotAllowed,
                ..
            }
        ));
    }
}
