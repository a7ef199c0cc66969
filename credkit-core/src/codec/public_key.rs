//! Passkey (`WebAuthn`) request options and credentials.
//!
//! Callers speak the `WebAuthn` JSON serialization (`PublicKeyCredentialCreationOptionsJSON`,
//! `RegistrationResponseJSON`, ...). The provider speaks the binary shapes below.

use serde::{Deserialize, Serialize};

use super::{b64url_decode, b64url_encode};
use crate::error::{CodecError, DomErrorKind};
use crate::request::CreatePublicKeyCredentialRequest;

// =============================================================================
// Provider shapes
// =============================================================================

/// Relying party of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpEntity {
    /// Relying party identifier (a registrable domain). Defaults to the caller's origin when absent.
    pub id: Option<String>,
    /// Human readable name.
    pub name: String,
}

/// Account the passkey is created for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntity {
    /// Opaque user handle.
    pub id: Vec<u8>,
    /// Account name.
    pub name: String,
    /// Display name.
    pub display_name: String,
}

/// One acceptable key type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialParameters {
    /// Always `public-key` today.
    pub credential_type: String,
    /// COSE algorithm identifier.
    pub algorithm: i64,
}

/// Reference to an existing credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    /// Always `public-key` today.
    pub credential_type: String,
    /// Credential id.
    pub id: Vec<u8>,
    /// Transport hints.
    pub transports: Option<Vec<String>>,
}

/// Authenticator requirements of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorSelection {
    /// `platform` or `cross-platform`.
    pub attachment: Option<String>,
    /// `discouraged`, `preferred` or `required`.
    pub resident_key: Option<String>,
    /// Legacy form of `resident_key == "required"`.
    pub require_resident_key: bool,
    /// `discouraged`, `preferred` or `required`.
    pub user_verification: Option<String>,
}

/// Provider request to register a passkey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationOptions {
    /// The relying party.
    pub rp: RpEntity,
    /// The account.
    pub user: UserEntity,
    /// Server challenge.
    pub challenge: Vec<u8>,
    /// Acceptable key types in preference order.
    pub parameters: Vec<CredentialParameters>,
    /// Timeout hint in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Credentials that must not be registered again.
    pub exclude_list: Vec<CredentialDescriptor>,
    /// Authenticator requirements.
    pub authenticator_selection: Option<AuthenticatorSelection>,
    /// Attestation conveyance preference.
    pub attestation: Option<String>,
}

/// Provider request to register a passkey, with caller preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// The parsed creation options.
    pub options: CreationOptions,
    /// Skip setup flows (e.g. screen lock enrollment) and fail instead.
    pub prefer_immediately_available_credentials: bool,
}

impl TryFrom<&CreatePublicKeyCredentialRequest> for RegistrationRequest {
    type Error = CodecError;

    fn try_from(request: &CreatePublicKeyCredentialRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            options: CreationOptions::from_json(&request.request_json)?,
            prefer_immediately_available_credentials: request
                .prefer_immediately_available_credentials,
        })
    }
}

/// Passkey part of a sign-in request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Server challenge.
    pub challenge: Vec<u8>,
    /// Relying party identifier.
    pub rp_id: String,
    /// Acceptable credentials; empty means any discoverable credential.
    pub allow_list: Vec<CredentialDescriptor>,
    /// Timeout hint in milliseconds.
    pub timeout_ms: Option<u64>,
    /// `discouraged`, `preferred` or `required`.
    pub user_verification: Option<String>,
}

/// Output of the `credProps` extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientExtensionResults {
    /// Whether the credential is discoverable, when the authenticator reports it.
    pub resident_key: Option<bool>,
}

/// Registration result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationResponse {
    /// Serialized client data.
    pub client_data_json: Vec<u8>,
    /// CBOR attestation object.
    pub attestation_object: Vec<u8>,
    /// Transports the authenticator supports.
    pub transports: Vec<String>,
}

/// Sign-in result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResponse {
    /// Serialized client data.
    pub client_data_json: Vec<u8>,
    /// Authenticator data.
    pub authenticator_data: Vec<u8>,
    /// Assertion signature.
    pub signature: Vec<u8>,
    /// User handle of a discoverable credential.
    pub user_handle: Option<Vec<u8>>,
}

/// Failure reported by the authenticator inside an otherwise successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// FIDO2 error code.
    pub error_code: u32,
    /// Optional diagnostic message.
    pub error_message: Option<String>,
}

/// The authenticator's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticatorResponse {
    /// A new credential was registered.
    Attestation(AttestationResponse),
    /// An existing credential signed a challenge.
    Assertion(AssertionResponse),
    /// The authenticator refused or failed.
    Error(ErrorResponse),
}

/// Provider response carrying a passkey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredential {
    /// Base64url credential id.
    pub id: String,
    /// Raw credential id.
    pub raw_id: Vec<u8>,
    /// Always `public-key` today.
    pub credential_type: String,
    /// The authenticator's answer.
    pub response: AuthenticatorResponse,
    /// `platform` or `cross-platform`.
    pub authenticator_attachment: Option<String>,
    /// Extension outputs.
    pub client_extension_results: Option<ClientExtensionResults>,
}

impl PublicKeyCredential {
    /// Returns the semantic failure carried by this credential, if any.
    #[must_use]
    pub fn error(&self) -> Option<(DomErrorKind, Option<String>)> {
        match &self.response {
            AuthenticatorResponse::Error(error) => Some((
                DomErrorKind::from_authenticator_code(error.error_code),
                error.error_message.clone(),
            )),
            _ => None,
        }
    }
}

// =============================================================================
// WebAuthn JSON in
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpJson {
    id: Option<String>,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserJson {
    id: String,
    name: String,
    display_name: String,
}

#[derive(Deserialize)]
struct ParametersJson {
    #[serde(rename = "type")]
    credential_type: String,
    alg: i64,
}

#[derive(Deserialize)]
struct DescriptorJson {
    #[serde(rename = "type")]
    credential_type: String,
    id: String,
    transports: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticatorSelectionJson {
    authenticator_attachment: Option<String>,
    resident_key: Option<String>,
    #[serde(default)]
    require_resident_key: bool,
    user_verification: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreationOptionsJson {
    rp: RpJson,
    user: UserJson,
    challenge: String,
    pub_key_cred_params: Vec<ParametersJson>,
    timeout: Option<u64>,
    #[serde(default)]
    exclude_credentials: Vec<DescriptorJson>,
    authenticator_selection: Option<AuthenticatorSelectionJson>,
    attestation: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestOptionsJson {
    challenge: String,
    rp_id: Option<String>,
    #[serde(default)]
    allow_credentials: Vec<DescriptorJson>,
    timeout: Option<u64>,
    user_verification: Option<String>,
}

fn descriptors(list: Vec<DescriptorJson>) -> Result<Vec<CredentialDescriptor>, CodecError> {
    list.into_iter()
        .map(|descriptor| {
            Ok(CredentialDescriptor {
                credential_type: descriptor.credential_type,
                id: b64url_decode("id", &descriptor.id)?,
                transports: descriptor.transports,
            })
        })
        .collect()
}

fn non_empty(field: &'static str, bytes: Vec<u8>) -> Result<Vec<u8>, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::InvalidRequestJson(format!("`{field}` must not be empty")));
    }
    Ok(bytes)
}

impl CreationOptions {
    /// Parses `PublicKeyCredentialCreationOptionsJSON`.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed, a binary field is not base64url, or the challenge
    /// or user id is empty.
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        let options: CreationOptionsJson = serde_json::from_str(json)
            .map_err(|err| CodecError::InvalidRequestJson(err.to_string()))?;

        Ok(Self {
            rp: RpEntity {
                id: options.rp.id,
                name: options.rp.name,
            },
            user: UserEntity {
                id: non_empty("user.id", b64url_decode("user.id", &options.user.id)?)?,
                name: options.user.name,
                display_name: options.user.display_name,
            },
            challenge: non_empty("challenge", b64url_decode("challenge", &options.challenge)?)?,
            parameters: options
                .pub_key_cred_params
                .into_iter()
                .map(|p| CredentialParameters {
                    credential_type: p.credential_type,
                    algorithm: p.alg,
                })
                .collect(),
            timeout_ms: options.timeout,
            exclude_list: descriptors(options.exclude_credentials)?,
            authenticator_selection: options.authenticator_selection.map(|s| {
                AuthenticatorSelection {
                    attachment: s.authenticator_attachment,
                    resident_key: s.resident_key,
                    require_resident_key: s.require_resident_key,
                    user_verification: s.user_verification,
                }
            }),
            attestation: options.attestation,
        })
    }
}

impl RequestOptions {
    /// Parses `PublicKeyCredentialRequestOptionsJSON`.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed, `rpId` is missing, or the challenge is empty or not
    /// base64url.
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        let options: RequestOptionsJson = serde_json::from_str(json)
            .map_err(|err| CodecError::InvalidRequestJson(err.to_string()))?;
        let rp_id = options
            .rp_id
            .ok_or_else(|| CodecError::InvalidRequestJson("missing field `rpId`".to_string()))?;

        Ok(Self {
            challenge: non_empty("challenge", b64url_decode("challenge", &options.challenge)?)?,
            rp_id,
            allow_list: descriptors(options.allow_credentials)?,
            timeout_ms: options.timeout,
            user_verification: options.user_verification,
        })
    }
}

// =============================================================================
// WebAuthn JSON out
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredPropsJson {
    rk: bool,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct ExtensionResultsJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    cred_props: Option<CredPropsJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttestationJson<'a> {
    #[serde(rename = "clientDataJSON")]
    client_data_json: String,
    attestation_object: String,
    transports: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssertionJson {
    #[serde(rename = "clientDataJSON")]
    client_data_json: String,
    authenticator_data: String,
    signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_handle: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialJson<'a, R> {
    id: &'a str,
    raw_id: String,
    #[serde(rename = "type")]
    credential_type: &'a str,
    response: R,
    #[serde(skip_serializing_if = "Option::is_none")]
    authenticator_attachment: Option<&'a str>,
    client_extension_results: ExtensionResultsJson,
}

impl PublicKeyCredential {
    fn to_json<R: Serialize>(&self, response: R) -> Result<String, CodecError> {
        let cred_props = self
            .client_extension_results
            .as_ref()
            .and_then(|results| results.resident_key)
            .map(|rk| CredPropsJson { rk });
        serde_json::to_string(&CredentialJson {
            id: &self.id,
            raw_id: b64url_encode(&self.raw_id),
            credential_type: &self.credential_type,
            response,
            authenticator_attachment: self.authenticator_attachment.as_deref(),
            client_extension_results: ExtensionResultsJson { cred_props },
        })
        .map_err(|err| CodecError::Serialization(err.to_string()))
    }

    /// Serializes a registration result as `RegistrationResponseJSON`.
    ///
    /// # Errors
    /// Returns [`CodecError::MalformedResponse`] if the credential does not carry an attestation.
    pub fn to_registration_json(&self) -> Result<String, CodecError> {
        let AuthenticatorResponse::Attestation(attestation) = &self.response else {
            return Err(CodecError::MalformedResponse(
                "expected an attestation response".to_string(),
            ));
        };
        self.to_json(AttestationJson {
            client_data_json: b64url_encode(&attestation.client_data_json),
            attestation_object: b64url_encode(&attestation.attestation_object),
            transports: &attestation.transports,
        })
    }

    /// Serializes a sign-in result as `AuthenticationResponseJSON`.
    ///
    /// # Errors
    /// Returns [`CodecError::MalformedResponse`] if the credential does not carry an assertion.
    pub fn to_authentication_json(&self) -> Result<String, CodecError> {
        let AuthenticatorResponse::Assertion(assertion) = &self.response else {
            return Err(CodecError::MalformedResponse(
                "expected an assertion response".to_string(),
            ));
        };
        self.to_json(AssertionJson {
            client_data_json: b64url_encode(&assertion.client_data_json),
            authenticator_data: b64url_encode(&assertion.authenticator_data),
            signature: b64url_encode(&assertion.signature),
            user_handle: assertion.user_handle.as_deref().map(b64url_encode),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const CREATION_JSON: &str = r#"{
        "rp": {"id": "example.com", "name": "Example"},
        "user": {"id": "dXNlci0x", "name": "alice", "displayName": "Alice"},
        "challenge": "AAECAwQF",
        "pubKeyCredParams": [{"type": "public-key", "alg": -7}, {"type": "public-key", "alg": -257}],
        "timeout": 60000,
        "excludeCredentials": [{"type": "public-key", "id": "qrvM", "transports": ["internal"]}],
        "authenticatorSelection": {"residentKey": "required", "userVerification": "preferred"},
        "attestation": "none"
    }"#;

    #[test]
    fn test_creation_options_from_json() {
        let options = CreationOptions::from_json(CREATION_JSON).unwrap();
        assert_eq!(options.rp.id.as_deref(), Some("example.com"));
        assert_eq!(options.user.id, b"user-1");
        assert_eq!(options.challenge, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(
            options.parameters.iter().map(|p| p.algorithm).collect::<Vec<_>>(),
            vec![-7, -257]
        );
        assert_eq!(options.exclude_list[0].id, vec![0xaa, 0xbb, 0xcc]);
        let selection = options.authenticator_selection.unwrap();
        assert_eq!(selection.resident_key.as_deref(), Some("required"));
        assert!(!selection.require_resident_key);
    }

    #[test]
    fn test_creation_options_rejects_bad_input() {
        assert!(matches!(
            CreationOptions::from_json("not json"),
            Err(CodecError::InvalidRequestJson(_))
        ));
        let missing_user = r#"{"rp": {"name": "x"}, "challenge": "AA", "pubKeyCredParams": []}"#;
        assert!(matches!(
            CreationOptions::from_json(missing_user),
            Err(CodecError::InvalidRequestJson(_))
        ));
        let empty_challenge = CREATION_JSON.replace("AAECAwQF", "");
        assert!(matches!(
            CreationOptions::from_json(&empty_challenge),
            Err(CodecError::InvalidRequestJson(_))
        ));
    }

    #[test]
    fn test_request_options_requires_rp_id() {
        let options =
            RequestOptions::from_json(r#"{"challenge": "AQID", "rpId": "example.com"}"#).unwrap();
        assert_eq!(options.challenge, vec![1, 2, 3]);
        assert!(options.allow_list.is_empty());

        assert!(matches!(
            RequestOptions::from_json(r#"{"challenge": "AQID"}"#),
            Err(CodecError::InvalidRequestJson(_))
        ));
    }

    fn credential(response: AuthenticatorResponse) -> PublicKeyCredential {
        PublicKeyCredential {
            id: "AQI".to_string(),
            raw_id: vec![1, 2],
            credential_type: "public-key".to_string(),
            response,
            authenticator_attachment: Some("platform".to_string()),
            client_extension_results: Some(ClientExtensionResults {
                resident_key: Some(true),
            }),
        }
    }

    #[test]
    fn test_registration_json() {
        let credential = credential(AuthenticatorResponse::Attestation(AttestationResponse {
            client_data_json: b"{}".to_vec(),
            attestation_object: vec![0xa0],
            transports: vec!["internal".to_string(), "hybrid".to_string()],
        }));
        let json: Value = serde_json::from_str(&credential.to_registration_json().unwrap()).unwrap();
        assert_eq!(
            json,
            json!({
                "id": "AQI",
                "rawId": "AQI",
                "type": "public-key",
                "response": {
                    "clientDataJSON": "e30",
                    "attestationObject": "oA",
                    "transports": ["internal", "hybrid"]
                },
                "authenticatorAttachment": "platform",
                "clientExtensionResults": {"credProps": {"rk": true}}
            })
        );
        assert!(credential.to_authentication_json().is_err());
    }

    #[test]
    fn test_authentication_json_without_user_handle() {
        let mut credential = credential(AuthenticatorResponse::Assertion(AssertionResponse {
            client_data_json: b"{}".to_vec(),
            authenticator_data: vec![1],
            signature: vec![2],
            user_handle: None,
        }));
        credential.client_extension_results = None;
        let json: Value =
            serde_json::from_str(&credential.to_authentication_json().unwrap()).unwrap();
        assert_eq!(json["response"]["signature"], "Ag");
        assert!(json["response"].get("userHandle").is_none());
        assert_eq!(json["clientExtensionResults"], json!({}));
    }

    #[test]
    fn test_error_response_is_semantic_error() {
        let credential = credential(AuthenticatorResponse::Error(ErrorResponse {
            error_code: 35,
            error_message: Some("user denied".to_string()),
        }));
        assert_eq!(
            credential.error(),
            Some((DomErrorKind::NotAllowed, Some("user denied".to_string())))
        );
    }
}
