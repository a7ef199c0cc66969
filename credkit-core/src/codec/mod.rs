//! Provider-native request/response shapes and their encodings.
//!
//! Payloads exchanged with the provider host are CBOR. Passkey requests and responses are exchanged
//! with callers as `WebAuthn` JSON, with binary fields in unpadded base64url.

pub mod password;
pub mod public_key;
pub mod sign_in;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::CodecError;

/// Encodes a provider payload as CBOR.
///
/// # Errors
/// Returns [`CodecError::Serialization`] if the value cannot be encoded.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)
        .map_err(|err| CodecError::Serialization(err.to_string()))?;
    Ok(bytes)
}

/// Decodes a provider payload from CBOR.
///
/// # Errors
/// Returns [`CodecError::MalformedResponse`] if the bytes do not decode to `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    ciborium::de::from_reader(bytes).map_err(|err| CodecError::MalformedResponse(err.to_string()))
}

pub(crate) fn b64url_decode(field: &'static str, value: &str) -> Result<Vec<u8>, CodecError> {
    // Relying parties are inconsistent about padding.
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|err| CodecError::InvalidBase64 {
            field,
            reason: err.to_string(),
        })
}

pub(crate) fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
