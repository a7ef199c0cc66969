//! Password save request.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::request::CreatePasswordRequest;

/// A username/password pair in provider form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInPassword {
    /// Account identifier.
    pub id: String,
    /// The password.
    pub password: String,
}

/// Provider request to save a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePasswordRequest {
    /// The credential to save.
    pub sign_in_password: SignInPassword,
}

impl TryFrom<&CreatePasswordRequest> for SavePasswordRequest {
    type Error = CodecError;

    fn try_from(request: &CreatePasswordRequest) -> Result<Self, Self::Error> {
        if request.password.is_empty() {
            return Err(CodecError::InvalidRequest(
                "password must not be empty".to_string(),
            ));
        }
        Ok(Self {
            sign_in_password: SignInPassword {
                id: request.id.clone(),
                password: request.password.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_password_is_rejected() {
        let request = CreatePasswordRequest {
            id: "alice".to_string(),
            password: String::new(),
        };
        assert!(matches!(
            SavePasswordRequest::try_from(&request),
            Err(CodecError::InvalidRequest(_))
        ));
    }
}
