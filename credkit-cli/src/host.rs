//! A provider host that answers from a script instead of showing UI.

use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ciborium::Value;
use credkit_core::codec::{
    self,
    password::{SavePasswordRequest, SignInPassword},
    public_key::{
        AssertionResponse, AttestationResponse, AuthenticatorResponse, ClientExtensionResults,
        ErrorResponse, PublicKeyCredential, RegistrationRequest,
    },
    sign_in::{BeginSignInRequest, SignInCredential},
};
use credkit_core::{
    HostError, ProviderHost, ProviderLaunch, ProviderOperation, ProviderResultMessage,
    ProviderResultReceiver, RESULT_CANCELED, RESULT_OK,
};

pub const HOST_ID: &str = "credkit-cli";

const CREDENTIAL_ID: &[u8] = b"credkit-demo-key";
const DEMO_USER: &str = "demo-user";
const DEMO_PASSWORD: &str = "demo-password";

/// How the scripted provider answers a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Cancel,
    Error(String),
    Dom(u32),
    Garbage,
    Silent,
    Refuse,
}

impl FromStr for Reply {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "cancel" => Ok(Self::Cancel),
            "garbage" => Ok(Self::Garbage),
            "silent" => Ok(Self::Silent),
            "refuse" => Ok(Self::Refuse),
            other => {
                if let Some(tag) = other.strip_prefix("error:") {
                    Ok(Self::Error(tag.to_string()))
                } else if let Some(code) = other.strip_prefix("dom:") {
                    code.parse()
                        .map(Self::Dom)
                        .map_err(|err| format!("invalid authenticator code `{code}`: {err}"))
                } else {
                    Err(format!(
                        "unknown reply `{other}` (expected ok, cancel, error:<TAG>, dom:<CODE>, garbage, silent or refuse)"
                    ))
                }
            }
        }
    }
}

pub struct ScriptedHost {
    reply: Reply,
    delay: Duration,
}

impl ScriptedHost {
    pub const fn new(reply: Reply, delay: Duration) -> Self {
        Self { reply, delay }
    }

    /// The scripted result for `launch`, or `None` if the host never answers.
    fn answer(
        &self,
        launch: &ProviderLaunch,
    ) -> Result<Option<(i32, ProviderResultMessage)>, HostError> {
        let message = |failure, exception_type, data| ProviderResultMessage {
            failure,
            exception_type,
            request_code: launch.request_code,
            data,
        };
        let answer = match &self.reply {
            Reply::Ok => (RESULT_OK, message(false, None, success_payload(launch)?)),
            Reply::Cancel => (RESULT_CANCELED, message(false, None, None)),
            Reply::Error(tag) => (RESULT_OK, message(true, Some(tag.clone()), None)),
            Reply::Dom(code) => (
                RESULT_OK,
                message(false, None, authenticator_error(launch.operation, *code)?),
            ),
            Reply::Garbage => (RESULT_OK, message(false, None, Some(vec![0xff, 0x00, 0x13]))),
            Reply::Silent => return Ok(None),
            Reply::Refuse => {
                return Err(HostError::Unavailable(
                    "scripted host refuses to show UI".to_string(),
                ))
            }
        };
        Ok(Some(answer))
    }
}

impl ProviderHost for ScriptedHost {
    fn host_id(&self) -> String {
        HOST_ID.to_string()
    }

    fn launch(
        &self,
        launch: ProviderLaunch,
        receiver: Arc<ProviderResultReceiver>,
    ) -> Result<(), HostError> {
        tracing::info!(
            operation = ?launch.operation,
            request_code = launch.request_code,
            payload_bytes = launch.payload.len(),
            "provider UI launched"
        );
        let Some((result_code, message)) = self.answer(&launch)? else {
            return Ok(());
        };
        let delay = self.delay;
        // Answer from another thread, the way a UI host delivers activity results.
        thread::spawn(move || {
            thread::sleep(delay);
            let accepted = receiver.on_receive_result(result_code, message);
            tracing::debug!(accepted, "scripted reply delivered");
        });
        Ok(())
    }

    fn dismiss(&self, request_code: u32) {
        tracing::info!(request_code, "provider UI dismissed");
    }
}

fn invalid_payload(err: impl std::fmt::Display) -> HostError {
    HostError::Unavailable(format!("cannot read launch payload: {err}"))
}

fn to_cbor<T: serde::Serialize>(value: &T) -> Result<Option<Vec<u8>>, HostError> {
    codec::to_cbor(value).map(Some).map_err(invalid_payload)
}

fn client_data(kind: &str, challenge: &[u8], rp_id: &str) -> Vec<u8> {
    serde_json::json!({
        "type": kind,
        "challenge": URL_SAFE_NO_PAD.encode(challenge),
        "origin": format!("https://{rp_id}"),
    })
    .to_string()
    .into_bytes()
}

fn credential(response: AuthenticatorResponse) -> PublicKeyCredential {
    PublicKeyCredential {
        id: URL_SAFE_NO_PAD.encode(CREDENTIAL_ID),
        raw_id: CREDENTIAL_ID.to_vec(),
        credential_type: "public-key".to_string(),
        response,
        authenticator_attachment: Some("platform".to_string()),
        client_extension_results: Some(ClientExtensionResults {
            resident_key: Some(true),
        }),
    }
}

fn success_payload(launch: &ProviderLaunch) -> Result<Option<Vec<u8>>, HostError> {
    match launch.operation {
        ProviderOperation::CreatePassword => {
            let request: SavePasswordRequest =
                codec::from_cbor(&launch.payload).map_err(invalid_payload)?;
            tracing::info!(id = %request.sign_in_password.id, "saving password");
            Ok(None)
        }
        ProviderOperation::CreatePublicKeyCredential => {
            let request: RegistrationRequest =
                codec::from_cbor(&launch.payload).map_err(invalid_payload)?;
            let rp_id = request.options.rp.id.unwrap_or_else(|| "localhost".to_string());
            let mut attestation_object = Vec::new();
            ciborium::ser::into_writer(
                &Value::Map(vec![
                    (Value::Text("fmt".into()), Value::Text("none".into())),
                    (Value::Text("attStmt".into()), Value::Map(vec![])),
                    (Value::Text("authData".into()), Value::Bytes(vec![0; 37])),
                ]),
                &mut attestation_object,
            )
            .map_err(invalid_payload)?;
            to_cbor(&credential(AuthenticatorResponse::Attestation(
                AttestationResponse {
                    client_data_json: client_data(
                        "webauthn.create",
                        &request.options.challenge,
                        &rp_id,
                    ),
                    attestation_object,
                    transports: vec!["internal".to_string(), "hybrid".to_string()],
                },
            )))
        }
        ProviderOperation::BeginSignIn => {
            let request: BeginSignInRequest =
                codec::from_cbor(&launch.payload).map_err(invalid_payload)?;
            let credential = match request.passkey_options {
                Some(options) => SignInCredential::PublicKeyCredential(credential(
                    AuthenticatorResponse::Assertion(AssertionResponse {
                        client_data_json: client_data(
                            "webauthn.get",
                            &options.challenge,
                            &options.rp_id,
                        ),
                        authenticator_data: vec![0; 37],
                        signature: vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01],
                        user_handle: Some(DEMO_USER.as_bytes().to_vec()),
                    }),
                )),
                None => SignInCredential::Password(SignInPassword {
                    id: DEMO_USER.to_string(),
                    password: DEMO_PASSWORD.to_string(),
                }),
            };
            to_cbor(&credential)
        }
    }
}

fn authenticator_error(
    operation: ProviderOperation,
    error_code: u32,
) -> Result<Option<Vec<u8>>, HostError> {
    let credential = credential(AuthenticatorResponse::Error(ErrorResponse {
        error_code,
        error_message: Some(format!("scripted authenticator error {error_code}")),
    }));
    match operation {
        ProviderOperation::BeginSignIn => {
            to_cbor(&SignInCredential::PublicKeyCredential(credential))
        }
        ProviderOperation::CreatePassword | ProviderOperation::CreatePublicKeyCredential => {
            to_cbor(&credential)
        }
    }
}
