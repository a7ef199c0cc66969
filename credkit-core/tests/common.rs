#![allow(dead_code, missing_docs)]

//! Common test utilities shared across integration tests.

use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use credkit_core::codec::public_key::{
    AssertionResponse, AttestationResponse, AuthenticatorResponse, ClientExtensionResults,
    ErrorResponse, PublicKeyCredential,
};
use credkit_core::{
    CallbackTask, CreateCredentialCallback, CreateCredentialError, CreateCredentialResponse,
    Executor, GetCredentialCallback, GetCredentialError, GetCredentialResponse, HostError,
    ProviderHost, ProviderLaunch, ProviderResultMessage, ProviderResultReceiver,
    RESULT_CANCELED, RESULT_OK,
};

/// A provider host that records launches and lets the test answer them.
pub struct RecordingHost {
    id: String,
    refuse: bool,
    launches: Mutex<Vec<(ProviderLaunch, Arc<ProviderResultReceiver>)>>,
    dismissed: Mutex<Vec<u32>>,
}

impl RecordingHost {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            refuse: false,
            launches: Mutex::new(Vec::new()),
            dismissed: Mutex::new(Vec::new()),
        })
    }

    /// A host whose `launch` always fails.
    pub fn refusing(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            refuse: true,
            launches: Mutex::new(Vec::new()),
            dismissed: Mutex::new(Vec::new()),
        })
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    pub fn launch(&self, index: usize) -> ProviderLaunch {
        self.launches.lock().unwrap()[index].0.clone()
    }

    pub fn dismissed(&self) -> Vec<u32> {
        self.dismissed.lock().unwrap().clone()
    }

    /// Delivers a raw result for the `index`-th launch, echoing `request_code`.
    pub fn reply_with_code(
        &self,
        index: usize,
        request_code: u32,
        result_code: i32,
        failure: bool,
        exception_type: Option<&str>,
        data: Option<Vec<u8>>,
    ) -> bool {
        let receiver = Arc::clone(&self.launches.lock().unwrap()[index].1);
        receiver.on_receive_result(
            result_code,
            ProviderResultMessage {
                failure,
                exception_type: exception_type.map(str::to_string),
                request_code,
                data,
            },
        )
    }

    pub fn succeed(&self, index: usize, data: Option<Vec<u8>>) -> bool {
        let code = self.launch(index).request_code;
        self.reply_with_code(index, code, RESULT_OK, false, None, data)
    }

    pub fn user_cancel(&self, index: usize) -> bool {
        let code = self.launch(index).request_code;
        self.reply_with_code(index, code, RESULT_CANCELED, false, None, None)
    }

    pub fn fail(&self, index: usize, exception_type: &str) -> bool {
        let code = self.launch(index).request_code;
        self.reply_with_code(index, code, RESULT_OK, true, Some(exception_type), None)
    }
}

impl ProviderHost for RecordingHost {
    fn host_id(&self) -> String {
        self.id.clone()
    }

    fn launch(
        &self,
        launch: ProviderLaunch,
        receiver: Arc<ProviderResultReceiver>,
    ) -> Result<(), HostError> {
        if self.refuse {
            return Err(HostError::Unavailable("no activity".to_string()));
        }
        self.launches.lock().unwrap().push((launch, receiver));
        Ok(())
    }

    fn dismiss(&self, request_code: u32) {
        self.dismissed.lock().unwrap().push(request_code);
    }
}

/// An executor that queues tasks until the test runs them.
#[derive(Default)]
pub struct QueueingExecutor {
    tasks: Mutex<Vec<Arc<CallbackTask>>>,
}

impl QueueingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queued(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Runs every queued task on the calling thread and returns how many ran.
    pub fn run_all(&self) -> usize {
        let tasks: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
        for task in &tasks {
            task.run();
        }
        tasks.len()
    }
}

impl Executor for QueueingExecutor {
    fn execute(&self, task: Arc<CallbackTask>) {
        self.tasks.lock().unwrap().push(task);
    }
}

/// Records every outcome delivered to it and the thread it was delivered on.
pub struct Recorder<R, E> {
    outcomes: Mutex<Vec<(Result<R, E>, ThreadId)>>,
}

impl<R: Clone, E: Clone> Recorder<R, E> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, outcome: Result<R, E>) {
        self.outcomes
            .lock()
            .unwrap()
            .push((outcome, thread::current().id()));
    }

    pub fn count(&self) -> usize {
        self.outcomes.lock().unwrap().len()
    }

    pub fn outcomes(&self) -> Vec<Result<R, E>> {
        self.outcomes
            .lock()
            .unwrap()
            .iter()
            .map(|(outcome, _)| outcome.clone())
            .collect()
    }

    pub fn threads(&self) -> Vec<ThreadId> {
        self.outcomes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, thread)| *thread)
            .collect()
    }

    /// The single outcome delivered so far.
    pub fn only(&self) -> Result<R, E> {
        let outcomes = self.outcomes();
        assert_eq!(outcomes.len(), 1, "expected exactly one outcome");
        outcomes.into_iter().next().unwrap()
    }
}

pub type CreateRecorder = Recorder<CreateCredentialResponse, CreateCredentialError>;
pub type GetRecorder = Recorder<GetCredentialResponse, GetCredentialError>;

impl CreateCredentialCallback for CreateRecorder {
    fn on_result(&self, response: CreateCredentialResponse) {
        self.record(Ok(response));
    }

    fn on_error(&self, error: CreateCredentialError) {
        self.record(Err(error));
    }
}

impl GetCredentialCallback for GetRecorder {
    fn on_result(&self, response: GetCredentialResponse) {
        self.record(Ok(response));
    }

    fn on_error(&self, error: GetCredentialError) {
        self.record(Err(error));
    }
}

pub const CREATION_JSON: &str = r#"{
    "rp": {"id": "example.com", "name": "Example"},
    "user": {"id": "dXNlci0x", "name": "alice", "displayName": "Alice"},
    "challenge": "AAECAwQF",
    "pubKeyCredParams": [{"type": "public-key", "alg": -7}],
    "authenticatorSelection": {"residentKey": "required"}
}"#;

pub const REQUEST_JSON: &str = r#"{"challenge": "AAECAwQF", "rpId": "example.com"}"#;

pub fn cbor<T: serde::Serialize>(value: &T) -> Vec<u8> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).unwrap();
    bytes
}

fn credential(response: AuthenticatorResponse) -> PublicKeyCredential {
    PublicKeyCredential {
        id: "AQID".to_string(),
        raw_id: vec![1, 2, 3],
        credential_type: "public-key".to_string(),
        response,
        authenticator_attachment: Some("platform".to_string()),
        client_extension_results: Some(ClientExtensionResults {
            resident_key: Some(true),
        }),
    }
}

pub fn attestation_credential() -> PublicKeyCredential {
    credential(AuthenticatorResponse::Attestation(AttestationResponse {
        client_data_json: br#"{"type":"webauthn.create"}"#.to_vec(),
        attestation_object: vec![0xa0],
        transports: vec!["internal".to_string()],
    }))
}

pub fn assertion_credential() -> PublicKeyCredential {
    credential(AuthenticatorResponse::Assertion(AssertionResponse {
        client_data_json: br#"{"type":"webauthn.get"}"#.to_vec(),
        authenticator_data: vec![0; 37],
        signature: vec![0x30, 0x00],
        user_handle: Some(b"alice".to_vec()),
    }))
}

pub fn authenticator_error(error_code: u32, message: &str) -> PublicKeyCredential {
    credential(AuthenticatorResponse::Error(ErrorResponse {
        error_code,
        error_message: Some(message.to_string()),
    }))
}
