//! Shared fixtures for app integration tests.

use std::sync::Mutex;
use std::time::Duration;

use ophtalm_app::UploadController;
use ophtalm_core::ImageFile;
use ophtalm_upload::{TransportResponse, UploadClient, UploadError, UploadRequest, UploadTransport};

/// Scripted transport outcome.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Script {
    /// Answer with status and body.
    Respond(u16, Vec<u8>),
    /// Fail with a transport error.
    Fail(String),
    /// Never answer.
    Hang,
}

/// In-memory transport that records requests and replays one script.
#[allow(dead_code)]
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Script,
    delay: Duration,
    requests: Mutex<Vec<UploadRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn delayed(script: Script, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(script)
        }
    }

    pub fn requests(&self) -> Vec<UploadRequest> {
        self.requests.lock().expect("request log lock should work").clone()
    }
}

impl UploadTransport for ScriptedTransport {
    async fn send(&self, request: &UploadRequest) -> Result<TransportResponse, UploadError> {
        self.requests
            .lock()
            .expect("request log lock should work")
            .push(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.script {
            Script::Respond(status, body) => Ok(TransportResponse {
                status: *status,
                body: body.clone(),
            }),
            Script::Fail(message) => Err(UploadError::Transport(message.clone())),
            Script::Hang => std::future::pending().await,
        }
    }
}

/// Creates a small deterministic fundus image fixture.
#[allow(dead_code)]
pub fn fixture_image(name: &str) -> ImageFile {
    ImageFile::new(name, vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
}

/// Creates a controller whose endpoint replays `script`.
#[allow(dead_code)]
pub fn controller(script: Script) -> UploadController<ScriptedTransport> {
    controller_with(ScriptedTransport::new(script), Duration::from_secs(5))
}

/// Creates a controller over a custom transport and deadline.
#[allow(dead_code)]
pub fn controller_with(
    transport: ScriptedTransport,
    timeout: Duration,
) -> UploadController<ScriptedTransport> {
    let client = UploadClient::new("http://localhost:8000", timeout, transport)
        .expect("upload client should build");
    UploadController::new(client)
}

/// Encodes a prediction response body.
#[allow(dead_code)]
pub fn prediction_body(value: f64) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "prediction_value": value,
        "prediction": value,
    }))
    .expect("fixture body should encode")
}
