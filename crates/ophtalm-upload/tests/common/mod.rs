//! Shared fixtures for upload integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ophtalm_core::ImageFile;
use ophtalm_upload::{TransportResponse, UploadError, UploadRequest, UploadTransport};

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
pub fn fixture_image() -> Arc<ImageFile> {
    Arc::new(ImageFile::new("fundus.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]))
}
