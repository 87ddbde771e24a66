//! Upload controller: the single writer of the analysis [`Session`].
//!
//! Selection clears the previous outcome synchronously and hands back a
//! [`PreviewJob`] that resolves on its own schedule. Submission holds the
//! session in the pending phase for the whole round trip; dropping the
//! submit future settles the session as errored instead of leaving it
//! loading.

use std::sync::Arc;

use log::{info, warn};
use ophtalm_contract::{AnalysisResult, interpret};
use ophtalm_core::{ImageFile, PreviewData};
use ophtalm_session::{SelectionTicket, Session, SessionError};
use ophtalm_upload::{FailureClass, UploadClient, UploadError, UploadTransport, classify_upload_error};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Message shown when submit is requested without an image.
pub const NO_IMAGE_MESSAGE: &str = "Please select an image of the eye.";

/// Message shown for every network or request failure.
pub const RETRY_MESSAGE: &str = "An error occurred during the analysis. Please try again.";

/// User-facing error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Submit without a selected image.
    Validation,
    /// Transport failure, deadline or abort.
    Network,
    /// Non-2xx status or unusable response body.
    Request,
    /// Submit while another submission is in flight.
    InFlight,
}

/// Errors returned by [`UploadController::submit`].
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No image is selected.
    #[error("validation error: {0}")]
    Validation(SessionError),
    /// Another submission is still running; session left untouched.
    #[error("submission refused: {0}")]
    InFlight(SessionError),
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(UploadError),
    /// The endpoint answered without a usable prediction.
    #[error("request error: {0}")]
    Request(UploadError),
}

impl AnalysisError {
    /// User-facing kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Validation(_) => ErrorKind::Validation,
            AnalysisError::InFlight(_) => ErrorKind::InFlight,
            AnalysisError::Network(_) => ErrorKind::Network,
            AnalysisError::Request(_) => ErrorKind::Request,
        }
    }

    /// HTTP status carried by a request error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AnalysisError::Request(error) => error.status_code(),
            _ => None,
        }
    }
}

impl From<UploadError> for AnalysisError {
    fn from(error: UploadError) -> Self {
        match classify_upload_error(&error) {
            FailureClass::Network => AnalysisError::Network(error),
            FailureClass::Request => AnalysisError::Request(error),
        }
    }
}

/// Pending preview for one selection.
#[derive(Debug, Clone)]
pub struct PreviewJob {
    ticket: SelectionTicket,
    file: Arc<ImageFile>,
}

impl PreviewJob {
    /// Encodes the preview after yielding to the runtime once.
    pub async fn run(self) -> ResolvedPreview {
        tokio::task::yield_now().await;
        ResolvedPreview {
            ticket: self.ticket,
            preview: PreviewData::encode(&self.file),
        }
    }
}

/// Preview ready to be applied to the session.
#[derive(Debug, Clone)]
pub struct ResolvedPreview {
    ticket: SelectionTicket,
    preview: PreviewData,
}

impl ResolvedPreview {
    /// Encoded data URI.
    pub fn preview(&self) -> &PreviewData {
        &self.preview
    }
}

/// Owns the session and the upload client.
#[derive(Debug)]
pub struct UploadController<T> {
    session: Session,
    client: UploadClient<T>,
    abort: CancellationToken,
}

impl<T: UploadTransport> UploadController<T> {
    /// Creates a controller with an idle session.
    pub fn new(client: UploadClient<T>) -> Self {
        Self {
            session: Session::new(),
            client,
            abort: CancellationToken::new(),
        }
    }

    /// Read-only view of the session for rendering.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Upload client in use.
    pub fn client(&self) -> &UploadClient<T> {
        &self.client
    }

    /// Handle that aborts the in-flight submission.
    ///
    /// The handle is renewed after a submission is aborted. A handle
    /// cancelled while idle aborts the next submission.
    pub fn abort_handle(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Replaces the selected image; result and error are cleared before this
    /// returns.
    pub fn select_file(&mut self, file: ImageFile) -> PreviewJob {
        let file = Arc::new(file);
        info!(
            target: "session",
            "select: name={} bytes={} content_type={}",
            file.name(),
            file.len(),
            file.content_type()
        );
        let ticket = self.session.select_file(Arc::clone(&file));
        PreviewJob { ticket, file }
    }

    /// Applies a resolved preview; returns `false` when it was stale.
    pub fn apply_preview(&mut self, resolved: ResolvedPreview) -> bool {
        let applied = self.session.apply_preview(resolved.ticket, resolved.preview);
        if !applied {
            info!(target: "session", "preview discarded: selection replaced");
        }
        applied
    }

    /// Selects an image and waits for its preview.
    pub async fn select_and_preview(&mut self, file: ImageFile) -> bool {
        let job = self.select_file(file);
        let resolved = job.run().await;
        self.apply_preview(resolved)
    }

    /// Uploads the selected image and stores the interpreted result.
    ///
    /// # Errors
    /// - [`AnalysisError::Validation`] when no image is selected; no request
    ///   is sent and the session shows [`NO_IMAGE_MESSAGE`].
    /// - [`AnalysisError::InFlight`] while a submission is pending.
    /// - [`AnalysisError::Network`] / [`AnalysisError::Request`] on upload
    ///   failure; the session shows [`RETRY_MESSAGE`].
    pub async fn submit(&mut self) -> Result<AnalysisResult, AnalysisError> {
        let file = match self.session.begin_submit() {
            Ok(file) => file,
            Err(SessionError::NoImageSelected) => {
                warn!(target: "session", "submit rejected: no image selected");
                self.session.fail(NO_IMAGE_MESSAGE);
                return Err(AnalysisError::Validation(SessionError::NoImageSelected));
            }
            Err(error @ SessionError::SubmissionInFlight) => {
                warn!(target: "session", "submit rejected: submission in flight");
                return Err(AnalysisError::InFlight(error));
            }
        };

        let mut pending = Pending {
            session: &mut self.session,
            settled: false,
        };
        let outcome = match self.client.upload(file, &self.abort).await {
            Ok(report) => {
                let result = interpret(&report.prediction);
                info!(
                    target: "session",
                    "result: has_glaucoma={} confidence={} severity={}",
                    result.has_glaucoma(),
                    result.confidence_text(),
                    result.severity().level()
                );
                pending.complete(result.clone());
                Ok(result)
            }
            Err(error) => {
                let error = AnalysisError::from(error);
                warn!(target: "session", "submit failed: {error}");
                pending.fail(RETRY_MESSAGE);
                Err(error)
            }
        };
        drop(pending);

        if self.abort.is_cancelled() {
            self.abort = CancellationToken::new();
        }
        outcome
    }
}

/// Keeps the session pending until settled; settles it as errored on drop.
struct Pending<'a> {
    session: &'a mut Session,
    settled: bool,
}

impl Pending<'_> {
    fn complete(&mut self, result: AnalysisResult) {
        self.session.complete(result);
        self.settled = true;
    }

    fn fail(&mut self, message: &str) {
        self.session.fail(message);
        self.settled = true;
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(target: "session", "submission dropped before completion");
            self.session.fail(RETRY_MESSAGE);
        }
    }
}
