#![warn(missing_docs)]
//! # ophtalm-app
//!
//! ## Purpose
//! Orchestrates image selection, upload and result interpretation for
//! `ophtalm`, and projects the session into display-ready text.
//!
//! ## Responsibilities
//! - Load configuration (endpoint, deadline) from env and flags.
//! - Drive one analysis session through [`UploadController`].
//! - Project session state into a flat [`SessionView`].
//!
//! ## Data flow
//! Image path -> [`load_image`] -> [`UploadController::select_file`] ->
//! preview -> [`UploadController::submit`] -> [`project_session_view`].
//!
//! ## Ownership and lifetimes
//! The controller owns the session; renderers only ever see `&Session`.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]; submission failures keep
//! their user-facing kind through [`AnalysisError::kind`].
//!
//! ## Security and privacy notes
//! Image bytes are never logged; plain-http remote endpoints are flagged by
//! [`AppConfig::is_insecure_remote`].

pub mod config;
pub mod controller;

use std::fmt;
use std::path::Path;

use ophtalm_contract::Severity;
use ophtalm_core::{CoreError, ImageFile};
use ophtalm_session::{Session, SessionPhase};
use ophtalm_upload::{HttpTransport, UploadClient, UploadError};
use thiserror::Error;

pub use config::{AppConfig, ConfigError};
pub use controller::{
    AnalysisError, ErrorKind, NO_IMAGE_MESSAGE, PreviewJob, RETRY_MESSAGE, ResolvedPreview,
    UploadController,
};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("OPHTALM_VERSION");

/// Text shown in place of the preview before one exists.
pub const PREVIEW_PLACEHOLDER: &str = "The image preview will appear here";

/// Disclaimer attached to every result.
pub const DISCLAIMER: &str = "This analysis is provided for information only. \
Please consult an ophthalmologist for an accurate diagnosis.";

/// Hint shown while there is neither a result nor a request in flight.
pub const HOW_IT_WORKS: &str = "The model analyses features of the eye to detect potential \
signs of glaucoma, such as optic nerve degeneration or increased intraocular pressure.";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Builds a controller talking HTTP to the configured endpoint.
///
/// # Errors
/// Returns [`AppError::Upload`] when the HTTP client or endpoint is invalid.
pub fn http_controller(config: &AppConfig) -> Result<UploadController<HttpTransport>, AppError> {
    let transport = HttpTransport::new(config.timeout)?;
    let client = UploadClient::new(&config.endpoint_base, config.timeout, transport)?;
    Ok(UploadController::new(client))
}

/// Reads an image from disk without blocking the runtime.
///
/// # Errors
/// Returns [`AppError::Image`] when the file cannot be read.
pub async fn load_image(path: impl AsRef<Path>) -> Result<ImageFile, AppError> {
    let path = path.as_ref();
    Ok(ImageFile::from_read(path, tokio::fs::read(path).await)?)
}

/// Display-ready projection of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Current phase.
    pub phase: SessionPhase,
    /// Whether the submit control is enabled.
    pub can_submit: bool,
    /// Whether a request is in flight.
    pub loading: bool,
    /// Preview data URI, or `None` while the placeholder is shown.
    pub preview: Option<String>,
    /// Error message.
    pub error: Option<String>,
    /// Result block, when a result is shown.
    pub result: Option<ResultView>,
    /// "How it works" hint, shown with no result and nothing loading.
    pub hint: Option<&'static str>,
}

/// Display-ready projection of one result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    /// Headline sentence.
    pub headline: &'static str,
    /// Confidence with two decimals and a percent sign.
    pub confidence: String,
    /// Severity tier, only when glaucoma was detected.
    pub severity: Option<Severity>,
    /// Filled state of the mild/moderate/severe meter segments.
    pub severity_meter: [bool; 3],
    /// Whether to point the user to a specialist.
    pub refer_to_specialist: bool,
    /// Disclaimer text.
    pub disclaimer: &'static str,
}

/// Projects session state into a flat view.
pub fn project_session_view(session: &Session) -> SessionView {
    let result = session.result().map(|result| {
        let severity = result.has_glaucoma().then(|| result.severity());
        let filled = result.severity().filled_segments();
        ResultView {
            headline: if result.has_glaucoma() {
                "Signs of glaucoma detected"
            } else {
                "No signs of glaucoma detected"
            },
            confidence: format!("{}%", result.confidence_text()),
            severity,
            severity_meter: [filled >= 1, filled >= 2, filled >= 3],
            refer_to_specialist: result.has_glaucoma(),
            disclaimer: DISCLAIMER,
        }
    });

    SessionView {
        phase: session.phase(),
        can_submit: session.can_submit(),
        loading: session.is_loading(),
        preview: session.preview().map(|preview| preview.as_str().to_string()),
        error: session.error().map(str::to_string),
        hint: (result.is_none() && !session.is_loading()).then_some(HOW_IT_WORKS),
        result,
    }
}

impl fmt::Display for SessionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.preview {
            Some(preview) => writeln!(f, "Preview: {} characters", preview.len())?,
            None => writeln!(f, "Preview: {PREVIEW_PLACEHOLDER}")?,
        }
        if self.loading {
            writeln!(f, "Analysing...")?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "Error: {error}")?;
        }
        if let Some(result) = &self.result {
            writeln!(f, "{}", result.headline)?;
            writeln!(f, "Confidence: {}", result.confidence)?;
            if let Some(severity) = result.severity {
                let meter: String = result
                    .severity_meter
                    .iter()
                    .map(|filled| if *filled { '#' } else { '-' })
                    .collect();
                writeln!(f, "Estimated severity: {} [{meter}]", severity.label())?;
            }
            writeln!(f, "{}", result.disclaimer)?;
            if result.refer_to_specialist {
                writeln!(f, "Find a specialist near you.")?;
            }
        }
        if let Some(hint) = self.hint {
            writeln!(f, "{hint}")?;
        }
        Ok(())
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Image could not be loaded.
    #[error("image error: {0}")]
    Image(#[from] CoreError),
    /// Upload client could not be built.
    #[error("upload setup error: {0}")]
    Upload(#[from] UploadError),
    /// Submission failed.
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),
}
