#![warn(missing_docs)]
//! # ophtalm-session
//!
//! ## Purpose
//! Defines the state of one analysis session: selected image, preview,
//! in-flight flag, result and error.
//!
//! ## Responsibilities
//! - Hold session state behind read-only accessors.
//! - Expose the legal transitions (select, preview, begin, complete, fail).
//! - Derive the session phase used by renderers.
//! - Refuse a second submission while one is in flight.
//!
//! ## Data flow
//! The upload controller owns the only `&mut Session` and applies
//! transitions. Renderers receive `&Session` and read accessors only.
//!
//! ## Ownership and lifetimes
//! The selected image is held as `Arc<ImageFile>` so an in-flight upload or
//! preview job can keep the bytes alive without borrowing the session.
//!
//! ## Error model
//! Illegal transitions return [`SessionError`] and leave state untouched.
//!
//! ## Invariants
//! - `preview` is present iff an image is selected and its preview for the
//!   current selection has resolved.
//! - `error` and `result` are never both set.
//! - `result` is cleared whenever a new image is selected.

use std::sync::Arc;

use ophtalm_contract::AnalysisResult;
use ophtalm_core::{ImageFile, PreviewData};
use thiserror::Error;

/// Lifecycle phase derived from session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing selected yet.
    Idle,
    /// An image is selected and no outcome is shown.
    Ready,
    /// A submission is in flight.
    Pending,
    /// A result is shown.
    Displayed,
    /// An error is shown.
    Errored,
}

/// Identifies one selection so late previews of replaced images are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTicket(u64);

/// State of one analysis session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    selected_file: Option<Arc<ImageFile>>,
    preview: Option<PreviewData>,
    is_loading: bool,
    error: Option<String>,
    result: Option<AnalysisResult>,
    selection: u64,
}

impl Session {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected image.
    pub fn selected_file(&self) -> Option<&Arc<ImageFile>> {
        self.selected_file.as_ref()
    }

    /// Preview of the current selection, once resolved.
    pub fn preview(&self) -> Option<&PreviewData> {
        self.preview.as_ref()
    }

    /// Whether a submission is in flight.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Human-readable error message.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Result of the last successful submission.
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Returns `true` when a submission may start.
    pub fn can_submit(&self) -> bool {
        self.selected_file.is_some() && !self.is_loading
    }

    /// Derives the current phase.
    pub fn phase(&self) -> SessionPhase {
        if self.is_loading {
            SessionPhase::Pending
        } else if self.error.is_some() {
            SessionPhase::Errored
        } else if self.result.is_some() {
            SessionPhase::Displayed
        } else if self.selected_file.is_some() {
            SessionPhase::Ready
        } else {
            SessionPhase::Idle
        }
    }

    /// Replaces the selection and clears preview, result and error.
    ///
    /// The returned ticket must accompany the preview for this selection.
    pub fn select_file(&mut self, file: Arc<ImageFile>) -> SelectionTicket {
        self.selection = self.selection.wrapping_add(1);
        self.selected_file = Some(file);
        self.preview = None;
        self.result = None;
        self.error = None;
        SelectionTicket(self.selection)
    }

    /// Stores a resolved preview.
    ///
    /// Returns `false` and discards the preview when the ticket belongs to a
    /// selection that has since been replaced.
    pub fn apply_preview(&mut self, ticket: SelectionTicket, preview: PreviewData) -> bool {
        if ticket.0 != self.selection || self.selected_file.is_none() {
            return false;
        }
        self.preview = Some(preview);
        true
    }

    /// Enters the pending phase and returns the image to upload.
    ///
    /// # Errors
    /// Returns [`SessionError::NoImageSelected`] when nothing is selected and
    /// [`SessionError::SubmissionInFlight`] while another submission runs.
    pub fn begin_submit(&mut self) -> Result<Arc<ImageFile>, SessionError> {
        if self.is_loading {
            return Err(SessionError::SubmissionInFlight);
        }
        let file = self
            .selected_file
            .clone()
            .ok_or(SessionError::NoImageSelected)?;

        self.is_loading = true;
        self.error = None;
        self.result = None;
        Ok(file)
    }

    /// Stores a successful result and leaves the pending phase.
    pub fn complete(&mut self, result: AnalysisResult) {
        self.result = Some(result);
        self.error = None;
        self.is_loading = false;
    }

    /// Stores an error message and leaves the pending phase.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.result = None;
        self.is_loading = false;
    }
}

/// Illegal session transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Submit was requested without a selected image.
    #[error("no image selected")]
    NoImageSelected,
    /// Submit was requested while another submission is in flight.
    #[error("a submission is already in flight")]
    SubmissionInFlight,
}
