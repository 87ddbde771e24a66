#![warn(missing_docs)]
//! # ophtalm-core
//!
//! ## Purpose
//! Defines the image values shared across the `ophtalm` workspace.
//!
//! ## Responsibilities
//! - Represent a user-selected image as an opaque owned blob.
//! - Infer a content type label from the file name.
//! - Encode the local preview as a base64 data URI.
//!
//! ## Data flow
//! The app reads a file into [`ImageFile`]. The session keeps it as the
//! current selection, [`PreviewData::encode`] derives the preview, and the
//! upload crate sends the same bytes to the inference endpoint.
//!
//! ## Ownership and lifetimes
//! [`ImageFile`] owns its bytes. Callers share it through `Arc` instead of
//! borrowing, so preview and upload stages never hold a borrow of the session.
//!
//! ## Error model
//! Read and data-URI decode failures return [`CoreError`]. No validation of
//! type or size happens at selection time.
//!
//! ## Example
//! ```rust
//! use ophtalm_core::{ImageFile, PreviewData};
//!
//! let file = ImageFile::new("eye.png", vec![1, 2, 3]);
//! let preview = PreviewData::encode(&file);
//! assert_eq!(preview.as_str(), "data:image/png;base64,AQID");
//! ```

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Content type used when the file name carries no known image extension.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// One user-selected image blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl ImageFile {
    /// Creates an image with a content type inferred from `name`.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = content_type_for_name(&name).to_string();
        Self {
            name,
            content_type,
            bytes,
        }
    }

    /// Creates an image with an explicit content type.
    pub fn with_content_type(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Builds an image from the outcome of reading `path`.
    ///
    /// The name is the final path component. The read itself is left to the
    /// caller.
    ///
    /// # Errors
    /// Returns [`CoreError::Io`] when the read failed.
    pub fn from_read(path: &Path, read: std::io::Result<Vec<u8>>) -> Result<Self, CoreError> {
        let bytes = read.map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(file_name_of(path), bytes))
    }

    /// File name as selected by the user.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Content type label used for the preview and the multipart part.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Full file content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte length of the file content.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when the file is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Returns the final path component, or `"image"` when the path has none.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

/// Infers an image content type from a file extension.
pub fn content_type_for_name(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        Some("webp") => "image/webp",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Base64 data URI of a full image, used as the local preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewData(String);

impl PreviewData {
    /// Encodes the whole file content as `data:<type>;base64,<payload>`.
    pub fn encode(file: &ImageFile) -> Self {
        let payload = STANDARD.encode(file.bytes());
        Self(format!("data:{};base64,{payload}", file.content_type()))
    }

    /// Returns the data URI.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the media type between `data:` and `;base64`.
    pub fn media_type(&self) -> Option<&str> {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .map(|(media_type, _)| media_type)
    }

    /// Decodes the embedded payload back into bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidDataUri`] when the URI is not a base64 data
    /// URI, and [`CoreError::Base64`] when the payload is not valid base64.
    pub fn decode_payload(&self) -> Result<Vec<u8>, CoreError> {
        let (_, payload) = self
            .0
            .split_once(";base64,")
            .ok_or_else(|| CoreError::InvalidDataUri("missing base64 marker".to_string()))?;
        Ok(STANDARD.decode(payload)?)
    }
}

impl std::fmt::Display for PreviewData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors for image reads and preview decoding.
#[derive(Debug, Error)]
pub enum CoreError {
    /// File could not be read from disk.
    #[error("unable to read image '{path}': {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Data URI is structurally invalid.
    #[error("invalid data uri: {0}")]
    InvalidDataUri(String),
    /// Data URI payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}
