#![warn(missing_docs)]
//! # ophtalm-upload
//!
//! ## Purpose
//! Sends one selected image to the inference endpoint and returns the parsed
//! prediction.
//!
//! ## Responsibilities
//! - Validate the endpoint base URL and derive the `/predict` URL.
//! - Build a multipart request with a single `file` field.
//! - Bound each request with a deadline and an abort signal.
//! - Classify failures into network and request failures.
//!
//! ## Data flow
//! [`UploadClient::upload`] -> [`UploadTransport::send`] -> status check ->
//! [`ophtalm_contract::parse_prediction_response`] -> [`UploadReport`].
//!
//! ## Ownership and lifetimes
//! Requests hold the image as `Arc<ImageFile>`; the transport copies bytes
//! into the multipart body only at dispatch time.
//!
//! ## Error model
//! Every failure is an [`UploadError`]; [`classify_upload_error`] maps it to
//! a [`FailureClass`]. No retries happen in this crate.
//!
//! ## Security and privacy notes
//! Image bytes are never logged. Log lines carry the SHA-256 digest and the
//! byte length instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use ophtalm_contract::{ContractError, RawPrediction, parse_prediction_response};
use ophtalm_core::ImageFile;
use reqwest::multipart::{Form, Part};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Path joined onto the endpoint base URL.
pub const PREDICT_PATH: &str = "predict";

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// Default endpoint base URL.
pub const DEFAULT_ENDPOINT_BASE: &str = "http://localhost:8000";

/// Default request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One prepared upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Fully resolved `/predict` URL.
    pub endpoint: Url,
    /// Image to send.
    pub file: Arc<ImageFile>,
    /// Hex SHA-256 digest of the image bytes, for log correlation.
    pub content_digest: String,
}

/// Status and body returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Outcome of one successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    /// Parsed prediction payload.
    pub prediction: RawPrediction,
    /// HTTP status code of the response.
    pub status: u16,
    /// Round-trip time.
    pub elapsed: Duration,
    /// Hex SHA-256 digest of the uploaded bytes.
    pub content_digest: String,
}

/// Abstract transport used by the upload client.
pub trait UploadTransport {
    /// Sends one multipart upload and returns the raw response.
    fn send(
        &self,
        request: &UploadRequest,
    ) -> impl Future<Output = Result<TransportResponse, UploadError>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a bounded connect timeout.
    ///
    /// # Errors
    /// Returns [`UploadError::Transport`] when the HTTP client cannot be built.
    pub fn new(connect_timeout: Duration) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|error| UploadError::Transport(format!("http client setup: {error}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl UploadTransport for HttpTransport {
    async fn send(&self, request: &UploadRequest) -> Result<TransportResponse, UploadError> {
        let part = Part::bytes(request.file.bytes().to_vec())
            .file_name(request.file.name().to_string())
            .mime_str(request.file.content_type())
            .map_err(|error| UploadError::InvalidRequest(format!("content type: {error}")))?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .client
            .post(request.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|error| UploadError::Transport(error.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|error| UploadError::Transport(format!("response body: {error}")))?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Upload client bound to one endpoint and deadline.
#[derive(Debug, Clone)]
pub struct UploadClient<T> {
    endpoint: Url,
    timeout: Duration,
    transport: T,
}

impl<T: UploadTransport> UploadClient<T> {
    /// Creates a client for `{endpoint_base}/predict`.
    ///
    /// # Errors
    /// Returns [`UploadError::InvalidTimeout`] when `timeout` is zero and
    /// [`UploadError::InvalidEndpoint`] when the base URL is not a valid
    /// `http`/`https` URL.
    pub fn new(endpoint_base: &str, timeout: Duration, transport: T) -> Result<Self, UploadError> {
        if timeout.is_zero() {
            return Err(UploadError::InvalidTimeout(timeout));
        }

        Ok(Self {
            endpoint: predict_endpoint(endpoint_base)?,
            timeout,
            transport,
        })
    }

    /// Resolved `/predict` URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Per-request deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Uploads one image and parses the prediction.
    ///
    /// # Errors
    /// - [`UploadError::Aborted`] when `abort` fires first.
    /// - [`UploadError::Timeout`] when the deadline elapses first.
    /// - [`UploadError::Status`] for any non-2xx status.
    /// - [`UploadError::Contract`] when a 2xx body does not match the contract.
    /// - Transport errors as reported by the transport.
    pub async fn upload(
        &self,
        file: Arc<ImageFile>,
        abort: &CancellationToken,
    ) -> Result<UploadReport, UploadError> {
        let request = UploadRequest {
            endpoint: self.endpoint.clone(),
            content_digest: content_digest(file.bytes()),
            file,
        };
        info!(
            target: "upload",
            "dispatch: endpoint={} bytes={} digest={}",
            request.endpoint,
            request.file.len(),
            request.content_digest
        );

        let started = Instant::now();
        let response = tokio::select! {
            biased;
            _ = abort.cancelled() => {
                warn!(target: "upload", "aborted: digest={}", request.content_digest);
                return Err(UploadError::Aborted);
            }
            outcome = tokio::time::timeout(self.timeout, self.transport.send(&request)) => {
                outcome.map_err(|_| UploadError::Timeout(self.timeout))??
            }
        };
        let elapsed = started.elapsed();

        if !(200..300).contains(&response.status) {
            warn!(
                target: "upload",
                "rejected: status={} elapsed_ms={}",
                response.status,
                elapsed.as_millis()
            );
            return Err(UploadError::Status(response.status));
        }

        let prediction = parse_prediction_response(&response.body)?;
        info!(
            target: "upload",
            "completed: status={} elapsed_ms={} prediction_value={}",
            response.status,
            elapsed.as_millis(),
            prediction.prediction_value
        );

        Ok(UploadReport {
            prediction,
            status: response.status,
            elapsed,
            content_digest: request.content_digest,
        })
    }
}

/// Derives the `/predict` URL from an endpoint base.
///
/// # Errors
/// Returns [`UploadError::InvalidEndpoint`] for unparsable URLs and for
/// schemes other than `http`/`https`.
pub fn predict_endpoint(endpoint_base: &str) -> Result<Url, UploadError> {
    let mut base = Url::parse(endpoint_base)
        .map_err(|error| UploadError::InvalidEndpoint(format!("invalid endpoint url: {error}")))?;

    if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
        return Err(UploadError::InvalidEndpoint(
            "endpoint must be an http or https url".to_string(),
        ));
    }

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(PREDICT_PATH)
        .map_err(|error| UploadError::InvalidEndpoint(format!("invalid predict url: {error}")))
}

/// Computes the hex SHA-256 digest of uploaded bytes.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Coarse failure class exposed to the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Transport failure, deadline or abort.
    Network,
    /// Endpoint answered, but not with a usable prediction.
    Request,
}

/// Classifies an upload error.
pub fn classify_upload_error(error: &UploadError) -> FailureClass {
    match error {
        UploadError::Transport(_) | UploadError::Timeout(_) | UploadError::Aborted => {
            FailureClass::Network
        }
        UploadError::InvalidEndpoint(_)
        | UploadError::InvalidTimeout(_)
        | UploadError::InvalidRequest(_)
        | UploadError::Status(_)
        | UploadError::Contract(_) => FailureClass::Request,
    }
}

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Endpoint configuration is invalid.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Request deadline is unusable.
    #[error("invalid request timeout of {} ms: must be greater than zero", .0.as_millis())]
    InvalidTimeout(Duration),
    /// Request could not be assembled.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Connection, DNS or body transfer failure.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Deadline elapsed before a response arrived.
    #[error("request exceeded deadline of {} ms", .0.as_millis())]
    Timeout(Duration),
    /// Request was aborted by the caller.
    #[error("request aborted")]
    Aborted,
    /// Endpoint answered with a non-2xx status.
    #[error("endpoint returned status {0}")]
    Status(u16),
    /// Response body violated the prediction contract.
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl UploadError {
    /// HTTP status code, when the endpoint answered with one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            UploadError::Status(status) => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for endpoint policy and digests.

    use super::*;

    #[test]
    fn joins_predict_onto_base_paths() {
        assert_eq!(
            predict_endpoint("http://localhost:8000").expect("valid").as_str(),
            "http://localhost:8000/predict"
        );
        assert_eq!(
            predict_endpoint("https://api.example.test/v1").expect("valid").as_str(),
            "https://api.example.test/v1/predict"
        );
        assert_eq!(
            predict_endpoint("https://api.example.test/v1/").expect("valid").as_str(),
            "https://api.example.test/v1/predict"
        );
    }

    #[test]
    fn rejects_non_http_endpoints() {
        assert!(predict_endpoint("ftp://example.test").is_err());
        assert!(predict_endpoint("mailto:team@example.test").is_err());
        assert!(predict_endpoint("not a url").is_err());
    }

    #[test]
    fn digest_is_stable_hex_sha256() {
        assert_eq!(
            content_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
