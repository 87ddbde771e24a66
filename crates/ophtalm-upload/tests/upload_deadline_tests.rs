//! Integration tests for upload outcomes, deadlines and aborts.

mod common;

use std::time::Duration;

use common::{Script, ScriptedTransport, fixture_image};
use ophtalm_upload::{UploadClient, UploadError, content_digest};
use tokio_util::sync::CancellationToken;

const ENDPOINT: &str = "http://localhost:8000";

#[tokio::test]
async fn upload_deadline_tests_parses_successful_prediction() {
    let body = br#"{"prediction_value":0.27,"prediction":"glaucoma"}"#.to_vec();
    let client = UploadClient::new(
        ENDPOINT,
        Duration::from_secs(5),
        ScriptedTransport::new(Script::Respond(200, body)),
    )
    .expect("client should build");

    let image = fixture_image();
    let report = client
        .upload(image.clone(), &CancellationToken::new())
        .await
        .expect("upload should succeed");

    assert_eq!(report.status, 200);
    assert_eq!(report.prediction.prediction_value, 0.27);
    assert_eq!(report.content_digest, content_digest(image.bytes()));
}

#[tokio::test]
async fn upload_deadline_tests_sends_exactly_one_request_to_predict() {
    let transport = ScriptedTransport::new(Script::Respond(500, Vec::new()));
    let client =
        UploadClient::new(ENDPOINT, Duration::from_secs(5), transport).expect("client should build");

    let error = client
        .upload(fixture_image(), &CancellationToken::new())
        .await
        .expect_err("500 should fail");
    assert!(matches!(error, UploadError::Status(500)));

    let requests = client.transport().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].endpoint.as_str(), "http://localhost:8000/predict");
}

#[tokio::test]
async fn upload_deadline_tests_reports_timeout() {
    let client = UploadClient::new(
        ENDPOINT,
        Duration::from_millis(20),
        ScriptedTransport::new(Script::Hang),
    )
    .expect("client should build");

    let error = client
        .upload(fixture_image(), &CancellationToken::new())
        .await
        .expect_err("hung transport should time out");
    assert!(matches!(error, UploadError::Timeout(deadline) if deadline == Duration::from_millis(20)));
}

#[tokio::test]
async fn upload_deadline_tests_abort_wins_over_slow_response() {
    let client = UploadClient::new(
        ENDPOINT,
        Duration::from_secs(5),
        ScriptedTransport::delayed(
            Script::Respond(200, br#"{"prediction_value":0.9}"#.to_vec()),
            Duration::from_secs(2),
        ),
    )
    .expect("client should build");

    let abort = CancellationToken::new();
    let trigger = abort.clone();
    let (outcome, ()) = tokio::join!(client.upload(fixture_image(), &abort), async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    assert!(matches!(outcome, Err(UploadError::Aborted)));
}

#[tokio::test]
async fn upload_deadline_tests_rejects_contract_violations() {
    let client = UploadClient::new(
        ENDPOINT,
        Duration::from_secs(5),
        ScriptedTransport::new(Script::Respond(200, b"not json".to_vec())),
    )
    .expect("client should build");

    let error = client
        .upload(fixture_image(), &CancellationToken::new())
        .await
        .expect_err("invalid body should fail");
    assert!(matches!(error, UploadError::Contract(_)));
}

#[test]
fn upload_deadline_tests_rejects_zero_timeout() {
    let result = UploadClient::new(
        ENDPOINT,
        Duration::ZERO,
        ScriptedTransport::new(Script::Hang),
    );
    let error = result.expect_err("zero timeout should be rejected");
    assert!(matches!(error, UploadError::InvalidTimeout(timeout) if timeout.is_zero()));
    assert!(error.to_string().contains("timeout"));
}
