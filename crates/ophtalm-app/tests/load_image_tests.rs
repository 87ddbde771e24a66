//! Integration tests for loading the selected image from disk.

use ophtalm_app::{AppError, load_image};
use ophtalm_core::CoreError;

#[tokio::test]
async fn load_image_tests_reads_file_name_and_bytes() {
    let path = std::env::temp_dir().join(format!("ophtalm-app-{}.jpg", std::process::id()));
    std::fs::write(&path, [0xFF, 0xD8, 0xFF]).expect("fixture should be writable");

    let outcome = load_image(&path).await;
    std::fs::remove_file(&path).expect("fixture should be removable");

    let file = outcome.expect("fixture should load");
    assert_eq!(file.name(), format!("ophtalm-app-{}.jpg", std::process::id()));
    assert_eq!(file.content_type(), "image/jpeg");
    assert_eq!(file.bytes(), &[0xFF, 0xD8, 0xFF]);
}

#[tokio::test]
async fn load_image_tests_missing_file_is_image_error() {
    let error = load_image("/definitely/not/here.png")
        .await
        .expect_err("missing file should fail");

    assert!(matches!(error, AppError::Image(CoreError::Io { .. })));
}
