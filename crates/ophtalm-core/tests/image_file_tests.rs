//! Integration tests for building image files from disk reads.

use std::io;
use std::path::Path;

use ophtalm_core::{CoreError, ImageFile, PreviewData};

#[test]
fn image_file_tests_reads_name_type_and_bytes_from_path() {
    let path = std::env::temp_dir().join(format!("ophtalm-core-{}.png", std::process::id()));
    std::fs::write(&path, [137, 80, 78, 71]).expect("fixture should be writable");

    let file =
        ImageFile::from_read(&path, std::fs::read(&path)).expect("fixture should be readable");
    std::fs::remove_file(&path).expect("fixture should be removable");

    assert_eq!(file.content_type(), "image/png");
    assert!(file.name().ends_with(".png"));
    assert_eq!(file.bytes(), &[137, 80, 78, 71]);
    assert_eq!(PreviewData::encode(&file).as_str(), "data:image/png;base64,iVBORw==");
}

#[test]
fn image_file_tests_reports_failed_reads_with_path() {
    let path = Path::new("/definitely/not/here.jpg");
    let error = ImageFile::from_read(path, Err(io::Error::from(io::ErrorKind::NotFound)))
        .expect_err("read should fail");

    assert!(matches!(&error, CoreError::Io { path, .. } if path == "/definitely/not/here.jpg"));
}
