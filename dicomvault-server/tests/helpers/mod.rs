//! Test Helper Utilities
//!
//! Shared utilities for testing dicomvault-server

#![allow(dead_code)]

pub mod dicom_generator;

pub use dicom_generator::{generate_dicom, sample_dicom, ImageConfig};

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;

use dicomvault_common::config::RootFolderInitializer;
use dicomvault_server::store::Store;
use dicomvault_server::AppState;

/// Multipart boundary used by [`MultipartBody`]
pub const BOUNDARY: &str = "dicomvault-test-boundary";

/// Isolated store rooted in a fresh temp directory
///
/// Keep the `TempDir` alive for the duration of the test.
pub fn test_store() -> (TempDir, Arc<Store>) {
    let dir = TempDir::new().expect("temp dir");
    let initializer = RootFolderInitializer::new(dir.path().to_path_buf());
    initializer.ensure_directory_exists().expect("root layout");
    (dir, Arc::new(Store::from_initializer(&initializer)))
}

/// App state over an isolated store
pub fn test_app_state() -> (TempDir, AppState) {
    let (dir, store) = test_store();
    (dir, AppState::new(store, 16 * 1024 * 1024))
}

/// Builder for `multipart/form-data` request bodies
#[derive(Debug, Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Finish the body and wrap it in a POST request
    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// Upload request for one study with DICOM-typed files
pub fn upload_request(study: &str, files: &[(&str, Vec<u8>)]) -> Request<Body> {
    files
        .iter()
        .fold(MultipartBody::new().text("study", study), |body, (name, bytes)| {
            body.file("files", name, "application/dicom", bytes)
        })
        .into_request("/upload")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
