#![allow(dead_code)] // Not every test binary uses every helper

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use blobrelay::{
    AppState, BlobPermissions, Config, LocalStorage, Storage, StorageError, create_app,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const TEST_ENDPOINT: &str = "http://blobs.test";
pub const TEST_SIGNING_KEY: &[u8] = b"integration-test-key";
pub const BOUNDARY: &str = "relay-test-boundary";

/// Storage stub that fails every call with a fixed message.
pub struct FailingStorage {
    pub message: String,
}

#[async_trait]
impl Storage for FailingStorage {
    async fn ensure_container(&self, _container: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend(self.message.clone()))
    }

    async fn upload(
        &self,
        _container: &str,
        _path: &str,
        _content: Bytes,
        _overwrite: bool,
    ) -> Result<(), StorageError> {
        Err(StorageError::Backend(self.message.clone()))
    }

    async fn generate_signed_url(
        &self,
        _container: &str,
        _path: &str,
        _permissions: BlobPermissions,
        _expiry: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        Err(StorageError::Backend(self.message.clone()))
    }
}

pub fn test_config() -> Config {
    Config::new("Provider=local;AccountKey=integration-test-key")
}

/// Router backed by filesystem storage rooted at `root`
pub fn local_app(root: &Path) -> Router {
    local_app_with(root, test_config())
}

pub fn local_app_with(root: &Path, config: Config) -> Router {
    let storage = LocalStorage::new(root, TEST_ENDPOINT, TEST_SIGNING_KEY);
    create_app(AppState::new(Arc::new(storage), config))
}

pub fn failing_app(message: &str) -> Router {
    let storage = FailingStorage {
        message: message.to_string(),
    };
    create_app(AppState::new(Arc::new(storage), test_config()))
}

/// Hand-built multipart/form-data body.
pub fn multipart_body(username: Option<&str>, file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some(username) = username {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\n{}\r\n",
                BOUNDARY, username
            )
            .as_bytes(),
        );
    }

    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(username: Option<&str>, file: Option<(&str, &[u8])>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(username, file)))
        .unwrap()
}

pub fn sas_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate-sas")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send one request through the router and decode the JSON reply.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}
