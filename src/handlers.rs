use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
};
use bytes::Bytes;
use chrono::{Duration, Utc};
use tracing::{debug, error, info};

use crate::{
    error::AppError,
    models::*,
    state::AppState,
    storage::BlobPermissions,
    utils::{blob_path, is_safe_blob_path, non_empty},
};

const UPLOAD_FIELDS_MISSING: &str = "Username or file missing";
const SAS_FIELDS_MISSING: &str = "Username or filename missing";
const UNSAFE_KEY: &str = "Invalid username or filename";

fn multipart_error(e: MultipartError) -> AppError {
    error!("Error parsing multipart: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::MultipartError(format!("Failed to parse multipart form: {}", e.body_text()))
    }
}

/// Builds the blob path, rejecting traversal sequences when strict keys are on.
fn resolve_blob_path(state: &AppState, username: &str, filename: &str) -> Result<String, AppError> {
    let path = blob_path(username, filename);
    if state.config.strict_keys && !is_safe_blob_path(&path) {
        return Err(AppError::Validation(UNSAFE_KEY.to_string()));
    }
    Ok(path)
}

/// Upload a file using multipart/form-data.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    // Temporary holders for multipart fields
    let mut username: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;

    match multipart {
        Ok(mut multipart) => {
            // First occurrence of each field wins
            while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
                match field.name().unwrap_or("") {
                    "username" if username.is_none() => {
                        let text = field.text().await.map_err(multipart_error)?;
                        username = non_empty(Some(text));
                    }
                    "file" if file.is_none() => {
                        // A part without a filename is not a file upload
                        let Some(filename) = non_empty(field.file_name().map(str::to_string))
                        else {
                            continue;
                        };
                        let data = field.bytes().await.map_err(multipart_error)?;
                        file = Some((filename, data));
                    }
                    _ => {}
                }
            }
        }
        // Not a multipart request at all: behaves like an empty form
        Err(rejection) => debug!("Upload without multipart body: {}", rejection),
    }

    let (Some(username), Some((filename, data))) = (username, file) else {
        return Err(AppError::Validation(UPLOAD_FIELDS_MISSING.to_string()));
    };

    let path = resolve_blob_path(&state, &username, &filename)?;
    let size = data.len();

    state
        .storage
        .upload(&state.config.container, &path, data, true)
        .await?;

    info!("File uploaded: {} ({} bytes)", path, size);

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        filename,
    }))
}

/// Issue a read-only signed URL for a user's file.
pub async fn generate_sas(
    State(state): State<AppState>,
    payload: Result<Json<SasRequest>, JsonRejection>,
) -> Result<Json<SasResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let (Some(username), Some(filename)) =
        (non_empty(request.username), non_empty(request.filename))
    else {
        return Err(AppError::Validation(SAS_FIELDS_MISSING.to_string()));
    };

    let path = resolve_blob_path(&state, &username, &filename)?;
    let expiry = Utc::now() + Duration::seconds(state.config.sas_ttl_secs);

    // No existence check: the grant may point at a blob that is not there yet
    let sas_url = state
        .storage
        .generate_signed_url(
            &state.config.container,
            &path,
            BlobPermissions::read_only(),
            expiry,
        )
        .await?;

    info!("Issued read-only URL for {} (expires {})", path, expiry);

    Ok(Json(SasResponse { sas_url }))
}

pub async fn health_check() -> &'static str {
    "OK"
}
