//! Upload API endpoints
//!
//! - POST /api/v1/upload - Upload one image (multipart field `file`)
//!
//! Also holds the multipart helpers shared with the subject and field
//! endpoints, which take their image in the same request.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use std::collections::HashMap;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the upload router
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(upload_file))
}

/// A file part read into memory
pub struct FilePart {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Text fields and the first file part of a multipart form
#[derive(Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub file: Option<FilePart>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Map multipart read errors; a body over the limit is a 413
pub fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(err.body_text())
    } else {
        ApiError::validation_error(err.body_text())
    }
}

/// Read a multipart form, keeping the part named `file_field` as the file
pub async fn read_form(mut multipart: Multipart, file_field: &str) -> Result<FormData, ApiError> {
    let mut form = FormData::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            if form.file.is_some() {
                continue;
            }
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field.bytes().await.map_err(multipart_error)?;
            form.file = Some(FilePart {
                content_type,
                data: data.to_vec(),
            });
        } else if !name.is_empty() {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// POST /api/v1/upload - Upload a single image
///
/// Requires authentication.
async fn upload_file(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(multipart, "file").await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::validation_error("No file provided"))?;

    let stored = state
        .files
        .store(None, &file.content_type, &file.data)
        .await?;

    tracing::info!("User {} uploaded {} ({} bytes)", auth.user.id, stored.filename, stored.size);
    Ok((StatusCode::CREATED, Json(stored)))
}
