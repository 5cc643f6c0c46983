//! Batch upload endpoint
//!
//! Multipart form with one `study` text field and repeated `files` fields.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::debug;

use crate::error::ApiResult;
use crate::ingest::{ingest, BatchOutcome, IncomingFile};
use crate::AppState;

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/upload", post(upload_files))
}

/// POST /upload
///
/// 200 with the committed files, or 422 with every rejected file when the
/// batch was refused as a whole.
pub async fn upload_files(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Response> {
    let mut study = String::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("study") => study = field.text().await?,
            Some("files") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;

                // Browsers send one empty part when no file was picked
                if name.is_empty() && bytes.is_empty() {
                    continue;
                }
                files.push(IncomingFile::new(name, bytes.to_vec(), content_type));
            }
            other => debug!(field = ?other, "Ignoring unknown multipart field"),
        }
    }

    let response = match ingest(&state.store, &study, files).await? {
        BatchOutcome::Rejected(rejections) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "success": false,
                "failedFiles": rejections.len(),
                "files": rejections,
            })),
        )
            .into_response(),
        BatchOutcome::Committed(uploaded) => Json(json!({
            "success": true,
            "filesUploaded": uploaded.len(),
            "files": uploaded,
        }))
        .into_response(),
    };

    Ok(response)
}
