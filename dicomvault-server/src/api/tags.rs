//! Metadata tag query endpoint

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::ApiResult;
use crate::metadata::{resolve_fields, FieldQueryOutcome};
use crate::AppState;

/// GET /files/:study/:filename/tag?tag=(gggg,eeee)&tag=...
///
/// Any token that fails to parse or resolve turns the whole response into
/// `{success: false, invalidTags: [...]}`.
pub async fn get_file_tags(
    State(state): State<AppState>,
    Path((study, filename)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let tokens: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == "tag")
        .map(|(_, value)| value)
        .collect();

    let outcome = resolve_fields(&state.store, &study, &filename, &tokens).await?;

    Ok(match outcome {
        FieldQueryOutcome::Invalid(invalid_tags) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "invalidTags": invalid_tags,
            })),
        )
            .into_response(),
        FieldQueryOutcome::Resolved(tags) => Json(json!({
            "success": true,
            "study": study,
            "file": filename,
            "tags": tags,
        }))
        .into_response(),
    })
}
