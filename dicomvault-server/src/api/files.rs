//! Study and record listing endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::store::StorageName;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudiesResponse {
    pub success: bool,
    pub studies_count: usize,
    pub studies: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyFilesResponse {
    pub success: bool,
    pub study: String,
    pub files_count: usize,
    pub files: Vec<String>,
}

/// GET /files
pub async fn list_studies(State(state): State<AppState>) -> ApiResult<Json<StudiesResponse>> {
    let studies = state.store.list_studies().await?;

    Ok(Json(StudiesResponse {
        success: true,
        studies_count: studies.len(),
        studies,
    }))
}

/// GET /files/:study
///
/// Committed records only; provisional uploads are never listed.
pub async fn list_study_files(
    State(state): State<AppState>,
    Path(study): Path<String>,
) -> ApiResult<Json<StudyFilesResponse>> {
    let name = StorageName::study(&study)
        .map_err(|_| ApiError::NotFound("study not found".to_string()))?;
    let files = state.store.list_records(&name).await?;

    Ok(Json(StudyFilesResponse {
        success: true,
        study,
        files_count: files.len(),
        files,
    }))
}

/// Build listing, tag query and raster routes
pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files", get(list_studies))
        .route("/files/:study", get(list_study_files))
        .route("/files/:study/:filename/tag", get(super::tags::get_file_tags))
        .route("/files/:study/:filename/png", get(super::raster::get_file_png))
}
