//! Raster endpoint

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::ApiResult;
use crate::AppState;

/// GET /files/:study/:filename/png
pub async fn get_file_png(
    State(state): State<AppState>,
    Path((study, filename)): Path<(String, String)>,
) -> ApiResult<Response> {
    let png = crate::raster::convert(&state.store, &study, &filename).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
