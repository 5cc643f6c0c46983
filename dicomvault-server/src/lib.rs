//! dicomvault-server library interface
//!
//! Exposes the store, the DICOM layer and the router for integration testing.

pub mod api;
pub mod dicom;
pub mod error;
pub mod ingest;
pub mod metadata;
pub mod raster;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

use crate::store::Store;

/// Module name reported by `/health` and used for config file lookup
pub const MODULE_NAME: &str = "dicomvault-server";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// File store for records and rasters
    pub store: Arc<Store>,
    /// Largest accepted upload request body, in bytes
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<Store>, max_upload_bytes: usize) -> Self {
        Self {
            store,
            max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .merge(api::ui_routes())
        .merge(api::file_routes())
        .merge(api::upload_routes().layer(DefaultBodyLimit::max(body_limit)))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
