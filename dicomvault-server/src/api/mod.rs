//! HTTP API handlers for dicomvault-server

pub mod buildinfo;
pub mod files;
pub mod health;
pub mod raster;
pub mod tags;
pub mod ui;
pub mod upload;

pub use buildinfo::get_build_info;
pub use files::file_routes;
pub use health::health_routes;
pub use ui::ui_routes;
pub use upload::upload_routes;
