//! DICOM pixel data to 8-bit grayscale PNG
//!
//! Rasters are derived once per record and persisted under the png tree;
//! every later request is served from that copy without touching the source.

use std::io::Cursor;

use image::{GrayImage, ImageFormat};
use tracing::{debug, info};

use crate::dicom::PixelMatrix;
use crate::error::{ApiError, ApiResult};
use crate::metadata::load_record;
use crate::store::{StorageName, Store};

/// Linear rescale of every sample to 0..=255 against the matrix maximum
///
/// A zero maximum yields an all-zero raster.
pub fn rescale_to_gray8(matrix: &PixelMatrix) -> Vec<u8> {
    let max = matrix.max_sample();
    if max == 0 {
        return vec![0; matrix.samples().len()];
    }

    let max = f64::from(max);
    matrix
        .samples()
        .iter()
        .map(|&s| ((f64::from(s) / max) * 255.0).floor() as u8)
        .collect()
}

/// Encode a pixel matrix as an 8-bit grayscale PNG
pub fn encode_png(matrix: &PixelMatrix) -> ApiResult<Vec<u8>> {
    let width = u32::try_from(matrix.columns())
        .map_err(|_| ApiError::ConversionFailed("image too wide".to_string()))?;
    let height = u32::try_from(matrix.rows())
        .map_err(|_| ApiError::ConversionFailed("image too tall".to_string()))?;

    let image = GrayImage::from_raw(width, height, rescale_to_gray8(matrix)).ok_or_else(|| {
        ApiError::ConversionFailed(format!("buffer does not fill {}x{}", width, height))
    })?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ApiError::ConversionFailed(format!("PNG encoding failed: {}", e)))?;
    Ok(png)
}

/// Return the raster for a committed record, deriving it on first request
pub async fn convert(store: &Store, study: &str, record: &str) -> ApiResult<Vec<u8>> {
    let (study_name, record_name) = match (StorageName::study(study), StorageName::record(record)) {
        (Ok(s), Ok(r)) => (s, r),
        _ => return Err(ApiError::file_not_found()),
    };

    if let Some(png) = store.read_raster(&study_name, &record_name).await? {
        return Ok(png);
    }

    let _guard = store.lock_raster(&study_name, &record_name).await;

    // Another request may have finished while this one waited
    if let Some(png) = store.read_raster(&study_name, &record_name).await? {
        debug!(study = %study_name, file = %record_name, "Raster produced by concurrent request");
        return Ok(png);
    }

    let parsed = load_record(store, study, record).await?;
    let png = tokio::task::spawn_blocking(move || {
        let matrix = parsed.pixel_matrix()?;
        encode_png(&matrix)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("conversion task failed: {}", e)))??;

    store.write_raster(&study_name, &record_name, png.clone()).await?;
    info!(study = %study_name, file = %record_name, bytes = png.len(), "Raster persisted");

    Ok(png)
}
