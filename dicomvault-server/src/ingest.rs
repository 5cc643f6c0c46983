//! Batch ingestion with all-or-nothing commit
//!
//! Every file of a batch is written provisionally and classified before any
//! of them becomes visible. A batch with at least one rejection commits
//! nothing.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dicom::DicomRecord;
use crate::error::{ApiError, ApiResult};
use crate::store::{StorageName, Store};

/// Content type reported when the client declared none
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Message for a request without a study name or without files
pub const MISSING_PARAMETERS: &str = "either study or files parameter is missing";

/// One file of an upload batch, as received
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            content_type,
        }
    }
}

/// Why a file was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    InvalidType,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub name: String,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub mime: String,
}

/// Result of a batch that passed request validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Nothing was committed
    Rejected(Vec<Rejection>),
    /// Every file was committed
    Committed(Vec<UploadedFile>),
}

struct Checked {
    name: StorageName,
    bytes: Vec<u8>,
    mime: String,
}

/// Validate the request shape before touching the filesystem
fn check_request(study: &str, files: Vec<IncomingFile>) -> ApiResult<(StorageName, Vec<Checked>)> {
    if study.trim().is_empty() || files.is_empty() {
        return Err(ApiError::MalformedQuery(MISSING_PARAMETERS.to_string()));
    }
    let study = StorageName::study(study)
        .map_err(|e| ApiError::MalformedQuery(format!("invalid study name: {}", e)))?;

    let checked = files
        .into_iter()
        .map(|file| {
            let name = StorageName::record(&file.name).map_err(|e| {
                ApiError::MalformedQuery(format!("invalid file name {:?}: {}", file.name, e))
            })?;
            let mime = file
                .content_type
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MIME.to_string());
            Ok(Checked {
                name,
                bytes: file.bytes,
                mime,
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok((study, checked))
}

/// Parse off the async runtime; true when the bytes are a usable DICOM file
async fn is_valid_dicom(bytes: Vec<u8>) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || DicomRecord::parse(&bytes).is_ok())
        .await
        .map_err(|e| ApiError::Internal(format!("validation task failed: {}", e)))
}

/// Ingest one batch into a study
///
/// Holds the study lock for the whole batch so that concurrent batches for
/// the same study see each other's commits.
pub async fn ingest(store: &Store, study: &str, files: Vec<IncomingFile>) -> ApiResult<BatchOutcome> {
    let (study, files) = check_request(study, files)?;

    let _guard = store.lock_study(&study).await;
    store.ensure_study(&study).await?;

    let mut rejections = Vec::new();
    let mut seen = HashSet::new();

    for file in &files {
        store.write_provisional(&study, &file.name, &file.bytes).await?;

        // A name counts as seen even when its first occurrence is invalid
        let repeated = !seen.insert(file.name.clone());

        let reason = if !is_valid_dicom(file.bytes.clone()).await? {
            Some(RejectionReason::InvalidType)
        } else if repeated || store.is_committed(&study, &file.name).await? {
            Some(RejectionReason::Duplicate)
        } else {
            None
        };

        if let Some(reason) = reason {
            debug!(study = %study, file = %file.name, ?reason, "File rejected");
            rejections.push(Rejection {
                name: file.name.to_string(),
                reason,
            });
        }
    }

    if !rejections.is_empty() {
        info!(
            study = %study,
            rejected = rejections.len(),
            total = files.len(),
            "Batch rejected, nothing committed"
        );
        return Ok(BatchOutcome::Rejected(rejections));
    }

    commit_all(store, &study, &files).await?;

    info!(study = %study, files = files.len(), "Batch committed");
    Ok(BatchOutcome::Committed(
        files
            .into_iter()
            .map(|file| UploadedFile {
                name: file.name.to_string(),
                size: file.bytes.len() as u64,
                mime: file.mime,
            })
            .collect(),
    ))
}

/// Commit every file, undoing earlier renames if one fails
async fn commit_all(store: &Store, study: &StorageName, files: &[Checked]) -> ApiResult<()> {
    for (index, file) in files.iter().enumerate() {
        if let Err(e) = store.commit(study, &file.name).await {
            warn!(study = %study, file = %file.name, error = %e, "Commit failed, rolling back batch");
            for done in &files[..index] {
                if let Err(undo) = store.uncommit(study, &done.name).await {
                    warn!(study = %study, file = %done.name, error = %undo, "Rollback failed");
                }
            }
            return Err(e.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::test_support::mr_image;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> Arc<Store> {
        Arc::new(Store::new(dir.path().join("dicom"), dir.path().join("png")))
    }

    fn dicom(name: &str) -> IncomingFile {
        IncomingFile::new(name, mr_image("Doe^John", 1, 2, &[0, 1]), Some("application/dicom".to_string()))
    }

    #[tokio::test]
    async fn test_blank_study_is_malformed() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let result = ingest(&store, "  ", vec![dicom("a.dcm")]).await;
        assert!(matches!(result, Err(ApiError::MalformedQuery(_))));
        assert!(!dir.path().join("dicom").exists());
    }

    #[tokio::test]
    async fn test_empty_batch_is_malformed() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let result = ingest(&store, "brain", vec![]).await;
        assert!(matches!(result, Err(ApiError::MalformedQuery(_))));
    }

    #[tokio::test]
    async fn test_traversal_file_name_is_malformed() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let result = ingest(&store, "brain", vec![dicom("../escape.dcm")]).await;
        assert!(matches!(result, Err(ApiError::MalformedQuery(_))));
        assert!(!dir.path().join("dicom").join("brain").exists());
    }

    #[tokio::test]
    async fn test_commit_reports_size_and_mime() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let file = dicom("a.dcm");
        let size = file.bytes.len() as u64;

        let outcome = ingest(&store, "brain", vec![file, IncomingFile::new("b.dcm", mr_image("X", 1, 1, &[3]), None)])
            .await
            .unwrap();

        let BatchOutcome::Committed(uploaded) = outcome else {
            panic!("expected commit, got {:?}", outcome);
        };
        assert_eq!(uploaded[0].name, "a.dcm");
        assert_eq!(uploaded[0].size, size);
        assert_eq!(uploaded[0].mime, "application/dicom");
        assert_eq!(uploaded[1].mime, DEFAULT_MIME);

        let study = StorageName::study("brain").unwrap();
        assert_eq!(store.list_records(&study).await.unwrap(), vec!["a.dcm", "b.dcm"]);
    }

    #[tokio::test]
    async fn test_one_invalid_file_rejects_batch() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let outcome = ingest(
            &store,
            "brain",
            vec![
                dicom("a.dcm"),
                IncomingFile::new("notes.txt", b"plain text".to_vec(), Some("text/plain".to_string())),
                dicom("c.dcm"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            BatchOutcome::Rejected(vec![Rejection {
                name: "notes.txt".to_string(),
                reason: RejectionReason::InvalidType,
            }])
        );

        let study = StorageName::study("brain").unwrap();
        assert!(store.list_records(&study).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_name_repeated_within_batch_is_duplicate() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let outcome = ingest(&store, "brain", vec![dicom("a.dcm"), dicom("a.dcm")]).await.unwrap();

        assert_eq!(
            outcome,
            BatchOutcome::Rejected(vec![Rejection {
                name: "a.dcm".to_string(),
                reason: RejectionReason::Duplicate,
            }])
        );
    }

    #[tokio::test]
    async fn test_invalid_takes_precedence_over_duplicate() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        ingest(&store, "brain", vec![dicom("a.dcm")]).await.unwrap();

        let outcome = ingest(
            &store,
            "brain",
            vec![IncomingFile::new("a.dcm", b"garbage".to_vec(), None)],
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            BatchOutcome::Rejected(vec![Rejection {
                name: "a.dcm".to_string(),
                reason: RejectionReason::InvalidType,
            }])
        );
    }

    #[test]
    fn test_reason_serialization() {
        assert_eq!(serde_json::to_value(RejectionReason::InvalidType).unwrap(), "invalid_type");
        assert_eq!(serde_json::to_value(RejectionReason::Duplicate).unwrap(), "duplicate");
    }
}
