//! Directory-per-study file store
//!
//! Two parallel trees keyed by study and record name:
//! - `<dicom root>/<study>/<record>` for committed files, with provisional
//!   uploads sitting next to them as `<record>.tmp`
//! - `<png root>/<study>/<record>.png` for derived rasters
//!
//! The store is injected into handlers through `AppState`; it owns the keyed
//! locks that serialize ingestion per study and conversion per record.

pub mod locks;
pub mod names;

pub use locks::{KeyGuard, KeyedLocks};
pub use names::{NameError, StorageName, PROVISIONAL_SUFFIX};

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dicomvault_common::config::RootFolderInitializer;
use dicomvault_common::{Error, Result};
use tracing::debug;

/// Suffix appended to a record name to form its raster file name
pub const RASTER_SUFFIX: &str = ".png";

#[derive(Debug)]
pub struct Store {
    dicom_root: PathBuf,
    png_root: PathBuf,
    locks: KeyedLocks,
}

impl Store {
    pub fn new(dicom_root: PathBuf, png_root: PathBuf) -> Self {
        Self {
            dicom_root,
            png_root,
            locks: KeyedLocks::new(),
        }
    }

    /// Store rooted at the standard layout under a root folder
    pub fn from_initializer(initializer: &RootFolderInitializer) -> Self {
        Self::new(initializer.dicom_dir(), initializer.png_dir())
    }

    pub fn dicom_root(&self) -> &Path {
        &self.dicom_root
    }

    pub fn png_root(&self) -> &Path {
        &self.png_root
    }

    // ========================================
    // Serialization
    // ========================================

    /// Exclusive access to a study for the duration of an ingestion
    pub async fn lock_study(&self, study: &StorageName) -> KeyGuard {
        self.locks.lock(&format!("study/{}", study)).await
    }

    /// Exclusive access to one record's raster derivation
    pub async fn lock_raster(&self, study: &StorageName, record: &StorageName) -> KeyGuard {
        self.locks.lock(&format!("raster/{}/{}", study, record)).await
    }

    // ========================================
    // Paths
    // ========================================

    pub fn study_dir(&self, study: &StorageName) -> PathBuf {
        self.dicom_root.join(study.as_str())
    }

    pub fn record_path(&self, study: &StorageName, record: &StorageName) -> PathBuf {
        self.study_dir(study).join(record.as_str())
    }

    pub fn provisional_path(&self, study: &StorageName, record: &StorageName) -> PathBuf {
        self.study_dir(study)
            .join(format!("{}{}", record, PROVISIONAL_SUFFIX))
    }

    pub fn raster_dir(&self, study: &StorageName) -> PathBuf {
        self.png_root.join(study.as_str())
    }

    pub fn raster_path(&self, study: &StorageName, record: &StorageName) -> PathBuf {
        self.raster_dir(study)
            .join(format!("{}{}", record, RASTER_SUFFIX))
    }

    // ========================================
    // Listing
    // ========================================

    /// Names of all studies, sorted
    pub async fn list_studies(&self) -> Result<Vec<String>> {
        if !tokio::fs::try_exists(&self.dicom_root).await? {
            return Ok(Vec::new());
        }
        list_dir(&self.dicom_root, |file_type, _| file_type.is_dir()).await
    }

    /// Names of committed records in a study, sorted
    ///
    /// Provisional files are never listed.
    pub async fn list_records(&self, study: &StorageName) -> Result<Vec<String>> {
        let dir = self.study_dir(study);
        if !tokio::fs::try_exists(&dir).await? {
            return Err(Error::NotFound("study not found".to_string()));
        }
        list_dir(&dir, |file_type, name| {
            file_type.is_file() && !name.ends_with(PROVISIONAL_SUFFIX)
        })
        .await
    }

    // ========================================
    // Records
    // ========================================

    /// Create the study directory if it does not exist yet
    pub async fn ensure_study(&self, study: &StorageName) -> Result<()> {
        let dir = self.study_dir(study);
        tokio::fs::create_dir_all(&dir).await?;
        debug!(study = %study, "Study directory ready");
        Ok(())
    }

    /// Write an upload to its provisional location, replacing any leftover
    pub async fn write_provisional(
        &self,
        study: &StorageName,
        record: &StorageName,
        bytes: &[u8],
    ) -> Result<()> {
        tokio::fs::write(self.provisional_path(study, record), bytes).await?;
        Ok(())
    }

    /// Whether a committed record with this name exists
    pub async fn is_committed(&self, study: &StorageName, record: &StorageName) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.record_path(study, record)).await?)
    }

    /// Promote a provisional file to a committed record
    pub async fn commit(&self, study: &StorageName, record: &StorageName) -> Result<()> {
        tokio::fs::rename(
            self.provisional_path(study, record),
            self.record_path(study, record),
        )
        .await?;
        Ok(())
    }

    /// Demote a committed record back to provisional (undo of [`Store::commit`])
    pub async fn uncommit(&self, study: &StorageName, record: &StorageName) -> Result<()> {
        tokio::fs::rename(
            self.record_path(study, record),
            self.provisional_path(study, record),
        )
        .await?;
        Ok(())
    }

    /// Read a committed record's bytes
    pub async fn read_record(&self, study: &StorageName, record: &StorageName) -> Result<Vec<u8>> {
        read_optional(&self.record_path(study, record))
            .await?
            .ok_or_else(|| Error::NotFound("file not found".to_string()))
    }

    // ========================================
    // Rasters
    // ========================================

    /// Read a persisted raster, `None` when it has not been derived yet
    pub async fn read_raster(
        &self,
        study: &StorageName,
        record: &StorageName,
    ) -> Result<Option<Vec<u8>>> {
        read_optional(&self.raster_path(study, record)).await
    }

    /// Persist a raster atomically (temp file + rename)
    pub async fn write_raster(
        &self,
        study: &StorageName,
        record: &StorageName,
        png: Vec<u8>,
    ) -> Result<()> {
        tokio::fs::create_dir_all(self.raster_dir(study)).await?;

        let target = self.raster_path(study, record);
        tokio::task::spawn_blocking(move || dicomvault_common::fs::write_atomic(&target, &png))
            .await
            .map_err(|e| Error::Internal(format!("Raster write task failed: {}", e)))?
    }
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Io(e)),
    }
}

async fn list_dir<F>(dir: &Path, keep: F) -> Result<Vec<String>>
where
    F: Fn(&std::fs::FileType, &str) -> bool,
{
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if keep(&file_type, &name) {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}
