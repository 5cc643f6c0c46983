//! Filesystem helpers
//!
//! Atomic writes go through a uniquely named temporary file in the target's
//! own directory, followed by a rename onto the final path. A reader that
//! finds a file at the final path therefore always sees complete contents.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::{Error, Result};

/// Suffix carried by every temporary file created by [`write_atomic`]
pub const TEMP_SUFFIX: &str = ".tmp";

/// Write `contents` to `target` atomically
///
/// The parent directory must exist. On any failure the temporary file is
/// removed and `target` is left untouched.
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = temp_path_for(target)?;

    let outcome = write_and_sync(&temp_path, contents)
        .and_then(|()| fs::rename(&temp_path, target));

    if let Err(e) = outcome {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %temp_path.display(),
                    error = %cleanup,
                    "Failed to remove temporary file"
                );
            }
        }
        return Err(Error::Io(e));
    }

    Ok(())
}

/// Build the sibling temporary path used for an atomic write of `target`
///
/// Format: `<file name>.<uuid>.tmp`
pub fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let file_name = target
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("Path has no file name: {}", target.display())))?;

    let mut temp_name = OsString::from(file_name);
    temp_name.push(format!(".{}{}", Uuid::new_v4().simple(), TEMP_SUFFIX));

    Ok(target.with_file_name(temp_name))
}

fn write_and_sync(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
