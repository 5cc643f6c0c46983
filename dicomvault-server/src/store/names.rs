//! Validated storage names
//!
//! Study and file names arrive from clients and become path segments, so
//! they are checked before any filesystem access.

use std::fmt;

use dicomvault_common::fs::TEMP_SUFFIX;

/// Longest accepted name, in bytes
pub const MAX_NAME_LEN: usize = 255;

/// Suffix marking a provisional (uploaded but uncommitted) file
pub const PROVISIONAL_SUFFIX: &str = TEMP_SUFFIX;

/// Why a name was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("name exceeds {} bytes", MAX_NAME_LEN)]
    TooLong,

    #[error("name contains a path separator or NUL")]
    ForbiddenCharacter,

    #[error("name is a relative path component")]
    RelativeComponent,

    #[error("name uses the reserved provisional suffix")]
    ReservedSuffix,
}

/// A study or record name that is safe to use as a single path segment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageName(String);

impl StorageName {
    /// Validate a study name
    ///
    /// Surrounding whitespace is not part of a study name.
    pub fn study(name: &str) -> Result<Self, NameError> {
        let name = name.trim();
        validate_segment(name)?;
        Ok(Self(name.to_string()))
    }

    /// Validate a record (file) name
    ///
    /// Record names additionally must not end in the provisional suffix,
    /// otherwise a committed file would be indistinguishable from an
    /// uncommitted one.
    pub fn record(name: &str) -> Result<Self, NameError> {
        validate_segment(name)?;
        if name.ends_with(PROVISIONAL_SUFFIX) {
            return Err(NameError::ReservedSuffix);
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_segment(name: &str) -> Result<(), NameError> {
    if name.trim().is_empty() {
        return Err(NameError::Empty);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong);
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(NameError::ForbiddenCharacter);
    }
    if name == "." || name == ".." {
        return Err(NameError::RelativeComponent);
    }
    Ok(())
}

impl fmt::Display for StorageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
