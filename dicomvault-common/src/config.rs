//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`DICOMVAULT_ROOT_FOLDER`, then `DICOMVAULT_ROOT`)
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Primary environment variable naming the root folder
pub const ENV_ROOT_FOLDER: &str = "DICOMVAULT_ROOT_FOLDER";

/// Alternative environment variable naming the root folder
pub const ENV_ROOT: &str = "DICOMVAULT_ROOT";

/// Directory (under the root) holding committed and provisional DICOM files
pub const DICOM_SUBDIR: &str = "files/dicom";

/// Directory (under the root) holding derived PNG rasters
pub const PNG_SUBDIR: &str = "files/png";

// ========================================
// Compiled Defaults
// ========================================

/// Built-in defaults used when no configuration source provides a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub port: u16,
    pub bind_address: String,
    pub max_upload_bytes: usize,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            port: DEFAULT_PORT,
            bind_address: "127.0.0.1".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/dicomvault (or /var/lib/dicomvault for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("dicomvault"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/dicomvault"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("dicomvault"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/dicomvault"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("dicomvault"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\dicomvault"))
    } else {
        PathBuf::from("./dicomvault_data")
    }
}

// ========================================
// TOML Bootstrap Configuration
// ========================================

/// Bootstrap configuration loaded from TOML
///
/// Read once at startup; changes require a restart.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Root folder holding `files/dicom` and `files/png`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    /// HTTP listen port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// HTTP bind address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Maximum accepted request body size for uploads, in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default TOML config file location for a module
///
/// On Linux the user config (`~/.config/dicomvault/<module>.toml`) is
/// preferred, falling back to `/etc/dicomvault/<module>.toml` when only the
/// system file exists.
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    let file_name = format!("{}.toml", module_name);
    let user_config = dirs::config_dir().map(|d| d.join("dicomvault").join(&file_name));

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/dicomvault").join(&file_name);
        let user_exists = user_config.as_ref().is_some_and(|p| p.exists());
        if !user_exists && system_config.exists() {
            return Some(system_config);
        }
    }

    user_config
}

/// Load a TOML config file
///
/// Returns an error if the file cannot be read or parsed. Callers that want
/// graceful degradation use [`load_toml_config_or_default`].
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
}

/// Load a TOML config file, falling back to defaults when it is missing or
/// invalid
pub fn load_toml_config_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        debug!("No TOML config path available, using defaults");
        return TomlConfig::default();
    };

    if !path.exists() {
        info!("Config file {} not found, using defaults", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            TomlConfig::default()
        }
    }
}

/// Write a TOML config file atomically (temp + rename)
///
/// On Unix the file is restricted to owner read/write (0600).
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    crate::fs::write_atomic(path, content.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Check whether a TOML file is readable by group or others
#[cfg(unix)]
pub fn check_toml_permissions_loose(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)?.permissions().mode();
    Ok(mode & 0o077 != 0)
}

// ========================================
// Root Folder Resolution
// ========================================

/// Resolves the root folder for a module
pub struct RootFolderResolver {
    module_name: String,
    cli_override: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl RootFolderResolver {
    /// Create a resolver for the given module name
    ///
    /// The module name selects the TOML file (`<module>.toml`).
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_override: None,
            config_path: default_config_path(module_name),
        }
    }

    /// Set a command-line override (highest priority)
    pub fn with_cli_override(mut self, path: Option<PathBuf>) -> Self {
        self.cli_override = path;
        self
    }

    /// Use an explicit TOML config file instead of the default location
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.config_path = path;
        }
        self
    }

    /// Path of the TOML file this resolver consults
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Resolve the root folder
    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_override {
            info!("Root folder: {} (command line)", path.display());
            return path.clone();
        }

        // Priority 2: Environment variables
        for var in [ENV_ROOT_FOLDER, ENV_ROOT] {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    info!("Root folder: {} (environment {})", value, var);
                    return PathBuf::from(value);
                }
            }
        }

        // Priority 3: TOML config file
        let toml_config = load_toml_config_or_default(self.config_path.as_deref());
        if let Some(path) = toml_config.root_folder {
            info!("Root folder: {} (config file)", path.display());
            return path;
        }

        // Priority 4: OS-dependent compiled default
        let path = CompiledDefaults::for_current_platform().root_folder;
        info!(
            module = %self.module_name,
            "Root folder: {} (compiled default)",
            path.display()
        );
        path
    }
}

/// Creates the root folder layout on first start
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Directory holding per-study DICOM files
    pub fn dicom_dir(&self) -> PathBuf {
        self.root_folder.join(DICOM_SUBDIR)
    }

    /// Directory holding per-study derived PNG rasters
    pub fn png_dir(&self) -> PathBuf {
        self.root_folder.join(PNG_SUBDIR)
    }

    /// Create the root folder and both storage trees if missing
    ///
    /// Safe to call repeatedly.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [self.dicom_dir(), self.png_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                Error::Config(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}
