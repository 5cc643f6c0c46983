//! # dicomvault common library
//!
//! Shared code for the dicomvault crates:
//! - Error and result types
//! - Root folder resolution and TOML bootstrap configuration
//! - Atomic file writes (temp + rename)

pub mod config;
pub mod error;
pub mod fs;

pub use error::{Error, Result};
