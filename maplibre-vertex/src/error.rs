//! Errors which can happen in various parts of the library.

use std::io;

use thiserror::Error;

/// Errors of the fallible boundaries of the crate. Tessellation itself never fails; malformed
/// geometry is skipped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to read settings: {0}")]
    Io(#[from] io::Error),
    #[error("unable to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("texture upload failed: {0}")]
    Upload(String),
}
