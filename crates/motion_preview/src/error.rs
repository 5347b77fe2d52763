// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the preview tool.

use motion_timeline::TimelineError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while previewing a snapshot
#[derive(Debug, Error)]
pub enum PreviewError {
    /// Timeline rejected the snapshot or a setting
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    /// File could not be read or written
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Settings file is not valid RON
    #[error("Failed to parse settings: {0}")]
    SettingsParse(#[from] ron::error::SpannedError),

    /// Settings could not be written as RON
    #[error("Failed to serialize settings: {0}")]
    SettingsWrite(#[from] ron::Error),

    /// Report could not be written as JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings parsed but hold unusable values
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

impl PreviewError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for preview operations
pub type Result<T> = std::result::Result<T, PreviewError>;
