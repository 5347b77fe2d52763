// SPDX-License-Identifier: MIT OR Apache-2.0
//! Preview settings stored as RON.

use crate::error::{PreviewError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Conventional settings file name
pub const SETTINGS_FILE_NAME: &str = "preview.ron";

/// How the simulated run is driven
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// Format version for migration
    pub format_version: u32,
    /// Simulated time between ticks, in milliseconds
    pub frame_interval_ms: f64,
    /// Hard cap on ticks for one run
    pub max_frames: usize,
    /// Number of loop restarts allowed before stopping a looping timeline
    pub max_loops: u32,
    /// Playback rate multiplier
    pub playback_rate: f64,
    /// Log every `timeupdate` at info level instead of trace
    pub log_time_updates: bool,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            format_version: SETTINGS_FORMAT_VERSION,
            frame_interval_ms: 1000.0 / 60.0,
            max_frames: 10_000,
            max_loops: 1,
            playback_rate: 1.0,
            log_time_updates: false,
        }
    }
}

impl PreviewSettings {
    /// Load settings from a RON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PreviewError::io(path, e))?;
        let settings: PreviewSettings = ron::from_str(&content)?;

        if settings.format_version > SETTINGS_FORMAT_VERSION {
            return Err(PreviewError::InvalidSettings(format!(
                "format version {} is newer than supported version {}",
                settings.format_version, SETTINGS_FORMAT_VERSION
            )));
        }
        settings.validate()?;

        tracing::debug!("Loaded preview settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a RON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content).map_err(|e| PreviewError::io(path, e))
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.frame_interval_ms.is_finite() && self.frame_interval_ms > 0.0) {
            return Err(PreviewError::InvalidSettings(format!(
                "frame_interval_ms must be > 0, got {}",
                self.frame_interval_ms
            )));
        }
        if self.max_frames == 0 {
            return Err(PreviewError::InvalidSettings("max_frames must be > 0".into()));
        }
        if !(self.playback_rate.is_finite() && self.playback_rate > 0.0) {
            return Err(PreviewError::InvalidSettings(format!(
                "playback_rate must be > 0, got {}",
                self.playback_rate
            )));
        }
        Ok(())
    }
}
