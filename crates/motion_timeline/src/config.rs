// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline configuration.

use crate::error::{validate_duration, validate_rate, Result};
use crate::player::FillMode;
use serde::{Deserialize, Serialize};

/// Default declared duration in milliseconds
pub const DEFAULT_DURATION: f64 = 1000.0;

/// Construction-time settings for a [`crate::Timeline`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Minimum duration in milliseconds; tracks may extend it
    pub duration: f64,
    /// Restart from 0 instead of completing
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Initial playback rate multiplier
    pub playback_rate: f64,
    /// Fill behaviour requested from animation players
    pub fill: FillMode,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            looping: false,
            playback_rate: 1.0,
            fill: FillMode::Both,
        }
    }
}

impl TimelineConfig {
    /// Config with the given declared duration
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    /// Enable or disable looping
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Set the initial playback rate
    pub fn playback_rate(mut self, rate: f64) -> Self {
        self.playback_rate = rate;
        self
    }

    /// Set the fill behaviour requested from players
    pub fn fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        validate_duration(self.duration)?;
        validate_rate(self.playback_rate)?;
        Ok(())
    }
}
