// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the timeline engine.

use thiserror::Error;

/// Errors produced by timeline operations.
///
/// Validation failures leave the target untouched. Unknown ids are not
/// errors: lookups and removals report them through `Option`/`bool`.
#[derive(Debug, Error)]
pub enum TimelineError {
    /// Keyframe time is negative or not finite
    #[error("Invalid keyframe time: {0} (must be finite and >= 0)")]
    InvalidTime(f64),

    /// Declared duration is negative or not finite
    #[error("Invalid duration: {0} (must be finite and >= 0)")]
    InvalidDuration(f64),

    /// Playback rate is zero, negative or not finite
    #[error("Invalid playback rate: {0} (must be finite and > 0)")]
    InvalidPlaybackRate(f64),

    /// Easing descriptor could not be parsed
    #[error("Invalid easing '{value}': {reason}")]
    InvalidEasing {
        /// Raw easing text
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A keyframe with this id already exists in the track
    #[error("Duplicate keyframe id: {0}")]
    DuplicateKeyframe(String),

    /// A track with this id already exists in the timeline
    #[error("Duplicate track id: {0}")]
    DuplicateTrack(String),

    /// Snapshot version is not understood by this importer
    #[error("Unsupported snapshot version '{found}' (expected '{expected}')")]
    UnsupportedVersion {
        /// Version found in the snapshot
        found: String,
        /// Version this importer understands
        expected: &'static str,
    },

    /// Snapshot content is structurally valid JSON but semantically wrong
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Snapshot could not be parsed or written as JSON
    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Check that a time or duration value is usable.
pub(crate) fn validate_time(time: f64) -> Result<f64> {
    if time.is_finite() && time >= 0.0 {
        Ok(time)
    } else {
        Err(TimelineError::InvalidTime(time))
    }
}

/// Check that a declared duration is usable.
pub(crate) fn validate_duration(duration: f64) -> Result<f64> {
    if duration.is_finite() && duration >= 0.0 {
        Ok(duration)
    } else {
        Err(TimelineError::InvalidDuration(duration))
    }
}

/// Check that a playback rate is usable.
pub(crate) fn validate_rate(rate: f64) -> Result<f64> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(TimelineError::InvalidPlaybackRate(rate))
    }
}
