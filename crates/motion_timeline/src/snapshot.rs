// SPDX-License-Identifier: MIT OR Apache-2.0
//! Portable timeline snapshots.
//!
//! A snapshot is the JSON form of a timeline: configuration, tracks and
//! keyframes with their ids. Subjects are runtime references and are not
//! serialized; on import they are resolved again by track name.

use crate::config::DEFAULT_DURATION;
use crate::easing::Easing;
use crate::error::{validate_duration, Result, TimelineError};
use crate::keyframe::{Keyframe, KeyframeId, Properties};
use crate::player::SubjectRef;
use crate::timeline::Timeline;
use crate::track::{Track, TrackId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Snapshot format version
pub const SNAPSHOT_VERSION: &str = "1.0";

fn default_duration() -> f64 {
    DEFAULT_DURATION
}

fn default_enabled() -> bool {
    true
}

/// Serialized timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    /// Format version, must equal [`SNAPSHOT_VERSION`]; required
    pub version: String,
    /// Declared duration in milliseconds
    #[serde(default = "default_duration")]
    pub duration: f64,
    /// Loop flag
    #[serde(default, rename = "loop")]
    pub looping: bool,
    /// Tracks in timeline order
    #[serde(default)]
    pub tracks: Vec<TrackSnapshot>,
}

/// Serialized track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    /// Track id, preserved on import
    pub id: TrackId,
    /// Track name, used to resolve the subject
    pub name: String,
    /// Enabled flag
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Keyframes in time order
    #[serde(default)]
    pub keyframes: Vec<KeyframeSnapshot>,
}

/// Serialized keyframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeSnapshot {
    /// Keyframe id, preserved on import
    pub id: KeyframeId,
    /// Time in milliseconds
    pub time: f64,
    /// Property values
    #[serde(default)]
    pub properties: Properties,
    /// Easing descriptor
    #[serde(default)]
    pub easing: Easing,
}

impl TimelineSnapshot {
    /// Parse a snapshot from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compact JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Indented JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Total keyframe count across tracks
    pub fn keyframe_count(&self) -> usize {
        self.tracks.iter().map(|t| t.keyframes.len()).sum()
    }

    /// Check the snapshot and build its tracks without touching any timeline
    fn build_tracks(
        &self,
        mut resolve: impl FnMut(&str) -> Option<SubjectRef>,
    ) -> Result<Vec<Track>> {
        if self.version != SNAPSHOT_VERSION {
            return Err(TimelineError::UnsupportedVersion {
                found: self.version.clone(),
                expected: SNAPSHOT_VERSION,
            });
        }
        validate_duration(self.duration)?;

        let mut seen = HashSet::new();
        let mut tracks = Vec::with_capacity(self.tracks.len());
        for data in &self.tracks {
            if !seen.insert(&data.id) {
                return Err(TimelineError::DuplicateTrack(data.id.to_string()));
            }

            let mut track = Track::with_id(data.id.clone(), data.name.clone());
            track.enabled = data.enabled;
            for kf in &data.keyframes {
                let keyframe = Keyframe::from_parts(
                    kf.id.clone(),
                    kf.time,
                    kf.properties.clone(),
                    kf.easing.clone(),
                )
                .map_err(|e| {
                    TimelineError::InvalidSnapshot(format!(
                        "keyframe {} of track '{}': {e}",
                        kf.id, data.name
                    ))
                })?;
                track.add_keyframe(keyframe)?;
            }

            match resolve(&data.name) {
                Some(subject) => track.set_subject(Some(subject)),
                None => tracing::debug!("No subject resolved for track '{}'", data.name),
            }
            tracks.push(track);
        }
        Ok(tracks)
    }
}

impl From<&Track> for TrackSnapshot {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id().clone(),
            name: track.name.clone(),
            enabled: track.enabled,
            keyframes: track.keyframes().iter().map(KeyframeSnapshot::from).collect(),
        }
    }
}

impl From<&Keyframe> for KeyframeSnapshot {
    fn from(keyframe: &Keyframe) -> Self {
        Self {
            id: keyframe.id().clone(),
            time: keyframe.time(),
            properties: keyframe.properties().clone(),
            easing: keyframe.easing().clone(),
        }
    }
}

impl Timeline {
    /// Serialize configuration and tracks.
    ///
    /// The declared duration is exported, not the effective one.
    pub fn export(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            duration: self.declared_duration(),
            looping: self.is_looping(),
            tracks: self.tracks().map(TrackSnapshot::from).collect(),
        }
    }

    /// Replace this timeline's content with `snapshot`.
    ///
    /// The whole snapshot is validated before anything changes; on error
    /// the timeline is untouched. On success playback is stopped, tracks
    /// and keyframes keep their ids, `duration`/`loop` are restored and
    /// `resolve` is asked for each track's subject by track name. A
    /// `trackadded` event is emitted per track.
    pub fn import(
        &mut self,
        snapshot: &TimelineSnapshot,
        resolve: impl FnMut(&str) -> Option<SubjectRef>,
    ) -> Result<()> {
        let tracks = snapshot.build_tracks(resolve)?;
        tracing::info!(
            "Importing snapshot: {} track(s), {} keyframe(s)",
            tracks.len(),
            snapshot.keyframe_count()
        );
        self.replace_content(tracks, snapshot.duration, snapshot.looping);
        Ok(())
    }

    /// Parse JSON and [`import`](Self::import) it
    pub fn import_json(
        &mut self,
        json: &str,
        resolve: impl FnMut(&str) -> Option<SubjectRef>,
    ) -> Result<()> {
        let snapshot = TimelineSnapshot::from_json(json)?;
        self.import(&snapshot, resolve)
    }
}
