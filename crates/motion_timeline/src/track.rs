// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track definitions for the timeline.

use crate::error::{Result, TimelineError};
use crate::keyframe::{Keyframe, KeyframeId, KeyframeUpdate};
use crate::player::{NormalizedKeyframe, SubjectRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a track
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier (e.g. one restored from a snapshot)
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::from_raw(id)
    }
}

/// An ordered sequence of keyframes bound to one subject.
///
/// Keyframes are always sorted ascending by time. Keyframes sharing a time
/// keep their insertion order, and the first inserted one is compiled first.
#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    /// Display name; also the key used to resolve subjects on import
    pub name: String,
    subject: Option<SubjectRef>,
    keyframes: Vec<Keyframe>,
    /// Disabled tracks are skipped when playback compiles the timeline
    pub enabled: bool,
}

impl Track {
    /// Create a new enabled track without a subject
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(TrackId::new(), name)
    }

    /// Create a track with an explicit id
    pub fn with_id(id: TrackId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            subject: None,
            keyframes: Vec::new(),
            enabled: true,
        }
    }

    /// Bind the track to a subject
    pub fn with_subject(mut self, subject: SubjectRef) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Track ID
    pub fn id(&self) -> &TrackId {
        &self.id
    }

    /// Subject this track animates, if any
    pub fn subject(&self) -> Option<&SubjectRef> {
        self.subject.as_ref()
    }

    /// Replace (or clear) the subject reference
    pub fn set_subject(&mut self, subject: Option<SubjectRef>) {
        self.subject = subject;
    }

    /// Whether this track should take part in playback
    pub fn is_playable(&self) -> bool {
        self.enabled && self.subject.as_ref().is_some_and(|s| s.is_attached())
    }

    /// Add a keyframe, keeping time order.
    ///
    /// Fails if a keyframe with the same id is already present.
    pub fn add_keyframe(&mut self, keyframe: Keyframe) -> Result<()> {
        if self.keyframe(keyframe.id()).is_some() {
            return Err(TimelineError::DuplicateKeyframe(keyframe.id().to_string()));
        }
        self.keyframes.push(keyframe);
        self.sort_keyframes();
        Ok(())
    }

    /// Remove a keyframe, returning it if it existed
    pub fn remove_keyframe(&mut self, keyframe_id: &KeyframeId) -> Option<Keyframe> {
        let idx = self.keyframes.iter().position(|k| k.id() == keyframe_id)?;
        Some(self.keyframes.remove(idx))
    }

    /// Get keyframe by ID
    pub fn keyframe(&self, keyframe_id: &KeyframeId) -> Option<&Keyframe> {
        self.keyframes.iter().find(|k| k.id() == keyframe_id)
    }

    /// Update a keyframe in place and restore time order.
    ///
    /// Returns `Ok(None)` if the keyframe does not exist. A rejected update
    /// leaves the track untouched.
    pub fn update_keyframe(
        &mut self,
        keyframe_id: &KeyframeId,
        update: KeyframeUpdate,
    ) -> Result<Option<&Keyframe>> {
        let Some(kf) = self.keyframes.iter_mut().find(|k| k.id() == keyframe_id) else {
            return Ok(None);
        };
        kf.update(update)?;
        self.sort_keyframes();
        Ok(self.keyframe(keyframe_id))
    }

    /// Sort keyframes by time; `sort_by` is stable so ties keep their order
    fn sort_keyframes(&mut self) {
        self.keyframes.sort_by(|a, b| a.time().total_cmp(&b.time()));
    }

    /// Get all keyframes in time order
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Get keyframe count
    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    /// Time of the latest keyframe, or 0 for an empty track
    pub fn duration(&self) -> f64 {
        self.keyframes
            .iter()
            .map(Keyframe::time)
            .fold(0.0, f64::max)
    }

    /// Compile keyframes into the player format.
    ///
    /// Offsets are `time / timeline_duration`, clamped to `[0, 1]`. A zero
    /// duration maps every keyframe to offset 0.
    pub fn to_normalized(&self, timeline_duration: f64) -> Vec<NormalizedKeyframe> {
        self.keyframes
            .iter()
            .map(|kf| NormalizedKeyframe {
                properties: kf.properties().clone(),
                offset: if timeline_duration > 0.0 {
                    (kf.time() / timeline_duration).clamp(0.0, 1.0)
                } else {
                    0.0
                },
                easing: kf.easing().clone(),
            })
            .collect()
    }

    /// Copy this track under a fresh id.
    ///
    /// Keyframes are deep-copied with new ids; the subject reference is
    /// shared, since the caller owns it.
    pub fn duplicate(&self) -> Self {
        Self {
            id: TrackId::new(),
            name: self.name.clone(),
            subject: self.subject.clone(),
            keyframes: self.keyframes.iter().map(Keyframe::duplicate).collect(),
            enabled: self.enabled,
        }
    }
}
