// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for the timeline.

use crate::easing::Easing;
use crate::error::{validate_time, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Animated property values, keyed by property name.
///
/// Values are opaque to the engine and handed to the player as-is.
pub type Properties = IndexMap<String, serde_json::Value>;

/// Unique identifier for a keyframe
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyframeId(String);

impl KeyframeId {
    /// Create a new random keyframe ID
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

impl Default for KeyframeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for KeyframeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyframeId {
    fn from(id: &str) -> Self {
        Self::from_raw(id)
    }
}

/// A timestamped set of property values
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    id: KeyframeId,
    time: f64,
    properties: Properties,
    easing: Easing,
}

impl Keyframe {
    /// Create a new keyframe at `time` milliseconds with linear easing.
    ///
    /// Fails if `time` is negative or not finite.
    pub fn new(time: f64, properties: Properties) -> Result<Self> {
        Self::from_parts(KeyframeId::new(), time, properties, Easing::Linear)
    }

    /// Build a keyframe with an explicit id
    pub fn from_parts(
        id: KeyframeId,
        time: f64,
        properties: Properties,
        easing: Easing,
    ) -> Result<Self> {
        Ok(Self {
            id,
            time: validate_time(time)?,
            properties,
            easing,
        })
    }

    /// Set the easing used when transitioning into this keyframe
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Keyframe ID
    pub fn id(&self) -> &KeyframeId {
        &self.id
    }

    /// Time in milliseconds from track start
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Animated property values
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Easing into this keyframe
    pub fn easing(&self) -> &Easing {
        &self.easing
    }

    /// Copy this keyframe under a fresh id.
    ///
    /// Properties are deep-copied, so editing the copy never touches the
    /// original.
    pub fn duplicate(&self) -> Self {
        Self {
            id: KeyframeId::new(),
            time: self.time,
            properties: self.properties.clone(),
            easing: self.easing.clone(),
        }
    }

    /// Apply the supplied fields of `update`.
    ///
    /// Validation happens before anything is written, so a rejected update
    /// leaves the keyframe unchanged. The owning track must re-sort
    /// afterwards; use [`crate::Track::update_keyframe`] to get that for free.
    pub fn update(&mut self, update: KeyframeUpdate) -> Result<()> {
        if let Some(time) = update.time {
            validate_time(time)?;
        }

        if let Some(time) = update.time {
            self.time = time;
        }
        if let Some(properties) = update.properties {
            self.properties = properties;
        }
        if let Some(easing) = update.easing {
            self.easing = easing;
        }
        Ok(())
    }
}

/// Partial keyframe update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyframeUpdate {
    /// New time in milliseconds
    pub time: Option<f64>,
    /// Replacement property map
    pub properties: Option<Properties>,
    /// New easing
    pub easing: Option<Easing>,
}

impl KeyframeUpdate {
    /// Empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the new time
    pub fn time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    /// Set the replacement properties
    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Set the new easing
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    /// Whether this update changes nothing
    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.properties.is_none() && self.easing.is_none()
    }
}
