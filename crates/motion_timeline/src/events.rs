// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline lifecycle events and listener registry.

use crate::keyframe::Keyframe;
use crate::track::Track;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

/// Kind of timeline event, used to subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Playback started or resumed
    Play,
    /// Playback paused
    Pause,
    /// Playback stopped and rewound
    Stop,
    /// A non-looping run reached its end
    Complete,
    /// Playback position changed
    TimeUpdate,
    /// Track added
    TrackAdded,
    /// Track removed
    TrackRemoved,
    /// Keyframe added
    KeyframeAdded,
    /// Keyframe removed
    KeyframeRemoved,
    /// Keyframe updated
    KeyframeUpdated,
    /// Recoverable problem worth surfacing to the user
    Warning,
}

impl EventKind {
    /// Get the event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Complete => "complete",
            Self::TimeUpdate => "timeupdate",
            Self::TrackAdded => "trackadded",
            Self::TrackRemoved => "trackremoved",
            Self::KeyframeAdded => "keyframeadded",
            Self::KeyframeRemoved => "keyframeremoved",
            Self::KeyframeUpdated => "keyframeupdated",
            Self::Warning => "warning",
        }
    }

    /// Get all event kinds
    pub fn all() -> &'static [EventKind] {
        &[
            Self::Play,
            Self::Pause,
            Self::Stop,
            Self::Complete,
            Self::TimeUpdate,
            Self::TrackAdded,
            Self::TrackRemoved,
            Self::KeyframeAdded,
            Self::KeyframeRemoved,
            Self::KeyframeUpdated,
            Self::Warning,
        ]
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown event '{s}'"))
    }
}

/// Event emitted by a timeline
#[derive(Debug, Clone)]
pub enum TimelineEvent {
    /// Playback started or resumed
    Play {
        /// Position at start, in milliseconds
        current_time: f64,
    },
    /// Playback paused
    Pause {
        /// Position when paused
        current_time: f64,
    },
    /// Playback stopped and rewound to 0
    Stop,
    /// A non-looping run reached its end
    Complete,
    /// Playback position changed
    TimeUpdate {
        /// New position
        current_time: f64,
    },
    /// Track added
    TrackAdded {
        /// The added track
        track: Track,
    },
    /// Track removed
    TrackRemoved {
        /// The removed track
        track: Track,
    },
    /// Keyframe added to a track
    KeyframeAdded {
        /// Owning track after the change
        track: Track,
        /// The added keyframe
        keyframe: Keyframe,
    },
    /// Keyframe removed from a track
    KeyframeRemoved {
        /// Owning track after the change
        track: Track,
        /// The removed keyframe
        keyframe: Keyframe,
    },
    /// Keyframe changed
    KeyframeUpdated {
        /// Owning track after the change
        track: Track,
        /// The keyframe after the change
        keyframe: Keyframe,
    },
    /// Recoverable problem (no player, lost subject, ...)
    Warning {
        /// Diagnostic message
        message: String,
    },
}

impl TimelineEvent {
    /// Get the kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Play { .. } => EventKind::Play,
            Self::Pause { .. } => EventKind::Pause,
            Self::Stop => EventKind::Stop,
            Self::Complete => EventKind::Complete,
            Self::TimeUpdate { .. } => EventKind::TimeUpdate,
            Self::TrackAdded { .. } => EventKind::TrackAdded,
            Self::TrackRemoved { .. } => EventKind::TrackRemoved,
            Self::KeyframeAdded { .. } => EventKind::KeyframeAdded,
            Self::KeyframeRemoved { .. } => EventKind::KeyframeRemoved,
            Self::KeyframeUpdated { .. } => EventKind::KeyframeUpdated,
            Self::Warning { .. } => EventKind::Warning,
        }
    }

    /// Playback position carried by the event, if any
    pub fn current_time(&self) -> Option<f64> {
        match self {
            Self::Play { current_time }
            | Self::Pause { current_time }
            | Self::TimeUpdate { current_time } => Some(*current_time),
            _ => None,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback type for timeline events
pub type Listener = Box<dyn FnMut(&TimelineEvent)>;

struct Registration {
    id: ListenerId,
    /// `None` listens to every event
    kind: Option<EventKind>,
    callback: Listener,
}

/// Ordered listener registry.
///
/// Listeners run synchronously in registration order. A panicking listener
/// is logged and skipped; the remaining listeners still run.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Registration>,
    next_id: u64,
}

impl EventBus {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one event kind
    pub fn on(&mut self, kind: EventKind, callback: impl FnMut(&TimelineEvent) + 'static) -> ListenerId {
        self.register(Some(kind), Box::new(callback))
    }

    /// Register a listener for every event kind
    pub fn on_any(&mut self, callback: impl FnMut(&TimelineEvent) + 'static) -> ListenerId {
        self.register(None, Box::new(callback))
    }

    fn register(&mut self, kind: Option<EventKind>, callback: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Registration { id, kind, callback });
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|r| r.id != id);
        self.listeners.len() != before
    }

    /// Number of listeners that would receive `kind`
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .iter()
            .filter(|r| r.kind.map_or(true, |k| k == kind))
            .count()
    }

    /// Remove every listener
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Deliver `event` to every matching listener
    pub fn emit(&mut self, event: &TimelineEvent) {
        let kind = event.kind();
        for registration in &mut self.listeners {
            if registration.kind.is_some_and(|k| k != kind) {
                continue;
            }

            let callback = &mut registration.callback;
            if panic::catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                tracing::error!("Listener {:?} panicked while handling '{}'", registration.id, kind);
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
