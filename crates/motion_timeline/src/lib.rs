// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe animation timeline engine.
//!
//! A [`Timeline`] owns [`Track`]s; each track binds an ordered list of
//! [`Keyframe`]s to a caller-owned [`Subject`]. Playback compiles enabled
//! tracks into normalized keyframes and delegates interpolation to an
//! [`AnimationPlayer`] created by a [`PlayerBackend`]. The timeline runs the
//! play/pause/stop/seek state machine, reports progress through events and
//! can be exported to and imported from a JSON [`TimelineSnapshot`].
//!
//! ```
//! use motion_timeline::{Keyframe, NamedSubject, Properties, SimClock, SimulatedBackend,
//!     Timeline, TimelineConfig, Track};
//!
//! let clock = SimClock::new();
//! let mut timeline = Timeline::new(TimelineConfig::with_duration(500.0))?
//!     .with_backend(SimulatedBackend::new(clock.clone()));
//!
//! let mut track = Track::new("title").with_subject(NamedSubject::shared("title"));
//! track.add_keyframe(Keyframe::new(0.0, Properties::new())?)?;
//! timeline.add_track(track)?;
//!
//! timeline.play();
//! clock.advance(200.0);
//! timeline.tick();
//! assert_eq!(timeline.current_time(), 200.0);
//! # Ok::<(), motion_timeline::TimelineError>(())
//! ```

pub mod config;
pub mod easing;
pub mod error;
pub mod events;
pub mod keyframe;
pub mod player;
pub mod snapshot;
pub mod timeline;
pub mod track;

pub use config::{TimelineConfig, DEFAULT_DURATION};
pub use easing::Easing;
pub use error::{Result, TimelineError};
pub use events::{EventBus, EventKind, Listener, ListenerId, TimelineEvent};
pub use keyframe::{Keyframe, KeyframeId, KeyframeUpdate, Properties};
pub use player::{
    AnimationPlayer, AnimationRequest, FillMode, NamedSubject, NormalizedKeyframe, PlayerBackend,
    RecordedRequest, SimClock, SimulatedBackend, Subject, SubjectRef,
};
pub use snapshot::{KeyframeSnapshot, TimelineSnapshot, TrackSnapshot, SNAPSHOT_VERSION};
pub use timeline::{PlaybackState, Timeline, TimelineStats};
pub use track::{Track, TrackId};
