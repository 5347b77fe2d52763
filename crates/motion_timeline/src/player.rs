// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation player contract.
//!
//! The timeline never interpolates properties itself. When playback starts it
//! compiles every enabled track into a list of [`NormalizedKeyframe`]s and
//! hands it to a [`PlayerBackend`], which returns an [`AnimationPlayer`] that
//! owns the actual timing. The timeline then only samples player positions
//! from [`crate::Timeline::tick`].
//!
//! [`SimulatedBackend`] is a deterministic implementation driven by a manual
//! [`SimClock`], used by the preview tool and by tests.

use crate::easing::Easing;
use crate::keyframe::Properties;
use crate::track::TrackId;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Opaque handle to the thing a track animates.
///
/// Subjects are owned by the caller; tracks only hold shared references.
pub trait Subject: fmt::Debug {
    /// Human-readable label used in diagnostics
    fn label(&self) -> &str;

    /// Whether the subject can still be animated.
    ///
    /// A subject that reports `false` during playback is dropped from the
    /// running animation.
    fn is_attached(&self) -> bool {
        true
    }
}

/// Shared reference to a caller-owned subject
pub type SubjectRef = Rc<dyn Subject>;

/// Simple named subject
#[derive(Debug)]
pub struct NamedSubject {
    name: String,
    attached: Cell<bool>,
}

impl NamedSubject {
    /// Create an attached subject
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attached: Cell::new(true),
        }
    }

    /// Create an attached subject already wrapped as a [`SubjectRef`]
    pub fn shared(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self::new(name))
    }

    /// Mark the subject as gone (e.g. its element was removed)
    pub fn detach(&self) {
        self.attached.set(false);
    }
}

impl Subject for NamedSubject {
    fn label(&self) -> &str {
        &self.name
    }

    fn is_attached(&self) -> bool {
        self.attached.get()
    }
}

/// A keyframe with its time normalized against the timeline duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedKeyframe {
    /// Property values at this keyframe
    pub properties: Properties,
    /// Position in `[0, 1]`
    pub offset: f64,
    /// Easing into this keyframe
    pub easing: Easing,
}

/// How a player holds values outside its active interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// Values are not held
    None,
    /// Hold the final frame after finishing
    Forwards,
    /// Apply the first frame before starting
    Backwards,
    /// Both of the above
    #[default]
    Both,
}

/// Everything a backend needs to animate one track
#[derive(Debug)]
pub struct AnimationRequest<'a> {
    /// Track being animated
    pub track_id: &'a TrackId,
    /// Subject to animate
    pub subject: &'a SubjectRef,
    /// Compiled keyframes, ordered by offset
    pub keyframes: Vec<NormalizedKeyframe>,
    /// Total duration in milliseconds
    pub duration: f64,
    /// Playback rate multiplier
    pub playback_rate: f64,
    /// Fill behaviour
    pub fill: FillMode,
}

/// A running animation for one subject
pub trait AnimationPlayer {
    /// Start playing from the current position
    fn begin(&mut self);
    /// Freeze at the current position
    fn pause(&mut self);
    /// Continue from the paused position
    fn resume(&mut self);
    /// Abort and release the animation
    fn cancel(&mut self);
    /// Current position in milliseconds
    fn current_time(&self) -> f64;
    /// Jump to a position in milliseconds
    fn set_current_time(&mut self, time: f64);
    /// Change the playback rate
    fn set_playback_rate(&mut self, rate: f64);
    /// Whether the animation reached its end
    fn is_finished(&self) -> bool;
}

/// Factory for animation players
pub trait PlayerBackend {
    /// Create a player for `request`, or `None` if the subject cannot be
    /// animated by this backend.
    fn animate(&mut self, request: AnimationRequest<'_>) -> Option<Box<dyn AnimationPlayer>>;
}

/// Manually advanced clock shared by simulated players
#[derive(Debug, Clone, Default)]
pub struct SimClock(Rc<Cell<f64>>);

impl SimClock {
    /// Clock starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock time in milliseconds
    pub fn now(&self) -> f64 {
        self.0.get()
    }

    /// Move the clock forward
    pub fn advance(&self, ms: f64) {
        self.0.set(self.0.get() + ms.max(0.0));
    }
}

/// Record of one animation request received by [`SimulatedBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Track that was compiled
    pub track_id: TrackId,
    /// Subject label
    pub subject: String,
    /// Compiled keyframes
    pub keyframes: Vec<NormalizedKeyframe>,
    /// Requested duration
    pub duration: f64,
    /// Requested rate
    pub playback_rate: f64,
    /// Requested fill behaviour
    pub fill: FillMode,
}

/// Deterministic backend whose players follow a [`SimClock`]
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    clock: SimClock,
    requests: Rc<RefCell<Vec<RecordedRequest>>>,
}

impl SimulatedBackend {
    /// Backend bound to `clock`
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            requests: Rc::default(),
        }
    }

    /// The clock driving this backend's players
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }
}

impl PlayerBackend for SimulatedBackend {
    fn animate(&mut self, request: AnimationRequest<'_>) -> Option<Box<dyn AnimationPlayer>> {
        self.requests.borrow_mut().push(RecordedRequest {
            track_id: request.track_id.clone(),
            subject: request.subject.label().to_string(),
            keyframes: request.keyframes,
            duration: request.duration,
            playback_rate: request.playback_rate,
            fill: request.fill,
        });

        Some(Box::new(SimulatedPlayer {
            clock: self.clock.clone(),
            duration: request.duration,
            rate: request.playback_rate,
            base: 0.0,
            anchor: None,
            begun: false,
            cancelled: false,
        }))
    }
}

/// Player that advances with a [`SimClock`]
#[derive(Debug)]
struct SimulatedPlayer {
    clock: SimClock,
    duration: f64,
    rate: f64,
    // Position at `anchor`
    base: f64,
    // Clock time when running started; `None` while paused
    anchor: Option<f64>,
    begun: bool,
    cancelled: bool,
}

impl SimulatedPlayer {
    fn raw_position(&self) -> f64 {
        match self.anchor {
            Some(anchor) => self.base + (self.clock.now() - anchor) * self.rate,
            None => self.base,
        }
    }

    fn rebase(&mut self) {
        self.base = self.current_time();
        if self.anchor.is_some() {
            self.anchor = Some(self.clock.now());
        }
    }
}

impl AnimationPlayer for SimulatedPlayer {
    fn begin(&mut self) {
        if self.cancelled {
            return;
        }
        self.begun = true;
        self.anchor = Some(self.clock.now());
    }

    fn pause(&mut self) {
        self.base = self.current_time();
        self.anchor = None;
    }

    fn resume(&mut self) {
        if self.begun && !self.cancelled && self.anchor.is_none() {
            self.anchor = Some(self.clock.now());
        }
    }

    fn cancel(&mut self) {
        self.cancelled = true;
        self.anchor = None;
        self.base = 0.0;
    }

    fn current_time(&self) -> f64 {
        self.raw_position().clamp(0.0, self.duration)
    }

    fn set_current_time(&mut self, time: f64) {
        self.base = time.clamp(0.0, self.duration);
        if self.anchor.is_some() {
            self.anchor = Some(self.clock.now());
        }
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rebase();
        self.rate = rate;
    }

    fn is_finished(&self) -> bool {
        self.begun && !self.cancelled && self.raw_position() >= self.duration
    }
}
