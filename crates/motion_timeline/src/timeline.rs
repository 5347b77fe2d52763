// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline containing tracks, with a playback state machine.
//!
//! Playback is cooperative: after [`Timeline::play`] the host calls
//! [`Timeline::tick`] once per frame (or from a timer, or a test clock) for
//! as long as it returns `true`. Each tick samples the reference player and
//! emits `timeupdate`; reaching the end either completes the run or restarts
//! it when looping.

use crate::config::TimelineConfig;
use crate::error::{validate_duration, validate_rate, Result, TimelineError};
use crate::events::{EventBus, EventKind, ListenerId, TimelineEvent};
use crate::keyframe::{Keyframe, KeyframeId, KeyframeUpdate};
use crate::player::{
    AnimationPlayer, AnimationRequest, FillMode, NormalizedKeyframe, PlayerBackend, SubjectRef,
};
use crate::track::{Track, TrackId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Not playing; initial state and the state after `stop()`
    #[default]
    Idle,
    /// Players are running
    Playing,
    /// Players are frozen
    Paused,
    /// A non-looping run reached its end
    Completed,
}

impl PlaybackState {
    /// Get the state name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    /// Check if playing or paused
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// Summary of a timeline's content and playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineStats {
    /// Effective duration in milliseconds
    pub duration: f64,
    /// Number of tracks
    pub track_count: usize,
    /// Number of enabled tracks
    pub enabled_track_count: usize,
    /// Keyframes across all tracks
    pub total_keyframes: usize,
    /// Playback state
    pub state: PlaybackState,
    /// Playback position
    pub current_time: f64,
    /// Playback rate multiplier
    pub playback_rate: f64,
}

/// A player animating one track during a run
struct ActivePlayer {
    track_id: TrackId,
    subject: SubjectRef,
    player: Box<dyn AnimationPlayer>,
}

/// A set of tracks with playback configuration and state
pub struct Timeline {
    tracks: IndexMap<TrackId, Track>,
    declared_duration: f64,
    looping: bool,
    current_time: f64,
    playback_rate: f64,
    fill: FillMode,
    state: PlaybackState,
    backend: Option<Box<dyn PlayerBackend>>,
    /// Players of the current run; the first one is the timing reference
    active: Vec<ActivePlayer>,
    events: EventBus,
}

impl Timeline {
    /// Create an empty timeline without a player backend
    pub fn new(config: TimelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(&config))
    }

    /// Build from a config that has already been validated
    fn from_config(config: &TimelineConfig) -> Self {
        Self {
            tracks: IndexMap::new(),
            declared_duration: config.duration,
            looping: config.looping,
            current_time: 0.0,
            playback_rate: config.playback_rate,
            fill: config.fill,
            state: PlaybackState::Idle,
            backend: None,
            active: Vec::new(),
            events: EventBus::new(),
        }
    }

    /// Attach the backend that creates animation players
    pub fn with_backend(mut self, backend: impl PlayerBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Replace (or remove) the player backend; stops any running playback
    pub fn set_backend(&mut self, backend: Option<Box<dyn PlayerBackend>>) {
        if self.state.is_active() {
            self.stop();
        }
        self.backend = backend;
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    /// Subscribe to one event kind
    pub fn on(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&TimelineEvent) + 'static,
    ) -> ListenerId {
        self.events.on(kind, callback)
    }

    /// Subscribe to every event
    pub fn on_any(&mut self, callback: impl FnMut(&TimelineEvent) + 'static) -> ListenerId {
        self.events.on_any(callback)
    }

    /// Unsubscribe; returns false if the listener was not registered
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    fn emit(&mut self, event: TimelineEvent) {
        self.events.emit(&event);
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.emit(TimelineEvent::Warning { message });
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    /// Declared minimum duration in milliseconds
    pub fn declared_duration(&self) -> f64 {
        self.declared_duration
    }

    /// Set the declared minimum duration
    pub fn set_duration(&mut self, duration: f64) -> Result<()> {
        self.declared_duration = validate_duration(duration)?;
        self.clamp_current_time();
        Ok(())
    }

    /// Effective duration: the declared duration or the longest track
    pub fn duration(&self) -> f64 {
        self.tracks
            .values()
            .map(Track::duration)
            .fold(self.declared_duration, f64::max)
    }

    /// Whether the timeline restarts instead of completing
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Enable or disable looping
    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Playback rate multiplier
    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    /// Change the playback rate, propagating it to running players
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.playback_rate = validate_rate(rate)?;
        for active in &mut self.active {
            active.player.set_playback_rate(rate);
        }
        Ok(())
    }

    /// Fill behaviour requested from players
    pub fn fill_mode(&self) -> FillMode {
        self.fill
    }

    /// Change the fill behaviour; takes effect at the next `play()`
    pub fn set_fill_mode(&mut self, fill: FillMode) {
        self.fill = fill;
    }

    /// Playback position in milliseconds
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Check if playing (and not paused)
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    /// Number of players in the current run
    pub fn active_player_count(&self) -> usize {
        self.active.len()
    }

    fn clamp_current_time(&mut self) {
        self.current_time = self.current_time.clamp(0.0, self.duration());
    }

    // ---------------------------------------------------------------------
    // Tracks and keyframes
    // ---------------------------------------------------------------------

    /// Add a track; fails if a track with the same id exists
    pub fn add_track(&mut self, track: Track) -> Result<TrackId> {
        let id = track.id().clone();
        if self.tracks.contains_key(&id) {
            return Err(TimelineError::DuplicateTrack(id.to_string()));
        }
        self.tracks.insert(id.clone(), track.clone());
        self.emit(TimelineEvent::TrackAdded { track });
        Ok(id)
    }

    /// Remove a track, returning it if it existed.
    ///
    /// A player animating the track is cancelled.
    pub fn remove_track(&mut self, track_id: &TrackId) -> Option<Track> {
        let track = self.tracks.shift_remove(track_id)?;
        self.active.retain_mut(|active| {
            if &active.track_id == track_id {
                active.player.cancel();
                false
            } else {
                true
            }
        });
        self.clamp_current_time();
        self.emit(TimelineEvent::TrackRemoved {
            track: track.clone(),
        });
        Some(track)
    }

    /// Get a track
    pub fn track(&self, track_id: &TrackId) -> Option<&Track> {
        self.tracks.get(track_id)
    }

    /// Get all tracks in insertion order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Enable or disable a track; returns false if it does not exist.
    ///
    /// Takes effect at the next `play()`.
    pub fn set_track_enabled(&mut self, track_id: &TrackId, enabled: bool) -> bool {
        match self.tracks.get_mut(track_id) {
            Some(track) => {
                track.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Rebind a track to another subject; returns false if it does not exist
    pub fn set_track_subject(&mut self, track_id: &TrackId, subject: Option<SubjectRef>) -> bool {
        match self.tracks.get_mut(track_id) {
            Some(track) => {
                track.set_subject(subject);
                true
            }
            None => false,
        }
    }

    /// Get a keyframe of a track
    pub fn keyframe(&self, track_id: &TrackId, keyframe_id: &KeyframeId) -> Option<&Keyframe> {
        self.tracks.get(track_id)?.keyframe(keyframe_id)
    }

    /// Add a keyframe to a track.
    ///
    /// Returns `Ok(false)` without side effects if the track does not exist.
    pub fn add_keyframe(&mut self, track_id: &TrackId, keyframe: Keyframe) -> Result<bool> {
        let Some(track) = self.tracks.get_mut(track_id) else {
            tracing::debug!("add_keyframe: unknown track {}", track_id);
            return Ok(false);
        };
        track.add_keyframe(keyframe.clone())?;
        let track = track.clone();
        self.emit(TimelineEvent::KeyframeAdded { track, keyframe });
        Ok(true)
    }

    /// Remove a keyframe from a track, returning it if it existed
    pub fn remove_keyframe(
        &mut self,
        track_id: &TrackId,
        keyframe_id: &KeyframeId,
    ) -> Option<Keyframe> {
        let track = self.tracks.get_mut(track_id)?;
        let keyframe = track.remove_keyframe(keyframe_id)?;
        let track = track.clone();
        self.clamp_current_time();
        self.emit(TimelineEvent::KeyframeRemoved {
            track,
            keyframe: keyframe.clone(),
        });
        Some(keyframe)
    }

    /// Update a keyframe and re-sort its track.
    ///
    /// Returns `Ok(false)` if the track or keyframe does not exist. Invalid
    /// updates are rejected without side effects or events.
    pub fn update_keyframe(
        &mut self,
        track_id: &TrackId,
        keyframe_id: &KeyframeId,
        update: KeyframeUpdate,
    ) -> Result<bool> {
        let Some(track) = self.tracks.get_mut(track_id) else {
            return Ok(false);
        };
        let Some(keyframe) = track.update_keyframe(keyframe_id, update)?.cloned() else {
            return Ok(false);
        };
        let track = track.clone();
        self.clamp_current_time();
        self.emit(TimelineEvent::KeyframeUpdated { track, keyframe });
        Ok(true)
    }

    /// Compile every playable track into the player format
    pub fn compile(&self) -> Vec<(TrackId, Vec<NormalizedKeyframe>)> {
        let duration = self.duration();
        self.tracks
            .values()
            .filter(|t| t.is_playable())
            .map(|t| (t.id().clone(), t.to_normalized(duration)))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Playback
    // ---------------------------------------------------------------------

    /// Start playback from the current position.
    ///
    /// No-op while already playing; resumes when paused. From `Idle` or
    /// `Completed` it starts from `current_time()`, except that a completed
    /// run still sitting at its end restarts from 0: starting players at
    /// `duration()` would finish them on the next tick without showing
    /// anything. After a seek in `Completed` the seeked position is used.
    /// Without a backend or any enabled track with a live subject this only
    /// emits a warning and the state is unchanged.
    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Playing => return,
            PlaybackState::Paused => {
                self.resume();
                return;
            }
            PlaybackState::Idle | PlaybackState::Completed => {}
        }

        let restart =
            self.state == PlaybackState::Completed && self.current_time >= self.duration();
        let start_at = if restart { 0.0 } else { self.current_time };

        if !self.start_players(start_at) {
            return;
        }

        self.current_time = start_at;
        self.state = PlaybackState::Playing;
        tracing::debug!(
            "Playback started at {}ms with {} player(s)",
            start_at,
            self.active.len()
        );
        self.emit(TimelineEvent::Play {
            current_time: self.current_time,
        });
    }

    /// Compile tracks and start one player per playable track.
    ///
    /// Returns false if nothing could be started.
    fn start_players(&mut self, start_at: f64) -> bool {
        self.cancel_players();

        if self.backend.is_none() {
            self.warn("No animation player backend available; play() ignored");
            return false;
        }

        let duration = self.duration();
        let mut started = Vec::new();
        let mut rejected = Vec::new();
        for track in self.tracks.values().filter(|t| t.is_playable()) {
            let Some(subject) = track.subject() else {
                continue;
            };
            let request = AnimationRequest {
                track_id: track.id(),
                subject,
                keyframes: track.to_normalized(duration),
                duration,
                playback_rate: self.playback_rate,
                fill: self.fill,
            };
            let player = self
                .backend
                .as_mut()
                .and_then(|backend| backend.animate(request));
            match player {
                Some(player) => started.push(ActivePlayer {
                    track_id: track.id().clone(),
                    subject: subject.clone(),
                    player,
                }),
                None => rejected.push(track.name.clone()),
            }
        }

        for name in rejected {
            self.warn(format!("Player backend could not animate track '{name}'"));
        }
        if started.is_empty() {
            self.warn("No enabled tracks with subjects to animate; play() ignored");
            return false;
        }

        for active in &mut started {
            active.player.set_playback_rate(self.playback_rate);
            if start_at > 0.0 {
                active.player.set_current_time(start_at);
            }
            active.player.begin();
        }
        self.active = started;
        true
    }

    fn cancel_players(&mut self) {
        for mut active in self.active.drain(..) {
            active.player.cancel();
        }
    }

    /// Pause playback; no-op unless playing
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        if let Some(reference) = self.active.first() {
            self.current_time = reference.player.current_time().clamp(0.0, self.duration());
        }
        for active in &mut self.active {
            active.player.pause();
        }
        self.state = PlaybackState::Paused;
        self.emit(TimelineEvent::Pause {
            current_time: self.current_time,
        });
    }

    /// Resume paused playback; no-op unless paused
    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        for active in &mut self.active {
            active.player.resume();
        }
        self.state = PlaybackState::Playing;
        self.emit(TimelineEvent::Play {
            current_time: self.current_time,
        });
    }

    /// Cancel all players and rewind to 0. Safe to call in any state.
    pub fn stop(&mut self) {
        self.cancel_players();
        self.current_time = 0.0;
        self.state = PlaybackState::Idle;
        self.emit(TimelineEvent::Stop);
    }

    /// Move the playback position, clamped to `[0, duration()]`.
    ///
    /// The state is unchanged; running players jump to the new position.
    pub fn seek(&mut self, time: f64) {
        if time.is_nan() {
            self.warn("Ignoring seek to NaN");
            return;
        }
        self.current_time = time.clamp(0.0, self.duration());
        for active in &mut self.active {
            active.player.set_current_time(self.current_time);
        }
        self.emit(TimelineEvent::TimeUpdate {
            current_time: self.current_time,
        });
    }

    /// Advance the progress loop by one step.
    ///
    /// Returns true while the host should keep ticking.
    pub fn tick(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }

        self.drop_detached_players();
        let Some(reference) = self.active.first() else {
            self.warn("No animated subjects left; stopping playback");
            self.stop();
            return false;
        };

        // The duration may have shrunk since the players were compiled
        let duration = self.duration();
        let position = reference.player.current_time();
        if reference.player.is_finished() || position >= duration {
            return self.finish_run(duration);
        }

        self.current_time = position.max(0.0);
        self.emit(TimelineEvent::TimeUpdate {
            current_time: self.current_time,
        });
        true
    }

    fn finish_run(&mut self, duration: f64) -> bool {
        if self.looping {
            self.cancel_players();
            self.current_time = 0.0;
            self.state = PlaybackState::Idle;
            self.play();
            return self.is_playing();
        }

        self.current_time = duration;
        self.state = PlaybackState::Completed;
        tracing::debug!("Playback completed at {}ms", duration);
        self.emit(TimelineEvent::Complete);
        false
    }

    /// Cancel players whose subject is gone; the track sits out the rest of
    /// the run.
    fn drop_detached_players(&mut self) {
        let mut lost = Vec::new();
        self.active.retain_mut(|active| {
            if active.subject.is_attached() {
                return true;
            }
            active.player.cancel();
            lost.push(active.track_id.clone());
            false
        });

        for track_id in lost {
            let name = self
                .tracks
                .get(&track_id)
                .map_or_else(|| track_id.to_string(), |t| t.name.clone());
            self.warn(format!(
                "Subject of track '{name}' is no longer available; track disabled for this run"
            ));
        }
    }

    /// Stop playback and remove every track
    pub fn clear(&mut self) {
        self.stop();
        self.tracks.clear();
        self.current_time = 0.0;
    }

    // ---------------------------------------------------------------------
    // Misc
    // ---------------------------------------------------------------------

    /// Summary of content and playback
    pub fn stats(&self) -> TimelineStats {
        TimelineStats {
            duration: self.duration(),
            track_count: self.tracks.len(),
            enabled_track_count: self.tracks.values().filter(|t| t.enabled).count(),
            total_keyframes: self.tracks.values().map(Track::keyframe_count).sum(),
            state: self.state,
            current_time: self.current_time,
            playback_rate: self.playback_rate,
        }
    }

    /// Copy configuration and tracks into a new idle timeline.
    ///
    /// Tracks and keyframes get fresh ids; subjects are shared. Listeners
    /// and the player backend are not copied.
    pub fn duplicate(&self) -> Self {
        let config = TimelineConfig {
            duration: self.declared_duration,
            looping: self.looping,
            playback_rate: self.playback_rate,
            fill: self.fill,
        };
        let mut copy = Self::from_config(&config);
        copy.tracks = self
            .tracks
            .values()
            .map(|t| {
                let track = t.duplicate();
                (track.id().clone(), track)
            })
            .collect();
        copy
    }

    /// Replace all tracks and configuration in one step.
    ///
    /// Used by snapshot import once the snapshot has been fully validated.
    pub(crate) fn replace_content(&mut self, tracks: Vec<Track>, duration: f64, looping: bool) {
        self.stop();
        self.tracks.clear();
        self.declared_duration = duration;
        self.looping = looping;
        for track in tracks {
            let id = track.id().clone();
            self.tracks.insert(id, track.clone());
            self.emit(TimelineEvent::TrackAdded { track });
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::from_config(&TimelineConfig::default())
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("tracks", &self.tracks.len())
            .field("declared_duration", &self.declared_duration)
            .field("looping", &self.looping)
            .field("current_time", &self.current_time)
            .field("playback_rate", &self.playback_rate)
            .field("state", &self.state)
            .field("has_backend", &self.backend.is_some())
            .field("active_players", &self.active.len())
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use crate::keyframe::Properties;
    use crate::player::{NamedSubject, SimClock, SimulatedBackend};
    use proptest::prelude::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    type EventLog = Rc<RefCell<Vec<TimelineEvent>>>;

    fn opacity(value: f64) -> Properties {
        Properties::from([("opacity".to_string(), json!(value))])
    }

    fn fade_track(name: &str, end: f64) -> (Track, Rc<NamedSubject>) {
        let subject = NamedSubject::shared(name);
        let mut track = Track::new(name).with_subject(subject.clone());
        track
            .add_keyframe(Keyframe::new(0.0, opacity(0.0)).unwrap())
            .unwrap();
        track
            .add_keyframe(Keyframe::new(end, opacity(1.0)).unwrap())
            .unwrap();
        (track, subject)
    }

    fn timeline(config: TimelineConfig) -> (Timeline, SimClock, EventLog) {
        let clock = SimClock::new();
        let mut timeline = Timeline::new(config)
            .unwrap()
            .with_backend(SimulatedBackend::new(clock.clone()));
        let log: EventLog = Rc::default();
        let l = log.clone();
        timeline.on_any(move |e| l.borrow_mut().push(e.clone()));
        (timeline, clock, log)
    }

    fn count(log: &EventLog, kind: EventKind) -> usize {
        log.borrow().iter().filter(|e| e.kind() == kind).count()
    }

    #[test]
    fn test_duration_derivation() {
        let mut tl = Timeline::new(TimelineConfig::with_duration(1000.0)).unwrap();
        assert_eq!(tl.duration(), 1000.0);

        let (short, _s1) = fade_track("short", 400.0);
        tl.add_track(short).unwrap();
        assert_eq!(tl.duration(), 1000.0);

        let (long, _s2) = fade_track("long", 2500.0);
        let long_id = tl.add_track(long).unwrap();
        assert_eq!(tl.duration(), 2500.0);

        tl.remove_track(&long_id);
        assert_eq!(tl.duration(), 1000.0);
    }

    #[test]
    fn test_play_without_tracks_is_noop() {
        let (mut tl, _clock, log) = timeline(TimelineConfig::with_duration(1000.0));
        tl.play();
        assert_eq!(tl.state(), PlaybackState::Idle);
        assert_eq!(count(&log, EventKind::Play), 0);
        assert_eq!(count(&log, EventKind::Warning), 1);
        assert!(!tl.tick());
    }

    #[test]
    fn test_play_without_backend_is_noop() {
        let mut tl = Timeline::new(TimelineConfig::default()).unwrap();
        let (track, _subject) = fade_track("box", 500.0);
        tl.add_track(track).unwrap();
        tl.play();
        assert_eq!(tl.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_play_skips_disabled_and_unbound_tracks() {
        let (mut tl, _clock, log) = timeline(TimelineConfig::default());
        let (mut disabled, _s) = fade_track("disabled", 500.0);
        disabled.enabled = false;
        tl.add_track(disabled).unwrap();
        tl.add_track(Track::new("unbound")).unwrap();

        tl.play();
        assert_eq!(tl.state(), PlaybackState::Idle);
        assert_eq!(count(&log, EventKind::Play), 0);
        assert!(tl.compile().is_empty());
    }

    #[test]
    fn test_play_is_idempotent() {
        let (mut tl, _clock, log) = timeline(TimelineConfig::default());
        let (track, _subject) = fade_track("box", 500.0);
        tl.add_track(track).unwrap();

        tl.play();
        tl.play();
        assert_eq!(count(&log, EventKind::Play), 1);
        assert_eq!(tl.active_player_count(), 1);
        assert!(tl.is_playing());
    }

    #[test]
    fn test_tick_reports_player_position() {
        let (mut tl, clock, log) = timeline(TimelineConfig::with_duration(1000.0));
        let (track, _subject) = fade_track("box", 1000.0);
        tl.add_track(track).unwrap();
        tl.play();

        clock.advance(250.0);
        assert!(tl.tick());
        assert_eq!(tl.current_time(), 250.0);

        clock.advance(250.0);
        assert!(tl.tick());
        assert_eq!(tl.current_time(), 500.0);

        let times: Vec<f64> = log
            .borrow()
            .iter()
            .filter(|e| e.kind() == EventKind::TimeUpdate)
            .filter_map(TimelineEvent::current_time)
            .collect();
        assert_eq!(times, vec![250.0, 500.0]);
    }

    #[test]
    fn test_completion_without_loop() {
        let (mut tl, clock, log) = timeline(TimelineConfig::with_duration(1000.0));
        let (track, _subject) = fade_track("box", 1000.0);
        tl.add_track(track).unwrap();
        tl.play();

        clock.advance(1200.0);
        assert!(!tl.tick());
        assert_eq!(tl.state(), PlaybackState::Completed);
        assert_eq!(tl.current_time(), 1000.0);

        assert!(!tl.tick());
        assert_eq!(count(&log, EventKind::Complete), 1);
    }

    #[test]
    fn test_loop_restarts_without_complete() {
        let (mut tl, clock, log) = timeline(TimelineConfig::with_duration(1000.0).looping(true));
        let (track, _subject) = fade_track("box", 1000.0);
        tl.add_track(track).unwrap();
        tl.play();

        clock.advance(1000.0);
        assert!(tl.tick());
        assert!(tl.is_playing());
        assert_eq!(tl.current_time(), 0.0);
        assert_eq!(count(&log, EventKind::Complete), 0);
        assert_eq!(count(&log, EventKind::Play), 2);

        clock.advance(300.0);
        assert!(tl.tick());
        assert_eq!(tl.current_time(), 300.0);
    }

    #[test]
    fn test_pause_and_resume() {
        let (mut tl, clock, log) = timeline(TimelineConfig::with_duration(1000.0));
        let (track, _subject) = fade_track("box", 1000.0);
        tl.add_track(track).unwrap();

        // Pausing while idle does nothing
        tl.pause();
        assert_eq!(count(&log, EventKind::Pause), 0);

        tl.play();
        clock.advance(200.0);
        tl.pause();
        assert!(tl.is_paused());
        assert_eq!(tl.current_time(), 200.0);
        tl.pause();
        assert_eq!(count(&log, EventKind::Pause), 1);

        clock.advance(500.0);
        assert!(!tl.tick());
        assert_eq!(tl.current_time(), 200.0);

        tl.resume();
        assert!(tl.is_playing());
        assert_eq!(count(&log, EventKind::Play), 2);
        clock.advance(100.0);
        assert!(tl.tick());
        assert_eq!(tl.current_time(), 300.0);
    }

    #[test]
    fn test_play_while_paused_resumes() {
        let (mut tl, clock, _log) = timeline(TimelineConfig::with_duration(1000.0));
        let (track, _subject) = fade_track("box", 1000.0);
        tl.add_track(track).unwrap();
        tl.play();
        clock.advance(100.0);
        tl.pause();
        tl.play();
        assert!(tl.is_playing());
        clock.advance(100.0);
        tl.tick();
        assert_eq!(tl.current_time(), 200.0);
    }

    #[test]
    fn test_stop_rewinds() {
        let (mut tl, clock, log) = timeline(TimelineConfig::with_duration(1000.0));
        let (track, _subject) = fade_track("box", 1000.0);
        tl.add_track(track).unwrap();
        tl.play();
        clock.advance(400.0);
        tl.tick();

        tl.stop();
        assert_eq!(tl.state(), PlaybackState::Idle);
        assert_eq!(tl.current_time(), 0.0);
        assert_eq!(tl.active_player_count(), 0);
        assert_eq!(count(&log, EventKind::Stop), 1);

        // Always safe
        tl.stop();
        assert_eq!(count(&log, EventKind::Stop), 2);
    }

    #[test]
    fn test_seek_clamps() {
        let (mut tl, _clock, log) = timeline(TimelineConfig::with_duration(1000.0));
        tl.seek(-50.0);
        assert_eq!(tl.current_time(), 0.0);
        tl.seek(5000.0);
        assert_eq!(tl.current_time(), 1000.0);
        tl.seek(f64::NAN);
        assert_eq!(tl.current_time(), 1000.0);
        assert_eq!(count(&log, EventKind::TimeUpdate), 2);
    }

    #[test]
    fn test_seek_syncs_running_player() {
        let (mut tl, clock, _log) = timeline(TimelineConfig::with_duration(1000.0));
        let (track, _subject) = fade_track("box", 1000.0);
        tl.add_track(track).unwrap();
        tl.play();
        clock.advance(100.0);
        tl.seek(600.0);
        clock.advance(50.0);
        tl.tick();
        assert_eq!(tl.current_time(), 650.0);
    }

    #[test]
    fn test_play_from_staged_position() {
        let (mut tl, clock, log) = timeline(TimelineConfig::with_duration(1000.0));
        let (track, _subject) = fade_track("box", 1000.0);
        tl.add_track(track).unwrap();
        tl.seek(400.0);
        tl.play();

        let play_time = log
            .borrow()
            .iter()
            .find(|e| e.kind() == EventKind::Play)
            .and_then(TimelineEvent::current_time);
        assert_eq!(play_time, Some(400.0));

        clock.advance(100.0);
        tl.tick();
        assert_eq!(tl.current_time(), 500.0);
    }

    #[test]
    fn test_play_after_complete_restarts() {
        let (mut tl, clock, _log) = timeline(TimelineConfig::with_duration(500.0));
        let (track, _subject) = fade_track("box", 500.0);
        tl.add_track(track).unwrap();
        tl.play();
        clock.advance(600.0);
        tl.tick();
        assert_eq!(tl.state(), PlaybackState::Completed);

        tl.play();
        assert!(tl.is_playing());
        assert_eq!(tl.current_time(), 0.0);
        clock.advance(100.0);
        tl.tick();
        assert_eq!(tl.current_time(), 100.0);
    }

    #[test]
    fn test_seek_while_paused_keeps_state() {
        let (mut tl, clock, log) = timeline(TimelineConfig::with_duration(1000.0));
        let (track, _subject) = fade_track("box", 1000.0);
        tl.add_track(track).unwrap();
        tl.play();
        clock.advance(200.0);
        tl.pause();

        tl.seek(700.0);
        assert!(tl.is_paused());
        assert_eq!(tl.current_time(), 700.0);
        clock.advance(300.0);
        assert!(!tl.tick());
        assert_eq!(tl.current_time(), 700.0);
        assert_eq!(count(&log, EventKind::Play), 1);

        tl.resume();
        clock.advance(100.0);
        assert!(tl.tick());
        assert_eq!(tl.current_time(), 800.0);
    }

    #[test]
    fn test_seek_after_complete_then_play() {
        let (mut tl, clock, log) = timeline(TimelineConfig::with_duration(500.0));
        let (track, _subject) = fade_track("box", 500.0);
        tl.add_track(track).unwrap();
        tl.play();
        clock.advance(600.0);
        tl.tick();
        assert_eq!(tl.state(), PlaybackState::Completed);

        tl.seek(200.0);
        assert_eq!(tl.state(), PlaybackState::Completed);
        assert_eq!(tl.current_time(), 200.0);

        tl.play();
        assert!(tl.is_playing());
        let play_times: Vec<f64> = log
            .borrow()
            .iter()
            .filter(|e| e.kind() == EventKind::Play)
            .filter_map(TimelineEvent::current_time)
            .collect();
        assert_eq!(play_times, vec![0.0, 200.0]);

        clock.advance(100.0);
        assert!(tl.tick());
        assert_eq!(tl.current_time(), 300.0);
    }

    #[test]
    fn test_completes_when_duration_shrinks_mid_run() {
        let (mut tl, clock, log) = timeline(TimelineConfig::with_duration(300.0));
        let (short, _a) = fade_track("short", 300.0);
        let (long, _b) = fade_track("long", 1000.0);
        tl.add_track(short).unwrap();
        let long_id = tl.add_track(long).unwrap();
        tl.play();

        clock.advance(400.0);
        assert!(tl.tick());
        assert_eq!(tl.current_time(), 400.0);

        // The reference player was compiled for 1000ms and is not finished
        tl.remove_track(&long_id);
        assert!(!tl.tick());
        assert_eq!(tl.state(), PlaybackState::Completed);
        assert_eq!(tl.current_time(), 300.0);
        assert_eq!(count(&log, EventKind::Complete), 1);
    }

    #[test]
    fn test_fill_mode_reaches_backend() {
        let clock = SimClock::new();
        let backend = SimulatedBackend::new(clock.clone());
        let mut tl = Timeline::new(TimelineConfig::default().fill(FillMode::Forwards))
            .unwrap()
            .with_backend(backend.clone());
        assert_eq!(tl.fill_mode(), FillMode::Forwards);
        let (track, _subject) = fade_track("box", 500.0);
        tl.add_track(track).unwrap();

        tl.play();
        tl.stop();
        tl.set_fill_mode(FillMode::None);
        tl.play();

        let fills: Vec<FillMode> = backend.requests().iter().map(|r| r.fill).collect();
        assert_eq!(fills, vec![FillMode::Forwards, FillMode::None]);
        assert_eq!(tl.duplicate().fill_mode(), FillMode::None);
    }

    #[test]
    fn test_playback_rate() {
        let (mut tl, clock, _log) = timeline(TimelineConfig::with_duration(1000.0));
        let (track, _subject) = fade_track("box", 1000.0);
        tl.add_track(track).unwrap();
        tl.play();
        tl.set_playback_rate(2.0).unwrap();
        clock.advance(100.0);
        tl.tick();
        assert_eq!(tl.current_time(), 200.0);
        assert!(tl.is_playing());

        assert!(tl.set_playback_rate(0.0).is_err());
        assert!(tl.set_playback_rate(-1.0).is_err());
        assert_eq!(tl.playback_rate(), 2.0);
    }

    #[test]
    fn test_detached_subject_is_dropped() {
        let (mut tl, clock, log) = timeline(TimelineConfig::with_duration(1000.0));
        let (first, first_subject) = fade_track("first", 1000.0);
        let (second, _second_subject) = fade_track("second", 1000.0);
        tl.add_track(first).unwrap();
        tl.add_track(second).unwrap();
        tl.play();
        assert_eq!(tl.active_player_count(), 2);

        first_subject.detach();
        clock.advance(100.0);
        assert!(tl.tick());
        assert_eq!(tl.active_player_count(), 1);
        assert_eq!(tl.current_time(), 100.0);
        assert_eq!(count(&log, EventKind::Warning), 1);
    }

    #[test]
    fn test_losing_every_subject_stops() {
        let (mut tl, clock, log) = timeline(TimelineConfig::with_duration(1000.0));
        let (track, subject) = fade_track("only", 1000.0);
        tl.add_track(track).unwrap();
        tl.play();

        subject.detach();
        clock.advance(100.0);
        assert!(!tl.tick());
        assert_eq!(tl.state(), PlaybackState::Idle);
        assert_eq!(count(&log, EventKind::Stop), 1);
    }

    #[test]
    fn test_keyframe_events() {
        let (mut tl, _clock, log) = timeline(TimelineConfig::default());
        let track_id = tl.add_track(Track::new("box")).unwrap();
        let kf = Keyframe::new(100.0, opacity(0.0)).unwrap();
        let kf_id = kf.id().clone();

        assert!(tl.add_keyframe(&track_id, kf).unwrap());
        assert!(tl
            .update_keyframe(&track_id, &kf_id, KeyframeUpdate::new().easing(Easing::EaseIn))
            .unwrap());
        assert_eq!(
            tl.keyframe(&track_id, &kf_id).map(Keyframe::easing),
            Some(&Easing::EaseIn)
        );
        assert!(tl.remove_keyframe(&track_id, &kf_id).is_some());

        assert_eq!(count(&log, EventKind::TrackAdded), 1);
        assert_eq!(count(&log, EventKind::KeyframeAdded), 1);
        assert_eq!(count(&log, EventKind::KeyframeUpdated), 1);
        assert_eq!(count(&log, EventKind::KeyframeRemoved), 1);
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let (mut tl, _clock, log) = timeline(TimelineConfig::default());
        let missing_track = TrackId::new();
        let missing_kf = KeyframeId::new();
        let kf = Keyframe::new(0.0, opacity(0.0)).unwrap();

        assert!(!tl.add_keyframe(&missing_track, kf).unwrap());
        assert!(tl.remove_keyframe(&missing_track, &missing_kf).is_none());
        assert!(!tl
            .update_keyframe(&missing_track, &missing_kf, KeyframeUpdate::new().time(1.0))
            .unwrap());
        assert!(tl.remove_track(&missing_track).is_none());
        assert!(!tl.set_track_enabled(&missing_track, false));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_invalid_update_emits_nothing() {
        let (mut tl, _clock, log) = timeline(TimelineConfig::default());
        let track_id = tl.add_track(Track::new("box")).unwrap();
        let kf = Keyframe::new(10.0, opacity(0.0)).unwrap();
        let kf_id = kf.id().clone();
        tl.add_keyframe(&track_id, kf).unwrap();
        log.borrow_mut().clear();

        assert!(tl
            .update_keyframe(&track_id, &kf_id, KeyframeUpdate::new().time(-10.0))
            .is_err());
        assert!(log.borrow().is_empty());
        assert_eq!(tl.keyframe(&track_id, &kf_id).map(Keyframe::time), Some(10.0));
    }

    #[test]
    fn test_duplicate_track_id_rejected() {
        let mut tl = Timeline::default();
        let track = Track::new("box");
        let clash = Track::with_id(track.id().clone(), "other");
        tl.add_track(track).unwrap();
        assert!(matches!(
            tl.add_track(clash),
            Err(TimelineError::DuplicateTrack(_))
        ));
        assert_eq!(tl.track_count(), 1);
    }

    #[test]
    fn test_shrinking_duration_clamps_position() {
        let mut tl = Timeline::new(TimelineConfig::with_duration(500.0)).unwrap();
        let (track, _subject) = fade_track("long", 2000.0);
        let id = tl.add_track(track).unwrap();
        tl.seek(1800.0);
        assert_eq!(tl.current_time(), 1800.0);

        tl.remove_track(&id);
        assert_eq!(tl.current_time(), 500.0);

        tl.set_duration(200.0).unwrap();
        assert_eq!(tl.current_time(), 200.0);
        assert!(tl.set_duration(-1.0).is_err());
    }

    #[test]
    fn test_panicking_listener_keeps_state() {
        let (mut tl, _clock, log) = timeline(TimelineConfig::default());
        tl.on(EventKind::Play, |_| panic!("broken listener"));
        let (track, _subject) = fade_track("box", 500.0);
        tl.add_track(track).unwrap();

        tl.play();
        assert!(tl.is_playing());
        assert_eq!(count(&log, EventKind::Play), 1);
    }

    #[test]
    fn test_compile_uses_timeline_duration() {
        let mut tl = Timeline::new(TimelineConfig::with_duration(2000.0)).unwrap();
        let (track, _subject) = fade_track("box", 1000.0);
        tl.add_track(track).unwrap();

        let compiled = tl.compile();
        assert_eq!(compiled.len(), 1);
        let offsets: Vec<f64> = compiled[0].1.iter().map(|k| k.offset).collect();
        assert_eq!(offsets, vec![0.0, 0.5]);
    }

    #[test]
    fn test_clear_halts_playback() {
        let (mut tl, _clock, log) = timeline(TimelineConfig::default());
        let (track, _subject) = fade_track("box", 500.0);
        tl.add_track(track).unwrap();
        tl.play();

        tl.clear();
        assert_eq!(tl.state(), PlaybackState::Idle);
        assert_eq!(tl.track_count(), 0);
        assert_eq!(tl.active_player_count(), 0);
        assert_eq!(count(&log, EventKind::Stop), 1);
    }

    #[test]
    fn test_stats() {
        let mut tl = Timeline::new(TimelineConfig::with_duration(800.0)).unwrap();
        let (a, _sa) = fade_track("a", 600.0);
        let (mut b, _sb) = fade_track("b", 1200.0);
        b.enabled = false;
        tl.add_track(a).unwrap();
        tl.add_track(b).unwrap();

        let stats = tl.stats();
        assert_eq!(stats.duration, 1200.0);
        assert_eq!(stats.track_count, 2);
        assert_eq!(stats.enabled_track_count, 1);
        assert_eq!(stats.total_keyframes, 4);
        assert_eq!(stats.state, PlaybackState::Idle);
        assert_eq!(stats.playback_rate, 1.0);
    }

    #[test]
    fn test_default_matches_default_config() {
        let tl = Timeline::default();
        let config = TimelineConfig::default();
        assert_eq!(tl.declared_duration(), config.duration);
        assert_eq!(tl.is_looping(), config.looping);
        assert_eq!(tl.playback_rate(), config.playback_rate);
        assert_eq!(tl.fill_mode(), config.fill);
        assert_eq!(tl.state(), PlaybackState::Idle);
        assert_eq!(tl.track_count(), 0);
    }

    #[test]
    fn test_duplicate_timeline() {
        let mut tl = Timeline::new(TimelineConfig::with_duration(800.0).looping(true)).unwrap();
        let (track, _subject) = fade_track("a", 600.0);
        let id = tl.add_track(track).unwrap();

        let copy = tl.duplicate();
        assert_eq!(copy.declared_duration(), 800.0);
        assert!(copy.is_looping());
        assert_eq!(copy.track_count(), 1);
        assert!(copy.track(&id).is_none());
        assert_eq!(copy.tracks().next().map(|t| t.name.as_str()), Some("a"));
        assert_eq!(copy.state(), PlaybackState::Idle);
    }

    proptest! {
        #[test]
        fn prop_seek_stays_in_range(
            declared in 0.0f64..10_000.0,
            track_end in 0.0f64..10_000.0,
            target in -1.0e7f64..1.0e7,
        ) {
            let mut tl = Timeline::new(TimelineConfig::with_duration(declared)).unwrap();
            let (track, _subject) = fade_track("prop", track_end);
            tl.add_track(track).unwrap();

            tl.seek(target);
            prop_assert!(tl.current_time() >= 0.0);
            prop_assert!(tl.current_time() <= tl.duration());
            prop_assert_eq!(tl.duration(), declared.max(track_end));
        }
    }
}
