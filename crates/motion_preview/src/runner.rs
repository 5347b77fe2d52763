// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless playback of a snapshot on a simulated clock.

use crate::error::Result;
use crate::settings::PreviewSettings;
use motion_timeline::{
    EventKind, NamedSubject, PlaybackState, SimClock, SimulatedBackend, SubjectRef, Timeline,
    TimelineEvent, TimelineSnapshot,
};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Why a preview run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Nothing could be played
    NotStarted,
    /// Timeline completed normally
    Completed,
    /// Looping timeline used up its loop budget
    LoopLimit,
    /// Frame cap reached while still playing
    FrameLimit,
    /// Playback stopped on its own (e.g. every subject was lost)
    Stopped,
}

/// Result of a preview run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// How the run ended
    pub outcome: RunOutcome,
    /// Ticks performed
    pub frames: usize,
    /// Loop restarts observed
    pub loops: u32,
    /// Simulated milliseconds elapsed
    pub elapsed_ms: f64,
    /// Timeline position at the end
    pub final_time: f64,
    /// Event counts by name
    pub events: BTreeMap<String, usize>,
}

/// Import `snapshot` with one simulated subject per track and resolve
/// subjects by track name
pub fn load_timeline(
    snapshot: &TimelineSnapshot,
    backend: Option<SimulatedBackend>,
) -> Result<Timeline> {
    let mut timeline = Timeline::default();
    if let Some(backend) = backend {
        timeline = timeline.with_backend(backend);
    }
    timeline.import(snapshot, |name| {
        let subject: SubjectRef = NamedSubject::shared(name);
        Some(subject)
    })?;
    Ok(timeline)
}

fn log_event(event: &TimelineEvent, verbose_time: bool) {
    match event {
        TimelineEvent::TimeUpdate { current_time } => {
            if verbose_time {
                tracing::info!("timeupdate {:.1}ms", current_time);
            } else {
                tracing::trace!("timeupdate {:.1}ms", current_time);
            }
        }
        TimelineEvent::Warning { message } => tracing::warn!("warning: {}", message),
        TimelineEvent::TrackAdded { track } => tracing::debug!("trackadded '{}'", track.name),
        other => match other.current_time() {
            Some(time) => tracing::info!("{} at {:.1}ms", other.kind(), time),
            None => tracing::info!("{}", other.kind()),
        },
    }
}

/// Play `snapshot` to the end, a loop budget or a frame cap
pub fn run_preview(snapshot: &TimelineSnapshot, settings: &PreviewSettings) -> Result<RunSummary> {
    settings.validate()?;

    let clock = SimClock::new();
    let mut timeline = load_timeline(snapshot, Some(SimulatedBackend::new(clock.clone())))?;
    timeline.set_playback_rate(settings.playback_rate)?;

    let counts: Rc<RefCell<BTreeMap<String, usize>>> = Rc::default();
    let c = counts.clone();
    let verbose_time = settings.log_time_updates;
    timeline.on_any(move |event| {
        log_event(event, verbose_time);
        *c.borrow_mut().entry(event.kind().to_string()).or_default() += 1;
    });

    let plays = Rc::new(RefCell::new(0u32));
    let p = plays.clone();
    timeline.on(EventKind::Play, move |_| *p.borrow_mut() += 1);

    tracing::info!(
        "Previewing {} track(s) over {}ms (loop: {})",
        timeline.track_count(),
        timeline.duration(),
        timeline.is_looping()
    );

    timeline.play();
    let mut frames = 0;
    let outcome = if timeline.is_playing() {
        loop {
            if frames >= settings.max_frames {
                timeline.stop();
                break RunOutcome::FrameLimit;
            }
            clock.advance(settings.frame_interval_ms);
            frames += 1;

            let running = timeline.tick();
            let loops = plays.borrow().saturating_sub(1);
            if timeline.is_looping() && loops >= settings.max_loops {
                timeline.stop();
                break RunOutcome::LoopLimit;
            }
            if !running {
                break if timeline.state() == PlaybackState::Completed {
                    RunOutcome::Completed
                } else {
                    RunOutcome::Stopped
                };
            }
        }
    } else {
        RunOutcome::NotStarted
    };

    let summary = RunSummary {
        outcome,
        frames,
        loops: plays.borrow().saturating_sub(1),
        elapsed_ms: clock.now(),
        final_time: timeline.current_time(),
        events: counts.borrow().clone(),
    };
    tracing::info!(
        "Preview finished: {:?} after {} frame(s)",
        summary.outcome,
        summary.frames
    );
    Ok(summary)
}
