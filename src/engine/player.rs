//! Playback controller
//!
//! Drives a [`TransportSession`] against an [`AudioDevice`]: arms one source
//! per audible layer on play, halts them on pause/stop/seek, and publishes
//! the playhead from the polling tick.
//!
//! The host calls [`Player::tick`] once per display refresh with the token
//! returned by the last (re)start. Stale tokens are ignored, so a tick queued
//! before a stop never acts on the new session.

use std::time::{Duration, Instant};

use tracing::debug;

use super::device::AudioDevice;
use super::graph::SourceId;
use super::scheduler::arm_layers;
use super::transport::{
    TickStatus, TickToken, TransportListener, TransportSession, TransportState,
};
use crate::config::EngineConfig;
use crate::dsp::{sanitize_gain, PeakMeter};
use crate::error::Result;
use crate::layers::{clamp_time, Project};

/// Drag-seek state
#[derive(Debug, Clone, Copy)]
struct ScrubState {
    was_playing: bool,
    last_restart: Option<Instant>,
}

/// Transport controller for one project
pub struct Player<D: AudioDevice> {
    device: D,
    config: EngineConfig,
    session: TransportSession,
    active: Vec<SourceId>,
    token: Option<TickToken>,
    listeners: Vec<Box<dyn TransportListener>>,
    scrub: Option<ScrubState>,
    meter: PeakMeter,
}

impl<D: AudioDevice> Player<D> {
    pub fn new(device: D, config: EngineConfig) -> Self {
        Self::with_session(device, config, TransportSession::new())
    }

    /// Start from a restored session, forced into the stopped state
    pub fn with_session(device: D, config: EngineConfig, session: TransportSession) -> Self {
        let mut session = session;
        session.halt();
        session.set_state(TransportState::Stopped);
        Self {
            device,
            config,
            session,
            active: Vec::new(),
            token: None,
            listeners: Vec::new(),
            scrub: None,
            meter: PeakMeter::default(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn session(&self) -> &TransportSession {
        &self.session
    }

    pub fn state(&self) -> TransportState {
        self.session.state()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Token of the running session, if playing
    pub fn token(&self) -> Option<TickToken> {
        self.token
    }

    /// Sources armed by the running session
    pub fn active_sources(&self) -> &[SourceId] {
        &self.active
    }

    pub fn subscribe(&mut self, listener: Box<dyn TransportListener>) {
        self.listeners.push(listener);
    }

    /// Set the master bus gain on the device
    pub fn set_master_gain(&mut self, gain: f64) {
        self.device.set_master_gain(sanitize_gain(gain, 1.0));
    }

    /// Current timeline time
    ///
    /// While playing this is computed from the device clock and clamped to
    /// the project; otherwise it is the resting playhead.
    pub fn current_time(&self, project: &Project) -> f64 {
        if self.session.is_playing() {
            clamp_time(
                self.session.time_at(self.device.current_time()),
                project.duration(),
            )
        } else {
            self.session.playhead_time()
        }
    }

    // ========================================================================
    // Transport Controls
    // ========================================================================

    /// Start or resume playback from the playhead
    ///
    /// From stopped, the playhead becomes the session start that Stop
    /// returns to. Playing an empty project does nothing; playing while
    /// already playing returns the running token.
    pub fn play(&mut self, project: &Project) -> Result<Option<TickToken>> {
        if project.is_empty() {
            debug!("play ignored, project is empty");
            return Ok(None);
        }
        if self.session.is_playing() {
            return Ok(self.token);
        }

        self.device.resume()?;
        self.device.set_master_gain(project.effective_master_gain());

        if self.session.is_stopped() {
            let start = self.session.playhead_time();
            self.session.set_session_start(start);
        }

        let cursor = clamp_time(self.session.playhead_time(), project.duration());
        let token = self.start_from(project, cursor);
        debug!(cursor, "playback started");
        self.notify_state();
        Ok(Some(token))
    }

    /// Pause at the current time; a no-op unless playing
    pub fn pause(&mut self, project: &Project) {
        if !self.session.is_playing() {
            return;
        }
        let time = self.current_time(project);
        self.halt();
        self.session.set_playhead(time);
        self.session.set_state(TransportState::Paused);
        debug!(time, "playback paused");
        self.notify_playhead();
        self.notify_state();
    }

    /// Pause when playing, play otherwise
    pub fn toggle_play(&mut self, project: &Project) -> Result<Option<TickToken>> {
        if self.session.is_playing() {
            self.pause(project);
            Ok(None)
        } else {
            self.play(project)
        }
    }

    /// Halt and rewind to where the session started
    ///
    /// Stopping an already stopped transport does nothing.
    pub fn stop(&mut self, project: &Project) {
        if self.session.is_stopped() {
            return;
        }
        self.halt();
        let back_to = clamp_time(self.session.play_session_start_time(), project.duration());
        self.session.set_playhead(back_to);
        self.session.set_state(TransportState::Stopped);
        debug!(time = back_to, "playback stopped");
        self.notify_playhead();
        self.notify_state();
    }

    /// Move the playhead to `time`
    ///
    /// While playing, sources are rescheduled from the new position and the
    /// new position becomes the session start. Returns the new token in
    /// that case.
    pub fn seek(&mut self, project: &Project, time: f64) -> Option<TickToken> {
        let was_playing = self.session.is_playing();
        let time = clamp_time(time, project.duration());
        self.halt();
        self.session.set_playhead(time);
        self.notify_playhead();

        if was_playing {
            self.session.set_session_start(time);
            Some(self.start_from(project, time))
        } else {
            None
        }
    }

    // ========================================================================
    // Drag Seeking
    // ========================================================================

    /// Pointer down on the ruler: seek immediately
    ///
    /// A restart here counts toward the restart interval of later moves.
    pub fn begin_scrub(
        &mut self,
        project: &Project,
        time: f64,
        now: Instant,
    ) -> Option<TickToken> {
        let was_playing = self.session.is_playing();
        self.scrub = Some(ScrubState {
            was_playing,
            last_restart: was_playing.then_some(now),
        });
        self.seek(project, time)
    }

    /// Pointer move while scrubbing
    ///
    /// The playhead is published on every call. When playback was running
    /// as the scrub began, sources are rescheduled at most once per
    /// restart interval and each restart position becomes the session
    /// start. Returns the new token when a restart happened.
    pub fn scrub_to(&mut self, project: &Project, time: f64, now: Instant) -> Option<TickToken> {
        let time = clamp_time(time, project.duration());
        let scrub = self.scrub?;

        if !scrub.was_playing {
            self.session.set_playhead(time);
            self.notify_playhead();
            return None;
        }

        let interval = Duration::from_millis(self.config.scrub_restart_interval_ms);
        let due = match scrub.last_restart {
            Some(last) => now.saturating_duration_since(last) > interval,
            None => true,
        };

        self.session.set_playhead(time);
        self.notify_playhead();
        if !due {
            return None;
        }

        self.scrub = Some(ScrubState {
            was_playing: true,
            last_restart: Some(now),
        });
        self.halt();
        self.session.set_session_start(time);
        Some(self.start_from(project, time))
    }

    /// Pointer up: settle at `time` and restart once if playback was running
    pub fn end_scrub(&mut self, project: &Project, time: f64) -> Option<TickToken> {
        let scrub = self.scrub.take()?;
        let time = clamp_time(time, project.duration());
        self.halt();
        self.session.set_playhead(time);
        self.notify_playhead();
        if scrub.was_playing {
            self.session.set_session_start(time);
            Some(self.start_from(project, time))
        } else {
            None
        }
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrub.is_some()
    }

    // ========================================================================
    // Polling
    // ========================================================================

    /// One display-refresh tick
    ///
    /// Publishes the clamped playhead and a meter frame, and ends playback
    /// once the clock passes the end of the timeline by the end epsilon.
    pub fn tick(&mut self, token: TickToken, project: &Project) -> TickStatus {
        if !self.session.is_playing() || !self.session.is_current(token) {
            return TickStatus::Stale;
        }

        let raw = self.session.time_at(self.device.current_time());
        let duration = project.duration();
        let time = clamp_time(raw, duration);
        self.session.set_playhead(time);
        self.notify_playhead();

        let frame = self.meter.update_peak(self.device.output_peak());
        for listener in &mut self.listeners {
            listener.on_meter_frame(&frame);
        }

        if raw >= duration + self.config.end_epsilon_secs {
            self.halt();
            let back_to = clamp_time(self.session.play_session_start_time(), duration);
            self.session.set_playhead(back_to);
            self.session.set_state(TransportState::Stopped);
            debug!(time = back_to, "playback reached end of timeline");
            self.notify_playhead();
            for listener in &mut self.listeners {
                listener.on_playback_ended();
            }
            self.notify_state();
            return TickStatus::Ended { time: back_to };
        }

        TickStatus::Playing { time }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Arm every layer at `cursor` and start a new clock session
    fn start_from(&mut self, project: &Project, cursor: f64) -> TickToken {
        let device_start = self.device.current_time() + self.config.scheduling_lead_secs;
        self.active = arm_layers(
            &mut self.device,
            project.layers(),
            cursor,
            device_start,
            &self.config,
        );
        let token = self.session.begin_session(cursor, device_start);
        self.token = Some(token);
        token
    }

    /// Stop every armed source and invalidate the running session
    fn halt(&mut self) {
        for id in self.active.drain(..) {
            if let Err(error) = self.device.stop_source(id) {
                debug!(%id, %error, "source already finished");
            }
        }
        self.session.halt();
        self.token = None;
    }

    fn notify_playhead(&mut self) {
        let time = self.session.playhead_time();
        for listener in &mut self.listeners {
            listener.on_playhead_changed(time);
        }
    }

    fn notify_state(&mut self) {
        let state = self.session.state();
        for listener in &mut self.listeners {
            listener.on_state_changed(state);
        }
    }
}
