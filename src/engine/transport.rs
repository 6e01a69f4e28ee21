//! Transport State Machine for Mixdeck
//!
//! Holds the playback state, the playhead and the mapping from device clock
//! to timeline time while a session is running. The [`Player`] drives the
//! transitions; this module only keeps the bookkeeping consistent.
//!
//! Every (re)start of playback issues a [`TickToken`]. Halting bumps the
//! session generation so any tick still holding an older token is ignored.
//!
//! [`Player`]: super::player::Player

use std::fmt;

use crate::dsp::MeterFrame;

/// Transport states representing the current playback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Nothing scheduled; the playhead rests (default state)
    #[default]
    Stopped,
    /// Sources are armed and the clock mapping is live
    Playing,
    /// Halted mid-session; the next play resumes from the playhead
    Paused,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Stopped => write!(f, "Stopped"),
            TransportState::Playing => write!(f, "Playing"),
            TransportState::Paused => write!(f, "Paused"),
        }
    }
}

/// Identifies one playback session for the polling tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickToken {
    generation: u64,
}

impl TickToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of one polling tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickStatus {
    /// The token belongs to a halted session; nothing happened
    Stale,
    /// Still playing; the published playhead
    Playing { time: f64 },
    /// Reached the end of the timeline; the playhead was rewound to `time`
    Ended { time: f64 },
}

/// Device clock anchor of a running session
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClockAnchor {
    timeline_time: f64,
    device_time: f64,
}

/// Playback bookkeeping for one project
///
/// # Example
/// ```
/// use mixdeck::engine::{TransportSession, TransportState};
///
/// let mut session = TransportSession::new();
/// session.set_playhead(2.0);
/// let token = session.begin_session(2.0, 10.0);
/// assert_eq!(session.state(), TransportState::Playing);
/// assert_eq!(session.time_at(11.5), 3.5);
///
/// session.halt();
/// assert!(!session.is_current(token));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportSession {
    state: TransportState,
    playhead_time: f64,
    play_session_start_time: f64,
    anchor: Option<ClockAnchor>,
    generation: u64,
}

impl TransportSession {
    /// A stopped session with the playhead at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a stopped session from persisted times
    ///
    /// Non-finite or negative times are coerced to zero.
    pub fn restore(playhead_time: f64, play_session_start_time: f64) -> Self {
        Self {
            playhead_time: non_negative(playhead_time),
            play_session_start_time: non_negative(play_session_start_time),
            ..Self::default()
        }
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == TransportState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == TransportState::Stopped
    }

    /// Last published playhead position in seconds
    pub fn playhead_time(&self) -> f64 {
        self.playhead_time
    }

    /// Where the current play session started; Stop rewinds here
    pub fn play_session_start_time(&self) -> f64 {
        self.play_session_start_time
    }

    /// Whether `token` belongs to the running session
    pub fn is_current(&self, token: TickToken) -> bool {
        self.anchor.is_some() && token.generation == self.generation
    }

    /// Timeline time at device time `device_now`
    ///
    /// While the clock mapping is live this is the anchor's timeline time
    /// plus the elapsed device time, never less than the anchor (the
    /// scheduling lead is not counted backwards). Otherwise the playhead.
    pub fn time_at(&self, device_now: f64) -> f64 {
        match self.anchor {
            Some(anchor) => {
                let elapsed = (device_now - anchor.device_time).max(0.0);
                anchor.timeline_time + elapsed
            }
            None => self.playhead_time,
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Move the playhead; non-finite or negative times become zero
    pub fn set_playhead(&mut self, time: f64) {
        self.playhead_time = non_negative(time);
    }

    pub fn set_session_start(&mut self, time: f64) {
        self.play_session_start_time = non_negative(time);
    }

    pub fn set_state(&mut self, state: TransportState) {
        self.state = state;
    }

    /// Start a session mapping `timeline_time` onto `device_time`
    ///
    /// Any previous session is invalidated. Returns the new session's token.
    pub fn begin_session(&mut self, timeline_time: f64, device_time: f64) -> TickToken {
        self.generation += 1;
        self.anchor = Some(ClockAnchor {
            timeline_time: non_negative(timeline_time),
            device_time,
        });
        self.state = TransportState::Playing;
        TickToken {
            generation: self.generation,
        }
    }

    /// Drop the clock mapping and invalidate outstanding tokens
    ///
    /// Leaves the state and playhead untouched.
    pub fn halt(&mut self) {
        self.generation += 1;
        self.anchor = None;
    }
}

/// Receives transport notifications
///
/// Every method has an empty default so listeners implement only what they
/// display.
pub trait TransportListener {
    /// The published playhead moved
    fn on_playhead_changed(&mut self, _time: f64) {}

    /// Playback ran past the end of the timeline
    fn on_playback_ended(&mut self) {}

    /// Output level measured during a tick
    fn on_meter_frame(&mut self, _frame: &MeterFrame) {}

    /// The transport state changed
    fn on_state_changed(&mut self, _state: TransportState) {}
}

#[inline]
fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
