//! Debounced autosave for Mixdeck projects.
//!
//! Every edit requests a save; the save runs once the edits have been quiet
//! for the debounce interval. Timestamps are passed in explicitly so the
//! host decides when to poll and tests need no sleeping.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::engine::TransportSession;
use crate::error::Result;
use crate::layers::Project;
use crate::state::storage::ProjectStore;

/// Default quiet time before a requested save runs, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Trailing-edge save debouncer.
#[derive(Debug, Clone)]
pub struct SaveDebouncer {
    /// Quiet time required after the last request.
    pub debounce: Duration,

    /// When the pending save becomes due.
    deadline: Option<Instant>,

    /// When the last save completed.
    pub last_save_time: Option<Instant>,
}

impl Default for SaveDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }
}

impl SaveDebouncer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            deadline: None,
            last_save_time: None,
        }
    }

    /// Create a debouncer with the interval in milliseconds.
    pub fn with_interval_ms(debounce_ms: u64) -> Self {
        Self::new(Duration::from_millis(debounce_ms))
    }

    /// Request a save; pushes any pending deadline back.
    pub fn request(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drop the pending save.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether the pending save is due at `now`; clears it if so.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Save through `store` when the pending save is due.
    ///
    /// Returns whether a save happened. A failed save is logged and
    /// returned; it is not retried until the next request.
    pub fn flush_if_due(
        &mut self,
        now: Instant,
        store: &ProjectStore,
        project: &Project,
        session: &TransportSession,
    ) -> Result<bool> {
        if !self.poll(now) {
            return Ok(false);
        }
        match store.save_project(project, session) {
            Ok(()) => {
                self.last_save_time = Some(now);
                Ok(true)
            }
            Err(error) => {
                warn!(%error, path = %store.root().display(), "autosave failed");
                Err(error)
            }
        }
    }
}
