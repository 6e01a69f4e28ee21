//! Engine configuration
//!
//! All tunables of the playback clock, scheduler and renderer. Every field
//! has a default so a partial JSON file is a valid configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::buffer::INTERNAL_SAMPLE_RATE;
use crate::error::{MixdeckError, Result};

/// How densely automation curves are sampled into value curves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationDensity {
    /// Samples per second of scheduled span
    pub per_second: f64,
    /// Lower bound on the number of samples
    pub min_samples: usize,
    /// Upper bound on the number of samples
    pub max_samples: usize,
    /// Spans at or below this are scheduled with the static value only
    pub min_span_secs: f64,
}

impl Default for AutomationDensity {
    fn default() -> Self {
        Self {
            per_second: 240.0,
            min_samples: 64,
            max_samples: 2048,
            min_span_secs: 1e-6,
        }
    }
}

impl AutomationDensity {
    /// Number of curve samples for a span of `span_secs`
    ///
    /// Returns `None` when the span is degenerate.
    pub fn samples_for_span(&self, span_secs: f64) -> Option<usize> {
        if !span_secs.is_finite() || span_secs <= self.min_span_secs {
            return None;
        }
        let wanted = (span_secs * self.per_second).ceil() as usize;
        let lo = self.min_samples.max(1);
        let hi = self.max_samples.max(lo);
        Some(wanted.clamp(lo, hi))
    }
}

/// Engine-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Native sample rate of the playback device and the renderer
    pub sample_rate: u32,
    /// Lead added to the device clock when arming sources
    pub scheduling_lead_secs: f64,
    /// Slack past the project end before playback is considered finished
    pub end_epsilon_secs: f64,
    /// Sources shorter than this are not scheduled
    pub min_play_duration_secs: f64,
    /// Minimum interval between reschedules during a drag-seek
    pub scrub_restart_interval_ms: u64,
    /// Quiet period before a requested save is flushed
    pub autosave_debounce_ms: u64,
    /// Automation sampling density
    pub automation: AutomationDensity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: INTERNAL_SAMPLE_RATE,
            scheduling_lead_secs: 0.05,
            end_epsilon_secs: 0.02,
            min_play_duration_secs: 0.0001,
            scrub_restart_interval_ms: 100,
            autosave_debounce_ms: 250,
            automation: AutomationDensity::default(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file, defaulting missing fields
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| MixdeckError::FileNotFound {
            path: path.display().to_string(),
            source: Some(e),
        })?;
        let config: EngineConfig = serde_json::from_reader(BufReader::new(file))?;
        Ok(config.sanitized())
    }

    /// Replace nonsensical values with defaults
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.sample_rate == 0 {
            self.sample_rate = defaults.sample_rate;
        }
        if !self.scheduling_lead_secs.is_finite() || self.scheduling_lead_secs < 0.0 {
            self.scheduling_lead_secs = defaults.scheduling_lead_secs;
        }
        if !self.end_epsilon_secs.is_finite() || self.end_epsilon_secs < 0.0 {
            self.end_epsilon_secs = defaults.end_epsilon_secs;
        }
        if !self.min_play_duration_secs.is_finite() || self.min_play_duration_secs < 0.0 {
            self.min_play_duration_secs = defaults.min_play_duration_secs;
        }
        if !self.automation.per_second.is_finite() || self.automation.per_second <= 0.0 {
            self.automation.per_second = defaults.automation.per_second;
        }
        self
    }
}
