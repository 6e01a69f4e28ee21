//! Layer (clip)
//!
//! One placed audio clip: immutable decoded source, its position and trims
//! on the timeline, a gain and an ordered effect list.

use std::sync::Arc;

use crate::dsp::{sanitize_gain, Effect, EffectKind};
use crate::engine::buffer::AudioBuffer;
use crate::error::{MixdeckError, Result};

use super::timeline::clip_duration;

/// Shortest audible region the trim editor leaves on a clip
pub const MIN_CLIP_DURATION: f64 = 0.01;

/// One placed audio clip
#[derive(Debug, Clone)]
pub struct Layer {
    /// Stable identifier assigned at creation
    pub id: String,
    /// Display name, usually the imported file name
    pub name: String,
    source: Arc<AudioBuffer>,
    raw_audio: Arc<[u8]>,
    /// Timeline position of the first audible sample, seconds
    pub offset: f64,
    /// Seconds cut from the start of the source
    pub trim_start: f64,
    /// Seconds cut from the end of the source
    pub trim_end: f64,
    /// Linear gain applied before the master bus
    pub gain: f64,
    /// Effects in signal order, first is closest to the source
    pub effects: Vec<Effect>,
}

impl Layer {
    /// Create an untrimmed layer at the start of the timeline
    pub fn new(name: impl Into<String>, source: Arc<AudioBuffer>, raw_audio: Arc<[u8]>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), name, source, raw_audio)
    }

    /// Create a layer with a known identifier (project restore)
    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        source: Arc<AudioBuffer>,
        raw_audio: Arc<[u8]>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source,
            raw_audio,
            offset: 0.0,
            trim_start: 0.0,
            trim_end: 0.0,
            gain: 1.0,
            effects: Vec::new(),
        }
    }

    /// Decoded source material
    pub fn source(&self) -> &Arc<AudioBuffer> {
        &self.source
    }

    /// Encoded bytes the source was decoded from
    pub fn raw_audio(&self) -> &Arc<[u8]> {
        &self.raw_audio
    }

    /// Length of the decoded source in seconds
    pub fn source_duration(&self) -> f64 {
        self.source.duration_secs()
    }

    /// Audible length after trimming
    pub fn clip_duration(&self) -> f64 {
        clip_duration(self.source_duration(), self.trim_start, self.trim_end)
    }

    /// Timeline start of the audible region
    pub fn clip_start(&self) -> f64 {
        finite_or_zero(self.offset)
    }

    /// Timeline end of the audible region
    pub fn clip_end(&self) -> f64 {
        self.clip_start() + self.clip_duration()
    }

    /// Gain usable as a multiplier
    pub fn effective_gain(&self) -> f64 {
        sanitize_gain(self.gain, 1.0)
    }

    /// Largest allowed `trim_start` given the current `trim_end`
    pub fn max_trim_start(&self) -> f64 {
        (self.source_duration() - finite_or_zero(self.trim_end) - MIN_CLIP_DURATION).max(0.0)
    }

    /// Largest allowed `trim_end` given the current `trim_start`
    pub fn max_trim_end(&self) -> f64 {
        (self.source_duration() - finite_or_zero(self.trim_start) - MIN_CLIP_DURATION).max(0.0)
    }

    /// Coerce placement fields into their valid ranges
    ///
    /// Non-finite values become 0, negative offsets and trims are raised to 0
    /// and trims are limited so at least [`MIN_CLIP_DURATION`] stays audible.
    pub fn sanitize(&mut self) {
        self.offset = finite_or_zero(self.offset).max(0.0);
        self.trim_start = finite_or_zero(self.trim_start).max(0.0);
        self.trim_end = finite_or_zero(self.trim_end).max(0.0);
        self.trim_start = self.trim_start.min(self.max_trim_start());
        self.trim_end = self.trim_end.min(self.max_trim_end());
        self.gain = sanitize_gain(self.gain, 1.0);
    }

    /// Set the placement in one step, clamped like the trim editor
    pub fn set_placement(
        &mut self,
        offset: Option<f64>,
        trim_start: Option<f64>,
        trim_end: Option<f64>,
    ) {
        if let Some(offset) = offset {
            self.offset = offset;
        }
        if let Some(trim_start) = trim_start {
            self.trim_start = trim_start;
        }
        if let Some(trim_end) = trim_end {
            self.trim_end = trim_end;
        }
        self.sanitize();
    }

    /// Append an effect with default parameters and its default automation
    ///
    /// Returns the new effect's id.
    pub fn add_effect(&mut self, kind: EffectKind) -> String {
        let mut effect = Effect::new(kind);
        effect.ensure_automation_defaults(self.source_duration());
        let id = effect.id.clone();
        self.effects.push(effect);
        id
    }

    /// Remove an effect by its id
    pub fn remove_effect(&mut self, effect_id: &str) -> Result<Effect> {
        let index = self
            .effects
            .iter()
            .position(|e| e.id == effect_id)
            .ok_or_else(|| MixdeckError::EffectNotFound {
                effect_id: effect_id.to_string(),
            })?;
        Ok(self.effects.remove(index))
    }

    /// Get an effect by its id
    pub fn effect(&self, effect_id: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id == effect_id)
    }

    /// Get an effect by its id, mutably
    pub fn effect_mut(&mut self, effect_id: &str) -> Result<&mut Effect> {
        self.effects
            .iter_mut()
            .find(|e| e.id == effect_id)
            .ok_or_else(|| MixdeckError::EffectNotFound {
                effect_id: effect_id.to_string(),
            })
    }

    /// Materialise default automation on every effect
    pub fn ensure_automation_defaults(&mut self) {
        let source_duration = self.source_duration();
        for effect in &mut self.effects {
            effect.ensure_automation_defaults(source_duration);
        }
    }
}

#[inline]
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
