//! Signal path construction
//!
//! Turns a layer's effect list into the ordered filter stages of one voice.
//! Real-time playback and offline rendering both go through
//! [`build_signal_path`], so automation is scheduled identically in both.

use tracing::trace;

use super::effect::EffectKind;
use crate::automation::Curve;
use crate::config::AutomationDensity;
use crate::layers::Layer;

/// Where a scheduled source lands in device time and which part of the
/// source material it plays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayContext {
    /// Device time at which the source starts
    pub absolute_start: f64,
    /// Source time of the first played sample
    pub source_range_start: f64,
    /// Source time where playback stops
    pub source_range_end: f64,
}

impl PlayContext {
    /// Length of the played source range
    pub fn span(&self) -> f64 {
        self.source_range_end - self.source_range_start
    }
}

/// Parameter values spread evenly over a device-time window
///
/// Evaluates like a Web Audio value curve: linear interpolation between
/// neighbouring points inside the window, the static value before it and
/// the last point after it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCurve {
    /// Device time of the first point
    pub start_time: f64,
    /// Length of the window in seconds
    pub duration: f64,
    /// Evenly spaced points, both window ends included
    pub values: Vec<f64>,
}

impl ValueCurve {
    /// Value at device time `t`, or `static_value` before the window opens
    pub fn value_at(&self, t: f64, static_value: f64) -> f64 {
        let (first, last) = match (self.values.first(), self.values.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return static_value,
        };
        if t < self.start_time {
            return static_value;
        }
        if t >= self.start_time + self.duration || self.values.len() == 1 {
            return if self.values.len() == 1 { first } else { last };
        }

        let position =
            (t - self.start_time) / self.duration * (self.values.len() - 1) as f64;
        let k = position.floor() as usize;
        let frac = position - k as f64;
        match (self.values.get(k), self.values.get(k + 1)) {
            (Some(&a), Some(&b)) => a + (b - a) * frac,
            (Some(&a), None) => a,
            _ => last,
        }
    }

    /// Device time where the curve ends
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Sample `curve` over `[source_range_start, source_range_end]` and map the
/// result onto device time starting at `absolute_start`
///
/// Returns `None` for a degenerate span, leaving the parameter static.
pub fn schedule_value_curve(
    curve: &Curve,
    play: &PlayContext,
    fallback: f64,
    density: &AutomationDensity,
) -> Option<ValueCurve> {
    let span = play.span();
    let samples = density.samples_for_span(span)?;
    let values = curve.sample(play.source_range_start, play.source_range_end, samples, fallback);
    Some(ValueCurve {
        start_time: play.absolute_start,
        duration: span,
        values,
    })
}

/// One filter in a voice's chain
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    /// Effect this stage was built from
    pub effect_id: String,
    pub kind: EffectKind,
    /// Static cutoff
    pub base_freq: f64,
    pub q: f64,
    /// Scheduled cutoff automation
    pub freq_curve: Option<ValueCurve>,
}

impl FilterStage {
    /// Cutoff at device time `t`
    #[inline]
    pub fn freq_at(&self, t: f64) -> f64 {
        match &self.freq_curve {
            Some(curve) => curve.value_at(t, self.base_freq),
            None => self.base_freq,
        }
    }
}

/// The ordered filter stages between a source and its layer gain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalPath {
    pub stages: Vec<FilterStage>,
}

impl SignalPath {
    /// A path with no filters
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Build the filter chain for `layer`
///
/// Enabled effects are inserted in listed order; disabled ones are skipped
/// outright. With a play context the cutoff automation is sampled over the
/// played source range. A missing cutoff curve is sampled as the default
/// single key at the source midpoint.
pub fn build_signal_path(
    layer: &Layer,
    play: Option<&PlayContext>,
    density: &AutomationDensity,
) -> SignalPath {
    let source_duration = layer.source_duration();
    let stages = layer
        .effects
        .iter()
        .filter(|fx| fx.enabled)
        .map(|fx| {
            let base_freq = fx.base_freq();
            let freq_curve = play.and_then(|play| {
                let curve = fx.effective_freq_curve(source_duration);
                schedule_value_curve(&curve, play, base_freq, density)
            });
            trace!(
                effect_id = %fx.id,
                kind = %fx.kind,
                base_freq,
                automated = freq_curve.is_some(),
                "filter stage"
            );
            FilterStage {
                effect_id: fx.id.clone(),
                kind: fx.kind,
                base_freq,
                q: fx.q(),
                freq_curve,
            }
        })
        .collect();

    SignalPath { stages }
}
