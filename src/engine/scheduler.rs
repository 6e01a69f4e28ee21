//! Per-layer scheduling
//!
//! Maps a timeline cursor onto device time for every layer: when its source
//! starts, where in the source material it starts reading and how long it
//! plays. Real-time playback and offline rendering share this math.

use tracing::{debug, warn};

use super::device::AudioDevice;
use super::graph::{ScheduledSource, SourceId};
use crate::config::EngineConfig;
use crate::dsp::{build_signal_path, PlayContext};
use crate::layers::Layer;

/// Where and how one layer's source is armed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePlan {
    /// Device time of the first sample
    pub when: f64,
    /// Source time of the first sample
    pub offset: f64,
    /// Seconds to play
    pub duration: f64,
}

impl SourcePlan {
    /// The play context handed to the layer's signal path
    pub fn play_context(&self) -> PlayContext {
        PlayContext {
            absolute_start: self.when,
            source_range_start: self.offset,
            source_range_end: self.offset + self.duration,
        }
    }
}

/// Plan `layer` for playback starting at timeline `cursor`, with the cursor
/// mapped to device time `device_start`
///
/// Returns `None` when the clip has already finished at the cursor or when
/// less than `min_duration` of it remains.
pub fn plan_layer(
    layer: &Layer,
    cursor: f64,
    device_start: f64,
    min_duration: f64,
) -> Option<SourcePlan> {
    let clip_start = layer.clip_start();
    let clip_end = layer.clip_end();
    if cursor >= clip_end {
        return None;
    }

    let trim_start = if layer.trim_start.is_finite() {
        layer.trim_start.max(0.0)
    } else {
        0.0
    };
    let when = device_start + (clip_start - cursor).max(0.0);
    let offset = trim_start + (cursor - clip_start).max(0.0);
    let duration = clip_end - cursor.max(clip_start);
    if duration <= min_duration {
        return None;
    }

    Some(SourcePlan {
        when,
        offset,
        duration,
    })
}

/// The source a plan arms for `layer`, routed through its effect chain
pub fn scheduled_source(layer: &Layer, plan: &SourcePlan, config: &EngineConfig) -> ScheduledSource {
    let play = plan.play_context();
    ScheduledSource {
        buffer: layer.source().clone(),
        when: plan.when,
        offset: plan.offset,
        duration: plan.duration,
        gain: layer.effective_gain(),
        path: build_signal_path(layer, Some(&play), &config.automation),
    }
}

/// Arm every layer that still has audio at `cursor`
///
/// A layer the device refuses is logged and skipped; the rest still play.
pub fn arm_layers<D: AudioDevice>(
    device: &mut D,
    layers: &[Layer],
    cursor: f64,
    device_start: f64,
    config: &EngineConfig,
) -> Vec<SourceId> {
    let mut armed = Vec::with_capacity(layers.len());
    for layer in layers {
        let plan = match plan_layer(layer, cursor, device_start, config.min_play_duration_secs) {
            Some(plan) => plan,
            None => continue,
        };
        debug!(
            layer_id = %layer.id,
            when = plan.when,
            offset = plan.offset,
            duration = plan.duration,
            "arming layer"
        );
        match device.start_source(scheduled_source(layer, &plan, config)) {
            Ok(id) => armed.push(id),
            Err(error) => warn!(layer_id = %layer.id, %error, "failed to arm layer"),
        }
    }
    armed
}
