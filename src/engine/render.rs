//! Offline mixdown
//!
//! Renders the whole timeline in one pass through the same voice graph and
//! signal-path construction as real-time playback, so both agree sample
//! for sample.

use tracing::{debug, info};

use super::buffer::AudioBuffer;
use super::graph::ScheduledSource;
use super::mixer::Mixer;
use super::scheduler::plan_layer;
use crate::config::AutomationDensity;
use crate::dsp::{build_signal_path, sanitize_gain};
use crate::layers::{project_duration, Layer};

/// Clips shorter than this are left out of the mixdown
const MIN_RENDER_DURATION: f64 = 1e-4;

/// Render `[0, project_duration]` to a stereo buffer at `sample_rate`
///
/// Returns `None` for an empty layer list or when the timeline is shorter
/// than one frame.
pub fn render_mixdown(
    layers: &[Layer],
    master_gain: f64,
    sample_rate: u32,
    density: &AutomationDensity,
) -> Option<AudioBuffer> {
    if layers.is_empty() || sample_rate == 0 {
        return None;
    }

    let duration = project_duration(layers);
    let frames = (duration * sample_rate as f64).ceil();
    if !frames.is_finite() || frames < 1.0 {
        return None;
    }
    let frames = frames as usize;

    let mut mixer = Mixer::new(sample_rate);
    mixer.set_master_gain(sanitize_gain(master_gain, 1.0));

    for layer in layers {
        // the mixdown clock is the timeline itself
        let plan = match plan_layer(layer, 0.0, 0.0, MIN_RENDER_DURATION) {
            Some(plan) => plan,
            None => {
                debug!(layer_id = %layer.id, "layer skipped in mixdown");
                continue;
            }
        };
        let play = plan.play_context();
        mixer.add(ScheduledSource {
            buffer: layer.source().clone(),
            when: plan.when,
            offset: plan.offset,
            duration: plan.duration,
            gain: layer.effective_gain(),
            path: build_signal_path(layer, Some(&play), density),
        });
    }

    info!(
        layers = layers.len(),
        duration_secs = duration,
        frames,
        sample_rate,
        "rendering mixdown"
    );
    Some(mixer.render_block(0, frames))
}
