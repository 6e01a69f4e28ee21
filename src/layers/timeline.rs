//! Timeline geometry
//!
//! Pure functions deriving clip and project extents from layer state, plus
//! the pixel mappings the track view is drawn with.

use super::layer::Layer;

/// Minimum width of the track area in pixels
pub const MIN_TRACK_WIDTH_PX: f64 = 300.0;

/// Empty space after the last clip in pixels
pub const TRACK_TAIL_PX: f64 = 120.0;

/// Minimum drawn width of a clip in pixels
pub const MIN_CLIP_WIDTH_PX: f64 = 30.0;

#[inline]
fn number(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Audible length of a clip: source length minus both trims, never negative
#[inline]
pub fn clip_duration(source_duration: f64, trim_start: f64, trim_end: f64) -> f64 {
    (number(source_duration) - number(trim_start) - number(trim_end)).max(0.0)
}

/// End of the last clip on the timeline, 0 for no layers
pub fn project_duration(layers: &[Layer]) -> f64 {
    layers
        .iter()
        .map(|layer| layer.clip_end())
        .fold(0.0, f64::max)
}

/// Clamp a timeline position to `[0, duration]`; non-finite input maps to 0
pub fn clamp_time(t: f64, duration: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    t.clamp(0.0, number(duration).max(0.0))
}

/// Pixel position of a timeline time
#[inline]
pub fn time_to_px(t: f64, px_per_sec: f64) -> f64 {
    number(t) * number(px_per_sec)
}

/// Timeline time at a pixel position
#[inline]
pub fn px_to_time(px: f64, px_per_sec: f64) -> f64 {
    let pps = number(px_per_sec);
    if pps <= 0.0 {
        return 0.0;
    }
    number(px) / pps
}

/// Width of the scrollable track area
pub fn track_width_px(layers: &[Layer], px_per_sec: f64) -> f64 {
    let content = (project_duration(layers) * number(px_per_sec)).ceil();
    MIN_TRACK_WIDTH_PX.max(content + TRACK_TAIL_PX)
}

/// Drawn width of a clip, at least `min_px`
pub fn clip_width_px(duration: f64, px_per_sec: f64, min_px: f64) -> f64 {
    min_px.max((number(duration) * number(px_per_sec)).ceil())
}
