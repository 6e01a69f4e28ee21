//! Zoom mapping
//!
//! The zoom slider is logarithmic in pixels per second.

/// Most zoomed-out scale, in pixels per second
pub const ZOOM_MIN: f64 = 50.0;

/// Most zoomed-in scale, in pixels per second
pub const ZOOM_MAX: f64 = 100000.0;

/// Slider range is `0..=ZOOM_SLIDER_MAX`
pub const ZOOM_SLIDER_MAX: u32 = 1000;

/// Clamp a scale to `[ZOOM_MIN, ZOOM_MAX]`
pub fn clamp_zoom(px_per_sec: f64) -> f64 {
    if px_per_sec.is_nan() {
        return ZOOM_MIN;
    }
    px_per_sec.clamp(ZOOM_MIN, ZOOM_MAX)
}

/// Scale for a slider position
pub fn zoom_from_slider(slider: f64) -> f64 {
    let s = if slider.is_finite() {
        slider.clamp(0.0, ZOOM_SLIDER_MAX as f64)
    } else {
        0.0
    };
    let t = s / ZOOM_SLIDER_MAX as f64;
    clamp_zoom(ZOOM_MIN * (ZOOM_MAX / ZOOM_MIN).powf(t))
}

/// Slider position for a scale
pub fn slider_from_zoom(px_per_sec: f64) -> u32 {
    let px = if px_per_sec.is_finite() && px_per_sec != 0.0 {
        clamp_zoom(px_per_sec)
    } else {
        ZOOM_MIN
    };
    let t = (px / ZOOM_MIN).ln() / (ZOOM_MAX / ZOOM_MIN).ln();
    (t * ZOOM_SLIDER_MAX as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_slider_endpoints() {
        assert_relative_eq!(zoom_from_slider(0.0), ZOOM_MIN);
        assert_relative_eq!(zoom_from_slider(1000.0), ZOOM_MAX, max_relative = 1e-12);
        assert_relative_eq!(zoom_from_slider(5000.0), ZOOM_MAX, max_relative = 1e-12);
        assert_eq!(zoom_from_slider(f64::NAN), ZOOM_MIN);
    }

    #[test]
    fn test_slider_roundtrip() {
        for slider in [0_u32, 1, 250, 500, 999, 1000] {
            assert_eq!(slider_from_zoom(zoom_from_slider(slider as f64)), slider);
        }
    }

    #[test]
    fn test_clamp_zoom() {
        assert_eq!(clamp_zoom(1.0), ZOOM_MIN);
        assert_eq!(clamp_zoom(1e9), ZOOM_MAX);
        assert_eq!(slider_from_zoom(0.0), 0);
    }
}
