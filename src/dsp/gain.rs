//! Gain helpers
//!
//! Master volume is edited in dB but applied as a linear multiplier. The
//! bottom of the dB range is treated as silence.

/// Lowest dB value; at or below this the gain is zero
pub const DB_MIN: f64 = -80.0;

/// Highest dB value
pub const DB_MAX: f64 = 12.0;

/// Clamp a dB value to the editable range
pub fn clamp_db(db: f64) -> f64 {
    if db.is_nan() {
        return DB_MIN;
    }
    db.clamp(DB_MIN, DB_MAX)
}

/// Convert decibels to linear amplitude
///
/// Non-finite values and values at or below [`DB_MIN`] are silent.
#[inline]
pub fn db_to_gain(db: f64) -> f64 {
    if !db.is_finite() || db <= DB_MIN {
        return 0.0;
    }
    10.0_f64.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Zero, negative and non-finite gains map to negative infinity.
#[inline]
pub fn gain_to_db(gain: f64) -> f64 {
    if !gain.is_finite() || gain <= 0.0 {
        return f64::NEG_INFINITY;
    }
    20.0 * gain.log10()
}

/// Format a dB value for display with one decimal, or `-inf`
pub fn format_db(db: f64) -> String {
    if !db.is_finite() || db <= DB_MIN {
        return "-inf".to_string();
    }
    format!("{:.1}", db)
}

/// Parse user-entered dB text
///
/// Accepts `-inf`/`-infinity` and a comma as the decimal separator.
/// Returns `None` when the text is not a number.
pub fn parse_db(text: &str) -> Option<f64> {
    let t = text.trim().to_ascii_lowercase();
    if t == "-inf" || t == "-infinity" {
        return Some(f64::NEG_INFINITY);
    }
    t.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Make a stored gain usable as a multiplier
///
/// Non-finite gains become `fallback`; negative gains become zero.
#[inline]
pub fn sanitize_gain(gain: f64, fallback: f64) -> f64 {
    if !gain.is_finite() {
        return fallback;
    }
    gain.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    #[test]
    fn test_db_to_gain() {
        assert_eq!(db_to_gain(0.0), 1.0);
        assert_abs_diff_eq!(db_to_gain(-6.0), 0.501187, epsilon = 1e-6);
        assert_eq!(db_to_gain(DB_MIN), 0.0);
        assert_eq!(db_to_gain(f64::NEG_INFINITY), 0.0);
        assert_eq!(db_to_gain(f64::NAN), 0.0);
    }

    #[test]
    fn test_gain_to_db() {
        assert_eq!(gain_to_db(1.0), 0.0);
        assert_abs_diff_eq!(gain_to_db(2.0), 6.0206, epsilon = 1e-4);
        assert_eq!(gain_to_db(0.0), f64::NEG_INFINITY);
        assert_eq!(gain_to_db(-1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_clamp_db() {
        assert_eq!(clamp_db(40.0), DB_MAX);
        assert_eq!(clamp_db(-200.0), DB_MIN);
        assert_eq!(clamp_db(-3.0), -3.0);
    }

    #[test_case(-3.26, "-3.3" ; "rounds to one decimal")]
    #[test_case(6.0, "6.0" ; "positive")]
    #[test_case(-90.0, "-inf" ; "below floor")]
    #[test_case(f64::NEG_INFINITY, "-inf" ; "silence")]
    fn test_format_db(db: f64, expected: &str) {
        assert_eq!(format_db(db), expected);
    }

    #[test_case(" -inf ", Some(f64::NEG_INFINITY) ; "inf text")]
    #[test_case("-3,5", Some(-3.5) ; "comma decimal")]
    #[test_case("12", Some(12.0) ; "integer")]
    #[test_case("loud", None ; "not a number")]
    fn test_parse_db(text: &str, expected: Option<f64>) {
        assert_eq!(parse_db(text), expected);
    }

    #[test]
    fn test_sanitize_gain() {
        assert_eq!(sanitize_gain(0.5, 1.0), 0.5);
        assert_eq!(sanitize_gain(-2.0, 1.0), 0.0);
        assert_eq!(sanitize_gain(f64::NAN, 1.0), 1.0);
    }
}
