//! Keyframe curves
//!
//! Keys are expressed in source time so trimming and moving a clip never
//! invalidates them. Keys are sorted before evaluation.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::{coerce, finite_or, CubicBezier};

/// Identity easing control points
pub const CURVE_LINEAR: [f64; 4] = [0.0, 0.0, 1.0, 1.0];

/// Minimum span used as a divisor when normalising positions
pub const SPAN_EPSILON: f64 = 1e-9;

/// One automation point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Source time in seconds
    #[serde(default)]
    pub s: f64,
    /// Parameter value
    #[serde(default)]
    pub v: f64,
    /// Easing toward the next key; `None` interpolates linearly
    #[serde(
        default,
        rename = "curveToNext",
        alias = "curve_to_next",
        skip_serializing_if = "Option::is_none"
    )]
    pub curve_to_next: Option<[f64; 4]>,
}

impl Keyframe {
    /// A key with linear easing to the next key
    pub fn new(s: f64, v: f64) -> Self {
        Self {
            s,
            v,
            curve_to_next: Some(CURVE_LINEAR),
        }
    }

    /// A key with a custom easing to the next key
    pub fn with_curve(s: f64, v: f64, curve: [f64; 4]) -> Self {
        Self {
            s,
            v,
            curve_to_next: Some(curve),
        }
    }

    fn time(&self) -> f64 {
        coerce(self.s)
    }
}

/// A time-varying scalar parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Curve {
    keys: Vec<Keyframe>,
}

impl Curve {
    /// An empty curve (invalid for sampling until a default is materialised)
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Build a curve from keys in any order
    pub fn from_keys(keys: Vec<Keyframe>) -> Self {
        let mut curve = Self { keys };
        curve.sort();
        curve
    }

    /// The single-key curve used before a parameter is first automated
    pub fn default_for(center_s: f64, value: f64) -> Self {
        Self {
            keys: vec![Keyframe::new(finite_or(center_s, 0.0), finite_or(value, 0.0))],
        }
    }

    /// Materialise the default single-key curve if this curve has no keys
    ///
    /// Returns true when the default was written.
    pub fn ensure_default(&mut self, center_s: f64, value: f64) -> bool {
        if !self.keys.is_empty() {
            return false;
        }
        *self = Self::default_for(center_s, value);
        true
    }

    /// Keys in stored order
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert a key, keeping keys sorted by source time
    ///
    /// Returns the index of the inserted key.
    pub fn insert_key(&mut self, key: Keyframe) -> usize {
        let s = key.time();
        let index = self.keys.partition_point(|k| k.time() <= s);
        self.keys.insert(index, key);
        index
    }

    /// Remove the key at `index`
    pub fn remove_key(&mut self, index: usize) -> Option<Keyframe> {
        if index < self.keys.len() {
            Some(self.keys.remove(index))
        } else {
            None
        }
    }

    /// Move the key at `index` and re-sort
    ///
    /// Returns the key's new index.
    pub fn move_key(&mut self, index: usize, s: f64, v: f64) -> Option<usize> {
        let mut key = self.remove_key(index)?;
        key.s = s;
        key.v = v;
        Some(self.insert_key(key))
    }

    /// Sort keys ascending by source time (stable)
    pub fn sort(&mut self) {
        self.keys.sort_by(|a, b| a.time().total_cmp(&b.time()));
    }

    /// Keys sorted by source time, borrowed when already in order
    fn sorted_keys(&self) -> Cow<'_, [Keyframe]> {
        let in_order = self.keys.windows(2).all(|w| w[0].time() <= w[1].time());
        if in_order {
            Cow::Borrowed(&self.keys)
        } else {
            let mut keys = self.keys.clone();
            keys.sort_by(|a, b| a.time().total_cmp(&b.time()));
            Cow::Owned(keys)
        }
    }

    /// Value at source time `s`, or `fallback` for an empty curve
    ///
    /// Flat before the first key and after the last key; between keys the
    /// outgoing easing of the earlier key shapes a linear blend of values.
    pub fn value_at(&self, s: f64, fallback: f64) -> f64 {
        let keys = self.sorted_keys();
        value_at_sorted(&keys, coerce(s), fallback)
    }

    /// `n` evenly spaced values across `[s0, s1]`, both ends included
    ///
    /// `n == 1` samples `s0` only. A degenerate or reversed span is widened
    /// to `SPAN_EPSILON`.
    pub fn sample(&self, s0: f64, s1: f64, n: usize, fallback: f64) -> Vec<f64> {
        let n = n.max(1);
        let s0 = finite_or(s0, 0.0);
        let s1 = finite_or(s1, 0.0);
        let span = (s1 - s0).max(SPAN_EPSILON);
        let keys = self.sorted_keys();

        (0..n)
            .map(|i| {
                let u = if n == 1 {
                    0.0
                } else {
                    i as f64 / (n - 1) as f64
                };
                // Land exactly on s1 for the last sample
                let s = if n > 1 && i == n - 1 && s1 > s0 {
                    s1
                } else {
                    s0 + u * span
                };
                value_at_sorted(&keys, s, fallback)
            })
            .collect()
    }
}

fn value_at_sorted(keys: &[Keyframe], s: f64, fallback: f64) -> f64 {
    let (first, last) = match (keys.first(), keys.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return fallback,
    };

    if s <= first.time() {
        return first.v;
    }

    for pair in keys.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let a_s = a.time();
        let b_s = b.time();
        if s >= a_s && s <= b_s {
            let u = (s - a_s) / (b_s - a_s).max(SPAN_EPSILON);
            let eased = match a.curve_to_next {
                Some(points) => CubicBezier::from_points(points).ease(u),
                None => u,
            };
            return a.v + (b.v - a.v) * eased;
        }
    }

    last.v
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp() -> Curve {
        Curve::from_keys(vec![
            Keyframe::new(1.0, 100.0),
            Keyframe::new(3.0, 300.0),
            Keyframe::with_curve(5.0, 500.0, [0.42, 0.0, 0.58, 1.0]),
            Keyframe::new(7.0, 100.0),
        ])
    }

    #[test]
    fn test_empty_curve_returns_fallback() {
        let curve = Curve::new();
        assert_eq!(curve.value_at(2.0, 42.0), 42.0);
        assert_eq!(curve.sample(0.0, 1.0, 4, 7.0), vec![7.0; 4]);
    }

    #[test]
    fn test_flat_before_first_and_after_last() {
        let curve = ramp();
        assert_eq!(curve.value_at(0.0, 0.0), 100.0);
        assert_eq!(curve.value_at(-100.0, 0.0), 100.0);
        assert_eq!(curve.value_at(7.5, 0.0), 100.0);
        assert_eq!(curve.value_at(f64::INFINITY, 0.0), 100.0);
    }

    #[test]
    fn test_exact_key_times_return_key_values() {
        let curve = ramp();
        for key in curve.keys() {
            assert_abs_diff_eq!(curve.value_at(key.s, 0.0), key.v, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_linear_midpoint() {
        let curve = ramp();
        assert_abs_diff_eq!(curve.value_at(2.0, 0.0), 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_easing_is_linear() {
        let curve = Curve::from_keys(vec![
            Keyframe {
                s: 0.0,
                v: 0.0,
                curve_to_next: None,
            },
            Keyframe::new(2.0, 10.0),
        ]);
        assert_abs_diff_eq!(curve.value_at(0.5, 0.0), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_eased_segment_is_symmetric() {
        let curve = ramp();
        assert_abs_diff_eq!(curve.value_at(6.0, 0.0), 300.0, epsilon = 1e-3);
        // ease-in-out lags linear in the first half of a falling segment
        assert!(curve.value_at(5.5, 0.0) > 400.0);
    }

    #[test]
    fn test_unsorted_keys_are_sorted_before_use() {
        let curve = Curve {
            keys: vec![Keyframe::new(4.0, 40.0), Keyframe::new(0.0, 0.0)],
        };
        assert_abs_diff_eq!(curve.value_at(2.0, 0.0), 20.0, epsilon = 1e-9);
        assert_eq!(curve.value_at(-1.0, 0.0), 0.0);
    }

    #[test]
    fn test_sample_endpoints_match_value_at() {
        let curve = ramp();
        let samples = curve.sample(0.5, 6.5, 17, 0.0);
        assert_eq!(samples.len(), 17);
        assert_abs_diff_eq!(samples[0], curve.value_at(0.5, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(samples[16], curve.value_at(6.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_sample_single_point_uses_start() {
        let curve = ramp();
        let samples = curve.sample(2.0, 6.0, 1, 0.0);
        assert_eq!(samples.len(), 1);
        assert_abs_diff_eq!(samples[0], 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sample_degenerate_span_is_finite() {
        let curve = ramp();
        let samples = curve.sample(2.0, 2.0, 8, 0.0);
        assert!(samples.iter().all(|v| v.is_finite()));
        assert!(samples.iter().all(|v| (v - 200.0).abs() < 1e-3));

        let samples = curve.sample(f64::NAN, f64::INFINITY, 4, 0.0);
        assert!(samples.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_single_key_samples_constant() {
        let curve = Curve::default_for(5.0, 12000.0);
        let samples = curve.sample(0.0, 10.0, 64, 0.0);
        assert!(samples.iter().all(|&v| v == 12000.0));
    }

    #[test]
    fn test_ensure_default_only_fills_empty() {
        let mut curve = Curve::new();
        assert!(curve.ensure_default(2.5, 80.0));
        assert_eq!(curve.keys(), &[Keyframe::new(2.5, 80.0)]);
        assert!(!curve.ensure_default(9.0, 1.0));
        assert_eq!(curve.len(), 1);
    }

    #[test]
    fn test_insert_and_move_keep_order() {
        let mut curve = ramp();
        let index = curve.insert_key(Keyframe::new(2.0, 0.0));
        assert_eq!(index, 1);
        let moved = curve.move_key(1, 10.0, 5.0).unwrap();
        assert_eq!(moved, curve.len() - 1);
        assert!(curve.keys().windows(2).all(|w| w[0].s <= w[1].s));
        assert!(curve.remove_key(99).is_none());
    }

    #[test]
    fn test_serde_shape() {
        let curve = Curve::from_keys(vec![Keyframe::new(1.0, 2.0)]);
        let json = serde_json::to_value(&curve).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "s": 1.0, "v": 2.0, "curveToNext": [0.0, 0.0, 1.0, 1.0] }])
        );
        let parsed: Curve = serde_json::from_str(r#"[{"s": 3}]"#).unwrap();
        assert_eq!(parsed.keys()[0].v, 0.0);
        assert_eq!(parsed.keys()[0].curve_to_next, None);
    }
}
