//! Effect model
//!
//! An effect is a filter stage attached to a layer. It stores parameters and
//! automation only; processing happens in the engine when a layer is armed
//! for playback or rendered offline.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::automation::{coerce, Curve};
use crate::error::{MixdeckError, Result};

/// Cutoff frequency parameter name
pub const PARAM_FREQ: &str = "freq";

/// Resonance parameter name
pub const PARAM_Q: &str = "q";

/// Resonance used when an effect has no `q` parameter
pub const DEFAULT_Q: f64 = 0.7;

/// Supported filter types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    /// Remove content above the cutoff
    Lowpass,
    /// Remove content below the cutoff
    Highpass,
}

impl EffectKind {
    /// All kinds, in menu order
    pub const ALL: [EffectKind; 2] = [EffectKind::Lowpass, EffectKind::Highpass];

    /// Parse a type identifier such as `"lowpass"`
    pub fn parse(effect_type: &str) -> Result<Self> {
        match effect_type.trim().to_ascii_lowercase().as_str() {
            "lowpass" => Ok(EffectKind::Lowpass),
            "highpass" => Ok(EffectKind::Highpass),
            _ => Err(MixdeckError::UnknownEffect {
                effect_type: effect_type.to_string(),
            }),
        }
    }

    /// Type identifier used in project files
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Lowpass => "lowpass",
            EffectKind::Highpass => "highpass",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            EffectKind::Lowpass => "Lowpass",
            EffectKind::Highpass => "Highpass",
        }
    }

    /// Cutoff used when the effect has no usable `freq` parameter
    pub fn default_freq(&self) -> f64 {
        match self {
            EffectKind::Lowpass => 12000.0,
            EffectKind::Highpass => 80.0,
        }
    }

    /// Parameters of a freshly created effect
    pub fn default_params(&self) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        params.insert(PARAM_FREQ.to_string(), self.default_freq());
        params.insert(PARAM_Q.to_string(), DEFAULT_Q);
        params
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filter stage attached to a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Unique identifier for this effect instance
    #[serde(default = "new_effect_id")]
    pub id: String,
    /// Filter type
    #[serde(rename = "type")]
    pub kind: EffectKind,
    /// Disabled effects are left out of the signal path entirely
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Static base values; also the automation fallback
    #[serde(default, deserialize_with = "lenient_params")]
    pub params: BTreeMap<String, f64>,
    /// Parameter name to automation curve
    #[serde(default)]
    pub automation: BTreeMap<String, Curve>,
}

fn new_effect_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn enabled_default() -> bool {
    true
}

/// Keep numeric parameters, parse numeric strings, drop everything else
fn lenient_params<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }?;
            Some((name, number))
        })
        .collect())
}

impl Effect {
    /// Create an effect with default parameters and no automation
    pub fn new(kind: EffectKind) -> Self {
        Self {
            id: new_effect_id(),
            kind,
            enabled: true,
            params: kind.default_params(),
            automation: BTreeMap::new(),
        }
    }

    /// Enable this effect
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disable this effect (bypass)
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Toggle the enabled state
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Update a static parameter
    pub fn set_param(&mut self, name: &str, value: f64) {
        self.params.insert(name.to_string(), value);
    }

    /// Get a static parameter
    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    /// Static cutoff frequency
    ///
    /// A missing, non-finite or zero `freq` falls back to the kind default.
    pub fn base_freq(&self) -> f64 {
        match self.param(PARAM_FREQ) {
            Some(freq) if freq.is_finite() && freq != 0.0 => freq,
            _ => self.kind.default_freq(),
        }
    }

    /// Static resonance
    pub fn q(&self) -> f64 {
        self.param(PARAM_Q).map(coerce).unwrap_or(DEFAULT_Q)
    }

    /// The cutoff automation curve, if one has been written
    pub fn freq_curve(&self) -> Option<&Curve> {
        self.automation.get(PARAM_FREQ).filter(|c| !c.is_empty())
    }

    /// Mutable access to the cutoff curve, materialising the default first
    pub fn freq_curve_mut(&mut self, source_duration: f64) -> &mut Curve {
        let base = self.base_freq();
        let curve = self.automation.entry(PARAM_FREQ.to_string()).or_default();
        curve.ensure_default(source_duration / 2.0, base);
        curve
    }

    /// Cutoff curve to sample, substituting the default when none is stored
    pub fn effective_freq_curve(&self, source_duration: f64) -> Curve {
        match self.freq_curve() {
            Some(curve) => curve.clone(),
            None => Curve::default_for(source_duration / 2.0, self.base_freq()),
        }
    }

    /// Materialise the single-key cutoff curve at the source midpoint
    ///
    /// Returns true when a curve was written.
    pub fn ensure_automation_defaults(&mut self, source_duration: f64) -> bool {
        let base = self.base_freq();
        self.automation
            .entry(PARAM_FREQ.to_string())
            .or_default()
            .ensure_default(source_duration / 2.0, base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_effect_defaults() {
        let fx = Effect::new(EffectKind::Lowpass);
        assert!(fx.enabled);
        assert_eq!(fx.base_freq(), 12000.0);
        assert_eq!(fx.q(), 0.7);
        assert!(fx.automation.is_empty());

        let hp = Effect::new(EffectKind::Highpass);
        assert_eq!(hp.base_freq(), 80.0);
        assert_ne!(fx.id, hp.id);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(EffectKind::parse("lowpass").unwrap(), EffectKind::Lowpass);
        assert_eq!(EffectKind::parse(" HighPass ").unwrap(), EffectKind::Highpass);
        assert!(matches!(
            EffectKind::parse("reverb"),
            Err(MixdeckError::UnknownEffect { .. })
        ));
    }

    #[test]
    fn test_zero_freq_falls_back_to_default() {
        let mut fx = Effect::new(EffectKind::Highpass);
        fx.set_param(PARAM_FREQ, 0.0);
        assert_eq!(fx.base_freq(), 80.0);
        fx.set_param(PARAM_FREQ, f64::NAN);
        assert_eq!(fx.base_freq(), 80.0);
        fx.set_param(PARAM_FREQ, 250.0);
        assert_eq!(fx.base_freq(), 250.0);
    }

    #[test]
    fn test_ensure_automation_defaults() {
        let mut fx = Effect::new(EffectKind::Lowpass);
        assert!(fx.ensure_automation_defaults(10.0));
        let curve = fx.freq_curve().unwrap();
        assert_eq!(curve.len(), 1);
        assert_eq!(curve.keys()[0].s, 5.0);
        assert_eq!(curve.keys()[0].v, 12000.0);
        assert!(!fx.ensure_automation_defaults(10.0));
    }

    #[test]
    fn test_effective_curve_does_not_mutate() {
        let fx = Effect::new(EffectKind::Lowpass);
        let curve = fx.effective_freq_curve(4.0);
        assert_eq!(curve.keys()[0].s, 2.0);
        assert!(fx.freq_curve().is_none());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"type": "lowpass", "params": {"freq": "900", "q": 1.2, "label": "x"}}"#;
        let fx: Effect = serde_json::from_str(json).unwrap();
        assert!(fx.enabled);
        assert!(!fx.id.is_empty());
        assert_eq!(fx.base_freq(), 900.0);
        assert_eq!(fx.q(), 1.2);
        assert!(!fx.params.contains_key("label"));
    }

    #[test]
    fn test_serialize_shape() {
        let mut fx = Effect::new(EffectKind::Highpass);
        fx.id = "fx-1".to_string();
        let json = serde_json::to_value(&fx).unwrap();
        assert_eq!(json["type"], "highpass");
        assert_eq!(json["enabled"], true);
        assert_eq!(json["params"]["freq"], 80.0);
    }
}
