//! Biquad filters
//!
//! RBJ cookbook low-pass and high-pass sections. One filter instance holds
//! state for every channel of a voice and recomputes its coefficients only
//! when the cutoff actually changes.

use std::f64::consts::PI;

use super::effect::EffectKind;

/// Lowest cutoff accepted by the filter
pub const MIN_CUTOFF_HZ: f64 = 10.0;

const MIN_Q: f64 = 0.1;
const MAX_Q: f64 = 30.0;

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (a0 + a1*z^-1 + a2*z^-2)
/// Normalized: all coefficients divided by a0
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Calculate coefficients using the Audio EQ Cookbook formulas
    pub fn calculate(kind: EffectKind, sample_rate: f64, frequency: f64, q: f64) -> Self {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            1.0
        };
        let upper = sample_rate / 2.0 * 0.999;
        // below ~20 Hz the Nyquist bound sits under the cutoff floor
        let lower = MIN_CUTOFF_HZ.min(upper);
        let freq = if frequency.is_finite() {
            frequency.clamp(lower, upper)
        } else {
            upper
        };
        let q = if q.is_finite() {
            q.clamp(MIN_Q, MAX_Q)
        } else {
            MIN_Q
        };

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let (b0, b1, b2) = match kind {
            EffectKind::Lowpass => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
            EffectKind::Highpass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
            ),
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Biquad filter state for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// A multi-channel biquad with a variable cutoff
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    kind: EffectKind,
    sample_rate: f64,
    q: f64,
    cutoff: f64,
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
}

impl BiquadFilter {
    pub fn new(kind: EffectKind, sample_rate: u32, cutoff: f64, q: f64, channels: usize) -> Self {
        let sample_rate = sample_rate.max(1) as f64;
        Self {
            kind,
            sample_rate,
            q,
            cutoff,
            coeffs: BiquadCoeffs::calculate(kind, sample_rate, cutoff, q),
            states: vec![BiquadState::default(); channels.max(1)],
        }
    }

    /// Current cutoff in Hz
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Retune the cutoff
    #[inline]
    pub fn set_cutoff(&mut self, cutoff: f64) {
        if cutoff != self.cutoff {
            self.cutoff = cutoff;
            self.coeffs = BiquadCoeffs::calculate(self.kind, self.sample_rate, cutoff, self.q);
        }
    }

    /// Filter one sample of `channel`
    #[inline]
    pub fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        match self.states.get_mut(channel) {
            Some(state) => state.process(input as f64, &self.coeffs) as f32,
            None => input,
        }
    }

    /// Clear filter history
    pub fn reset(&mut self) {
        for state in &mut self.states {
            *state = BiquadState::default();
        }
    }
}
