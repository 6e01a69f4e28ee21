//! DSP
//!
//! The per-clip effect model, the signal path that real-time playback and
//! offline rendering share, and the filter, gain and meter primitives.

mod chain;
mod effect;
mod filter;
mod gain;
mod meter;

pub use chain::{
    build_signal_path, schedule_value_curve, FilterStage, PlayContext, SignalPath, ValueCurve,
};
pub use effect::{Effect, EffectKind, DEFAULT_Q, PARAM_FREQ, PARAM_Q};
pub use filter::{BiquadCoeffs, BiquadFilter, MIN_CUTOFF_HZ};
pub use gain::{
    clamp_db, db_to_gain, format_db, gain_to_db, parse_db, sanitize_gain, DB_MAX, DB_MIN,
};
pub use meter::{fraction_from_db, MeterFrame, PeakMeter, METER_MAX_DB, METER_MIN_DB};
