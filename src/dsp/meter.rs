//! Output level meter
//!
//! Tracks the peak of each rendered block with a peak-hold marker and a
//! sticky clip indicator.

use super::gain::gain_to_db;

/// Bottom of the meter scale in dB
pub const METER_MIN_DB: f64 = -60.0;

/// Top of the meter scale in dB
pub const METER_MAX_DB: f64 = 12.0;

/// Position of `db` on a `[min_db, max_db]` scale, in `[0, 1]`
pub fn fraction_from_db(db: f64, min_db: f64, max_db: f64) -> f64 {
    if max_db <= min_db {
        return 0.0;
    }
    let d = if db.is_nan() {
        min_db
    } else {
        db.clamp(min_db, max_db)
    };
    (d - min_db) / (max_db - min_db)
}

/// One meter reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterFrame {
    /// Linear peak of the block
    pub peak: f32,
    /// Peak in dB (negative infinity for silence)
    pub peak_db: f64,
    /// Meter fill, `[0, 1]`
    pub fill: f64,
    /// Peak-hold marker position, `[0, 1]`
    pub hold: f64,
    /// A sample above full scale has been seen since the last reset
    pub clipped: bool,
}

/// Peak meter with hold
#[derive(Debug, Clone)]
pub struct PeakMeter {
    min_db: f64,
    max_db: f64,
    peak_hold_db: f64,
    clip_hold: bool,
}

impl Default for PeakMeter {
    fn default() -> Self {
        Self::new(METER_MIN_DB, METER_MAX_DB)
    }
}

impl PeakMeter {
    pub fn new(min_db: f64, max_db: f64) -> Self {
        Self {
            min_db,
            max_db,
            peak_hold_db: f64::NEG_INFINITY,
            clip_hold: false,
        }
    }

    /// Feed one block of samples and return the reading
    pub fn update(&mut self, samples: &[f32]) -> MeterFrame {
        let peak = samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
        self.update_peak(peak)
    }

    /// Feed a precomputed linear peak
    pub fn update_peak(&mut self, peak: f32) -> MeterFrame {
        if peak > 1.0 {
            self.clip_hold = true;
        }
        let peak_db = gain_to_db(peak as f64);
        self.peak_hold_db = self.peak_hold_db.max(peak_db);

        MeterFrame {
            peak,
            peak_db,
            fill: fraction_from_db(peak_db, self.min_db, self.max_db),
            hold: fraction_from_db(self.peak_hold_db, self.min_db, self.max_db),
            clipped: self.clip_hold,
        }
    }

    /// Highest peak seen since the last reset, in dB
    pub fn peak_hold_db(&self) -> f64 {
        self.peak_hold_db
    }

    pub fn is_clipped(&self) -> bool {
        self.clip_hold
    }

    /// Clear the peak hold and the clip indicator
    pub fn reset(&mut self) {
        self.peak_hold_db = f64::NEG_INFINITY;
        self.clip_hold = false;
    }
}
