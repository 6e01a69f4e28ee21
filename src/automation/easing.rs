//! Cubic-bezier easing
//!
//! Solves the CSS `cubic-bezier(x1, y1, x2, y2)` timing function: the curve
//! runs from (0,0) to (1,1), x is progress through a segment, y is the eased
//! interpolation weight.

const NEWTON_ITERATIONS: usize = 4;
const NEWTON_MIN_SLOPE: f64 = 0.001;
const SUBDIVISION_PRECISION: f64 = 1e-7;
const SUBDIVISION_MAX_ITERATIONS: usize = 10;
const SPLINE_TABLE_SIZE: usize = 11;
const SAMPLE_STEP_SIZE: f64 = 1.0 / (SPLINE_TABLE_SIZE as f64 - 1.0);

#[inline]
fn coeff_a(a1: f64, a2: f64) -> f64 {
    1.0 - 3.0 * a2 + 3.0 * a1
}

#[inline]
fn coeff_b(a1: f64, a2: f64) -> f64 {
    3.0 * a2 - 6.0 * a1
}

#[inline]
fn coeff_c(a1: f64) -> f64 {
    3.0 * a1
}

/// x(t) or y(t) of the bezier given the two inner control coordinates
#[inline]
fn calc_bezier(t: f64, a1: f64, a2: f64) -> f64 {
    ((coeff_a(a1, a2) * t + coeff_b(a1, a2)) * t + coeff_c(a1)) * t
}

/// dx/dt or dy/dt
#[inline]
fn slope(t: f64, a1: f64, a2: f64) -> f64 {
    3.0 * coeff_a(a1, a2) * t * t + 2.0 * coeff_b(a1, a2) * t + coeff_c(a1)
}

/// A solved cubic-bezier easing function
#[derive(Debug, Clone, PartialEq)]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    samples: [f64; SPLINE_TABLE_SIZE],
}

impl CubicBezier {
    /// Build an easing from control points
    ///
    /// The x coordinates must lie in [0, 1] for the curve to be a function
    /// of x; out-of-range or non-finite values are clamped.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let x1 = clamp_unit(x1);
        let x2 = clamp_unit(x2);
        let y1 = super::finite_or(y1, 0.0);
        let y2 = super::finite_or(y2, 1.0);

        let mut samples = [0.0; SPLINE_TABLE_SIZE];
        for (i, sample) in samples.iter_mut().enumerate() {
            *sample = calc_bezier(i as f64 * SAMPLE_STEP_SIZE, x1, x2);
        }

        Self {
            x1,
            y1,
            x2,
            y2,
            samples,
        }
    }

    /// Build from a `[x1, y1, x2, y2]` control tuple
    pub fn from_points(points: [f64; 4]) -> Self {
        Self::new(points[0], points[1], points[2], points[3])
    }

    /// True when the easing is the identity
    pub fn is_linear(&self) -> bool {
        self.x1 == self.y1 && self.x2 == self.y2
    }

    /// Evaluate the eased weight for progress `x` in [0, 1]
    pub fn ease(&self, x: f64) -> f64 {
        if self.is_linear() {
            return x;
        }
        // Exact endpoints regardless of control points
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        calc_bezier(self.t_for_x(x), self.y1, self.y2)
    }

    fn t_for_x(&self, x: f64) -> f64 {
        let mut interval_start = 0.0;
        let mut current = 1;
        let last = SPLINE_TABLE_SIZE - 1;

        while current != last && self.samples[current] <= x {
            interval_start += SAMPLE_STEP_SIZE;
            current += 1;
        }
        current -= 1;

        let span = self.samples[current + 1] - self.samples[current];
        let dist = if span.abs() > f64::EPSILON {
            (x - self.samples[current]) / span
        } else {
            0.0
        };
        let guess = interval_start + dist * SAMPLE_STEP_SIZE;

        let initial_slope = slope(guess, self.x1, self.x2);
        if initial_slope >= NEWTON_MIN_SLOPE {
            self.newton_raphson(x, guess)
        } else if initial_slope == 0.0 {
            guess
        } else {
            self.binary_subdivide(x, interval_start, interval_start + SAMPLE_STEP_SIZE)
        }
    }

    fn newton_raphson(&self, x: f64, mut guess: f64) -> f64 {
        for _ in 0..NEWTON_ITERATIONS {
            let current_slope = slope(guess, self.x1, self.x2);
            if current_slope == 0.0 {
                return guess;
            }
            let current_x = calc_bezier(guess, self.x1, self.x2) - x;
            guess -= current_x / current_slope;
        }
        guess
    }

    fn binary_subdivide(&self, x: f64, mut a: f64, mut b: f64) -> f64 {
        let mut t = a;
        for _ in 0..SUBDIVISION_MAX_ITERATIONS {
            t = a + (b - a) / 2.0;
            let current_x = calc_bezier(t, self.x1, self.x2) - x;
            if current_x.abs() <= SUBDIVISION_PRECISION {
                break;
            }
            if current_x > 0.0 {
                b = t;
            } else {
                a = t;
            }
        }
        t
    }
}

fn clamp_unit(v: f64) -> f64 {
    num_traits::clamp(super::finite_or(v, 0.0), 0.0, 1.0)
}
