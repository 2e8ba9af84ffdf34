// Centralized tolerances and helpers for conservation and pixel math

pub const EPS_CONSERVATION: f64 = 0.01;  // |Out - In| slack per stage
pub const MIN_FLOW_VALUE: f64 = 0.01;    // floor after proportional squeeze-out
pub const EPS_PIXEL: f64 = 1.0;          // range conversion slack (px)
pub const EPS_DENOM: f64 = 1e-9;         // denominator guard for ratios

#[inline] pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 { x.max(lo).min(hi) }
#[inline] pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool { (a - b).abs() <= eps }

#[inline]
pub fn safe_div(num: f64, den: f64, fallback: f64) -> f64 {
    if den.abs() <= EPS_DENOM { fallback } else { num/den }
}

/// `a` lies strictly right of `b` once the pixel slack is absorbed.
#[inline]
pub fn strictly_right_of(a_px: f64, b_px: f64, eps_px: f64) -> bool { a_px > b_px + eps_px }
