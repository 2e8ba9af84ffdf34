// Centralized ingestion limits to harden against untrusted snapshots

// Scene size caps
pub const MAX_STAGES: usize = 50_000;
pub const MAX_FLOWS: usize = 100_000;
pub const MAX_NAME_LEN: usize = 1_024;

// Axis ticks
pub const MAX_TICKS: usize = 100_000;

// Numeric bounds
pub const OFFSET_MIN: f64 = -10_000_000.0;
pub const OFFSET_MAX: f64 =  10_000_000.0;
pub const VALUE_MAX: f64 = 1.0e12;

#[inline]
pub fn in_offset_bounds(y: f64) -> bool { y.is_finite() && y >= OFFSET_MIN && y <= OFFSET_MAX }

#[inline]
pub fn in_value_bounds(v: f64) -> bool { v.is_finite() && v >= 0.0 && v <= VALUE_MAX }
