//! Percentage axis <-> pixel mapping, snapping, ticks and the pan/zoom viewport.

use crate::geometry::limits::MAX_TICKS;
use crate::geometry::tolerance::{clamp, safe_div};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl Default for AxisRange {
    fn default() -> Self {
        AxisRange { min: -10.0, max: 110.0 }
    }
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        AxisRange { min, max }
    }
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
    pub fn clamp(&self, position: f64) -> f64 {
        clamp(position, self.min, self.max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub position: f64,
    pub major: bool,
}

pub fn position_to_pixel(position: f64, axis: AxisRange, canvas_width: f64) -> f64 {
    safe_div(position - axis.min, axis.span(), 0.0) * canvas_width
}

pub fn pixel_to_position(px: f64, axis: AxisRange, canvas_width: f64) -> f64 {
    let t = safe_div(px, canvas_width, 0.0);
    axis.clamp(axis.min + t * axis.span())
}

/// Round to the nearest multiple of `tick`, then clamp into the axis.
pub fn snap(position: f64, tick: f64, axis: AxisRange) -> f64 {
    if !position.is_finite() {
        return axis.clamp(0.0);
    }
    if !(tick.is_finite() && tick > 0.0) {
        return axis.clamp(position);
    }
    let steps = (position / tick).round();
    axis.clamp(tidy(steps * tick, tick))
}

// Strip representation noise like 0.30000000000000004 down to the tick's precision.
fn tidy(v: f64, tick: f64) -> f64 {
    let decimals = (-tick.log10().floor()).max(0.0).min(12.0) as i32 + 1;
    let p = 10f64.powi(decimals);
    (v * p).round() / p
}

/// Every tick across the axis, both ends included.
///
/// Majors fall on multiples of `tick * major_every` measured from zero, so a
/// -10..110 axis with 0.1 ticks and `major_every = 100` marks -10, 0, 10, ... 110.
pub fn ticker_positions(tick: f64, major_every: u32, axis: AxisRange) -> Vec<Tick> {
    if !(tick.is_finite() && tick > 0.0) || !(axis.span() > 0.0) {
        return Vec::new();
    }
    let count = (axis.span() / tick + 1e-9).floor() as usize;
    if count >= MAX_TICKS {
        return Vec::new();
    }
    let every = major_every.max(1) as i64;
    let mut out = Vec::with_capacity(count + 2);
    for i in 0..=count {
        let position = tidy(axis.min + i as f64 * tick, tick);
        if position > axis.max {
            break;
        }
        let k = (position / tick).round() as i64;
        out.push(Tick { position, major: k.rem_euclid(every) == 0 });
    }
    if out.last().map_or(true, |t| t.position < axis.max) {
        let k = (axis.max / tick).round() as i64;
        out.push(Tick { position: axis.max, major: k.rem_euclid(every) == 0 });
    }
    out
}

/// Pan/zoom transform between world pixels (layout space) and screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Viewport {
    pub fn world_to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.zoom + self.pan_x, y * self.zoom + self.pan_y)
    }
    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            safe_div(sx - self.pan_x, self.zoom, sx - self.pan_x),
            safe_div(sy - self.pan_y, self.zoom, sy - self.pan_y),
        )
    }
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
        if !dx.is_finite() || !dy.is_finite() {
            return false;
        }
        self.pan_x += dx;
        self.pan_y += dy;
        true
    }
    /// Scale by `factor` keeping the screen point (ax, ay) fixed.
    pub fn zoom_at(&mut self, factor: f64, ax: f64, ay: f64, min_zoom: f64, max_zoom: f64) -> bool {
        if !(factor.is_finite() && factor > 0.0) || !ax.is_finite() || !ay.is_finite() {
            return false;
        }
        let (wx, wy) = self.screen_to_world(ax, ay);
        self.zoom = clamp(self.zoom * factor, min_zoom, max_zoom);
        self.pan_x = ax - wx * self.zoom;
        self.pan_y = ay - wy * self.zoom;
        true
    }
    pub fn reset(&mut self) {
        *self = Viewport::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tidy_removes_float_noise() {
        assert_eq!(snap(0.30000000000000004, 0.1, AxisRange::default()), 0.3);
        assert_eq!(snap(12.345, 0.1, AxisRange::default()), 12.3);
    }

    #[test]
    fn zero_width_canvas_maps_to_axis_min() {
        let axis = AxisRange::default();
        assert_eq!(pixel_to_position(50.0, axis, 0.0), -10.0);
        assert_eq!(position_to_pixel(50.0, axis, 0.0), 0.0);
    }
}
