use crate::geometry::tolerance::{EPS_CONSERVATION, EPS_PIXEL, MIN_FLOW_VALUE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Layout and numeric constants, supplied once when an editor is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub min_flow_width: f64,
    /// Pixels per unit of flow value.
    pub height_scale: f64,
    pub flow_spacing: f64,
    pub min_marker_height: f64,
    /// Drawn width of a stage marker; also its hit box.
    pub marker_width: f64,
    pub axis_min: f64,
    pub axis_max: f64,
    pub tick_resolution: f64,
    pub major_tick_every: u32,
    pub conservation_epsilon: f64,
    pub pixel_epsilon: f64,
    pub min_flow_value: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub pick_tolerance: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            min_flow_width: 20.0,
            height_scale: 8.0,
            flow_spacing: 8.0,
            min_marker_height: 40.0,
            marker_width: 12.0,
            axis_min: -10.0,
            axis_max: 110.0,
            tick_resolution: 0.1,
            major_tick_every: 100,
            conservation_epsilon: EPS_CONSERVATION,
            pixel_epsilon: EPS_PIXEL,
            min_flow_value: MIN_FLOW_VALUE,
            min_zoom: 0.1,
            max_zoom: 10.0,
            pick_tolerance: 4.0,
        }
    }
}

impl LayoutConfig {
    pub fn axis(&self) -> crate::algorithms::coords::AxisRange {
        crate::algorithms::coords::AxisRange::new(self.axis_min, self.axis_max)
    }

    /// Replace non-finite or nonsensical fields with their defaults.
    pub fn validated(mut self) -> Self {
        let d = LayoutConfig::default();
        fn pos(v: f64, fallback: f64) -> f64 { if v.is_finite() && v > 0.0 { v } else { fallback } }
        fn non_neg(v: f64, fallback: f64) -> f64 { if v.is_finite() && v >= 0.0 { v } else { fallback } }
        self.min_flow_width = non_neg(self.min_flow_width, d.min_flow_width);
        self.height_scale = non_neg(self.height_scale, d.height_scale);
        self.flow_spacing = non_neg(self.flow_spacing, d.flow_spacing);
        self.min_marker_height = non_neg(self.min_marker_height, d.min_marker_height);
        self.marker_width = non_neg(self.marker_width, d.marker_width);
        if !(self.axis_min.is_finite() && self.axis_max.is_finite() && self.axis_min < self.axis_max) {
            self.axis_min = d.axis_min;
            self.axis_max = d.axis_max;
        }
        self.tick_resolution = pos(self.tick_resolution, d.tick_resolution);
        if self.major_tick_every == 0 { self.major_tick_every = d.major_tick_every; }
        self.conservation_epsilon = pos(self.conservation_epsilon, d.conservation_epsilon);
        self.pixel_epsilon = non_neg(self.pixel_epsilon, d.pixel_epsilon);
        self.min_flow_value = non_neg(self.min_flow_value, d.min_flow_value);
        self.min_zoom = pos(self.min_zoom, d.min_zoom);
        self.max_zoom = pos(self.max_zoom, d.max_zoom);
        if self.min_zoom > self.max_zoom {
            self.min_zoom = d.min_zoom;
            self.max_zoom = d.max_zoom;
        }
        self.pick_tolerance = non_neg(self.pick_tolerance, d.pick_tolerance);
        self
    }

    /// Missing keys keep their defaults.
    pub fn from_json_value(v: serde_json::Value) -> Result<Self> {
        let cfg: LayoutConfig =
            serde_json::from_value(v).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(cfg.validated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = LayoutConfig::from_json_value(json!({"height_scale": 4.0})).unwrap();
        assert_eq!(cfg.height_scale, 4.0);
        assert_eq!(cfg.min_flow_width, 20.0);
        assert_eq!(cfg.axis_min, -10.0);
    }

    #[test]
    fn inverted_axis_is_reset() {
        let cfg = LayoutConfig { axis_min: 50.0, axis_max: 10.0, ..Default::default() }.validated();
        assert_eq!((cfg.axis_min, cfg.axis_max), (-10.0, 110.0));
    }

    #[test]
    fn non_finite_fields_fall_back() {
        let cfg = LayoutConfig { tick_resolution: f64::NAN, min_zoom: -1.0, ..Default::default() }.validated();
        assert_eq!(cfg.tick_resolution, 0.1);
        assert_eq!(cfg.min_zoom, 0.1);
    }
}
