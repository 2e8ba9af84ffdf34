use crate::algorithms::stacking::SceneLayout;
use crate::geometry::math::{cubic_distance_sq, point_in_rect, ribbon_controls};
use crate::model::{FlowId, StageId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Pick {
    Stage { id: StageId, dist: f64 },
    Flow { id: FlowId, t: f64, dist: f64 },
}

fn rect_distance(px: f64, py: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    let dx = (x0 - px).max(0.0).max(px - x1);
    let dy = (y0 - py).max(0.0).max(py - y1);
    (dx*dx + dy*dy).sqrt()
}

/// Hit-test a scene in world pixels. Stage markers win over flows; among each
/// kind the nearest within `tol` is returned.
pub fn pick_impl(scene: &SceneLayout, x: f64, y: f64, tol: f64) -> Option<Pick> {
    let half = scene.marker_width * 0.5;
    // Stages first
    let mut best_stage: Option<(StageId, f64)> = None;
    for s in &scene.stages {
        let (x0, y0, x1, y1) = (s.x - half, s.top, s.x + half, s.top + s.height);
        if point_in_rect(x, y, x0, y0, x1, y1, tol) {
            let d = rect_distance(x, y, x0, y0, x1, y1);
            if d <= tol && best_stage.map_or(true, |(_, bd)| d < bd) { best_stage = Some((s.id, d)); }
        }
    }
    if let Some((id, dist)) = best_stage { return Some(Pick::Stage { id, dist }); }
    // Flows
    let mut best_flow: Option<(FlowId, f64, f64)> = None;
    for f in &scene.flows {
        let c = ribbon_controls(f.x0, f.y0, f.x1, f.y1);
        let (d2, t) = cubic_distance_sq(x, y, &c);
        let d = (d2.sqrt() - f.width * 0.5).max(0.0);
        if d <= tol && best_flow.map_or(true, |(_, bd, _)| d < bd) { best_flow = Some((f.id, d, t)); }
    }
    best_flow.map(|(id, dist, t)| Pick::Flow { id, t, dist })
}
