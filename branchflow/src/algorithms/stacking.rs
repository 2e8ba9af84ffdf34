//! Stage heights and per-flow stacking offsets.
//!
//! Flows sharing an endpoint are stacked top to bottom without overlap: by
//! `branch_index` on the source side, by the vertical position of their source
//! stages on the target side. Hanging flows (an endpoint stage is gone) take no
//! part in layout.

use crate::algorithms::coords::position_to_pixel;
use crate::config::LayoutConfig;
use crate::model::{Color, Diagram, Flow, FlowId, Stage, StageId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas { width: 1200.0, height: 800.0 }
    }
}

/// Rendered width of a flow; never below `min_flow_width`.
pub fn flow_width(value: f64, cfg: &LayoutConfig) -> f64 {
    let w = value * cfg.height_scale;
    if w.is_finite() { w.max(cfg.min_flow_width) } else { cfg.min_flow_width }
}

fn bundle_height(flows: &[&Flow], cfg: &LayoutConfig) -> Option<f64> {
    if flows.is_empty() {
        return None;
    }
    let sum: f64 = flows.iter().map(|f| flow_width(f.value, cfg)).sum();
    Some(sum + cfg.flow_spacing * (flows.len() - 1) as f64)
}

pub fn stage_center_y(stage: &Stage, canvas: Canvas) -> f64 {
    canvas.height * 0.5 + stage.vertical_offset
}

// Centre of each width measured from the top of the bundle.
fn stack_centers(widths: &[f64], spacing: f64) -> Vec<f64> {
    let mut acc = 0.0;
    widths
        .iter()
        .map(|w| {
            let c = acc + w * 0.5;
            acc += w + spacing;
            c
        })
        .collect()
}

// Live flows per endpoint, built once per layout call.
struct Links<'a> {
    stages: HashMap<StageId, &'a Stage>,
    out: HashMap<StageId, Vec<&'a Flow>>,
    inc: HashMap<StageId, Vec<&'a Flow>>,
}

impl<'a> Links<'a> {
    fn build(d: &'a Diagram) -> Self {
        let mut stages: HashMap<StageId, &Stage> = HashMap::with_capacity(d.stages.len());
        for s in &d.stages {
            stages.entry(s.id).or_insert(s);
        }
        let mut out: HashMap<StageId, Vec<&Flow>> = HashMap::new();
        let mut inc: HashMap<StageId, Vec<&Flow>> = HashMap::new();
        for f in &d.flows {
            if stages.contains_key(&f.from) && stages.contains_key(&f.to) {
                out.entry(f.from).or_default().push(f);
                inc.entry(f.to).or_default().push(f);
            }
        }
        Links { stages, out, inc }
    }

    fn outgoing(&self, s: StageId) -> &[&'a Flow] {
        self.out.get(&s).map(Vec::as_slice).unwrap_or(&[])
    }

    fn incoming(&self, s: StageId) -> &[&'a Flow] {
        self.inc.get(&s).map(Vec::as_slice).unwrap_or(&[])
    }

    fn height(&self, s: StageId, cfg: &LayoutConfig) -> f64 {
        bundle_height(self.incoming(s), cfg)
            .or_else(|| bundle_height(self.outgoing(s), cfg))
            .unwrap_or(cfg.min_marker_height)
    }

    fn top(&self, s: &Stage, cfg: &LayoutConfig, canvas: Canvas) -> f64 {
        stage_center_y(s, canvas) - self.height(s.id, cfg) * 0.5
    }

    fn source_order(&self, s: StageId) -> Vec<&'a Flow> {
        let mut v = self.outgoing(s).to_vec();
        v.sort_by(|a, b| a.branch_index.cmp(&b.branch_index).then(a.id.cmp(&b.id)));
        v
    }

    fn target_order(&self, s: StageId, canvas: Canvas) -> Vec<&'a Flow> {
        let src_y = |f: &Flow| self.stages.get(&f.from).map_or(0.0, |s| stage_center_y(s, canvas));
        let mut v = self.incoming(s).to_vec();
        v.sort_by(|a, b| src_y(a).total_cmp(&src_y(b)).then(a.id.cmp(&b.id)));
        v
    }
}

/// Height of a stage marker: its incoming bundle, else its outgoing bundle,
/// else the fixed marker height.
pub fn node_height(d: &Diagram, stage: StageId, cfg: &LayoutConfig) -> f64 {
    Links::build(d).height(stage, cfg)
}

fn offset_in(order: &[&Flow], flow: FlowId, cfg: &LayoutConfig) -> Option<f64> {
    let widths: Vec<f64> = order.iter().map(|f| flow_width(f.value, cfg)).collect();
    let idx = order.iter().position(|f| f.id == flow)?;
    stack_centers(&widths, cfg.flow_spacing).get(idx).copied()
}

/// Absolute vertical centre of `flow` at its source and at its target, or
/// `None` for a hanging or unknown flow.
pub fn flow_vertical_center(
    d: &Diagram,
    flow: FlowId,
    cfg: &LayoutConfig,
    canvas: Canvas,
) -> Option<(f64, f64)> {
    let links = Links::build(d);
    let f = d.flow(flow)?;
    let src = links.stages.get(&f.from)?;
    let tgt = links.stages.get(&f.to)?;
    let y0 = links.top(src, cfg, canvas) + offset_in(&links.source_order(src.id), flow, cfg)?;
    let y1 = links.top(tgt, cfg, canvas) + offset_in(&links.target_order(tgt.id, canvas), flow, cfg)?;
    Some((y0, y1))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageGeom {
    pub id: StageId,
    pub x: f64,
    pub y: f64,
    pub top: f64,
    pub height: f64,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowGeom {
    pub id: FlowId,
    pub from: StageId,
    pub to: StageId,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub width: f64,
    pub color: Color,
}

/// Everything a renderer needs for one frame, in world pixels.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SceneLayout {
    pub marker_width: f64,
    pub stages: Vec<StageGeom>,
    pub flows: Vec<FlowGeom>,
}

pub struct StageArrays {
    pub ids: Vec<u32>,
    pub rects: Vec<f32>,
    pub rgba: Vec<u8>,
}

pub struct FlowArrays {
    pub ids: Vec<u32>,
    pub endpoints: Vec<u32>,
    pub geometry: Vec<f32>,
    pub widths: Vec<f32>,
    pub rgba: Vec<u8>,
}

impl SceneLayout {
    pub fn stage(&self, id: StageId) -> Option<&StageGeom> {
        self.stages.iter().find(|s| s.id == id)
    }
    pub fn flow(&self, id: FlowId) -> Option<&FlowGeom> {
        self.flows.iter().find(|f| f.id == id)
    }

    /// Stage rects as `[x, top, w, h]` quads.
    pub fn stage_arrays(&self) -> StageArrays {
        let mut ids = Vec::with_capacity(self.stages.len());
        let mut rects = Vec::with_capacity(self.stages.len() * 4);
        let mut rgba = Vec::with_capacity(self.stages.len() * 4);
        for s in &self.stages {
            ids.push(s.id);
            rects.extend_from_slice(&[
                (s.x - self.marker_width * 0.5) as f32,
                s.top as f32,
                self.marker_width as f32,
                s.height as f32,
            ]);
            rgba.extend_from_slice(&[s.color.r, s.color.g, s.color.b, s.color.a]);
        }
        StageArrays { ids, rects, rgba }
    }

    /// Flow centre lines as `[x0, y0, x1, y1]` quads.
    pub fn flow_arrays(&self) -> FlowArrays {
        let mut out = FlowArrays {
            ids: Vec::with_capacity(self.flows.len()),
            endpoints: Vec::with_capacity(self.flows.len() * 2),
            geometry: Vec::with_capacity(self.flows.len() * 4),
            widths: Vec::with_capacity(self.flows.len()),
            rgba: Vec::with_capacity(self.flows.len() * 4),
        };
        for f in &self.flows {
            out.ids.push(f.id);
            out.endpoints.extend_from_slice(&[f.from, f.to]);
            out.geometry.extend_from_slice(&[f.x0 as f32, f.y0 as f32, f.x1 as f32, f.y1 as f32]);
            out.widths.push(f.width as f32);
            out.rgba.extend_from_slice(&[f.color.r, f.color.g, f.color.b, f.color.a]);
        }
        out
    }
}

/// Resolve pixel geometry for every stage and every live flow.
pub fn layout_scene(d: &Diagram, cfg: &LayoutConfig, canvas: Canvas) -> SceneLayout {
    let axis = cfg.axis();
    let links = Links::build(d);
    let mut stages = Vec::with_capacity(d.stages.len());
    let mut by_id: HashMap<StageId, usize> = HashMap::with_capacity(d.stages.len());
    for s in &d.stages {
        let height = links.height(s.id, cfg);
        let y = stage_center_y(s, canvas);
        by_id.insert(s.id, stages.len());
        stages.push(StageGeom {
            id: s.id,
            x: position_to_pixel(s.position, axis, canvas.width),
            y,
            top: y - height * 0.5,
            height,
            color: s.color,
        });
    }

    let mut src_y: HashMap<FlowId, f64> = HashMap::with_capacity(d.flows.len());
    let mut tgt_y: HashMap<FlowId, f64> = HashMap::with_capacity(d.flows.len());
    for g in &stages {
        let outs = links.source_order(g.id);
        let widths: Vec<f64> = outs.iter().map(|f| flow_width(f.value, cfg)).collect();
        for (f, c) in outs.iter().zip(stack_centers(&widths, cfg.flow_spacing)) {
            src_y.insert(f.id, g.top + c);
        }
        let ins = links.target_order(g.id, canvas);
        let widths: Vec<f64> = ins.iter().map(|f| flow_width(f.value, cfg)).collect();
        for (f, c) in ins.iter().zip(stack_centers(&widths, cfg.flow_spacing)) {
            tgt_y.insert(f.id, g.top + c);
        }
    }

    let half = cfg.marker_width * 0.5;
    let mut flows = Vec::with_capacity(d.flows.len());
    for f in &d.flows {
        let (Some(&si), Some(&ti)) = (by_id.get(&f.from), by_id.get(&f.to)) else {
            continue;
        };
        let (Some(&y0), Some(&y1)) = (src_y.get(&f.id), tgt_y.get(&f.id)) else {
            continue;
        };
        flows.push(FlowGeom {
            id: f.id,
            from: f.from,
            to: f.to,
            x0: stages[si].x + half,
            y0,
            x1: stages[ti].x - half,
            y1,
            width: flow_width(f.value, cfg),
            color: f.color,
        });
    }
    SceneLayout { marker_width: cfg.marker_width, stages, flows }
}
