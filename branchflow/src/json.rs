use crate::algorithms::conservation::check_acyclic;
use crate::algorithms::coords::AxisRange;
use crate::geometry::limits;
use crate::model::{Color, Diagram, Flow, Stage};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

pub const SNAPSHOT_VERSION: u32 = 1;

pub fn to_json_impl(d: &Diagram) -> Value {
    #[derive(Serialize)]
    struct StageSer<'a> {
        id: u32,
        name: &'a str,
        position: f64,
        vertical_offset: f64,
        color: Color,
    }
    #[derive(Serialize)]
    struct FlowSer<'a> {
        id: u32,
        name: &'a str,
        from: u32,
        to: u32,
        value: f64,
        branch_index: u32,
        color: Color,
    }
    #[derive(Serialize)]
    struct Doc<'a> {
        version: u32,
        stages: Vec<StageSer<'a>>,
        flows: Vec<FlowSer<'a>>,
    }
    let stages = d
        .stages
        .iter()
        .map(|s| StageSer {
            id: s.id,
            name: &s.name,
            position: s.position,
            vertical_offset: s.vertical_offset,
            color: s.color,
        })
        .collect();
    let flows = d
        .flows
        .iter()
        .map(|f| FlowSer {
            id: f.id,
            name: &f.name,
            from: f.from,
            to: f.to,
            value: f.value,
            branch_index: f.branch_index,
            color: f.color,
        })
        .collect();
    serde_json::to_value(Doc { version: SNAPSHOT_VERSION, stages, flows }).unwrap_or(Value::Null)
}

// Field aliases accept snapshots written by the browser store (camelCase keys).
#[derive(Deserialize)]
struct StageDe {
    id: u32,
    #[serde(default)]
    name: String,
    position: f64,
    #[serde(default, alias = "verticalOffset")]
    vertical_offset: f64,
    #[serde(default)]
    color: Color,
}

#[derive(Deserialize)]
struct FlowDe {
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(alias = "fromStageId")]
    from: u32,
    #[serde(alias = "toStageId")]
    to: u32,
    value: f64,
    #[serde(default, alias = "branchIndex")]
    branch_index: u32,
    #[serde(default)]
    color: Color,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

#[derive(Deserialize)]
struct DocDe {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    stages: Vec<StageDe>,
    #[serde(default)]
    flows: Vec<FlowDe>,
}

/// Check a diagram against the ingestion limits: size caps, name lengths,
/// numeric bounds, positions inside `axis`, unique ids across stages and
/// flows, no self-loops and no cycles.
pub fn validate(d: &Diagram, axis: AxisRange) -> Result<()> {
    if d.stages.len() > limits::MAX_STAGES {
        return Err(Error::CapsExceeded(format!("stages>{}", limits::MAX_STAGES)));
    }
    if d.flows.len() > limits::MAX_FLOWS {
        return Err(Error::CapsExceeded(format!("flows>{}", limits::MAX_FLOWS)));
    }
    let mut ids = HashSet::with_capacity(d.stages.len() + d.flows.len());
    for s in &d.stages {
        if s.name.len() > limits::MAX_NAME_LEN {
            return Err(Error::CapsExceeded("stage name".into()));
        }
        if !(s.position.is_finite() && s.position >= axis.min && s.position <= axis.max) {
            return Err(Error::OutOfBounds("stage position".into()));
        }
        if !limits::in_offset_bounds(s.vertical_offset) {
            return Err(Error::OutOfBounds("stage vertical_offset".into()));
        }
        if !ids.insert(s.id) {
            return Err(Error::InvalidStructure(format!("duplicate id {}", s.id)));
        }
    }
    for f in &d.flows {
        if f.name.len() > limits::MAX_NAME_LEN {
            return Err(Error::CapsExceeded("flow name".into()));
        }
        if !limits::in_value_bounds(f.value) {
            return Err(Error::OutOfBounds("flow value".into()));
        }
        if f.from == f.to {
            return Err(Error::InvalidStructure("flow endpoints equal".into()));
        }
        if !ids.insert(f.id) {
            return Err(Error::InvalidStructure(format!("duplicate id {}", f.id)));
        }
    }
    check_acyclic(d)
}

/// Build a diagram from a snapshot, rejecting anything out of bounds or cyclic.
/// Positions are clamped into `axis`. Flows naming a missing stage are kept;
/// layout treats them as hanging.
pub fn from_json_impl_strict(v: Value, axis: AxisRange) -> Result<Diagram> {
    let doc: DocDe = serde_json::from_value(v).map_err(|e| Error::Parse(e.to_string()))?;
    if doc.version > SNAPSHOT_VERSION {
        return Err(Error::InvalidStructure(format!("unsupported version {}", doc.version)));
    }
    let mut d = Diagram::new();
    d.stages = doc
        .stages
        .into_iter()
        .map(|s| Stage {
            id: s.id,
            name: s.name,
            // Non-finite positions stay as they are so `validate` reports them.
            position: if s.position.is_finite() { axis.clamp(s.position) } else { s.position },
            vertical_offset: s.vertical_offset,
            color: s.color,
        })
        .collect();
    d.flows = doc
        .flows
        .into_iter()
        .map(|f| Flow {
            id: f.id,
            name: f.name,
            from: f.from,
            to: f.to,
            value: f.value,
            branch_index: f.branch_index,
            color: f.color,
        })
        .collect();
    validate(&d, axis)?;
    d.reseat_next_id();
    Ok(d)
}

pub fn from_json_impl(v: Value, axis: AxisRange) -> Option<Diagram> {
    match from_json_impl_strict(v, axis) {
        Ok(d) => Some(d),
        Err(e) => {
            warn!(code = e.code(), error = %e, "snapshot rejected");
            None
        }
    }
}
