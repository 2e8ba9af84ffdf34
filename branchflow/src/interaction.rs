//! Selection / editing state as a single enum. Only one of stage edit, flow
//! edit or branch targeting can be active, and entering one leaves the others.

use crate::algorithms::conservation::incoming_value;
use crate::algorithms::coords::{pixel_to_position, position_to_pixel, snap};
use crate::config::LayoutConfig;
use crate::geometry::limits::MAX_NAME_LEN;
use crate::geometry::tolerance::{clamp, safe_div, strictly_right_of};
use crate::model::{Color, Diagram, FlowId, StageId};
use serde::{Deserialize, Serialize};

/// Uncommitted edits to a stage; dropped on cancel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageDraft {
    pub name: String,
    pub color: Color,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InteractionState {
    #[default]
    Idle,
    EditingStage { stage: StageId, draft: StageDraft },
    /// `percent` is the draft share of the parent's incoming budget.
    EditingFlow { flow: FlowId, percent: f64 },
    AwaitingBranchTarget { source: StageId },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    ClickStage(StageId),
    ClickFlow(FlowId),
    /// Empty canvas at world pixel `x`; `vertical_offset` is where a new stage would sit.
    ClickCanvas { x: f64, vertical_offset: f64 },
    BeginBranch,
    SetFlowPercent(f64),
    SetStageName(String),
    SetStageColor(Color),
    Save,
    Cancel,
}

/// What the session must do to the diagram after a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    CreateFlow { from: StageId, to: StageId },
    CreateStage { from: StageId, position: f64, vertical_offset: f64 },
    ApplyFlowPercent { flow: FlowId, percent: f64 },
    UpdateStage { stage: StageId, name: String, color: Color },
}

/// Read-only view the state machine needs to decide a transition.
pub struct Context<'a> {
    pub diagram: &'a Diagram,
    pub config: &'a LayoutConfig,
    pub canvas_width: f64,
}

impl Context<'_> {
    fn px(&self, position: f64) -> f64 {
        position_to_pixel(position, self.config.axis(), self.canvas_width)
    }
}

/// A flow's value as a percentage of its parent's budget.
pub fn flow_percent(d: &Diagram, flow: FlowId) -> Option<f64> {
    let f = d.flow(flow)?;
    Some(safe_div(f.value, incoming_value(d, f.from), 0.0) * 100.0)
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn selected_stage(&self) -> Option<StageId> {
        match self {
            InteractionState::EditingStage { stage, .. } => Some(*stage),
            InteractionState::AwaitingBranchTarget { source } => Some(*source),
            _ => None,
        }
    }

    pub fn selected_flow(&self) -> Option<FlowId> {
        match self {
            InteractionState::EditingFlow { flow, .. } => Some(*flow),
            _ => None,
        }
    }

    /// Drop back to idle if the selected stage or flow no longer exists.
    pub fn prune(self, d: &Diagram) -> Self {
        let alive = match &self {
            InteractionState::Idle => true,
            InteractionState::EditingStage { stage, .. } => d.has_stage(*stage),
            InteractionState::AwaitingBranchTarget { source } => d.has_stage(*source),
            InteractionState::EditingFlow { flow, .. } => d.flow(*flow).is_some(),
        };
        if alive { self } else { InteractionState::Idle }
    }

    pub fn handle(self, event: Event, ctx: &Context<'_>) -> (Self, Option<Effect>) {
        use InteractionState::*;
        let d = ctx.diagram;
        match (self, event) {
            (_, Event::Cancel) => (Idle, None),

            (AwaitingBranchTarget { source }, Event::ClickStage(target)) => {
                let (Some(s), Some(t)) = (d.stage(source), d.stage(target)) else {
                    return (AwaitingBranchTarget { source }, None);
                };
                if strictly_right_of(ctx.px(t.position), ctx.px(s.position), ctx.config.pixel_epsilon) {
                    (Idle, Some(Effect::CreateFlow { from: source, to: target }))
                } else {
                    (AwaitingBranchTarget { source }, None)
                }
            }
            (AwaitingBranchTarget { source }, Event::ClickCanvas { x, vertical_offset }) => {
                let Some(s) = d.stage(source) else {
                    return (Idle, None);
                };
                if !x.is_finite() || !vertical_offset.is_finite() {
                    return (AwaitingBranchTarget { source }, None);
                }
                let axis = ctx.config.axis();
                let position = snap(
                    pixel_to_position(x, axis, ctx.canvas_width),
                    ctx.config.tick_resolution,
                    axis,
                );
                if strictly_right_of(x, ctx.px(s.position), ctx.config.pixel_epsilon) && position > s.position {
                    (Idle, Some(Effect::CreateStage { from: source, position, vertical_offset }))
                } else {
                    (AwaitingBranchTarget { source }, None)
                }
            }
            (state, Event::ClickStage(stage)) => match d.stage(stage) {
                Some(s) => {
                    if matches!(&state, EditingStage { stage: cur, .. } if *cur == stage) {
                        return (state, None);
                    }
                    let draft = StageDraft { name: s.name.clone(), color: s.color };
                    (EditingStage { stage, draft }, None)
                }
                None => (state, None),
            },

            (EditingFlow { flow: cur, .. }, Event::ClickFlow(flow)) if cur == flow => (Idle, None),
            (state, Event::ClickFlow(flow)) => match flow_percent(d, flow) {
                Some(percent) => (EditingFlow { flow, percent }, None),
                None => (state, None),
            },

            (EditingStage { .. } | EditingFlow { .. }, Event::ClickCanvas { .. }) => (Idle, None),

            (EditingStage { stage, .. }, Event::BeginBranch) => (AwaitingBranchTarget { source: stage }, None),

            (EditingFlow { flow, .. }, Event::SetFlowPercent(p)) if p.is_finite() => {
                (EditingFlow { flow, percent: clamp(p, 0.0, 100.0) }, None)
            }
            (EditingStage { stage, draft }, Event::SetStageName(name)) if name.len() <= MAX_NAME_LEN => {
                (EditingStage { stage, draft: StageDraft { name, ..draft } }, None)
            }
            (EditingStage { stage, draft }, Event::SetStageColor(color)) => {
                (EditingStage { stage, draft: StageDraft { color, ..draft } }, None)
            }

            (EditingFlow { flow, percent }, Event::Save) => {
                (Idle, Some(Effect::ApplyFlowPercent { flow, percent }))
            }
            (EditingStage { stage, draft }, Event::Save) => {
                (Idle, Some(Effect::UpdateStage { stage, name: draft.name, color: draft.color }))
            }
            (AwaitingBranchTarget { .. }, Event::Save) => (Idle, None),

            (state, _) => (state, None),
        }
    }
}
