pub mod config;
pub mod error;
pub mod interaction;
pub mod model;
pub mod geometry {
    pub mod limits;
    pub mod math;
    pub mod tolerance;
}
pub mod algorithms {
    pub mod conservation;
    pub mod coords;
    pub mod picking;
    pub mod stacking;
}
mod json;

pub use algorithms::conservation::{incoming_value, Conservation};
pub use algorithms::coords::{AxisRange, Tick, Viewport};
pub use algorithms::picking::Pick;
pub use algorithms::stacking::{Canvas, FlowArrays, SceneLayout, StageArrays};
pub use config::LayoutConfig;
pub use error::{Error, Result};
pub use interaction::{Effect, Event, InteractionState};
pub use model::{Color, Diagram, Flow, FlowId, Stage, StageId};

use algorithms::coords::ticker_positions;
use geometry::limits::MAX_NAME_LEN;
use tracing::debug;

pub const SEED_STAGE_NAME: &str = "Start";

/// One editing session: the current diagram plus view and selection state.
///
/// Every mutation goes through the conservation engine, replaces the whole
/// snapshot and bumps `version`; a failed operation leaves the session as it was.
pub struct Editor {
    pub(crate) diagram: Diagram,
    pub(crate) config: LayoutConfig,
    pub(crate) conservation: Conservation,
    pub(crate) canvas: Canvas,
    pub(crate) viewport: Viewport,
    pub(crate) interaction: InteractionState,
    pub(crate) version: u64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        let config = config.validated();
        let mut ed = Editor {
            diagram: Diagram::new(),
            conservation: Conservation::from(&config),
            config,
            canvas: Canvas::default(),
            viewport: Viewport::default(),
            interaction: InteractionState::Idle,
            version: 1,
        };
        ed.seed();
        ed
    }

    fn seed(&mut self) {
        let mut d = Diagram::new();
        d.push_stage(SEED_STAGE_NAME, 0.0, 0.0, Color::default());
        self.diagram = d;
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    fn commit(&mut self, d: Diagram) {
        self.diagram = d;
        self.interaction = std::mem::take(&mut self.interaction).prune(&self.diagram);
        self.bump();
    }

    /// Monotonic; increments on every diagram mutation.
    pub fn version(&self) -> u64 {
        self.version
    }
    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }
    pub fn snapshot(&self) -> Diagram {
        self.diagram.clone()
    }
    /// Put back a snapshot taken earlier (undo). Snapshots that break the
    /// ingestion limits or contain a cycle are refused.
    pub fn restore(&mut self, mut d: Diagram) -> Result<()> {
        json::validate(&d, self.config.axis())?;
        d.reseat_next_id();
        self.commit(d);
        Ok(())
    }
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }
    pub fn set_canvas_size(&mut self, width: f64, height: f64) -> bool {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return false;
        }
        self.canvas = Canvas { width, height };
        true
    }

    // Stages/flows
    pub fn stage_count(&self) -> u32 {
        self.diagram.stages.len() as u32
    }
    pub fn flow_count(&self) -> u32 {
        self.diagram.flows.len() as u32
    }
    pub fn get_stage(&self, id: StageId) -> Option<&Stage> {
        self.diagram.stage(id)
    }
    pub fn get_flow(&self, id: FlowId) -> Option<&Flow> {
        self.diagram.flow(id)
    }
    pub fn incoming_value(&self, id: StageId) -> Option<f64> {
        self.diagram.stage(id).map(|_| incoming_value(&self.diagram, id))
    }
    pub fn flow_percent(&self, id: FlowId) -> Option<f64> {
        interaction::flow_percent(&self.diagram, id)
    }

    /// Create a stage at `position` (clamped to the axis) and a flow into it
    /// from `from`. Positions at or left of the source are ignored.
    pub fn branch_to_new_stage(
        &mut self,
        from: StageId,
        position: f64,
        vertical_offset: f64,
    ) -> Result<Option<(StageId, FlowId)>> {
        let Some(src) = self.diagram.stage(from) else {
            return Ok(None);
        };
        if !position.is_finite() || !vertical_offset.is_finite() {
            return Ok(None);
        }
        let position = self.config.axis().clamp(position);
        if position <= src.position {
            debug!(from, position, "branch target not right of source");
            return Ok(None);
        }
        let flow_color = src.color;
        let mut d = self.diagram.clone();
        let name = format!("Stage {}", d.next_id);
        let stage = d.push_stage(name, position, vertical_offset, Color::default());
        let (d, flow) = self.conservation.branch_create(&d, from, stage, flow_color)?;
        self.commit(d);
        Ok(Some((stage, flow)))
    }

    /// Connect two existing stages. The target must sit strictly right of the source.
    pub fn connect(&mut self, from: StageId, to: StageId) -> Result<Option<FlowId>> {
        let (Some(src), Some(dst)) = (self.diagram.stage(from), self.diagram.stage(to)) else {
            return Ok(None);
        };
        if dst.position <= src.position {
            debug!(from, to, "connect rejected: target not right of source");
            return Ok(None);
        }
        let color = src.color;
        let (d, flow) = self.conservation.branch_create(&self.diagram, from, to, color)?;
        self.commit(d);
        Ok(Some(flow))
    }

    pub fn edit_flow_percent(&mut self, flow: FlowId, percent: f64) -> Result<bool> {
        if self.diagram.flow(flow).is_none() || !percent.is_finite() {
            return Ok(false);
        }
        let d = self.conservation.apply_manual_edit(&self.diagram, flow, percent)?;
        self.commit(d);
        Ok(true)
    }

    /// Roots and unknown ids are left alone and report `false`.
    pub fn delete_stage(&mut self, stage: StageId) -> Result<bool> {
        if !self.diagram.has_stage(stage) || self.diagram.is_root(stage) {
            return Ok(false);
        }
        let d = self.conservation.delete_stage(&self.diagram, stage)?;
        self.commit(d);
        Ok(true)
    }

    pub fn disconnect_flow(&mut self, flow: FlowId) -> Result<bool> {
        if self.diagram.flow(flow).is_none() {
            return Ok(false);
        }
        let d = self.conservation.disconnect_flow(&self.diagram, flow)?;
        self.commit(d);
        Ok(true)
    }

    pub fn rebalance(&mut self) -> Result<()> {
        let d = self.conservation.rebalance(&self.diagram)?;
        if d != self.diagram {
            self.commit(d);
        }
        Ok(())
    }

    /// Drag a stage. Topology is not re-validated; only new flows are gated on position.
    pub fn move_stage(&mut self, id: StageId, position: f64, vertical_offset: f64) -> bool {
        if !position.is_finite() || !vertical_offset.is_finite() {
            return false;
        }
        let axis = self.config.axis();
        let Some(s) = self.diagram.stage_mut(id) else {
            return false;
        };
        s.position = axis.clamp(position);
        s.vertical_offset = vertical_offset;
        self.bump();
        true
    }

    pub fn rename_stage(&mut self, id: StageId, name: &str) -> bool {
        if name.len() > MAX_NAME_LEN {
            return false;
        }
        let Some(s) = self.diagram.stage_mut(id) else {
            return false;
        };
        s.name = name.to_string();
        self.bump();
        true
    }
    pub fn set_stage_color(&mut self, id: StageId, color: Color) -> bool {
        let Some(s) = self.diagram.stage_mut(id) else {
            return false;
        };
        s.color = color;
        self.bump();
        true
    }
    pub fn rename_flow(&mut self, id: FlowId, name: &str) -> bool {
        if name.len() > MAX_NAME_LEN {
            return false;
        }
        let Some(f) = self.diagram.flow_mut(id) else {
            return false;
        };
        f.name = name.to_string();
        self.bump();
        true
    }
    pub fn set_flow_color(&mut self, id: FlowId, color: Color) -> bool {
        let Some(f) = self.diagram.flow_mut(id) else {
            return false;
        };
        f.color = color;
        self.bump();
        true
    }

    // Layout + view
    pub fn layout(&self) -> SceneLayout {
        algorithms::stacking::layout_scene(&self.diagram, &self.config, self.canvas)
    }
    pub fn node_height(&self, id: StageId) -> Option<f64> {
        self.diagram
            .stage(id)
            .map(|_| algorithms::stacking::node_height(&self.diagram, id, &self.config))
    }
    pub fn ticks(&self) -> Vec<Tick> {
        ticker_positions(self.config.tick_resolution, self.config.major_tick_every, self.config.axis())
    }
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
        self.viewport.pan_by(dx, dy)
    }
    pub fn zoom_at(&mut self, factor: f64, sx: f64, sy: f64) -> bool {
        self.viewport.zoom_at(factor, sx, sy, self.config.min_zoom, self.config.max_zoom)
    }
    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    /// Hit-test at a screen point; the tolerance is in screen pixels.
    pub fn pick(&self, sx: f64, sy: f64) -> Option<Pick> {
        if !sx.is_finite() || !sy.is_finite() {
            return None;
        }
        let (x, y) = self.viewport.screen_to_world(sx, sy);
        let tol = self.config.pick_tolerance / self.viewport.zoom;
        algorithms::picking::pick_impl(&self.layout(), x, y, tol)
    }

    // Interaction
    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    /// Run one event through the state machine and apply what it asks for.
    /// Returns the effect that was applied, if any.
    pub fn dispatch(&mut self, event: Event) -> Result<Option<Effect>> {
        let ctx = interaction::Context {
            diagram: &self.diagram,
            config: &self.config,
            canvas_width: self.canvas.width,
        };
        let (next, effect) = std::mem::take(&mut self.interaction).handle(event, &ctx);
        self.interaction = next;
        let Some(effect) = effect else {
            return Ok(None);
        };
        let applied = match &effect {
            Effect::CreateFlow { from, to } => self.connect(*from, *to)?.is_some(),
            Effect::CreateStage { from, position, vertical_offset } => {
                self.branch_to_new_stage(*from, *position, *vertical_offset)?.is_some()
            }
            Effect::ApplyFlowPercent { flow, percent } => self.edit_flow_percent(*flow, *percent)?,
            Effect::UpdateStage { stage, name, color } => {
                let renamed = self.rename_stage(*stage, name);
                let recolored = self.set_stage_color(*stage, *color);
                renamed || recolored
            }
        };
        Ok(applied.then_some(effect))
    }

    pub fn click_stage(&mut self, id: StageId) -> Result<Option<Effect>> {
        self.dispatch(Event::ClickStage(id))
    }
    pub fn click_flow(&mut self, id: FlowId) -> Result<Option<Effect>> {
        self.dispatch(Event::ClickFlow(id))
    }
    /// Click on empty canvas at a screen point.
    pub fn click_canvas(&mut self, sx: f64, sy: f64) -> Result<Option<Effect>> {
        let (x, y) = self.viewport.screen_to_world(sx, sy);
        let vertical_offset = y - self.canvas.height * 0.5;
        self.dispatch(Event::ClickCanvas { x, vertical_offset })
    }
    pub fn begin_branch(&mut self) -> bool {
        let before = self.interaction.clone();
        let _ = self.dispatch(Event::BeginBranch);
        self.interaction != before
    }
    pub fn set_flow_draft(&mut self, percent: f64) -> Result<Option<Effect>> {
        self.dispatch(Event::SetFlowPercent(percent))
    }
    pub fn set_stage_draft_name(&mut self, name: &str) -> Result<Option<Effect>> {
        self.dispatch(Event::SetStageName(name.to_string()))
    }
    pub fn save(&mut self) -> Result<Option<Effect>> {
        self.dispatch(Event::Save)
    }
    pub fn cancel(&mut self) {
        self.interaction = InteractionState::Idle;
    }

    // JSON
    pub fn to_json_value(&self) -> serde_json::Value {
        json::to_json_impl(&self.diagram)
    }
    pub fn from_json_value(&mut self, v: serde_json::Value) -> bool {
        match json::from_json_impl(v, self.config.axis()) {
            Some(d) => {
                self.commit(d);
                true
            }
            None => false,
        }
    }
    pub fn from_json_value_strict(&mut self, v: serde_json::Value) -> Result<()> {
        let d = json::from_json_impl_strict(v, self.config.axis())?;
        self.commit(d);
        Ok(())
    }

    /// Back to a single seed root.
    pub fn clear(&mut self) {
        self.seed();
        self.interaction = InteractionState::Idle;
        self.bump();
    }
}
