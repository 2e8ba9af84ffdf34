use serde::{Deserialize, Serialize};

pub type StageId = u32;
pub type FlowId = u32;

/// Incoming budget of a stage with no incoming flows.
pub const ROOT_BUDGET: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::rgb(0x3b, 0x82, 0xf6)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    /// Logical axis units, usually 0..=100.
    pub position: f64,
    /// Pixels relative to the canvas mid-line.
    pub vertical_offset: f64,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub id: FlowId,
    pub name: String,
    pub from: StageId,
    pub to: StageId,
    pub value: f64,
    /// Source-side stacking order among flows sharing `from`.
    pub branch_index: u32,
    pub color: Color,
}

/// Immutable-by-convention snapshot of the whole diagram.
///
/// Engine operations take a `&Diagram` and hand back a fresh one, so a caller
/// can keep the previous value around for undo or diffing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub stages: Vec<Stage>,
    pub flows: Vec<Flow>,
    pub next_id: u32,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }
    pub fn stage_mut(&mut self, id: StageId) -> Option<&mut Stage> {
        self.stages.iter_mut().find(|s| s.id == id)
    }
    pub fn flow(&self, id: FlowId) -> Option<&Flow> {
        self.flows.iter().find(|f| f.id == id)
    }
    pub fn flow_mut(&mut self, id: FlowId) -> Option<&mut Flow> {
        self.flows.iter_mut().find(|f| f.id == id)
    }
    pub fn has_stage(&self, id: StageId) -> bool {
        self.stage(id).is_some()
    }

    pub fn incoming(&self, id: StageId) -> impl Iterator<Item = &Flow> {
        self.flows.iter().filter(move |f| f.to == id)
    }
    pub fn outgoing(&self, id: StageId) -> impl Iterator<Item = &Flow> {
        self.flows.iter().filter(move |f| f.from == id)
    }

    pub fn is_root(&self, id: StageId) -> bool {
        self.incoming(id).next().is_none()
    }

    /// Out(s): total value leaving a stage.
    pub fn outgoing_total(&self, id: StageId) -> f64 {
        self.outgoing(id).map(|f| f.value).sum()
    }

    pub(crate) fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub(crate) fn push_stage(
        &mut self,
        name: impl Into<String>,
        position: f64,
        vertical_offset: f64,
        color: Color,
    ) -> StageId {
        let id = self.alloc_id();
        self.stages.push(Stage {
            id,
            name: name.into(),
            position,
            vertical_offset,
            color,
        });
        id
    }

    /// Recompute `next_id` after a bulk load so new ids never collide.
    pub(crate) fn reseat_next_id(&mut self) {
        let max_stage = self.stages.iter().map(|s| s.id).max();
        let max_flow = self.flows.iter().map(|f| f.id).max();
        self.next_id = match max_stage.max(max_flow) {
            Some(m) => m.wrapping_add(1).max(self.next_id),
            None => self.next_id,
        };
    }
}
