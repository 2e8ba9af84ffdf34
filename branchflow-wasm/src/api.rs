use crate::Editor;
use branchflow::{Color, Effect, LayoutConfig};
use wasm_bindgen::prelude::*;
type JsValue = wasm_bindgen::JsValue;
use crate::error;
use crate::interop::{new_obj, set_kv};

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js<T: serde::Serialize + ?Sized>(v: &T) -> JsValue {
    serde_wasm_bindgen::to_value(v).unwrap_or(JsValue::NULL)
}

// { kind: 'create_flow'|'create_stage'|'apply_flow_percent'|'update_stage', ... }
fn effect_to_js(effect: &Effect) -> JsValue {
    let obj = new_obj();
    match effect {
        Effect::CreateFlow { from, to } => {
            set_kv(&obj, "kind", &JsValue::from_str("create_flow"));
            set_kv(&obj, "from", &JsValue::from_f64(*from as f64));
            set_kv(&obj, "to", &JsValue::from_f64(*to as f64));
        }
        Effect::CreateStage { from, position, vertical_offset } => {
            set_kv(&obj, "kind", &JsValue::from_str("create_stage"));
            set_kv(&obj, "from", &JsValue::from_f64(*from as f64));
            set_kv(&obj, "position", &JsValue::from_f64(*position));
            set_kv(&obj, "vertical_offset", &JsValue::from_f64(*vertical_offset));
        }
        Effect::ApplyFlowPercent { flow, percent } => {
            set_kv(&obj, "kind", &JsValue::from_str("apply_flow_percent"));
            set_kv(&obj, "flow", &JsValue::from_f64(*flow as f64));
            set_kv(&obj, "percent", &JsValue::from_f64(*percent));
        }
        Effect::UpdateStage { stage, name, color } => {
            set_kv(&obj, "kind", &JsValue::from_str("update_stage"));
            set_kv(&obj, "stage", &JsValue::from_f64(*stage as f64));
            set_kv(&obj, "name", &JsValue::from_str(name));
            set_kv(&obj, "color", &to_js(color));
        }
    }
    obj.into()
}

fn branch_obj(stage: u32, flow: u32) -> JsValue {
    let obj = new_obj();
    set_kv(&obj, "stage", &JsValue::from_f64(stage as f64));
    set_kv(&obj, "flow", &JsValue::from_f64(flow as f64));
    obj.into()
}

fn effect_result(r: branchflow::Result<Option<Effect>>) -> JsValue {
    match r {
        Ok(Some(e)) => effect_to_js(&e),
        Ok(None) => JsValue::NULL,
        Err(e) => error::engine(&e),
    }
}

#[wasm_bindgen]
impl Editor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Editor {
        crate::Editor::rs_new()
    }
    /// Build with layout overrides; unknown or malformed input falls back to defaults.
    pub fn with_config(cfg: JsValue) -> Editor {
        let parsed = serde_wasm_bindgen::from_value::<serde_json::Value>(cfg)
            .map_err(|e| e.to_string())
            .and_then(|v| LayoutConfig::from_json_value(v).map_err(|e| e.to_string()));
        let config = match parsed {
            Ok(c) => c,
            Err(msg) => {
                web_sys::console::warn_1(&JsValue::from_str(&format!("layout config ignored: {msg}")));
                LayoutConfig::default()
            }
        };
        Editor { inner: branchflow::Editor::with_config(config) }
    }
    pub fn version(&self) -> u64 {
        self.rs_version()
    }
    pub fn get_config(&self) -> JsValue {
        to_js(self.inner.config())
    }
    pub fn set_canvas_size(&mut self, width: f64, height: f64) -> bool {
        self.inner.set_canvas_size(width, height)
    }
    pub fn set_canvas_size_res(&mut self, width: f64, height: f64) -> JsValue {
        if !width.is_finite() {
            return error::non_finite("width");
        }
        if !height.is_finite() {
            return error::non_finite("height");
        }
        if width <= 0.0 {
            return error::out_of_range("width", 0.0, f64::INFINITY, width);
        }
        if height <= 0.0 {
            return error::out_of_range("height", 0.0, f64::INFINITY, height);
        }
        error::ok(JsValue::from_bool(self.inner.set_canvas_size(width, height)))
    }

    // Stages/flows
    pub fn stage_count(&self) -> u32 {
        self.inner.stage_count()
    }
    pub fn flow_count(&self) -> u32 {
        self.inner.flow_count()
    }
    pub fn get_stage(&self, id: u32) -> JsValue {
        self.inner.get_stage(id).map_or(JsValue::NULL, to_js)
    }
    pub fn get_stage_res(&self, id: u32) -> JsValue {
        match self.inner.get_stage(id) {
            Some(s) => error::ok(to_js(s)),
            None => error::invalid_id("stage", id),
        }
    }
    pub fn get_flow(&self, id: u32) -> JsValue {
        self.inner.get_flow(id).map_or(JsValue::NULL, to_js)
    }
    pub fn get_flow_res(&self, id: u32) -> JsValue {
        match self.inner.get_flow(id) {
            Some(f) => error::ok(to_js(f)),
            None => error::invalid_id("flow", id),
        }
    }
    pub fn incoming_value(&self, id: u32) -> Option<f64> {
        self.inner.incoming_value(id)
    }
    pub fn flow_percent(&self, id: u32) -> Option<f64> {
        self.inner.flow_percent(id)
    }
    pub fn node_height(&self, id: u32) -> Option<f64> {
        self.inner.node_height(id)
    }

    // Structural edits
    /// Returns `{ stage, flow }` or null when nothing was created.
    pub fn branch_to_new_stage(&mut self, from: u32, position: f64, vertical_offset: f64) -> JsValue {
        match self.inner.branch_to_new_stage(from, position, vertical_offset) {
            Ok(Some((stage, flow))) => branch_obj(stage, flow),
            _ => JsValue::NULL,
        }
    }
    pub fn branch_to_new_stage_res(&mut self, from: u32, position: f64, vertical_offset: f64) -> JsValue {
        if !position.is_finite() {
            return error::non_finite("position");
        }
        if !vertical_offset.is_finite() {
            return error::non_finite("vertical_offset");
        }
        if self.inner.get_stage(from).is_none() {
            return error::invalid_id("stage", from);
        }
        match self.inner.branch_to_new_stage(from, position, vertical_offset) {
            Ok(Some((stage, flow))) => error::ok(branch_obj(stage, flow)),
            Ok(None) => error::not_right_of(from, position),
            Err(e) => error::engine(&e),
        }
    }
    pub fn connect(&mut self, from: u32, to: u32) -> Option<u32> {
        self.inner.connect(from, to).ok().flatten()
    }
    pub fn connect_res(&mut self, from: u32, to: u32) -> JsValue {
        if self.inner.get_stage(from).is_none() {
            return error::invalid_id("stage", from);
        }
        let Some(target) = self.inner.get_stage(to) else {
            return error::invalid_id("stage", to);
        };
        let position = target.position;
        match self.inner.connect(from, to) {
            Ok(Some(flow)) => error::ok(JsValue::from_f64(flow as f64)),
            Ok(None) => error::not_right_of(from, position),
            Err(e) => error::engine(&e),
        }
    }
    pub fn edit_flow_percent(&mut self, flow: u32, percent: f64) -> bool {
        self.inner.edit_flow_percent(flow, percent).unwrap_or(false)
    }
    pub fn edit_flow_percent_res(&mut self, flow: u32, percent: f64) -> JsValue {
        if !percent.is_finite() {
            return error::non_finite("percent");
        }
        if !(0.0..=100.0).contains(&percent) {
            return error::out_of_range("percent", 0.0, 100.0, percent);
        }
        if self.inner.get_flow(flow).is_none() {
            return error::invalid_id("flow", flow);
        }
        match self.inner.edit_flow_percent(flow, percent) {
            Ok(changed) => error::ok(JsValue::from_bool(changed)),
            Err(e) => error::engine(&e),
        }
    }
    pub fn delete_stage(&mut self, id: u32) -> bool {
        self.inner.delete_stage(id).unwrap_or(false)
    }
    pub fn delete_stage_res(&mut self, id: u32) -> JsValue {
        if self.inner.get_stage(id).is_none() {
            return error::invalid_id("stage", id);
        }
        if self.inner.diagram().is_root(id) {
            let d = new_obj();
            set_kv(&d, "id", &JsValue::from_f64(id as f64));
            return error::err("root_protected", "root stages cannot be deleted", Some(d.into()));
        }
        match self.inner.delete_stage(id) {
            Ok(removed) => error::ok(JsValue::from_bool(removed)),
            Err(e) => error::engine(&e),
        }
    }
    pub fn disconnect_flow(&mut self, id: u32) -> bool {
        self.inner.disconnect_flow(id).unwrap_or(false)
    }
    pub fn disconnect_flow_res(&mut self, id: u32) -> JsValue {
        if self.inner.get_flow(id).is_none() {
            return error::invalid_id("flow", id);
        }
        match self.inner.disconnect_flow(id) {
            Ok(removed) => error::ok(JsValue::from_bool(removed)),
            Err(e) => error::engine(&e),
        }
    }
    pub fn rebalance(&mut self) -> bool {
        self.inner.rebalance().is_ok()
    }
    pub fn rebalance_res(&mut self) -> JsValue {
        match self.inner.rebalance() {
            Ok(()) => error::ok(JsValue::TRUE),
            Err(e) => error::engine(&e),
        }
    }

    // Attributes
    pub fn move_stage(&mut self, id: u32, position: f64, vertical_offset: f64) -> bool {
        self.inner.move_stage(id, position, vertical_offset)
    }
    pub fn move_stage_res(&mut self, id: u32, position: f64, vertical_offset: f64) -> JsValue {
        if !position.is_finite() {
            return error::non_finite("position");
        }
        if !vertical_offset.is_finite() {
            return error::non_finite("vertical_offset");
        }
        if self.inner.get_stage(id).is_none() {
            return error::invalid_id("stage", id);
        }
        error::ok(JsValue::from_bool(self.inner.move_stage(id, position, vertical_offset)))
    }
    pub fn rename_stage(&mut self, id: u32, name: &str) -> bool {
        self.inner.rename_stage(id, name)
    }
    pub fn set_stage_color(&mut self, id: u32, r: u8, g: u8, b: u8, a: u8) -> bool {
        self.inner.set_stage_color(id, Color { r, g, b, a })
    }
    pub fn rename_flow(&mut self, id: u32, name: &str) -> bool {
        self.inner.rename_flow(id, name)
    }
    pub fn set_flow_color(&mut self, id: u32, r: u8, g: u8, b: u8, a: u8) -> bool {
        self.inner.set_flow_color(id, Color { r, g, b, a })
    }

    // Layout
    pub fn get_stage_data(&self) -> JsValue {
        crate::interop::stage_data(&self.inner.layout().stage_arrays())
    }
    pub fn get_flow_data(&self) -> JsValue {
        crate::interop::flow_data(&self.inner.layout().flow_arrays())
    }
    pub fn get_layout(&self) -> JsValue {
        to_js(&self.inner.layout())
    }
    /// `{ positions: Float32Array, major: Uint8Array }`, one entry per tick.
    pub fn get_ticks(&self) -> JsValue {
        let ticks = self.inner.ticks();
        let positions: Vec<f32> = ticks.iter().map(|t| t.position as f32).collect();
        let major: Vec<u8> = ticks.iter().map(|t| t.major as u8).collect();
        let obj = new_obj();
        set_kv(&obj, "positions", &crate::interop::arr_f32(&positions).into());
        set_kv(&obj, "major", &crate::interop::arr_u8(&major).into());
        obj.into()
    }

    // View
    pub fn get_viewport(&self) -> JsValue {
        to_js(&self.inner.viewport())
    }
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
        self.inner.pan_by(dx, dy)
    }
    pub fn zoom_at(&mut self, factor: f64, sx: f64, sy: f64) -> bool {
        self.inner.zoom_at(factor, sx, sy)
    }
    pub fn zoom_at_res(&mut self, factor: f64, sx: f64, sy: f64) -> JsValue {
        if !factor.is_finite() {
            return error::non_finite("factor");
        }
        if factor <= 0.0 {
            return error::out_of_range("factor", 0.0, f64::INFINITY, factor);
        }
        if !sx.is_finite() {
            return error::non_finite("sx");
        }
        if !sy.is_finite() {
            return error::non_finite("sy");
        }
        error::ok(JsValue::from_bool(self.inner.zoom_at(factor, sx, sy)))
    }
    pub fn reset_view(&mut self) {
        self.inner.reset_view();
    }

    // Picking
    /// `{ kind: 'stage'|'flow', id, dist, t? }` in screen space, or null.
    pub fn pick(&self, sx: f64, sy: f64) -> JsValue {
        self.inner.pick(sx, sy).map_or(JsValue::NULL, |p| to_js(&p))
    }
    pub fn pick_res(&self, sx: f64, sy: f64) -> JsValue {
        if !sx.is_finite() {
            return error::non_finite("sx");
        }
        if !sy.is_finite() {
            return error::non_finite("sy");
        }
        error::ok(self.pick(sx, sy))
    }

    // Interaction
    pub fn get_interaction(&self) -> JsValue {
        to_js(self.inner.interaction())
    }
    /// Each returns the effect that was applied to the diagram, or null.
    pub fn click_stage(&mut self, id: u32) -> JsValue {
        effect_result(self.inner.click_stage(id))
    }
    pub fn click_flow(&mut self, id: u32) -> JsValue {
        effect_result(self.inner.click_flow(id))
    }
    pub fn click_canvas(&mut self, sx: f64, sy: f64) -> JsValue {
        effect_result(self.inner.click_canvas(sx, sy))
    }
    pub fn begin_branch(&mut self) -> bool {
        self.inner.begin_branch()
    }
    pub fn set_flow_draft(&mut self, percent: f64) -> JsValue {
        effect_result(self.inner.set_flow_draft(percent))
    }
    pub fn set_stage_draft_name(&mut self, name: &str) -> JsValue {
        effect_result(self.inner.set_stage_draft_name(name))
    }
    pub fn set_stage_draft_color(&mut self, r: u8, g: u8, b: u8, a: u8) -> JsValue {
        effect_result(self.inner.dispatch(branchflow::Event::SetStageColor(Color { r, g, b, a })))
    }
    pub fn save(&mut self) -> JsValue {
        effect_result(self.inner.save())
    }
    pub fn cancel(&mut self) {
        self.inner.cancel();
    }

    // JSON
    pub fn to_json(&self) -> JsValue {
        to_js(&self.inner.to_json_value())
    }
    pub fn from_json(&mut self, v: JsValue) -> bool {
        let val = match serde_wasm_bindgen::from_value::<serde_json::Value>(v) {
            Ok(val) => val,
            Err(_) => return false,
        };
        match self.inner.from_json_value_strict(val) {
            Ok(()) => true,
            Err(e) => {
                web_sys::console::warn_1(&JsValue::from_str(&format!("snapshot rejected: {e}")));
                false
            }
        }
    }
    pub fn from_json_res(&mut self, v: JsValue) -> JsValue {
        match serde_wasm_bindgen::from_value::<serde_json::Value>(v) {
            Ok(val) => match self.inner.from_json_value_strict(val) {
                Ok(()) => error::ok(JsValue::TRUE),
                Err(e) => error::engine(&e),
            },
            Err(e) => error::err("json_parse", format!("{}", e), None),
        }
    }
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

