#![cfg(target_arch = "wasm32")]

use branchflow_wasm::Editor;
use js_sys::{Float32Array, Reflect, Uint32Array, Uint8Array};
use serde::Deserialize;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn get(v: &JsValue, k: &str) -> JsValue {
    Reflect::get(v, &JsValue::from_str(k)).unwrap()
}

fn branch(ed: &mut Editor, from: u32, position: f64, offset: f64) -> (u32, u32) {
    let r = ed.branch_to_new_stage(from, position, offset);
    assert!(!r.is_null(), "branch refused");
    (get(&r, "stage").as_f64().unwrap() as u32, get(&r, "flow").as_f64().unwrap() as u32)
}

#[wasm_bindgen_test]
fn stages_and_flows_basic() {
    let mut ed = Editor::new();
    assert_eq!(ed.stage_count(), 1);
    let (a, fa) = branch(&mut ed, 0, 50.0, -100.0);
    let (_, fb) = branch(&mut ed, 0, 50.0, 100.0);
    assert_eq!(ed.stage_count(), 3);
    assert_eq!(ed.flow_count(), 2);
    assert_eq!(ed.flow_percent(fa), Some(50.0));

    #[derive(Deserialize)]
    struct Stage {
        name: String,
        position: f64,
        vertical_offset: f64,
    }
    let s: Stage = serde_wasm_bindgen::from_value(ed.get_stage(a)).unwrap();
    assert_eq!(s.position, 50.0);
    assert_eq!(s.vertical_offset, -100.0);
    assert_eq!(s.name, format!("Stage {a}"));

    assert!(ed.edit_flow_percent(fa, 80.0));
    assert!((ed.flow_percent(fb).unwrap() - 20.0).abs() <= 0.01);

    // typed arrays
    let sd = ed.get_stage_data();
    assert_eq!(Uint32Array::new(&get(&sd, "ids")).length(), 3);
    assert_eq!(Float32Array::new(&get(&sd, "rects")).length(), 12);
    assert_eq!(Uint8Array::new(&get(&sd, "rgba")).length(), 12);
    let fd = ed.get_flow_data();
    assert_eq!(Uint32Array::new(&get(&fd, "ids")).length(), 2);
    assert_eq!(Uint32Array::new(&get(&fd, "endpoints")).length(), 4);
    assert_eq!(Float32Array::new(&get(&fd, "geometry")).length(), 8);
    assert_eq!(Float32Array::new(&get(&fd, "widths")).length(), 2);

    assert!(ed.delete_stage(a));
    assert!(!ed.delete_stage(0), "root is protected");
    assert_eq!(ed.flow_percent(fb), Some(100.0));
}

#[wasm_bindgen_test]
fn pick_stage_and_flow() {
    let mut ed = Editor::new();
    let (a, f) = branch(&mut ed, 0, 50.0, 0.0);
    #[derive(Deserialize)]
    struct Pick {
        kind: String,
        id: u32,
    }
    let p: Pick = serde_wasm_bindgen::from_value(ed.pick(600.0, 400.0)).unwrap();
    assert_eq!(p.kind, "stage");
    assert_eq!(p.id, a);
    let p: Pick = serde_wasm_bindgen::from_value(ed.pick(350.0, 400.0)).unwrap();
    assert_eq!(p.kind, "flow");
    assert_eq!(p.id, f);
    assert!(ed.pick(350.0, 1000.0).is_null());
}

#[wasm_bindgen_test]
fn interaction_creates_stage_on_canvas_click() {
    let mut ed = Editor::new();
    assert!(ed.click_stage(0).is_null());
    assert!(ed.begin_branch());
    let effect = ed.click_canvas(600.0, 300.0);
    assert_eq!(get(&effect, "kind").as_string().as_deref(), Some("create_stage"));
    assert_eq!(get(&effect, "position").as_f64(), Some(50.0));
    assert_eq!(ed.stage_count(), 2);

    #[derive(Deserialize)]
    struct State {
        state: String,
    }
    let s: State = serde_wasm_bindgen::from_value(ed.get_interaction()).unwrap();
    assert_eq!(s.state, "idle");
}

#[wasm_bindgen_test]
fn ticks_cover_axis() {
    let ed = Editor::new();
    let t = ed.get_ticks();
    let pos = Float32Array::new(&get(&t, "positions"));
    let major = Uint8Array::new(&get(&t, "major"));
    assert_eq!(pos.length(), 1201);
    assert_eq!(major.length(), 1201);
    assert_eq!(pos.get_index(0), -10.0);
    assert_eq!(pos.get_index(1200), 110.0);
}

#[wasm_bindgen_test]
fn json_roundtrip_and_clear() {
    let mut ed = Editor::new();
    branch(&mut ed, 0, 40.0, 0.0);
    let j = ed.to_json();
    #[derive(Deserialize)]
    struct Doc {
        version: u32,
        stages: Vec<serde_json::Value>,
        flows: Vec<serde_json::Value>,
    }
    let doc: Doc = serde_wasm_bindgen::from_value(j.clone()).unwrap();
    assert_eq!(doc.version, 1);
    assert_eq!(doc.stages.len(), 2);
    assert_eq!(doc.flows.len(), 1);

    let mut ed2 = Editor::new();
    assert!(ed2.from_json(j));
    assert_eq!(ed2.stage_count(), 2);
    assert_eq!(ed2.flow_count(), 1);

    ed2.clear();
    assert_eq!(ed2.stage_count(), 1);
    assert_eq!(ed2.flow_count(), 0);
}

#[wasm_bindgen_test]
fn config_overrides_apply() {
    let cfg = serde_wasm_bindgen::to_value(&serde_json::json!({"height_scale": 2.0})).unwrap();
    let mut ed = Editor::with_config(cfg);
    let (a, _) = branch(&mut ed, 0, 50.0, 0.0);
    assert_eq!(ed.node_height(a), Some(200.0));
    // Garbage falls back to defaults
    let ed = Editor::with_config(JsValue::from_str("nope"));
    assert_eq!(ed.stage_count(), 1);
}
