use branchflow::{Editor, Error};
use serde_json::json;

fn stage(id: u32, position: f64) -> serde_json::Value {
    json!({"id": id, "name": format!("s{id}"), "position": position, "vertical_offset": 0.0})
}

fn flow(id: u32, from: u32, to: u32, value: f64) -> serde_json::Value {
    json!({"id": id, "from": from, "to": to, "value": value})
}

#[test]
fn json_caps_exceeded_stages() {
    let mut ed = Editor::new();
    let too_many = 50_001u32;
    let stages: Vec<_> = (0..too_many).map(|i| stage(i, 0.0)).collect();
    let v = json!({"version": 1, "stages": stages, "flows": []});
    let err = ed.from_json_value_strict(v).unwrap_err();
    assert_eq!(err.code(), "caps_exceeded");
}

#[test]
fn json_overlong_name() {
    let mut ed = Editor::new();
    let v = json!({"version": 1, "stages": [{"id": 0, "name": "x".repeat(2000), "position": 0.0}], "flows": []});
    assert!(matches!(ed.from_json_value_strict(v), Err(Error::CapsExceeded(_))));
}

#[test]
fn json_invalid_numbers() {
    let mut ed = Editor::new();
    let v = json!({"version": 1, "stages": [stage(0, 0.0), stage(1, 10.0)], "flows": [flow(2, 0, 1, 1.0e13)]});
    assert!(matches!(ed.from_json_value_strict(v), Err(Error::OutOfBounds(_))));
    let v = json!({"version": 1, "stages": [stage(0, 0.0), stage(1, 10.0)], "flows": [flow(2, 0, 1, -1.0)]});
    assert!(matches!(ed.from_json_value_strict(v), Err(Error::OutOfBounds(_))));
    let v = json!({"version": 1, "stages": [{"id": 0, "position": 0.0, "vertical_offset": 1.0e8}], "flows": []});
    assert!(matches!(ed.from_json_value_strict(v), Err(Error::OutOfBounds(_))));
}

#[test]
fn json_duplicate_ids_across_kinds() {
    let mut ed = Editor::new();
    let v = json!({"version": 1, "stages": [stage(0, 0.0), stage(1, 10.0)], "flows": [flow(1, 0, 1, 100.0)]});
    let err = ed.from_json_value_strict(v).unwrap_err();
    assert_eq!(err.code(), "invalid_structure");
}

#[test]
fn json_self_loop_rejected() {
    let mut ed = Editor::new();
    let v = json!({"version": 1, "stages": [stage(0, 0.0)], "flows": [flow(1, 0, 0, 100.0)]});
    assert!(matches!(ed.from_json_value_strict(v), Err(Error::InvalidStructure(_))));
}

#[test]
fn json_cycle_rejected() {
    let mut ed = Editor::new();
    let v = json!({
        "version": 1,
        "stages": [stage(0, 0.0), stage(1, 10.0), stage(2, 20.0)],
        "flows": [flow(3, 0, 1, 100.0), flow(4, 1, 2, 100.0), flow(5, 2, 1, 100.0)]
    });
    let err = ed.from_json_value_strict(v).unwrap_err();
    assert_eq!(err.code(), "cycle_detected");
}

#[test]
fn json_future_version_rejected() {
    let mut ed = Editor::new();
    let v = json!({"version": 2, "stages": [], "flows": []});
    assert!(matches!(ed.from_json_value_strict(v), Err(Error::InvalidStructure(_))));
    assert!(matches!(ed.from_json_value_strict(json!([1, 2, 3])), Err(Error::Parse(_))));
}

#[test]
fn failed_load_keeps_session() {
    let mut ed = Editor::new();
    let r = ed.diagram().stages[0].id;
    ed.branch_to_new_stage(r, 40.0, 0.0).unwrap();
    let before = ed.snapshot();
    let ver = ed.version();
    assert!(!ed.from_json_value(json!({"version": 1, "stages": "nope"})));
    assert_eq!(ed.diagram(), &before);
    assert_eq!(ed.version(), ver);
}

#[test]
fn load_clamps_positions_and_reseats_ids() {
    let mut ed = Editor::new();
    let v = json!({
        "version": 1,
        "stages": [stage(4, -50.0), stage(9, 500.0)],
        "flows": [flow(20, 4, 9, 100.0)]
    });
    assert!(ed.from_json_value(v));
    assert_eq!(ed.get_stage(4).unwrap().position, -10.0);
    assert_eq!(ed.get_stage(9).unwrap().position, 110.0);
    // New ids never collide with loaded ones
    let (s, f) = ed.branch_to_new_stage(4, 50.0, 0.0).unwrap().unwrap();
    assert!(s > 20 && f > 20 && s != f);
}

#[test]
fn dangling_flows_load_but_do_not_render() {
    let mut ed = Editor::new();
    let v = json!({"version": 1, "stages": [stage(0, 0.0)], "flows": [flow(1, 0, 7, 100.0)]});
    assert!(ed.from_json_value(v));
    assert_eq!(ed.flow_count(), 1);
    let scene = ed.layout();
    assert_eq!(scene.stages.len(), 1);
    assert!(scene.flows.is_empty());
}
