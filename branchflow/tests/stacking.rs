use branchflow::algorithms::stacking::{flow_vertical_center, flow_width, layout_scene, node_height};
use branchflow::{Canvas, Color, Diagram, Editor, Flow, LayoutConfig, Pick, Stage};

fn stage(id: u32, position: f64, vertical_offset: f64) -> Stage {
    Stage { id, name: String::new(), position, vertical_offset, color: Color::default() }
}

fn flow(id: u32, from: u32, to: u32, value: f64, branch_index: u32) -> Flow {
    Flow { id, name: String::new(), from, to, value, branch_index, color: Color::default() }
}

fn merge(s1_offset: f64, s2_offset: f64) -> Diagram {
    Diagram {
        stages: vec![stage(0, 0.0, s1_offset), stage(1, 0.0, s2_offset), stage(2, 50.0, 0.0)],
        flows: vec![flow(3, 0, 2, 10.0, 0), flow(4, 1, 2, 20.0, 0)],
        next_id: 5,
    }
}

#[test]
fn widths_respect_minimum() {
    let cfg = LayoutConfig::default();
    assert_eq!(flow_width(10.0, &cfg), 80.0);
    assert_eq!(flow_width(0.5, &cfg), 20.0);
    assert_eq!(flow_width(0.0, &cfg), 20.0);
    assert_eq!(flow_width(f64::NAN, &cfg), 20.0);
}

#[test]
fn merge_node_height_sums_bundle() {
    let cfg = LayoutConfig::default();
    let d = merge(-100.0, 100.0);
    assert_eq!(node_height(&d, 2, &cfg), 248.0);
    // Sources only have an outgoing bundle
    assert_eq!(node_height(&d, 0, &cfg), 80.0);
    assert_eq!(node_height(&d, 1, &cfg), 160.0);
}

#[test]
fn target_side_stacks_by_source_height() {
    let cfg = LayoutConfig::default();
    let canvas = Canvas::default();
    let d = merge(-100.0, 100.0);
    let (_, y_a) = flow_vertical_center(&d, 3, &cfg, canvas).unwrap();
    let (_, y_b) = flow_vertical_center(&d, 4, &cfg, canvas).unwrap();
    assert_eq!(y_a, 316.0);
    assert_eq!(y_b, 444.0);

    let d = merge(100.0, -100.0);
    let (_, y_a) = flow_vertical_center(&d, 3, &cfg, canvas).unwrap();
    let (_, y_b) = flow_vertical_center(&d, 4, &cfg, canvas).unwrap();
    assert_eq!(y_b, 356.0);
    assert_eq!(y_a, 484.0);
}

#[test]
fn source_side_stacks_by_branch_index() {
    let cfg = LayoutConfig::default();
    let d = Diagram {
        stages: vec![stage(0, 0.0, 0.0), stage(1, 50.0, -200.0), stage(2, 50.0, 200.0)],
        flows: vec![flow(10, 0, 1, 10.0, 1), flow(11, 0, 2, 10.0, 0)],
        next_id: 12,
    };
    let scene = layout_scene(&d, &cfg, Canvas::default());
    let root = scene.stage(0).unwrap();
    assert_eq!(root.height, 168.0);
    assert_eq!(root.top, 316.0);
    assert_eq!(scene.flow(11).unwrap().y0, 356.0);
    assert_eq!(scene.flow(10).unwrap().y0, 444.0);
}

#[test]
fn stacked_flows_never_overlap() {
    let cfg = LayoutConfig::default();
    let d = Diagram {
        stages: vec![stage(0, 0.0, 0.0), stage(1, 30.0, -50.0), stage(2, 30.0, 0.0), stage(3, 30.0, 50.0)],
        flows: vec![flow(4, 0, 1, 70.0, 0), flow(5, 0, 2, 0.5, 1), flow(6, 0, 3, 29.5, 2)],
        next_id: 7,
    };
    let scene = layout_scene(&d, &cfg, Canvas::default());
    let mut spans: Vec<(f64, f64)> = scene.flows.iter().map(|f| (f.y0 - f.width / 2.0, f.y0 + f.width / 2.0)).collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));
    for w in spans.windows(2) {
        assert!(w[1].0 - w[0].1 >= cfg.flow_spacing - 1e-9);
    }
    let root = scene.stage(0).unwrap();
    assert!((spans[0].0 - root.top).abs() < 1e-9);
    assert!((spans[2].1 - (root.top + root.height)).abs() < 1e-9);
}

#[test]
fn hanging_flows_are_excluded() {
    let cfg = LayoutConfig::default();
    let d = Diagram {
        stages: vec![stage(0, 0.0, 0.0)],
        flows: vec![flow(5, 0, 99, 100.0, 0)],
        next_id: 6,
    };
    assert_eq!(flow_vertical_center(&d, 5, &cfg, Canvas::default()), None);
    assert_eq!(node_height(&d, 0, &cfg), cfg.min_marker_height);
    let scene = layout_scene(&d, &cfg, Canvas::default());
    assert_eq!(scene.stages.len(), 1);
    assert!(scene.flows.is_empty());
}

#[test]
fn scene_maps_positions_to_pixels() {
    let mut ed = Editor::new();
    let r = ed.diagram().stages[0].id;
    let (a, f) = ed.branch_to_new_stage(r, 50.0, 0.0).unwrap().unwrap();
    let scene = ed.layout();
    assert_eq!(scene.stage(r).unwrap().x, 100.0);
    assert_eq!(scene.stage(a).unwrap().x, 600.0);
    let g = scene.flow(f).unwrap();
    assert_eq!(g.x0, 106.0);
    assert_eq!(g.x1, 594.0);
    assert_eq!(g.width, 800.0);
    assert_eq!(ed.node_height(a), Some(800.0));

    let stages = scene.stage_arrays();
    assert_eq!(stages.ids.len(), 2);
    assert_eq!(stages.rects.len(), 8);
    assert_eq!(stages.rects[0], 94.0);
    let flows = scene.flow_arrays();
    assert_eq!(flows.endpoints, vec![r, a]);
    assert_eq!(flows.geometry, vec![106.0, 400.0, 594.0, 400.0]);
    assert_eq!(flows.rgba.len(), 4);
}

#[test]
fn pick_prefers_stage_markers() {
    let mut ed = Editor::new();
    let r = ed.diagram().stages[0].id;
    let (a, f) = ed.branch_to_new_stage(r, 50.0, 0.0).unwrap().unwrap();
    match ed.pick(600.0, 400.0) {
        Some(Pick::Stage { id, dist }) => {
            assert_eq!(id, a);
            assert_eq!(dist, 0.0);
        }
        other => panic!("expected stage, got {other:?}"),
    }
    match ed.pick(350.0, 400.0) {
        Some(Pick::Flow { id, .. }) => assert_eq!(id, f),
        other => panic!("expected flow, got {other:?}"),
    }
    // Ribbon is 800 px tall here; well outside it nothing is hit
    assert_eq!(ed.pick(350.0, 850.0), None);
    assert_eq!(ed.pick(f64::NAN, 0.0), None);
}

#[test]
fn pick_follows_viewport() {
    let mut ed = Editor::new();
    let r = ed.diagram().stages[0].id;
    assert!(ed.pan_by(50.0, 0.0));
    assert!(matches!(ed.pick(150.0, 400.0), Some(Pick::Stage { id, .. }) if id == r));
    assert!(ed.zoom_at(2.0, 150.0, 400.0));
    assert!(matches!(ed.pick(150.0, 400.0), Some(Pick::Stage { id, .. }) if id == r));
    ed.reset_view();
    assert!(matches!(ed.pick(100.0, 400.0), Some(Pick::Stage { id, .. }) if id == r));
}

#[test]
fn thin_siblings_stack_by_drawn_width() {
    let cfg = LayoutConfig::default();
    let d = Diagram {
        stages: vec![stage(0, 0.0, 0.0), stage(1, 50.0, -100.0), stage(2, 50.0, 100.0)],
        flows: vec![flow(3, 0, 1, 1.0, 0), flow(4, 0, 2, 1.0, 1)],
        next_id: 5,
    };
    // Two minimum-width ribbons plus one gap, not 2 * 1.0 * height_scale
    assert_eq!(node_height(&d, 0, &cfg), 20.0 + 8.0 + 20.0);
    let top = 400.0 - 24.0;
    let (y0_a, _) = flow_vertical_center(&d, 3, &cfg, Canvas::default()).unwrap();
    let (y0_b, _) = flow_vertical_center(&d, 4, &cfg, Canvas::default()).unwrap();
    assert_eq!(y0_a, top + 10.0);
    assert_eq!(y0_b, top + 20.0 + 8.0 + 10.0);
}

#[test]
fn large_tree_layout_is_linear() {
    use std::time::Instant;
    // Ternary tree, every stage one axis step right of its parent
    let n = 20_000u32;
    let mut stages = vec![stage(0, 0.0, 0.0)];
    let mut flows = Vec::new();
    let mut depth = vec![0u32];
    for i in 1..n {
        let parent = (i - 1) / 3;
        let dp = depth[parent as usize] + 1;
        depth.push(dp);
        stages.push(stage(i, dp as f64 * 10.0, (i % 600) as f64 - 300.0));
        flows.push(flow(n + i, parent, i, 1.0, (i - 1) % 3));
    }
    let d = Diagram { stages, flows, next_id: 2 * n };
    let cfg = LayoutConfig::default();
    let canvas = Canvas::default();

    let t0 = Instant::now();
    let scene = layout_scene(&d, &cfg, canvas);
    let elapsed = t0.elapsed();
    assert_eq!(scene.stages.len(), n as usize);
    assert_eq!(scene.flows.len(), n as usize - 1);
    assert!(elapsed.as_secs_f64() < 5.0, "layout took {elapsed:?}");

    for id in [n + 1, n + 2, n + 3, n + 4_000, 2 * n - 1] {
        let g = scene.flow(id).unwrap();
        assert_eq!(flow_vertical_center(&d, id, &cfg, canvas), Some((g.y0, g.y1)));
    }
}
