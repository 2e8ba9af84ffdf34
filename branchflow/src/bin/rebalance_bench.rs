use branchflow::{Editor, LayoutConfig, StageId};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn build_tree(stages_target: usize, fanout: usize) -> Editor {
    let mut ed = Editor::with_config(LayoutConfig::default());
    // Breadth-first: each stage gets `fanout` children one axis step further right
    let mut frontier: Vec<(StageId, f64)> = vec![(ed.diagram().stages[0].id, 0.0)];
    let mut count = 1usize;
    'outer: while !frontier.is_empty() {
        let mut next = Vec::new();
        for (sid, pos) in frontier {
            for k in 0..fanout {
                let p = (pos + 1.0).min(109.0);
                let off = (count as f64 * 13.0) % 600.0 - 300.0 + k as f64;
                if let Ok(Some((child, _))) = ed.branch_to_new_stage(sid, p, off) { next.push((child, p)); }
                count += 1;
                if count >= stages_target { break 'outer; }
            }
        }
        frontier = next;
    }
    ed
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() { return 0.0; }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len()-1)]
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args: Vec<String> = std::env::args().collect();
    let mut stages = 500usize;
    let mut fanout = 3usize;
    let mut edits = 1000usize;
    let mut assert_ms: Option<f64> = None;
    let mut layout_assert_ms: Option<f64> = None;
    for a in &args[1..] {
        if let Some(val)=a.strip_prefix("--stages=") { if let Ok(v)=val.parse() { stages=v; } }
        else if let Some(val)=a.strip_prefix("--fanout=") { if let Ok(v)=val.parse() { fanout=v; } }
        else if let Some(val)=a.strip_prefix("--edits=") { if let Ok(v)=val.parse() { edits=v; } }
        else if let Some(val)=a.strip_prefix("--assert-ms=") { if let Ok(v)=val.parse() { assert_ms=Some(v); } }
        else if let Some(val)=a.strip_prefix("--layout-assert-ms=") { if let Ok(v)=val.parse() { layout_assert_ms=Some(v); } }
    }

    let t_build = Instant::now();
    let mut ed = build_tree(stages, fanout.max(1));
    info!(stages = ed.stage_count(), flows = ed.flow_count(), ms = t_build.elapsed().as_secs_f64() * 1000.0, "tree built");

    // Cycle manual edits over every flow with a sweeping percentage
    let flow_ids: Vec<u32> = ed.diagram().flows.iter().map(|f| f.id).collect();
    if flow_ids.is_empty() { println!("no flows"); return; }
    let mut times_ms: Vec<f64> = Vec::with_capacity(edits);
    let start_all = Instant::now();
    for k in 0..edits {
        let fid = flow_ids[k % flow_ids.len()];
        let pct = (k * 37 % 100) as f64;
        let t0 = Instant::now();
        if let Err(e) = ed.edit_flow_percent(fid, pct) { eprintln!("edit failed: {e}"); std::process::exit(1); }
        times_ms.push(t0.elapsed().as_secs_f64() * 1000.0);
    }
    let dur_all = start_all.elapsed().as_secs_f64() * 1000.0;
    let t_layout = Instant::now();
    let scene = ed.layout();
    let layout_ms = t_layout.elapsed().as_secs_f64() * 1000.0;
    // Pick through the middle of the canvas; every pick lays the scene out again
    let t_pick = Instant::now();
    let hit = ed.pick(ed.canvas().width * 0.5, ed.canvas().height * 0.5).is_some();
    let pick_ms = t_pick.elapsed().as_secs_f64() * 1000.0;
    times_ms.sort_by(|a,b| a.total_cmp(b));
    let med = percentile(&times_ms, 0.5);
    let p90 = percentile(&times_ms, 0.9);
    let p99 = percentile(&times_ms, 0.99);
    println!("stages={} flows={} edits={} total_ms={:.3} median_ms={:.4} p90_ms={:.4} p99_ms={:.4} layout_ms={:.3} pick_ms={:.3} hit={} geoms={}",
        ed.stage_count(), ed.flow_count(), edits, dur_all, med, p90, p99, layout_ms, pick_ms, hit, scene.flows.len());
    if let Some(th) = assert_ms { if med > th { eprintln!("FAIL: median {:.4} ms > threshold {:.3} ms", med, th); std::process::exit(1); } }
    if let Some(th) = layout_assert_ms {
        let worst = layout_ms.max(pick_ms);
        if worst > th { eprintln!("FAIL: layout/pick {:.3} ms > threshold {:.3} ms", worst, th); std::process::exit(1); }
    }
}
