use super::tolerance::approx_eq;

const EPS_POS: f64 = 1e-6;

pub fn seg_distance_sq(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> (f64, f64) {
    let vx = x2 - x1; let vy = y2 - y1;
    let wx = px - x1; let wy = py - y1;
    let vv = vx*vx + vy*vy;
    let mut t = if vv > 0.0 { (wx*vx + wy*vy) / vv } else { 0.0 };
    if t < 0.0 { t = 0.0; } else if t > 1.0 { t = 1.0; }
    let projx = x1 + t * vx; let projy = y1 + t * vy;
    let dx = px - projx; let dy = py - projy;
    (dx*dx + dy*dy, t)
}

pub fn cubic_point(t: f64, x0: f64, y0: f64, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> (f64, f64) {
    let u = 1.0 - t;
    let tt = t*t; let uu = u*u;
    let uuu = uu*u; let ttt = tt*t;
    let x = uuu*x0 + 3.0*uu*t*x1 + 3.0*u*tt*x2 + ttt*x3;
    let y = uuu*y0 + 3.0*uu*t*y1 + 3.0*u*tt*y2 + ttt*y3;
    (x, y)
}

/// Control points of a flow ribbon's centre line: horizontal tangents at both
/// ends, bending at the horizontal midpoint.
pub fn ribbon_controls(x0: f64, y0: f64, x1: f64, y1: f64) -> [(f64, f64); 4] {
    let mx = x0 + (x1 - x0) * 0.5;
    [(x0, y0), (mx, y0), (mx, y1), (x1, y1)]
}

/// Sampled squared distance from a point to a cubic; returns (d2, t).
pub fn cubic_distance_sq(px: f64, py: f64, c: &[(f64, f64); 4]) -> (f64, f64) {
    let [(x0, y0), (x1, y1), (x2, y2), (x3, y3)] = *c;
    if approx_eq(x0,x3,EPS_POS) && approx_eq(y0,y3,EPS_POS)
        && approx_eq(x1,x2,EPS_POS) && approx_eq(y1,y2,EPS_POS) && approx_eq(x0,x1,EPS_POS) {
        let dx = px - x0; let dy = py - y0; return (dx*dx+dy*dy, 0.0);
    }
    let mut best_d2 = f64::INFINITY;
    let mut best_t = 0.0;
    let n = 32;
    let mut prev = (x0, y0);
    for i in 1..=n {
        let t = i as f64 / n as f64;
        let cur = cubic_point(t, x0,y0,x1,y1,x2,y2,x3,y3);
        let (d2, ts) = seg_distance_sq(px, py, prev.0, prev.1, cur.0, cur.1);
        if d2 < best_d2 { best_d2 = d2; best_t = (i as f64 - 1.0 + ts) / n as f64; }
        prev = cur;
    }
    (best_d2, best_t)
}

#[inline]
pub fn point_in_rect(px: f64, py: f64, x0: f64, y0: f64, x1: f64, y1: f64, pad: f64) -> bool {
    px >= x0 - pad && px <= x1 + pad && py >= y0 - pad && py <= y1 + pad
}
