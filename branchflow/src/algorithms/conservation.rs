//! Flow conservation: every stage with outgoing flows passes on exactly what it
//! receives (100 for a root).
//!
//! Public operations take a snapshot by reference and return a new one. The
//! `*_in_place` helpers do the actual work on an owned copy so multi-step
//! operations clone once.

use crate::config::LayoutConfig;
use crate::geometry::tolerance::{clamp, EPS_CONSERVATION, EPS_DENOM, MIN_FLOW_VALUE};
use crate::model::{Color, Diagram, Flow, FlowId, StageId, ROOT_BUDGET};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace, warn};

/// In(s): 100 for a stage without incoming flows, else their sum.
pub fn incoming_value(d: &Diagram, stage: StageId) -> f64 {
    let mut any = false;
    let mut sum = 0.0;
    for f in d.incoming(stage) {
        any = true;
        sum += f.value;
    }
    if any { sum } else { ROOT_BUDGET }
}

/// Stages whose outgoing total drifts from their incoming budget by more than `eps`.
pub fn unbalanced_stages(d: &Diagram, eps: f64) -> Vec<StageId> {
    let adj = Adjacency::build(d);
    d.stages
        .iter()
        .filter(|s| {
            let outs = adj.outgoing(s.id);
            if outs.is_empty() {
                return false;
            }
            let out: f64 = outs.iter().map(|&i| d.flows[i].value).sum();
            out > 0.0 && (out - adj.incoming_value(d, s.id)).abs() > eps
        })
        .map(|s| s.id)
        .collect()
}

/// Fails with `CycleDetected` if any flow path returns to its start.
pub fn check_acyclic(d: &Diagram) -> Result<()> {
    let adj = Adjacency::build(d);
    topo_order(d, &adj, None).map(|_| ())
}

/// True if `to` can already reach `from`, i.e. a `from -> to` flow would close a cycle.
pub fn would_create_cycle(d: &Diagram, from: StageId, to: StageId) -> bool {
    if from == to {
        return true;
    }
    let adj = Adjacency::build(d);
    adj.reachable(d, to).contains(&from)
}

// Flow indices per stage, built once per call.
struct Adjacency {
    stages: HashSet<StageId>,
    out: HashMap<StageId, Vec<usize>>,
    inc: HashMap<StageId, Vec<usize>>,
}

impl Adjacency {
    fn build(d: &Diagram) -> Self {
        let mut out: HashMap<StageId, Vec<usize>> = HashMap::new();
        let mut inc: HashMap<StageId, Vec<usize>> = HashMap::new();
        for (i, f) in d.flows.iter().enumerate() {
            out.entry(f.from).or_default().push(i);
            inc.entry(f.to).or_default().push(i);
        }
        let stages = d.stages.iter().map(|s| s.id).collect();
        Adjacency { stages, out, inc }
    }

    fn has(&self, s: StageId) -> bool {
        self.stages.contains(&s)
    }

    fn outgoing(&self, s: StageId) -> &[usize] {
        self.out.get(&s).map(Vec::as_slice).unwrap_or(&[])
    }

    fn incoming(&self, s: StageId) -> &[usize] {
        self.inc.get(&s).map(Vec::as_slice).unwrap_or(&[])
    }

    fn incoming_value(&self, d: &Diagram, s: StageId) -> f64 {
        let inc = self.incoming(s);
        if inc.is_empty() {
            ROOT_BUDGET
        } else {
            inc.iter().map(|&i| d.flows[i].value).sum()
        }
    }

    // Existing stages reachable from `start`, `start` included.
    fn reachable(&self, d: &Diagram, start: StageId) -> HashSet<StageId> {
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(s) = stack.pop() {
            if !seen.insert(s) {
                continue;
            }
            for &i in self.outgoing(s) {
                let t = d.flows[i].to;
                if self.has(t) && !seen.contains(&t) {
                    stack.push(t);
                }
            }
        }
        seen
    }
}

// Kahn's algorithm over existing stages, optionally restricted to `subset`.
// Flows with a missing endpoint or leaving the subset do not constrain the order.
fn topo_order(d: &Diagram, adj: &Adjacency, subset: Option<&HashSet<StageId>>) -> Result<Vec<StageId>> {
    let member = |s: StageId| subset.map_or_else(|| adj.has(s), |set| set.contains(&s));
    let nodes: Vec<StageId> = d.stages.iter().map(|s| s.id).filter(|&s| member(s)).collect();
    let mut indeg: HashMap<StageId, usize> = HashMap::with_capacity(nodes.len());
    for &s in &nodes {
        let n = adj
            .incoming(s)
            .iter()
            .filter(|&&i| member(d.flows[i].from))
            .count();
        indeg.insert(s, n);
    }
    let mut queue: VecDeque<StageId> = nodes.iter().copied().filter(|s| indeg[s] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(s) = queue.pop_front() {
        order.push(s);
        for &i in adj.outgoing(s) {
            let t = d.flows[i].to;
            if let Some(n) = indeg.get_mut(&t) {
                *n -= 1;
                if *n == 0 {
                    queue.push_back(t);
                }
            }
        }
    }
    if order.len() < nodes.len() {
        let stage = nodes
            .iter()
            .copied()
            .find(|s| indeg.get(s).map_or(false, |&n| n > 0))
            .unwrap_or(nodes[0]);
        warn!(stage, "cycle detected in flow graph");
        return Err(Error::CycleDetected { stage });
    }
    Ok(order)
}

/// Split `total` across `weights` proportionally, keeping every share at or
/// above `floor`. Shares that would dip under the floor are pinned to it and the
/// rest is re-split among the others. An all-zero weight vector splits equally.
pub fn proportional_fill(weights: &[f64], total: f64, floor: f64) -> Vec<f64> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }
    if total <= floor * n as f64 {
        return vec![total / n as f64; n];
    }
    let mut pinned = vec![false; n];
    let mut shares = vec![0.0; n];
    loop {
        let pinned_count = pinned.iter().filter(|p| **p).count();
        let free_total = total - floor * pinned_count as f64;
        let free_count = n - pinned_count;
        let free_weight: f64 = weights
            .iter()
            .zip(&pinned)
            .filter(|(_, p)| !**p)
            .map(|(w, _)| w.max(0.0))
            .sum();
        let mut newly_pinned = false;
        for i in 0..n {
            if pinned[i] {
                shares[i] = floor;
                continue;
            }
            shares[i] = if free_weight > EPS_DENOM {
                free_total * weights[i].max(0.0) / free_weight
            } else {
                free_total / free_count as f64
            };
            if shares[i] < floor {
                pinned[i] = true;
                newly_pinned = true;
            }
        }
        if !newly_pinned {
            return shares;
        }
    }
}

/// Rebalancing policy: the conservation epsilon and the squeeze-out floor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Conservation {
    pub epsilon: f64,
    pub min_flow_value: f64,
}

impl Default for Conservation {
    fn default() -> Self {
        Conservation { epsilon: EPS_CONSERVATION, min_flow_value: MIN_FLOW_VALUE }
    }
}

impl From<&LayoutConfig> for Conservation {
    fn from(cfg: &LayoutConfig) -> Self {
        Conservation { epsilon: cfg.conservation_epsilon, min_flow_value: cfg.min_flow_value }
    }
}

impl Conservation {
    /// Add a `from -> to` flow and equal-split `from`'s budget over all its children.
    ///
    /// The new flow's `branch_index` is the number of pre-existing siblings.
    /// Downstream stages whose budget moved are repaired by a rebalance pass.
    pub fn branch_create(
        &self,
        d: &Diagram,
        from: StageId,
        to: StageId,
        color: Color,
    ) -> Result<(Diagram, FlowId)> {
        if !d.has_stage(from) {
            return Err(Error::UnknownStage(from));
        }
        if !d.has_stage(to) {
            return Err(Error::UnknownStage(to));
        }
        if would_create_cycle(d, from, to) {
            warn!(from, to, "branch would close a cycle");
            return Err(Error::CycleDetected { stage: from });
        }
        let mut out = d.clone();
        let incoming = incoming_value(&out, from);
        let siblings = out.outgoing(from).count();
        let k = siblings + 1;
        let share = incoming / k as f64;
        let id = out.alloc_id();
        for f in out.flows.iter_mut().filter(|f| f.from == from) {
            f.value = share;
        }
        out.flows.push(Flow {
            id,
            name: String::new(),
            from,
            to,
            value: share,
            branch_index: siblings as u32,
            color,
        });
        debug!(from, to, flow = id, k, share, "branch created");
        self.rebalance_in_place(&mut out)?;
        Ok((out, id))
    }

    /// Equal-split every stage whose outgoing total is off by more than epsilon.
    /// Stages are visited in topological order so a repaired parent is seen by
    /// its children within the same pass; a second pass changes nothing.
    pub fn rebalance(&self, d: &Diagram) -> Result<Diagram> {
        let mut out = d.clone();
        self.rebalance_in_place(&mut out)?;
        Ok(out)
    }

    pub(crate) fn rebalance_in_place(&self, d: &mut Diagram) -> Result<()> {
        let adj = Adjacency::build(d);
        let order = topo_order(d, &adj, None)?;
        let mut repaired = 0usize;
        for s in order {
            let outs = adj.outgoing(s);
            if outs.is_empty() {
                continue;
            }
            let incoming = adj.incoming_value(d, s);
            let total: f64 = outs.iter().map(|&i| d.flows[i].value).sum();
            if (total - incoming).abs() > self.epsilon {
                let share = incoming / outs.len() as f64;
                trace!(stage = s, total, incoming, share, "rebalancing stage");
                for &i in outs {
                    d.flows[i].value = share;
                }
                repaired += 1;
            }
        }
        if repaired > 0 {
            debug!(repaired, "rebalance pass");
        }
        Ok(())
    }

    /// Set a flow to `percent` of its parent's budget and re-spread the rest
    /// over its siblings by their current shares.
    ///
    /// Sequence: redistribute, rebalance the graph, re-assert the edited value,
    /// redistribute again, then rebalance once more so the siblings' own
    /// subtrees follow their new budgets. The parent is already balanced by
    /// then, so the last pass leaves the edited flow alone.
    pub fn apply_manual_edit(&self, d: &Diagram, flow: FlowId, percent: f64) -> Result<Diagram> {
        let parent = match d.flow(flow) {
            Some(f) => f.from,
            None => return Err(Error::UnknownFlow(flow)),
        };
        if !percent.is_finite() {
            return Ok(d.clone());
        }
        let mut out = d.clone();
        let incoming = incoming_value(&out, parent);
        let target = clamp(percent / 100.0 * incoming, 0.0, incoming);
        debug!(flow, parent, percent, target, "manual flow edit");
        self.redistribute(&mut out, flow, target);
        self.rebalance_in_place(&mut out)?;
        self.redistribute(&mut out, flow, target);
        self.rebalance_in_place(&mut out)?;
        Ok(out)
    }

    // Pin `flow` at `target` (clamped to what the parent can give while keeping
    // each sibling at the floor) and hand the remainder to the siblings.
    fn redistribute(&self, d: &mut Diagram, flow: FlowId, target: f64) {
        let parent = match d.flow(flow) {
            Some(f) => f.from,
            None => return,
        };
        let incoming = incoming_value(d, parent);
        let others: Vec<usize> = d
            .flows
            .iter()
            .enumerate()
            .filter(|(_, f)| f.from == parent && f.id != flow)
            .map(|(i, _)| i)
            .collect();
        let n = others.len() as f64;
        let floor = if incoming >= self.min_flow_value * n { self.min_flow_value } else { 0.0 };
        let edited = clamp(target, 0.0, (incoming - floor * n).max(0.0));
        let edited = if others.is_empty() { incoming } else { edited };
        if let Some(f) = d.flow_mut(flow) {
            f.value = edited;
        }
        let weights: Vec<f64> = others.iter().map(|&i| d.flows[i].value).collect();
        let shares = proportional_fill(&weights, incoming - edited, floor);
        for (&i, share) in others.iter().zip(shares) {
            d.flows[i].value = share;
        }
    }

    /// Equal-split `stage`'s outgoing flows from its current budget and carry the
    /// change through every descendant, parents before children.
    pub fn recalculate_subtree(&self, d: &Diagram, stage: StageId) -> Result<Diagram> {
        let mut out = d.clone();
        self.recalculate_subtree_in_place(&mut out, stage)?;
        Ok(out)
    }

    pub(crate) fn recalculate_subtree_in_place(&self, d: &mut Diagram, stage: StageId) -> Result<()> {
        if !d.has_stage(stage) {
            return Ok(());
        }
        let adj = Adjacency::build(d);
        let reach = adj.reachable(d, stage);
        let order = topo_order(d, &adj, Some(&reach))?;
        for s in order {
            let outs = adj.outgoing(s);
            if outs.is_empty() {
                continue;
            }
            let share = adj.incoming_value(d, s) / outs.len() as f64;
            for &i in outs {
                d.flows[i].value = share;
            }
        }
        trace!(stage, stages = reach.len(), "subtree recalculated");
        Ok(())
    }

    /// Remove a non-root stage with every flow touching it. Its former parents
    /// re-split among surviving children; its former children become roots and
    /// their subtrees are recalculated from the root budget. Roots are protected.
    pub fn delete_stage(&self, d: &Diagram, stage: StageId) -> Result<Diagram> {
        if !d.has_stage(stage) || d.is_root(stage) {
            trace!(stage, "delete ignored");
            return Ok(d.clone());
        }
        let mut out = d.clone();
        let mut parents: Vec<StageId> = Vec::new();
        let mut children: Vec<StageId> = Vec::new();
        for f in &out.flows {
            if f.to == stage && f.from != stage && !parents.contains(&f.from) {
                parents.push(f.from);
            }
            if f.from == stage && f.to != stage && !children.contains(&f.to) {
                children.push(f.to);
            }
        }
        out.stages.retain(|s| s.id != stage);
        out.flows.retain(|f| f.from != stage && f.to != stage);
        debug!(stage, parents = parents.len(), orphans = children.len(), "stage deleted");
        for p in parents {
            self.recalculate_subtree_in_place(&mut out, p)?;
        }
        for c in children {
            self.recalculate_subtree_in_place(&mut out, c)?;
        }
        Ok(out)
    }

    /// Remove one flow, keeping both endpoints, and repair both sides.
    pub fn disconnect_flow(&self, d: &Diagram, flow: FlowId) -> Result<Diagram> {
        let (from, to) = match d.flow(flow) {
            Some(f) => (f.from, f.to),
            None => return Err(Error::UnknownFlow(flow)),
        };
        let mut out = d.clone();
        out.flows.retain(|f| f.id != flow);
        debug!(flow, from, to, "flow disconnected");
        self.recalculate_subtree_in_place(&mut out, from)?;
        self.recalculate_subtree_in_place(&mut out, to)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_pins_small_shares_to_floor() {
        let s = proportional_fill(&[1000.0, 1.0], 10.0, 0.5);
        assert!((s[1] - 0.5).abs() < 1e-12);
        assert!((s[0] - 9.5).abs() < 1e-12);
    }

    #[test]
    fn fill_zero_weights_splits_equally() {
        let s = proportional_fill(&[0.0, 0.0, 0.0, 0.0], 2.0, 0.01);
        assert!(s.iter().all(|v| (v - 0.5).abs() < 1e-12));
    }

    #[test]
    fn fill_tight_budget_gives_floor_each() {
        let s = proportional_fill(&[3.0, 7.0], 0.02, 0.01);
        assert_eq!(s, vec![0.01, 0.01]);
    }

    #[test]
    fn self_loop_counts_as_cycle() {
        let mut d = Diagram::new();
        let a = d.push_stage("a", 0.0, 0.0, Color::default());
        assert!(would_create_cycle(&d, a, a));
    }
}
