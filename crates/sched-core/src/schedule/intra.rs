//! Linearization of a single SCC's members.
//!
//! The intra-SCC order minimizes re-execution inside the fixed-point loop:
//! members driven by the predecessor SCC go first, so a single pass often
//! reaches the fixed point. Trivial SCCs pass straight through.

use std::collections::VecDeque;

use crate::dag::ConstraintGraph;
use crate::error::ScheduleError;
use crate::schedule::scc::Condensation;
use crate::schedule::topo::TopoOrder;

/// Emit the members of `scc` in execution order.
pub(crate) fn order_scc(
    g: &ConstraintGraph,
    cond: &Condensation,
    topo: &TopoOrder,
    scc: usize,
) -> Result<Vec<usize>, ScheduleError> {
    let members = &cond.members[scc];
    if members.len() == 1 {
        return Ok(members.clone());
    }

    for &v in members {
        if g.is_port[v] {
            return Err(ScheduleError::invariant(format!(
                "callee method '{}' appears in a combinational cycle",
                g.verts[v].name()
            )));
        }
    }

    let mut by_name = members.clone();
    by_name.sort_by(|&a, &b| g.verts[a].name().cmp(g.verts[b].name()));

    let mut seeds: Vec<usize> = Vec::new();
    if let Some(pred) = topo.predecessor[scc] {
        for &v in &by_name {
            if g.rev[v].iter().any(|&u| cond.comp_of[u] == pred) {
                seeds.push(v);
            }
        }
    }
    if seeds.is_empty() {
        seeds.push(max_internal_in_degree(g, cond, scc, &by_name));
    }

    // BFS along forward edges that stay inside the SCC. Strong connectivity
    // guarantees every member is reached.
    let mut seen = vec![false; g.verts.len()];
    let mut order = Vec::with_capacity(members.len());
    let mut queue: VecDeque<usize> = VecDeque::new();
    for &s in &seeds {
        if !seen[s] {
            seen[s] = true;
            queue.push_back(s);
        }
    }
    while let Some(v) = queue.pop_front() {
        order.push(v);
        for &w in &g.fwd[v] {
            if cond.comp_of[w] == scc && !seen[w] {
                seen[w] = true;
                queue.push_back(w);
            }
        }
    }

    if order.len() != members.len() {
        return Err(ScheduleError::invariant(format!(
            "intra-SCC walk covered {} of {} members",
            order.len(),
            members.len()
        )));
    }
    Ok(order)
}

/// The member with the most in-edges from inside the SCC; ties go to the
/// lexicographically smallest name (`by_name` is pre-sorted).
fn max_internal_in_degree(
    g: &ConstraintGraph,
    cond: &Condensation,
    scc: usize,
    by_name: &[usize],
) -> usize {
    let internal_in = |v: usize| g.rev[v].iter().filter(|&&u| cond.comp_of[u] == scc).count();
    let mut best = by_name[0];
    let mut best_deg = internal_in(best);
    for &v in &by_name[1..] {
        let deg = internal_in(v);
        if deg > best_deg {
            best = v;
            best_deg = deg;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{CalleePort, UpdateBlock, Vertex};
    use crate::dag::SimTop;
    use crate::schedule::scc::condense;
    use crate::schedule::topo::topo_sort;
    use crate::value::SignalValue;
    use std::collections::HashSet;
    use std::rc::Rc;

    fn build(names: &[&str], edges: &[(usize, usize)]) -> (crate::dag::ConstraintGraph, Vec<Rc<UpdateBlock>>) {
        let blks: Vec<Rc<UpdateBlock>> = names
            .iter()
            .map(|n| UpdateBlock::new(n.to_string(), || {}))
            .collect();
        let mut top = SimTop::new("top");
        top.dag.final_upblks = blks.clone();
        let mut cons = HashSet::new();
        for &(u, v) in edges {
            cons.insert((Vertex::from(blks[u].clone()), Vertex::from(blks[v].clone())));
        }
        top.dag.all_constraints = Some(cons);
        (crate::dag::ConstraintGraph::build(&top).unwrap(), blks)
    }

    #[test]
    fn rootless_cycle_seeds_at_max_internal_in_degree() {
        // b has two internal in-edges, a and c have one each.
        let (g, blks) = build(&["up_a", "up_b", "up_c"], &[(0, 1), (2, 1), (1, 0), (0, 2)]);
        let cond = condense(&g, 0).unwrap();
        let topo = topo_sort(&g, &cond).unwrap();
        let scc = cond.comp_of[g.index[&Vertex::from(blks[0].clone())]];
        let order = order_scc(&g, &cond, &topo, scc).unwrap();
        assert_eq!(g.verts[order[0]].name(), "up_b");
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn driven_members_seed_when_a_predecessor_exists() {
        // src drives b inside the {a, b} cycle; b must lead the intra order.
        let (g, blks) = build(&["up_src", "up_a", "up_b"], &[(0, 2), (1, 2), (2, 1)]);
        let cond = condense(&g, 0).unwrap();
        let topo = topo_sort(&g, &cond).unwrap();
        let scc = cond.comp_of[g.index[&Vertex::from(blks[1].clone())]];
        let order = order_scc(&g, &cond, &topo, scc).unwrap();
        let names: Vec<&str> = order.iter().map(|&v| g.verts[v].name()).collect();
        assert_eq!(names, vec!["up_b", "up_a"]);
    }

    #[test]
    fn ports_inside_a_cycle_are_rejected() {
        let blk = UpdateBlock::new("up_a", || {});
        let p = CalleePort::new("enq", |_| SignalValue::Void);
        let mut top = SimTop::new("top");
        top.dag.final_upblks = vec![blk.clone()];
        top.callee_ports = vec![p.clone()];
        let mut cons = HashSet::new();
        cons.insert((Vertex::from(blk.clone()), Vertex::from(p.clone())));
        cons.insert((Vertex::from(p), Vertex::from(blk.clone())));
        top.dag.all_constraints = Some(cons);

        let g = crate::dag::ConstraintGraph::build(&top).unwrap();
        let cond = condense(&g, 0).unwrap();
        let topo = TopoOrder {
            order: vec![0],
            predecessor: vec![None; cond.len()],
        };
        let scc = cond.comp_of[g.index[&Vertex::from(blk)]];
        let err = order_scc(&g, &cond, &topo, scc).err();
        assert!(matches!(err, Some(ScheduleError::SchedulingInvariant { .. })));
    }
}
