//! Kahn topological sort over the condensed DAG.
//!
//! The frontier tie-break prefers a trivial SCC holding a plain update block
//! over one holding a method or ready port. Methods scheduled late sit close
//! to the blocks that consume their effects, which keeps the cursor from
//! sweeping long prefixes on every host call.

use std::collections::VecDeque;

use crate::dag::ConstraintGraph;
use crate::error::ScheduleError;
use crate::schedule::scc::Condensation;

pub(crate) struct TopoOrder {
    /// SCC ids in schedule order.
    pub(crate) order: Vec<usize>,
    /// For each SCC, the SCC that first drained its in-degree, if any.
    /// Seeds intra-SCC linearization.
    pub(crate) predecessor: Vec<Option<usize>>,
}

pub(crate) fn topo_sort(
    g: &ConstraintGraph,
    cond: &Condensation,
) -> Result<TopoOrder, ScheduleError> {
    let m = cond.len();
    let mut in_deg = cond.in_deg.clone();
    let mut predecessor: Vec<Option<usize>> = vec![None; m];

    let mut frontier: VecDeque<usize> = (0..m).filter(|&s| in_deg[s] == 0).collect();
    let mut order = Vec::with_capacity(m);

    while !frontier.is_empty() {
        let pick = frontier
            .iter()
            .position(|&s| cond.is_trivial(s) && !g.is_port[cond.members[s][0]])
            .unwrap_or(0);
        let s = match frontier.remove(pick) {
            Some(s) => s,
            None => break,
        };
        order.push(s);

        let mut newly_zero = Vec::new();
        for &t in &cond.succs[s] {
            if in_deg[t] > 0 {
                predecessor[t].get_or_insert(s);
                in_deg[t] -= 1;
                if in_deg[t] == 0 {
                    newly_zero.push(t);
                }
            }
        }
        frontier.extend(newly_zero);
    }

    if order.len() != m {
        return Err(ScheduleError::invariant(format!(
            "condensed graph is cyclic: scheduled {} of {} components",
            order.len(),
            m
        )));
    }
    Ok(TopoOrder { order, predecessor })
}
