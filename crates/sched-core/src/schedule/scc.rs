//! Kosaraju condensation of the constraint graph.
//!
//! Pass 1 computes a DFS post-order on the forward graph; pass 2 gathers
//! components with reverse BFS in reverse post-order. Both passes are
//! iterative — constraint chains 1500 vertices deep occur in real designs
//! and would blow the native stack under recursion.
//!
//! The DFS start order is a seeded shuffle: reproducible for one seed,
//! variable across seeds, so regression suites can lock an order while fuzz
//! runs explore others.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::dag::ConstraintGraph;
use crate::error::ScheduleError;

const UNASSIGNED: usize = usize::MAX;

/// The SCC partition plus the condensed DAG.
pub(crate) struct Condensation {
    /// Vertex index → SCC id.
    pub(crate) comp_of: Vec<usize>,
    /// SCC id → member vertex indices, in reverse-BFS discovery order.
    pub(crate) members: Vec<Vec<usize>>,
    /// Condensed edges, set-deduplicated.
    pub(crate) succs: Vec<std::collections::BTreeSet<usize>>,
    /// In-degree of each SCC in the condensed DAG.
    pub(crate) in_deg: Vec<usize>,
}

impl Condensation {
    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn is_trivial(&self, scc: usize) -> bool {
        self.members[scc].len() == 1
    }
}

pub(crate) fn condense(g: &ConstraintGraph, seed: u64) -> Result<Condensation, ScheduleError> {
    let n = g.verts.len();

    // Pass 1: iterative DFS post-order over shuffled starts. Each frame is
    // pushed twice; the second visit emits the vertex.
    let mut starts: Vec<usize> = (0..n).collect();
    starts.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut visited = vec![false; n];
    let mut post = Vec::with_capacity(n);
    let mut stack: Vec<(usize, bool)> = Vec::new();
    for &s in &starts {
        if visited[s] {
            continue;
        }
        stack.push((s, false));
        while let Some((v, second_visit)) = stack.pop() {
            if second_visit {
                post.push(v);
                continue;
            }
            if visited[v] {
                continue;
            }
            visited[v] = true;
            stack.push((v, true));
            for &w in &g.fwd[v] {
                if !visited[w] {
                    stack.push((w, false));
                }
            }
        }
    }

    // Pass 2: reverse BFS in reverse post-order.
    let mut comp_of = vec![UNASSIGNED; n];
    let mut members: Vec<Vec<usize>> = Vec::new();
    for &v in post.iter().rev() {
        if comp_of[v] != UNASSIGNED {
            continue;
        }
        let id = members.len();
        comp_of[v] = id;
        let mut scc = vec![v];
        let mut queue = VecDeque::from([v]);
        while let Some(u) = queue.pop_front() {
            for &w in &g.rev[u] {
                if comp_of[w] == UNASSIGNED {
                    comp_of[w] = id;
                    scc.push(w);
                    queue.push_back(w);
                }
            }
        }
        members.push(scc);
    }

    if comp_of.iter().any(|&c| c == UNASSIGNED) {
        return Err(ScheduleError::invariant(
            "vertex missing from SCC assignment",
        ));
    }

    // Condensation: cross-SCC edges, deduplicated; in-degree counts each
    // condensed edge once.
    let m = members.len();
    let mut succs = vec![std::collections::BTreeSet::new(); m];
    let mut in_deg = vec![0usize; m];
    for u in 0..n {
        for &w in &g.fwd[u] {
            let (cu, cw) = (comp_of[u], comp_of[w]);
            if cu != cw && succs[cu].insert(cw) {
                in_deg[cw] += 1;
            }
        }
    }

    debug!(sccs = m, vertices = n, "condensation complete");
    Ok(Condensation {
        comp_of,
        members,
        succs,
        in_deg,
    })
}
