//! Fixed-point execution of a combinational cycle.
//!
//! Each non-trivial SCC becomes one super-block. An iteration snapshots the
//! SCC's trigger variables, runs the intra order once, and re-reads: when
//! every trigger is structurally unchanged the cycle has stabilized for this
//! clock cycle. Divergent designs hit the iteration bound and surface a
//! [`ScheduleError::CombinationalLoop`] naming every member.

use std::rc::Rc;

use crate::block::{UpdateBlock, Vertex};
use crate::dag::ConstraintGraph;
use crate::error::ScheduleError;
use crate::schedule::scc::Condensation;
use crate::value::{SignalRef, SignalValue};

/// Iteration bound per SCC per cycle.
pub const MAX_ITERS: usize = 100;

pub(crate) struct FixedPointBlock {
    name: String,
    blocks: Vec<Rc<UpdateBlock>>,
    member_names: Vec<String>,
    triggers: Vec<SignalRef>,
}

impl FixedPointBlock {
    /// Build the super-block for `scc` with its members in `order`.
    ///
    /// Trigger variables come from the constraint-variable map restricted to
    /// edges internal to the SCC, deduplicated by handle identity. Signals
    /// with no producer inside the SCC never enter the map, so they
    /// contribute no snapshot.
    pub(crate) fn new(
        g: &ConstraintGraph,
        cond: &Condensation,
        scc: usize,
        order: &[usize],
    ) -> Result<Self, ScheduleError> {
        let mut blocks = Vec::with_capacity(order.len());
        let mut member_names = Vec::with_capacity(order.len());
        for &v in order {
            match &g.verts[v] {
                Vertex::Upblk(b) => {
                    member_names.push(b.name().to_string());
                    blocks.push(b.clone());
                }
                Vertex::Port(p) => {
                    return Err(ScheduleError::invariant(format!(
                        "callee method '{}' appears in a combinational cycle",
                        p.name()
                    )));
                }
            }
        }

        let mut triggers: Vec<SignalRef> = Vec::new();
        let mut seen_keys = std::collections::HashSet::new();
        for &u in order {
            for &v in &g.fwd[u] {
                if cond.comp_of[v] != scc {
                    continue;
                }
                if let Some(sigs) = g.triggers.get(&(u, v)) {
                    for sig in sigs {
                        if seen_keys.insert(sig.key()) {
                            triggers.push(sig.clone());
                        }
                    }
                }
            }
        }

        Ok(FixedPointBlock {
            name: format!("scc_loop_{}", scc),
            blocks,
            member_names,
            triggers,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Iterate to a fixed point, or fail after [`MAX_ITERS`] iterations.
    pub(crate) fn run(&self) -> Result<(), ScheduleError> {
        for _ in 0..MAX_ITERS {
            let snapshots: Vec<SignalValue> =
                self.triggers.iter().map(SignalRef::snapshot).collect();
            for blk in &self.blocks {
                blk.run();
            }
            let stable = self
                .triggers
                .iter()
                .zip(&snapshots)
                .all(|(sig, snap)| sig.snapshot() == *snap);
            if stable {
                return Ok(());
            }
        }
        Err(ScheduleError::combinational_loop(&self.member_names))
    }
}

impl std::fmt::Debug for FixedPointBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedPointBlock")
            .field("name", &self.name)
            .field("members", &self.member_names)
            .field("triggers", &self.triggers.len())
            .finish()
    }
}
