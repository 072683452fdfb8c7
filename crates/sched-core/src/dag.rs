//! Upstream DAG intake and constraint-graph construction.
//!
//! The DAG-builder pass runs before scheduling and leaves its results in a
//! [`ConstraintDag`]; the elaborated root contributes the remaining fields of
//! [`SimTop`]. This module folds both into a [`ConstraintGraph`]: an explicit
//! index-based adjacency (forward and reverse) over the vertex set the
//! scheduler actually orders.
//!
//! # Vertex set
//!
//! `V = final_upblks \ ff_upblks`, extended by every top-level callee port
//! and, per NB interface, both the method and its ready-guard. Flip-flop
//! blocks are excluded here because they execute in the fixed `schedule_ff`
//! slot of the linked schedule, not in the constraint-ordered sweep.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::block::{CalleePort, NbInterface, UpdateBlock, Vertex};
use crate::error::ScheduleError;
use crate::value::SignalRef;

// ============================================================================
// Collaborator-facing input structs
// ============================================================================

/// Constraint payload produced by the DAG-builder pass.
pub struct ConstraintDag {
    /// Happens-before edges between schedulable vertices. `None` means the
    /// DAG pass has not run; scheduling refuses to proceed with a
    /// [`ScheduleError::PassOrder`].
    pub all_constraints: Option<HashSet<(Vertex, Vertex)>>,
    /// Update blocks surviving DAG construction.
    pub final_upblks: Vec<Rc<UpdateBlock>>,
    /// Method-level edges. The right endpoint is redirected to the method's
    /// ready-guard when one exists: "before the method" means "before its
    /// ready".
    pub top_level_callee_constraints: Vec<(Rc<CalleePort>, Rc<CalleePort>)>,
    /// Trigger signals per constraint edge, consulted for SCC convergence.
    pub constraint_objs: HashMap<(Vertex, Vertex), Vec<SignalRef>>,
}

impl ConstraintDag {
    /// An empty but well-formed DAG result (the pass ran, found nothing).
    pub fn new() -> Self {
        ConstraintDag {
            all_constraints: Some(HashSet::new()),
            final_upblks: Vec::new(),
            top_level_callee_constraints: Vec::new(),
            constraint_objs: HashMap::new(),
        }
    }
}

impl Default for ConstraintDag {
    /// The state before the DAG pass has run: `all_constraints` is absent.
    fn default() -> Self {
        ConstraintDag {
            all_constraints: None,
            final_upblks: Vec::new(),
            top_level_callee_constraints: Vec::new(),
            constraint_objs: HashMap::new(),
        }
    }
}

/// Everything the scheduler needs from an elaborated top-level component.
pub struct SimTop {
    pub name: String,
    /// Result of the root's `get_all_update_ff()` reflection; these blocks
    /// are scheduled in the flip-flop slot, not the constraint sweep.
    pub ff_upblks: Vec<Rc<UpdateBlock>>,
    /// Plain callee ports hosted by the root.
    pub callee_ports: Vec<Rc<CalleePort>>,
    /// Non-blocking interfaces hosted by the root, in discovery order.
    pub nb_ifcs: Vec<NbInterface>,
    pub dag: ConstraintDag,
    /// Flip-flop blocks, executed after the update sweep.
    pub schedule_ff: Vec<Rc<UpdateBlock>>,
    /// Posedge-flip blocks, executed last in the cycle.
    pub schedule_posedge_flip: Vec<Rc<UpdateBlock>>,
    /// Opaque tracing hooks (VCD writer, text-signal collector).
    pub tracing_hooks: Vec<Rc<UpdateBlock>>,
    /// Per-cycle trace renderer, printed when the config enables it.
    pub line_trace: Option<Rc<dyn Fn() -> String>>,
}

impl SimTop {
    pub fn new(name: impl Into<String>) -> Self {
        SimTop {
            name: name.into(),
            ff_upblks: Vec::new(),
            callee_ports: Vec::new(),
            nb_ifcs: Vec::new(),
            dag: ConstraintDag::new(),
            schedule_ff: Vec::new(),
            schedule_posedge_flip: Vec::new(),
            tracing_hooks: Vec::new(),
            line_trace: None,
        }
    }
}

// ============================================================================
// ConstraintGraph
// ============================================================================

/// Index-based constraint digraph over the schedulable vertex set.
pub(crate) struct ConstraintGraph {
    pub(crate) verts: Vec<Vertex>,
    pub(crate) index: HashMap<Vertex, usize>,
    /// Forward adjacency, deduplicated and iteration-stable.
    pub(crate) fwd: Vec<BTreeSet<usize>>,
    /// Reverse adjacency.
    pub(crate) rev: Vec<BTreeSet<usize>>,
    /// Trigger signals per retained edge.
    pub(crate) triggers: HashMap<(usize, usize), Vec<SignalRef>>,
    /// Whether each vertex is a callee port (method or ready-guard).
    pub(crate) is_port: Vec<bool>,
}

impl ConstraintGraph {
    pub(crate) fn build(top: &SimTop) -> Result<Self, ScheduleError> {
        let constraints = top
            .dag
            .all_constraints
            .as_ref()
            .ok_or(ScheduleError::PassOrder {
                attribute: "all_constraints",
            })?;

        let mut g = ConstraintGraph {
            verts: Vec::new(),
            index: HashMap::new(),
            fwd: Vec::new(),
            rev: Vec::new(),
            triggers: HashMap::new(),
            is_port: Vec::new(),
        };

        let ff: HashSet<Vertex> = top
            .ff_upblks
            .iter()
            .map(|b| Vertex::from(b.clone()))
            .collect();

        for blk in &top.dag.final_upblks {
            let v = Vertex::from(blk.clone());
            if ff.contains(&v) {
                continue;
            }
            g.add_vertex(v, false);
        }

        // Callee registration. Seeing the same port twice means the upstream
        // discovery pass handed over a corrupted registration.
        let mut rdy_of: HashMap<Vertex, usize> = HashMap::new();
        for port in &top.callee_ports {
            g.register_port(port)?;
        }
        for ifc in &top.nb_ifcs {
            let mi = g.register_port(&ifc.method)?;
            let ri = g.register_port(&ifc.rdy)?;
            g.add_edge(ri, mi);
            rdy_of.insert(Vertex::from(ifc.method.clone()), ri);
        }

        for (x, y) in constraints {
            if let (Some(&xi), Some(&yi)) = (g.index.get(x), g.index.get(y)) {
                g.add_edge(xi, yi);
            }
        }

        for (x, y) in &top.dag.top_level_callee_constraints {
            let xv = Vertex::from(x.clone());
            let yv = Vertex::from(y.clone());
            let yi = match rdy_of.get(&yv) {
                Some(&ri) => Some(ri),
                None => g.index.get(&yv).copied(),
            };
            if let (Some(&xi), Some(yi)) = (g.index.get(&xv), yi) {
                g.add_edge(xi, yi);
            }
        }

        for ((u, v), sigs) in &top.dag.constraint_objs {
            if let (Some(&ui), Some(&vi)) = (g.index.get(u), g.index.get(v)) {
                g.triggers.insert((ui, vi), sigs.clone());
            }
        }

        debug!(
            vertices = g.verts.len(),
            edges = g.edge_count(),
            "constraint graph built"
        );
        Ok(g)
    }

    fn add_vertex(&mut self, v: Vertex, is_port: bool) -> usize {
        if let Some(&i) = self.index.get(&v) {
            return i;
        }
        let i = self.verts.len();
        self.index.insert(v.clone(), i);
        self.verts.push(v);
        self.fwd.push(BTreeSet::new());
        self.rev.push(BTreeSet::new());
        self.is_port.push(is_port);
        i
    }

    fn register_port(&mut self, port: &Rc<CalleePort>) -> Result<usize, ScheduleError> {
        let v = Vertex::from(port.clone());
        if self.index.contains_key(&v) {
            return Err(ScheduleError::DuplicateMethod {
                name: port.name().to_string(),
            });
        }
        Ok(self.add_vertex(v, true))
    }

    pub(crate) fn add_edge(&mut self, u: usize, v: usize) {
        self.fwd[u].insert(v);
        self.rev[v].insert(u);
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.fwd.iter().map(BTreeSet::len).sum()
    }

    /// Deterministic GraphViz rendering of V/E, name-sorted.
    pub(crate) fn to_dot(&self, name: &str) -> String {
        let mut out = format!("digraph \"{}\" {{\n", name);
        let mut names: Vec<&str> = self.verts.iter().map(Vertex::name).collect();
        names.sort_unstable();
        for n in names {
            out.push_str(&format!("  \"{}\";\n", n));
        }
        let mut edges: Vec<(&str, &str)> = Vec::with_capacity(self.edge_count());
        for (u, succs) in self.fwd.iter().enumerate() {
            for &v in succs {
                edges.push((self.verts[u].name(), self.verts[v].name()));
            }
        }
        edges.sort_unstable();
        for (u, v) in edges {
            out.push_str(&format!("  \"{}\" -> \"{}\";\n", u, v));
        }
        out.push_str("}\n");
        out
    }

    /// Honor the `MAMBA_DAG` environment variable: dump the graph to
    /// `<top>.dag.dot` before scheduling. A write failure degrades to a log
    /// line; it never fails the pass.
    pub(crate) fn dump_if_requested(&self, top_name: &str) {
        if std::env::var_os("MAMBA_DAG").is_none() {
            return;
        }
        let path = format!("{}.dag.dot", top_name);
        match std::fs::write(&path, self.to_dot(top_name)) {
            Ok(()) => debug!(%path, "dumped constraint graph"),
            Err(e) => warn!(%path, error = %e, "failed to dump constraint graph"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SignalValue;

    fn upblk(name: &str) -> Rc<UpdateBlock> {
        UpdateBlock::new(name, || {})
    }

    fn port(name: &str) -> Rc<CalleePort> {
        CalleePort::new(name, |_| SignalValue::Void)
    }

    #[test]
    fn missing_constraints_is_a_pass_order_error() {
        let mut top = SimTop::new("top");
        top.dag = ConstraintDag::default();
        let err = ConstraintGraph::build(&top).err();
        assert!(matches!(
            err,
            Some(ScheduleError::PassOrder {
                attribute: "all_constraints"
            })
        ));
    }

    #[test]
    fn ff_blocks_are_excluded_from_the_vertex_set() {
        let a = upblk("up_a");
        let ff = upblk("up_ff");
        let mut top = SimTop::new("top");
        top.dag.final_upblks = vec![a.clone(), ff.clone()];
        top.ff_upblks = vec![ff];

        let g = ConstraintGraph::build(&top).unwrap();
        assert_eq!(g.verts.len(), 1);
        assert_eq!(g.verts[0].name(), "up_a");
    }

    #[test]
    fn nb_interface_gets_an_implicit_rdy_edge() {
        let ifc = NbInterface::new(port("enq"), port("enq_rdy"));
        let mut top = SimTop::new("top");
        top.nb_ifcs = vec![ifc];

        let g = ConstraintGraph::build(&top).unwrap();
        let ri = g.index[&Vertex::from(g_port(&g, "enq_rdy"))];
        let mi = g.index[&Vertex::from(g_port(&g, "enq"))];
        assert!(g.fwd[ri].contains(&mi));
        assert!(g.rev[mi].contains(&ri));
    }

    fn g_port(g: &ConstraintGraph, name: &str) -> Rc<CalleePort> {
        g.verts
            .iter()
            .find_map(|v| match v {
                Vertex::Port(p) if p.name() == name => Some(p.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn duplicate_port_registration_is_fatal() {
        let p = port("enq");
        let mut top = SimTop::new("top");
        top.callee_ports = vec![p.clone(), p];

        let err = ConstraintGraph::build(&top).err();
        assert!(matches!(err, Some(ScheduleError::DuplicateMethod { name }) if name == "enq"));
    }

    #[test]
    fn callee_constraint_redirects_to_ready_guard() {
        let a = port("give");
        let ifc = NbInterface::new(port("enq"), port("enq_rdy"));
        let mut top = SimTop::new("top");
        top.callee_ports = vec![a.clone()];
        top.nb_ifcs = vec![ifc.clone()];
        top.dag.top_level_callee_constraints = vec![(a.clone(), ifc.method.clone())];

        let g = ConstraintGraph::build(&top).unwrap();
        let ai = g.index[&Vertex::from(a)];
        let ri = g.index[&Vertex::from(ifc.rdy)];
        let mi = g.index[&Vertex::from(ifc.method)];
        assert!(g.fwd[ai].contains(&ri));
        assert!(!g.fwd[ai].contains(&mi));
    }

    #[test]
    fn constraints_with_foreign_endpoints_are_dropped() {
        let a = upblk("up_a");
        let stranger = upblk("up_elsewhere");
        let mut top = SimTop::new("top");
        top.dag.final_upblks = vec![a.clone()];
        let mut cons = HashSet::new();
        cons.insert((Vertex::from(a.clone()), Vertex::from(stranger)));
        top.dag.all_constraints = Some(cons);

        let g = ConstraintGraph::build(&top).unwrap();
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn dot_rendering_is_name_sorted() {
        let a = upblk("up_a");
        let b = upblk("up_b");
        let mut top = SimTop::new("top");
        top.dag.final_upblks = vec![b.clone(), a.clone()];
        let mut cons = HashSet::new();
        cons.insert((Vertex::from(a.clone()), Vertex::from(b.clone())));
        top.dag.all_constraints = Some(cons);

        let g = ConstraintGraph::build(&top).unwrap();
        let dot = g.to_dot("top");
        assert_eq!(
            dot,
            "digraph \"top\" {\n  \"up_a\";\n  \"up_b\";\n  \"up_a\" -> \"up_b\";\n}\n"
        );
    }
}
