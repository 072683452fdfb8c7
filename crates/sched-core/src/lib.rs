//! sched-core - Open-loop cycle-level scheduling core
//!
//! This crate turns a set of update blocks plus a partial-order constraint
//! set into a linear per-cycle execution order that behaves like concurrent
//! evaluation. It is the scheduling stage of a cycle-level hardware-modeling
//! stack: component elaboration and DAG construction happen upstream and
//! hand their results over as [`SimTop`].
//!
//! # Overview
//!
//! Compilation runs a fixed pipeline:
//!
//! 1. Fold strongly connected components of the constraint graph into
//!    super-nodes (Kosaraju, iterative).
//! 2. Topologically linearize the condensed DAG, preferring plain update
//!    blocks over callee ports when the frontier offers a choice.
//! 3. Linearize each non-trivial SCC internally and wrap it in a fixed-point
//!    super-block that re-executes until its trigger variables stabilize,
//!    with a runtime combinational-loop guard.
//! 4. Link the per-cycle schedule (trace clearing, sweep, line trace,
//!    flip-flops, tracing hooks, posedge flips) and project callee slots out
//!    of it.
//! 5. Install a cursor over the projection so externally invoked methods
//!    consume exactly their share of the cycle.
//!
//! # Quick Start
//!
//! ```rust
//! use sched_core::{open_loop_schedule, ScheduleConfig, SimTop, UpdateBlock, Vertex};
//!
//! let a = UpdateBlock::new("up_a", || {});
//! let b = UpdateBlock::new("up_b", || {});
//!
//! let mut top = SimTop::new("top");
//! top.dag.final_upblks = vec![a.clone(), b.clone()];
//! top.dag
//!     .all_constraints
//!     .as_mut()
//!     .unwrap()
//!     .insert((Vertex::from(a), Vertex::from(b)));
//!
//! let sim = open_loop_schedule(top, ScheduleConfig::default()).unwrap();
//! sim.tick().unwrap();
//! assert_eq!(sim.num_cycles_executed(), 1);
//! ```
//!
//! # Host-driven methods
//!
//! Callee ports registered on the root get a slot in the schedule. Invoking
//! one through [`OpenLoopSim::call`] (or a [`MethodHandle`]) first executes
//! every projected block up to the method's slot, so interleaved host calls
//! and [`OpenLoopSim::tick`] observe the same per-cycle order a free-running
//! simulation would.

pub mod block;
pub mod dag;
pub mod error;
pub mod schedule;
pub mod test_utils;
pub mod value;

pub use block::{CalleePort, MethodFn, NbInterface, UpblkFn, UpdateBlock, Vertex};
pub use dag::{ConstraintDag, SimTop};
pub use error::ScheduleError;
pub use schedule::{open_loop_schedule, MethodHandle, OpenLoopSim, ScheduleConfig, MAX_ITERS};
pub use value::{Signal, SignalRef, SignalValue};
