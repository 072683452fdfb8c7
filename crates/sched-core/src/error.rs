//! Scheduler error kinds.
//!
//! Every failure surfaces; nothing is retried or swallowed. All kinds are
//! fatal for the schedule that raised them — `CombinationalLoop` reaches the
//! caller of `tick()` or of a wrapped method, the rest abort compilation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    /// A required attribute from an upstream pass is missing on the DAG
    /// input. Names the attribute the caller must generate first.
    #[error("Please first apply other passes to generate dag.{attribute}")]
    PassOrder { attribute: &'static str },

    /// The scheduler broke one of its own invariants — a bug in this core,
    /// not in the caller's design.
    #[error("scheduling invariant violated: {reason}")]
    SchedulingInvariant { reason: String },

    /// A fixed-point super-block failed to stabilize within the iteration
    /// bound. Names every member of the offending cycle.
    #[error("Combinational loop detected at runtime in {{{members}}}!")]
    CombinationalLoop { members: String },

    /// The same port object appeared twice in callee registration.
    #[error("duplicate callee registration for method '{name}'")]
    DuplicateMethod { name: String },
}

impl ScheduleError {
    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        ScheduleError::SchedulingInvariant {
            reason: reason.into(),
        }
    }

    pub(crate) fn combinational_loop(member_names: &[String]) -> Self {
        ScheduleError::CombinationalLoop {
            members: member_names.join(", "),
        }
    }
}
