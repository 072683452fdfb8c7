//! Final schedule assembly and the methodless projection.
//!
//! The per-cycle schedule has a fixed shape:
//!
//! 1. `clear_cl_trace` — reset every callee port's per-cycle call trace
//! 2. the constraint-ordered update sweep (blocks, super-blocks, callee slots)
//! 3. the line-trace printer, when configured
//! 4. flip-flop blocks
//! 5. tracing hooks
//! 6. posedge-flip blocks
//!
//! Callee slots are placeholders: the sweep never executes them. Filtering
//! them out yields the *projection* — the execution spine the cursor drives —
//! together with each port's jump target into the projection.

use std::rc::Rc;

use tracing::debug;

use crate::block::{CalleePort, UpdateBlock};
use crate::dag::SimTop;
use crate::error::ScheduleError;
use crate::schedule::fixed_point::FixedPointBlock;
use crate::schedule::ScheduleConfig;

/// One entry of the linked schedule.
#[derive(Clone)]
pub(crate) enum Step {
    Block(Rc<UpdateBlock>),
    Loop(Rc<FixedPointBlock>),
    /// A callee slot. Skipped by the sweep; executed only through its
    /// cursor wrapper.
    Port(Rc<CalleePort>),
}

impl Step {
    pub(crate) fn name(&self) -> &str {
        match self {
            Step::Block(b) => b.name(),
            Step::Loop(l) => l.name(),
            Step::Port(p) => p.name(),
        }
    }

    pub(crate) fn run(&self) -> Result<(), ScheduleError> {
        match self {
            Step::Block(b) => {
                b.run();
                Ok(())
            }
            Step::Loop(l) => l.run(),
            Step::Port(p) => Err(ScheduleError::invariant(format!(
                "callee slot '{}' reached the execution spine",
                p.name()
            ))),
        }
    }
}

/// A callee port's position in the schedule and its projection jump target.
pub(crate) struct PortSlot {
    pub(crate) port: Rc<CalleePort>,
    /// Index of the slot in the full schedule.
    pub(crate) orig_idx: usize,
    /// Projected index of the first non-callee step after the slot;
    /// `projection.len()` when the slot is at the tail.
    pub(crate) target_new: usize,
}

pub(crate) struct LinkedSchedule {
    pub(crate) steps: Vec<Step>,
    pub(crate) projection: Vec<Step>,
    pub(crate) port_slots: Vec<PortSlot>,
}

pub(crate) fn link(top: &SimTop, sweep: Vec<Step>, config: &ScheduleConfig) -> LinkedSchedule {
    let mut steps: Vec<Step> = Vec::with_capacity(sweep.len() + 8);

    let all_ports: Vec<Rc<CalleePort>> = top
        .callee_ports
        .iter()
        .cloned()
        .chain(
            top.nb_ifcs
                .iter()
                .flat_map(|ifc| [ifc.method.clone(), ifc.rdy.clone()]),
        )
        .collect();
    steps.push(Step::Block(UpdateBlock::new("clear_cl_trace", move || {
        for port in &all_ports {
            port.clear_cl_trace();
        }
    })));

    steps.extend(sweep);

    if config.print_line_trace {
        if let Some(lt) = &top.line_trace {
            let lt = lt.clone();
            steps.push(Step::Block(UpdateBlock::new("print_line_trace", move || {
                println!("{}", lt());
            })));
        }
    }
    for blk in &top.schedule_ff {
        steps.push(Step::Block(blk.clone()));
    }
    for blk in &top.tracing_hooks {
        steps.push(Step::Block(blk.clone()));
    }
    for blk in &top.schedule_posedge_flip {
        steps.push(Step::Block(blk.clone()));
    }

    // Projection plus jump targets. A run of consecutive callee slots shares
    // one target: the projected index of the next real step.
    let mut projection: Vec<Step> = Vec::with_capacity(steps.len());
    let mut port_slots: Vec<PortSlot> = Vec::new();
    let mut pending: Vec<usize> = Vec::new();
    for (i, step) in steps.iter().enumerate() {
        match step {
            Step::Port(p) => {
                pending.push(port_slots.len());
                port_slots.push(PortSlot {
                    port: p.clone(),
                    orig_idx: i,
                    target_new: 0,
                });
            }
            _ => {
                for k in pending.drain(..) {
                    port_slots[k].target_new = projection.len();
                }
                projection.push(step.clone());
            }
        }
    }
    for k in pending.drain(..) {
        port_slots[k].target_new = projection.len();
    }

    debug!(
        schedule = steps.len(),
        projection = projection.len(),
        callee_slots = port_slots.len(),
        "schedule linked"
    );
    LinkedSchedule {
        steps,
        projection,
        port_slots,
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
    fn schedule_sections_come_in_fixed_order() {
        let mut top = SimTop::new("top");
        top.schedule_ff = vec![upblk("up_ff")];
        top.tracing_hooks = vec![upblk("vcd_hook")];
        top.schedule_posedge_flip = vec![upblk("up_flip")];
        top.line_trace = Some(Rc::new(|| String::new()));

        let config = ScheduleConfig {
            print_line_trace: true,
            ..ScheduleConfig::default()
        };
        let sweep = vec![Step::Block(upblk("up_a"))];
        let linked = link(&top, sweep, &config);
        let names: Vec<&str> = linked.steps.iter().map(Step::name).collect();
        assert_eq!(
            names,
            vec![
                "clear_cl_trace",
                "up_a",
                "print_line_trace",
                "up_ff",
                "vcd_hook",
                "up_flip"
            ]
        );
    }

    #[test]
    fn line_trace_is_omitted_unless_configured() {
        let mut top = SimTop::new("top");
        top.line_trace = Some(Rc::new(|| String::new()));
        let linked = link(&top, Vec::new(), &ScheduleConfig::default());
        assert!(linked.steps.iter().all(|s| s.name() != "print_line_trace"));
    }

    #[test]
    fn projection_filters_callee_slots_and_targets_collapse() {
        let top = SimTop::new("top");
        let sweep = vec![
            Step::Block(upblk("up_a")),
            Step::Port(port("enq_rdy")),
            Step::Port(port("enq")),
            Step::Block(upblk("up_b")),
            Step::Port(port("deq")),
        ];
        let linked = link(&top, sweep, &ScheduleConfig::default());

        // Full schedule: clear, up_a, enq_rdy, enq, up_b, deq.
        assert_eq!(linked.steps.len(), 6);
        assert_eq!(linked.projection.len(), 3);
        assert_eq!(
            linked.projection.len() + linked.port_slots.len(),
            linked.steps.len()
        );

        let slot = |n: &str| {
            linked
                .port_slots
                .iter()
                .find(|s| s.port.name() == n)
                .unwrap()
        };
        // Consecutive slots share the target of the next real step.
        assert_eq!(slot("enq_rdy").orig_idx, 2);
        assert_eq!(slot("enq_rdy").target_new, 2);
        assert_eq!(slot("enq").target_new, 2);
        // A tail slot jumps past the whole projection.
        assert_eq!(slot("deq").target_new, 3);
    }

    #[test]
    fn clear_cl_trace_resets_every_registered_port() {
        let p = port("enq");
        let mut top = SimTop::new("top");
        top.callee_ports = vec![p.clone()];
        let linked = link(&top, Vec::new(), &ScheduleConfig::default());

        p.call_direct(SignalValue::Void);
        assert!(p.called());
        linked.steps[0].run().unwrap();
        assert!(!p.called());
    }
}
