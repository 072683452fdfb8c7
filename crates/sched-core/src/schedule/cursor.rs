//! Cursor-driven execution of the linked schedule.
//!
//! The compiled simulation owns the projection and a two-counter cursor:
//! `new_idx` walks the projection, `orig_idx` walks the full schedule.
//! Invoking a wrapped method advances the projection to the method's jump
//! target, runs the method, and leaves the cursor parked just past the
//! method's slot. A method whose slot already passed this cycle finishes the
//! cycle first and wraps.
//!
//! The cursor belongs to this simulation handle alone; independently
//! compiled roots never share state.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::block::{CalleePort, NbInterface, Vertex};
use crate::error::ScheduleError;
use crate::schedule::linker::{LinkedSchedule, PortSlot, Step};
use crate::value::SignalValue;

#[derive(Clone, Copy, Default)]
struct Cursor {
    new_idx: usize,
    orig_idx: usize,
}

struct SimInner {
    name: String,
    projection: Vec<Step>,
    schedule_names: Vec<String>,
    slots: Vec<PortSlot>,
    slot_of: HashMap<Vertex, usize>,
    nb_ifcs: Vec<NbInterface>,
    cursor: RefCell<Cursor>,
    num_cycles: Cell<u64>,
}

/// A compiled open-loop simulation: the schedule, the projection, and the
/// cursor, installed over the root that was handed to the scheduler.
///
/// Cloning is cheap and shares the underlying state.
#[derive(Clone)]
pub struct OpenLoopSim {
    inner: Rc<SimInner>,
}

impl OpenLoopSim {
    pub(crate) fn install(name: String, nb_ifcs: Vec<NbInterface>, linked: LinkedSchedule) -> Self {
        let schedule_names = linked.steps.iter().map(|s| s.name().to_string()).collect();
        let slot_of = linked
            .port_slots
            .iter()
            .enumerate()
            .map(|(k, slot)| (Vertex::from(slot.port.clone()), k))
            .collect();
        OpenLoopSim {
            inner: Rc::new(SimInner {
                name,
                projection: linked.projection,
                schedule_names,
                slots: linked.port_slots,
                slot_of,
                nb_ifcs,
                cursor: RefCell::new(Cursor::default()),
                num_cycles: Cell::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Run one full cycle: the projection from the current cursor to the
    /// end, then reset and count the cycle.
    pub fn tick(&self) -> Result<(), ScheduleError> {
        self.advance_to(self.inner.projection.len())?;
        self.wrap_cycle();
        Ok(())
    }

    pub fn num_cycles_executed(&self) -> u64 {
        self.inner.num_cycles.get()
    }

    /// The cursor as `(new_idx, orig_idx)`.
    pub fn cursor(&self) -> (usize, usize) {
        let c = self.inner.cursor.borrow();
        (c.new_idx, c.orig_idx)
    }

    /// Display names of the full schedule, callee slots included.
    pub fn schedule_names(&self) -> &[String] {
        &self.inner.schedule_names
    }

    pub fn projection_len(&self) -> usize {
        self.inner.projection.len()
    }

    /// NB interfaces of the root, in discovery order.
    pub fn top_level_nb_ifcs(&self) -> &[NbInterface] {
        &self.inner.nb_ifcs
    }

    /// The cursor-aware wrapper for a scheduled callee port, or `None` if
    /// the port is not part of this schedule.
    pub fn method(&self, port: &Rc<CalleePort>) -> Option<MethodHandle> {
        let slot = *self.inner.slot_of.get(&Vertex::from(port.clone()))?;
        Some(MethodHandle {
            sim: self.clone(),
            slot,
        })
    }

    /// Invoke a scheduled callee port through its wrapper.
    pub fn call(
        &self,
        port: &Rc<CalleePort>,
        args: SignalValue,
    ) -> Result<SignalValue, ScheduleError> {
        let slot = self
            .inner
            .slot_of
            .get(&Vertex::from(port.clone()))
            .copied()
            .ok_or_else(|| {
                ScheduleError::invariant(format!("port '{}' is not in the schedule", port.name()))
            })?;
        self.call_slot(slot, args)
    }

    fn advance_to(&self, target: usize) -> Result<(), ScheduleError> {
        loop {
            let i = self.inner.cursor.borrow().new_idx;
            if i >= target {
                return Ok(());
            }
            self.inner.projection[i].run()?;
            self.inner.cursor.borrow_mut().new_idx = i + 1;
        }
    }

    fn wrap_cycle(&self) {
        {
            let mut c = self.inner.cursor.borrow_mut();
            c.new_idx = 0;
            c.orig_idx = 0;
        }
        self.inner.num_cycles.set(self.inner.num_cycles.get() + 1);
    }

    fn call_slot(&self, slot: usize, args: SignalValue) -> Result<SignalValue, ScheduleError> {
        let (my_idx, target) = {
            let s = &self.inner.slots[slot];
            (s.orig_idx, s.target_new)
        };

        // Strictly greater: a second callee at the same projection index
        // stays within the current cycle.
        if self.inner.cursor.borrow().orig_idx > my_idx {
            self.advance_to(self.inner.projection.len())?;
            self.wrap_cycle();
        }

        self.advance_to(target)?;
        self.inner.cursor.borrow_mut().orig_idx = my_idx + 1;
        Ok(self.inner.slots[slot].port.call_direct(args))
    }
}

impl fmt::Debug for OpenLoopSim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (new_idx, orig_idx) = self.cursor();
        f.debug_struct("OpenLoopSim")
            .field("name", &self.inner.name)
            .field("schedule", &self.inner.schedule_names.len())
            .field("projection", &self.inner.projection.len())
            .field("cursor", &(new_idx, orig_idx))
            .field("num_cycles", &self.inner.num_cycles.get())
            .finish()
    }
}

/// A cursor-aware handle to one scheduled callee port.
#[derive(Clone)]
pub struct MethodHandle {
    sim: OpenLoopSim,
    slot: usize,
}

impl MethodHandle {
    pub fn name(&self) -> &str {
        self.sim.inner.slots[self.slot].port.name()
    }

    /// Advance the cycle to this method's slot and invoke it.
    pub fn call(&self, args: SignalValue) -> Result<SignalValue, ScheduleError> {
        self.sim.call_slot(self.slot, args)
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MethodHandle").field(&self.name()).finish()
    }
}
