//! Executable handles: update blocks, callee ports, NB interfaces.
//!
//! Everything the scheduler places in a schedule is one of these handles.
//! Identity is by reference (`Rc` pointer), never by display name — two
//! blocks named `up_a` in different components are distinct vertices.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::value::SignalValue;

/// The body of an update block: a side-effect function over signals.
pub type UpblkFn = Box<dyn FnMut()>;

/// The body of a callee method: consumes arguments, produces a result.
pub type MethodFn = Box<dyn FnMut(SignalValue) -> SignalValue>;

// ============================================================================
// UpdateBlock
// ============================================================================

/// A side-effecting function executed once per cycle, in the order the
/// scheduler determines.
pub struct UpdateBlock {
    name: String,
    body: RefCell<UpblkFn>,
}

impl UpdateBlock {
    pub fn new(name: impl Into<String>, body: impl FnMut() + 'static) -> Rc<Self> {
        Rc::new(UpdateBlock {
            name: name.into(),
            body: RefCell::new(Box::new(body)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn run(&self) {
        (self.body.borrow_mut())()
    }
}

impl fmt::Debug for UpdateBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UpdateBlock").field(&self.name).finish()
    }
}

// ============================================================================
// CalleePort
// ============================================================================

/// An externally-callable entry point on the root component.
///
/// The scheduler gives each registered port a slot in the full schedule;
/// invoking the port through the compiled simulation advances the cursor to
/// that slot first. The registered method itself stays reachable through
/// [`CalleePort::call_direct`], which never touches the cursor.
///
/// Every invocation records a per-cycle call trace (`name(args) = result`)
/// for line tracing; the schedule's leading `clear_cl_trace` step resets it.
pub struct CalleePort {
    name: String,
    method: RefCell<MethodFn>,
    called: Cell<bool>,
    last_call: RefCell<Option<String>>,
}

impl CalleePort {
    pub fn new(
        name: impl Into<String>,
        method: impl FnMut(SignalValue) -> SignalValue + 'static,
    ) -> Rc<Self> {
        Rc::new(CalleePort {
            name: name.into(),
            method: RefCell::new(Box::new(method)),
            called: Cell::new(false),
            last_call: RefCell::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the registered method without consulting the schedule cursor.
    pub fn call_direct(&self, args: SignalValue) -> SignalValue {
        let result = (self.method.borrow_mut())(args.clone());
        self.called.set(true);
        *self.last_call.borrow_mut() = Some(format!("{}({}) = {}", self.name, args, result));
        result
    }

    /// Whether this port was invoked since the last `clear_cl_trace`.
    pub fn called(&self) -> bool {
        self.called.get()
    }

    /// The rendered call trace for the current cycle, if any.
    pub fn cl_trace(&self) -> Option<String> {
        self.last_call.borrow().clone()
    }

    pub(crate) fn clear_cl_trace(&self) {
        self.called.set(false);
        *self.last_call.borrow_mut() = None;
    }
}

impl fmt::Debug for CalleePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CalleePort").field(&self.name).finish()
    }
}

// ============================================================================
// NbInterface
// ============================================================================

/// A non-blocking callee interface: a method guarded by a ready predicate.
///
/// The scheduler inserts the implicit ordering edge `rdy → method` so a host
/// that polls `rdy` before calling `method` observes a consistent cycle.
#[derive(Clone)]
pub struct NbInterface {
    pub method: Rc<CalleePort>,
    pub rdy: Rc<CalleePort>,
}

impl NbInterface {
    pub fn new(method: Rc<CalleePort>, rdy: Rc<CalleePort>) -> Self {
        NbInterface { method, rdy }
    }
}

impl fmt::Debug for NbInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NbInterface")
            .field("method", &self.method.name())
            .field("rdy", &self.rdy.name())
            .finish()
    }
}

// ============================================================================
// Vertex
// ============================================================================

/// A schedulable vertex: an update block or a callee port (method or ready).
///
/// Equality and hashing go through the underlying handle pointer.
#[derive(Clone)]
pub enum Vertex {
    Upblk(Rc<UpdateBlock>),
    Port(Rc<CalleePort>),
}

impl Vertex {
    pub fn name(&self) -> &str {
        match self {
            Vertex::Upblk(b) => b.name(),
            Vertex::Port(p) => p.name(),
        }
    }

    pub fn is_port(&self) -> bool {
        matches!(self, Vertex::Port(_))
    }

    fn key(&self) -> usize {
        match self {
            Vertex::Upblk(b) => Rc::as_ptr(b) as usize,
            Vertex::Port(p) => Rc::as_ptr(p) as usize,
        }
    }
}

impl From<Rc<UpdateBlock>> for Vertex {
    fn from(blk: Rc<UpdateBlock>) -> Self {
        Vertex::Upblk(blk)
    }
}

impl From<Rc<CalleePort>> for Vertex {
    fn from(port: Rc<CalleePort>) -> Self {
        Vertex::Port(port)
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Vertex {}

impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.key());
    }
}

impl fmt::Debug for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vertex::Upblk(b) => write!(f, "Upblk({})", b.name()),
            Vertex::Port(p) => write!(f, "Port({})", p.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_identity_is_by_handle_not_name() {
        let a = UpdateBlock::new("up", || {});
        let b = UpdateBlock::new("up", || {});
        assert_ne!(Vertex::from(a.clone()), Vertex::from(b));
        assert_eq!(Vertex::from(a.clone()), Vertex::from(a));
    }

    #[test]
    fn call_direct_records_cl_trace() {
        let port = CalleePort::new("enq", |v| v);
        assert!(!port.called());

        port.call_direct(SignalValue::bits(8, 0x2a));
        assert!(port.called());
        assert_eq!(port.cl_trace().as_deref(), Some("enq(2a) = 2a"));

        port.clear_cl_trace();
        assert!(!port.called());
        assert_eq!(port.cl_trace(), None);
    }

    #[test]
    fn update_block_runs_its_body() {
        use std::cell::Cell;
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let blk = UpdateBlock::new("up_count", move || c.set(c.get() + 1));
        blk.run();
        blk.run();
        assert_eq!(count.get(), 2);
    }
}
