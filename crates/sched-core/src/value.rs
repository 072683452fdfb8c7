//! Signal values and trigger-variable handles.
//!
//! The scheduler never declares signals itself — the DAG-builder collaborator
//! hands over [`SignalRef`] watch handles for the signals whose stability
//! decides whether a combinational cycle has converged. [`Signal`] is the thin
//! cell this crate offers collaborators (and its own tests) for backing those
//! handles; any other storage works as long as it can produce a read closure.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

// ============================================================================
// SignalValue
// ============================================================================

/// A value observed on a signal.
///
/// Snapshot semantics follow the variable kind: fixed-width integers are
/// copied by value, records are cloned structurally, and everything else is
/// carried as a JSON tree and deep-copied. Convergence checks compare with
/// structural equality, so `Clone` + `PartialEq` are the whole contract.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalValue {
    /// No payload. Used for argument-less method invocations.
    Void,
    /// Fixed-width integer signal. `value` is truncated to `width` bits by
    /// [`SignalValue::bits`].
    Bits { width: u32, value: u64 },
    /// Single-bit predicate, e.g. a ready flag.
    Bool(bool),
    /// Structured record with named fields, in declaration order.
    Record(Vec<(String, SignalValue)>),
    /// Anything else the collaborator wants to carry through unchanged.
    Opaque(serde_json::Value),
}

impl SignalValue {
    /// A `width`-bit integer value. Bits above `width` are masked off.
    pub fn bits(width: u32, value: u64) -> Self {
        let masked = if width >= 64 {
            value
        } else {
            value & ((1u64 << width) - 1)
        };
        SignalValue::Bits {
            width,
            value: masked,
        }
    }

    /// The integer payload, if this is a `Bits` value.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SignalValue::Bits { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// The boolean payload, if this is a `Bool` value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SignalValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Void => Ok(()),
            SignalValue::Bits { width, value } => {
                let nibbles = (*width as usize + 3) / 4;
                write!(f, "{:0nibbles$x}", value, nibbles = nibbles.max(1))
            }
            SignalValue::Bool(b) => write!(f, "{}", u8::from(*b)),
            SignalValue::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            SignalValue::Opaque(v) => write!(f, "{}", v),
        }
    }
}

impl fmt::Debug for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Void => write!(f, "Void"),
            SignalValue::Bits { width, value } => write!(f, "Bits{}({:#x})", width, value),
            SignalValue::Bool(b) => write!(f, "Bool({})", b),
            SignalValue::Record(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, v)| (k, v)))
                .finish(),
            SignalValue::Opaque(v) => write!(f, "Opaque({})", v),
        }
    }
}

// ============================================================================
// SignalRef
// ============================================================================

/// A trigger-variable watch handle: a named read closure.
///
/// Fixed-point super-blocks snapshot the value before an iteration and
/// compare after it; the closure must return an owned copy of the current
/// value. Identity is by handle (the shared read closure), not by name, so
/// two watches over distinct signals that happen to share a display name are
/// still distinct trigger variables.
#[derive(Clone)]
pub struct SignalRef {
    name: Rc<str>,
    read: Rc<dyn Fn() -> SignalValue>,
}

impl SignalRef {
    /// Wrap an arbitrary read closure.
    pub fn new(name: impl Into<String>, read: impl Fn() -> SignalValue + 'static) -> Self {
        SignalRef {
            name: Rc::from(name.into()),
            read: Rc::new(read),
        }
    }

    fn from_cell(name: Rc<str>, cell: Rc<RefCell<SignalValue>>) -> Self {
        SignalRef {
            name,
            read: Rc::new(move || cell.borrow().clone()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the current value as an owned copy.
    pub fn snapshot(&self) -> SignalValue {
        (self.read)()
    }

    pub(crate) fn key(&self) -> usize {
        Rc::as_ptr(&self.read) as *const () as usize
    }
}

impl fmt::Debug for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignalRef").field(&self.name).finish()
    }
}

// ============================================================================
// Signal
// ============================================================================

/// A named mutable cell holding a [`SignalValue`].
///
/// Cloning a `Signal` shares the underlying cell — the clone is another
/// handle to the same signal, which is how update blocks capture the signals
/// they read and write. [`Signal::watch`] returns the signal's stable
/// [`SignalRef`]; every watch of the same signal compares equal by handle
/// identity.
#[derive(Clone)]
pub struct Signal {
    name: Rc<str>,
    cell: Rc<RefCell<SignalValue>>,
    watch: SignalRef,
}

impl Signal {
    pub fn new(name: impl Into<String>, init: SignalValue) -> Self {
        let name: Rc<str> = Rc::from(name.into());
        let cell = Rc::new(RefCell::new(init));
        let watch = SignalRef::from_cell(name.clone(), cell.clone());
        Signal { name, cell, watch }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> SignalValue {
        self.cell.borrow().clone()
    }

    pub fn set(&self, value: SignalValue) {
        *self.cell.borrow_mut() = value;
    }

    /// The stable watch handle for this signal.
    pub fn watch(&self) -> SignalRef {
        self.watch.clone()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("value", &*self.cell.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_masked_to_width() {
        assert_eq!(SignalValue::bits(4, 0x1f).as_u64(), Some(0xf));
        assert_eq!(SignalValue::bits(64, u64::MAX).as_u64(), Some(u64::MAX));
    }

    #[test]
    fn display_formats_bits_as_hex_nibbles() {
        assert_eq!(SignalValue::bits(8, 0x0a).to_string(), "0a");
        assert_eq!(SignalValue::bits(1, 1).to_string(), "1");
        assert_eq!(SignalValue::Bool(true).to_string(), "1");
    }

    #[test]
    fn record_equality_is_structural() {
        let a = SignalValue::Record(vec![("x".into(), SignalValue::bits(8, 3))]);
        let b = SignalValue::Record(vec![("x".into(), SignalValue::bits(8, 3))]);
        let c = SignalValue::Record(vec![("x".into(), SignalValue::bits(8, 4))]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn watch_handles_of_one_signal_share_identity() {
        let s = Signal::new("x", SignalValue::bits(8, 0));
        assert_eq!(s.watch().key(), s.watch().key());

        let t = Signal::new("x", SignalValue::bits(8, 0));
        assert_ne!(s.watch().key(), t.watch().key());
    }

    #[test]
    fn snapshot_is_an_owned_copy() {
        let s = Signal::new("x", SignalValue::bits(8, 1));
        let snap = s.watch().snapshot();
        s.set(SignalValue::bits(8, 2));
        assert_eq!(snap, SignalValue::bits(8, 1));
        assert_eq!(s.watch().snapshot(), SignalValue::bits(8, 2));
    }
}
