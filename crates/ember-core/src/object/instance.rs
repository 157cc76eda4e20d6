//! Instance segments

use crate::gc::GcRef;
use crate::value::Value;
use crate::{VmError, VmResult};

/// One segment of an instance chain
///
/// A segment holds the slots of exactly one class level and owns the segment
/// built for the superclass.
#[derive(Debug, Clone)]
pub struct Instance {
    class: GcRef,
    superinstance: Option<GcRef>,
    slots: Vec<Value>,
}

impl Instance {
    /// Create a segment with nil slots
    pub fn new(class: GcRef, slot_count: usize) -> Self {
        Self {
            class,
            superinstance: None,
            slots: vec![Value::Nil; slot_count],
        }
    }

    /// Class level this segment was built for
    pub fn class(&self) -> GcRef {
        self.class
    }

    /// Segment built for the superclass
    pub fn superinstance(&self) -> Option<GcRef> {
        self.superinstance
    }

    /// Link the superclass segment
    pub fn set_superinstance(&mut self, superinstance: Option<GcRef>) {
        self.superinstance = superinstance;
    }

    /// All slots
    pub fn slots(&self) -> &[Value] {
        &self.slots
    }

    /// Get a slot value
    pub fn slot(&self, index: usize) -> VmResult<Value> {
        self.slots.get(index).copied().ok_or_else(|| {
            VmError::RuntimeError(format!(
                "Slot index {} out of bounds (segment has {} slots)",
                index,
                self.slots.len()
            ))
        })
    }

    /// Set a slot value
    pub fn set_slot(&mut self, index: usize, value: Value) -> VmResult<()> {
        let len = self.slots.len();
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(VmError::RuntimeError(format!(
                "Slot index {} out of bounds (segment has {} slots)",
                index, len
            ))),
        }
    }

    /// Number of slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

/// Result of reading a member through an instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup {
    /// Name is not bound anywhere in the chain
    NotFound,
    /// Data member value
    Data(Value),
    /// Callable bound to the instance (closure or native function)
    Method(Value),
}

impl Lookup {
    /// Check if the member was found
    pub fn is_found(&self) -> bool {
        !matches!(self, Lookup::NotFound)
    }

    /// The value found, data or method
    pub fn value(&self) -> Option<Value> {
        match self {
            Lookup::NotFound => None,
            Lookup::Data(value) | Lookup::Method(value) => Some(*value),
        }
    }
}
