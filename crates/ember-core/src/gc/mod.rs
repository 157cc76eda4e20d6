//! Garbage collection system
//!
//! This module provides the heap and the mark-sweep collector for the Ember VM.
//!
//! # Architecture
//!
//! - **GcRef**: generational handle to a heap cell (index + generation)
//! - **HeapObject**: the closed set of heap-allocated object kinds
//! - **Heap**: arena of cells with a free list and an optional object limit
//! - **RootSet**: LIFO stack of transient roots for objects under construction
//! - **GarbageCollector**: mark-sweep collection from the roots
//!
//! # Rooting contract
//!
//! No allocation may run while an allocated-but-unreachable object has no path
//! from a root. Objects built in several steps are pushed onto the
//! [`RootSet`] first (see [`crate::vm::Rooted`]) and popped in reverse order
//! once they are linked into something the caller already holds.
//!
//! A handle whose cell was swept is detected by its generation and reported as
//! [`crate::VmError::InvalidReference`] instead of aliasing a newer object.

mod collector;
mod heap;
mod roots;

pub use collector::{GarbageCollector, GcStats, HeapStats};
pub use heap::Heap;
pub use roots::RootSet;

use crate::object::{Class, Closure, Instance};
use crate::value::Value;
use std::fmt;

/// Handle to a heap cell
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GcRef {
    index: u32,
    generation: u32,
}

impl GcRef {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Cell index
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the cell when this handle was issued
    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for GcRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Heap-allocated object
#[derive(Debug)]
pub enum HeapObject {
    /// Class template
    Class(Class),
    /// Instance segment
    Instance(Instance),
    /// Closure
    Closure(Closure),
}

impl HeapObject {
    /// Object kind name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            HeapObject::Class(_) => "class",
            HeapObject::Instance(_) => "instance",
            HeapObject::Closure(_) => "closure",
        }
    }

    /// Push every heap handle this object references onto `out`
    pub fn trace(&self, out: &mut Vec<GcRef>) {
        match self {
            HeapObject::Class(class) => {
                out.extend(class.superclass());
                out.extend(class.shared_methods());
            }
            HeapObject::Instance(instance) => {
                out.push(instance.class());
                out.extend(instance.superinstance());
                out.extend(instance.slots().iter().filter_map(Value::heap_ref));
            }
            HeapObject::Closure(closure) => {
                out.extend(closure.upvals().iter().filter_map(Value::heap_ref));
            }
        }
    }
}
