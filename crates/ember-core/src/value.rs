//! Value representation
//!
//! Values are small `Copy` tagged variants. Immediate data (nil, booleans,
//! numbers, interned strings, native functions) is stored inline; heap objects
//! are referenced through generational [`GcRef`] handles into the VM heap.
//!
//! # Variants
//!
//! ```text
//! Nil | Bool | Int | Real | Str(Symbol)      inline
//! Native(NativeFn)                            host function pointer
//! Class | Instance | Closure (GcRef)          heap handle, traced by the GC
//! ```

use crate::gc::GcRef;
use crate::object::NativeFn;
use crate::string::Symbol;
use std::fmt;

/// Tagged value
#[derive(Clone, Copy, PartialEq)]
pub enum Value {
    /// Absent value; fresh instance slots hold nil
    Nil,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Real(f64),
    /// Interned string
    Str(Symbol),
    /// Host-provided native function
    Native(NativeFn),
    /// Class object
    Class(GcRef),
    /// Instance segment (the most-derived one when held by user code)
    Instance(GcRef),
    /// Closure
    Closure(GcRef),
}

impl Value {
    /// Check if this value is nil
    #[inline]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check if this value can be invoked
    #[inline]
    pub const fn is_callable(&self) -> bool {
        matches!(self, Value::Native(_) | Value::Closure(_) | Value::Class(_))
    }

    /// Heap handle, if this value refers to a heap object
    #[inline]
    pub const fn heap_ref(&self) -> Option<GcRef> {
        match self {
            Value::Class(r) | Value::Instance(r) | Value::Closure(r) => Some(*r),
            _ => None,
        }
    }

    /// Extract boolean value
    #[inline]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract integer value
    #[inline]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract interned string
    #[inline]
    pub const fn as_str(&self) -> Option<Symbol> {
        match self {
            Value::Str(s) => Some(*s),
            _ => None,
        }
    }

    /// Extract instance handle
    #[inline]
    pub const fn as_instance(&self) -> Option<GcRef> {
        match self {
            Value::Instance(r) => Some(*r),
            _ => None,
        }
    }

    /// Extract closure handle
    #[inline]
    pub const fn as_closure(&self) -> Option<GcRef> {
        match self {
            Value::Closure(r) => Some(*r),
            _ => None,
        }
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Real(r) => *r != 0.0,
            _ => true,
        }
    }

    /// Get type name for debugging
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Real(_) => "real",
            Value::Str(_) => "string",
            Value::Native(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Closure(_) => "function",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "bool({})", b),
            Value::Int(i) => write!(f, "int({})", i),
            Value::Real(r) => write!(f, "real({})", r),
            Value::Str(s) => write!(f, "str({})", s.index()),
            Value::Native(n) => write!(f, "{:?}", n),
            Value::Class(r) => write!(f, "class({})", r),
            Value::Instance(r) => write!(f, "instance({})", r),
            Value::Closure(r) => write!(f, "closure({})", r),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Str(s) => write!(f, "<string#{}>", s.index()),
            Value::Native(_) => write!(f, "<native>"),
            Value::Class(r) => write!(f, "<class{}>", r),
            Value::Instance(r) => write!(f, "<instance{}>", r),
            Value::Closure(r) => write!(f, "<function{}>", r),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}
