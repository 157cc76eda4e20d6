//! Ember VM Core Runtime
//!
//! This crate provides the object model and error-propagation core of the
//! Ember virtual machine:
//! - Classes, instance chains and member resolution
//! - Shared, deferred (per-instance) and primitive method binding
//! - Arena heap with a mark-sweep collector and a LIFO rooting discipline
//! - Protected execution regions for recovering from thrown errors
//!
//! The bytecode dispatch loop and the parser live outside this crate; they
//! plug in through [`vm::ClosureExecutor`] and [`Vm::protected_parse`].

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod gc;
pub mod object;
pub mod stack;
pub mod string;
pub mod value;
pub mod vm;

pub use gc::{GarbageCollector, GcRef, GcStats, Heap, HeapObject, HeapStats, RootSet};
pub use object::{Class, Closure, Instance, Lookup, Member, MemberKind, NativeFn, Proto, UpvalDesc};
pub use stack::{CallFrame, Stack};
pub use string::{StringTable, Symbol};
pub use value::Value;
pub use vm::{
    ClosureExecutor, ExceptFrame, Exception, HandlerStack, NoopExecutor, Rooted, Vm, VmOptions,
};

/// Status code carried by a thrown error
///
/// The discriminants are stable and may be handed to embedders as plain
/// integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[repr(i32)]
pub enum Status {
    /// Completed without error
    #[error("ok")]
    Ok = 0,

    /// Program requested termination
    #[error("exit")]
    Exit = 1,

    /// Host allocation failed or the heap limit was reached
    #[error("memory allocation failed")]
    MallocFail = 2,

    /// User-raised exception (catchable by except blocks)
    #[error("exception")]
    Exception = 3,

    /// Load-time syntax error
    #[error("syntax error")]
    SyntaxError = 4,

    /// Internal runtime failure
    #[error("execution error")]
    ExecError = 5,

    /// I/O failure reported by a host collaborator
    #[error("i/o error")]
    IoError = 6,
}

impl Status {
    /// Raw integer code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Check if this status means success
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

/// VM execution errors
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    /// Stack overflow
    #[error("Stack overflow")]
    StackOverflow,

    /// Stack underflow
    #[error("Stack underflow")]
    StackUnderflow,

    /// Heap reference does not point at a live object
    #[error("Invalid heap reference {0}")]
    InvalidReference(GcRef),

    /// Type error
    #[error("Type error: {0}")]
    TypeError(String),

    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    /// Member re-bound while strict redefinition checks are enabled
    #[error("Member '{member}' is already defined in class '{class}'")]
    Redefinition {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Syntax error reported by the parser
    #[error("{source_name}:{line}: {message}")]
    Syntax {
        /// Source file or chunk name
        source_name: String,
        /// Line number (1-based)
        line: u32,
        /// Parser message
        message: String,
    },

    /// Invalid VM options
    #[error("Invalid VM options: {0}")]
    Options(#[from] toml::de::Error),

    /// Error thrown toward the nearest protected region
    #[error("Thrown: {0}")]
    Thrown(Status),

    /// Error thrown with no protected region installed
    #[error("Uncaught {0}: no protected region to recover to")]
    Fatal(Status),
}

impl VmError {
    /// Status code delivered to the protected region that receives this error
    pub fn status(&self) -> Status {
        match self {
            VmError::Thrown(status) | VmError::Fatal(status) => *status,
            VmError::Syntax { .. } => Status::SyntaxError,
            VmError::StackOverflow
            | VmError::StackUnderflow
            | VmError::InvalidReference(_)
            | VmError::TypeError(_)
            | VmError::RuntimeError(_)
            | VmError::Redefinition { .. }
            | VmError::Options(_) => Status::ExecError,
        }
    }

    /// Check if no protected region could receive this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, VmError::Fatal(_))
    }
}

/// VM execution result
pub type VmResult<T> = Result<T, VmError>;
