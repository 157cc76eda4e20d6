//! Closure executor trait
//!
//! The bytecode dispatch loop lives outside this crate. [`Vm::call`] hands
//! every closure to the executor attached with [`Vm::set_executor`], which
//! keeps the object model independent of any particular interpreter.

use super::Vm;
use crate::gc::GcRef;
use crate::value::Value;
use crate::{VmError, VmResult};

/// Runs closures on behalf of the VM
///
/// When `execute` is entered, a call frame for `closure` holding `args` as its
/// locals has already been pushed; the executor must not pop it. Errors are
/// returned as-is and travel to the nearest protected region.
pub trait ClosureExecutor {
    /// Run `closure` with `args` and return its result
    fn execute(&self, vm: &mut Vm, closure: GcRef, args: &[Value]) -> VmResult<Value>;
}

/// Executor that rejects every closure
///
/// Installed by default so native-only embeddings need no interpreter.
pub struct NoopExecutor;

impl ClosureExecutor for NoopExecutor {
    fn execute(&self, vm: &mut Vm, closure: GcRef, _args: &[Value]) -> VmResult<Value> {
        let name = vm.heap().closure(closure)?.proto().name();
        Err(VmError::RuntimeError(format!(
            "no interpreter attached to run '{}'",
            vm.string(name).unwrap_or("?")
        )))
    }
}
