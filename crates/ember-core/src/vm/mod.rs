//! Virtual machine context
//!
//! [`Vm`] owns the heap, the operand stack, the handler stack and the string
//! table of one single-threaded runtime. The object-model operations live in
//! the submodules as `impl Vm` blocks:
//!
//! - `binding`: class definition and member binding
//! - `instantiate`: instance chains and constructor lookup
//! - `resolve`: member resolution, read and write
//! - `protected`: protected execution regions
//! - `rooting`: the allocation rooting guard

mod binding;
mod executor;
mod instantiate;
mod options;
mod protected;
mod resolve;
mod rooting;

pub use executor::{ClosureExecutor, NoopExecutor};
pub use options::VmOptions;
pub use protected::{ExceptFrame, HandlerStack};
pub use rooting::Rooted;

use crate::gc::{GarbageCollector, GcRef, Heap, HeapObject};
use crate::stack::Stack;
use crate::string::{StringTable, Symbol};
use crate::value::Value;
use crate::{Status, VmError, VmResult};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Pending exception raised by user code
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exception {
    /// Exception kind (usually a string such as `"value_error"`)
    pub kind: Value,
    /// Message or payload
    pub message: Value,
}

/// Ember virtual machine
pub struct Vm {
    /// Heap and collector
    gc: GarbageCollector,

    /// Operand stack and call frames
    stack: Stack,

    /// Protected region frames
    handlers: HandlerStack,

    /// Interned strings
    strings: StringTable,

    /// Global variables (GC roots)
    globals: FxHashMap<Symbol, Value>,

    /// Exception raised by the last throw, if not yet handled
    exception: Option<Exception>,

    /// Bridge to the bytecode interpreter
    executor: Rc<dyn ClosureExecutor>,

    /// Instruction pointer of the running function
    ip: usize,

    /// Options the VM was created with
    options: VmOptions,
}

impl Vm {
    /// Create a VM with default options
    pub fn new() -> Self {
        Self::with_options(VmOptions::default())
    }

    /// Create a VM with explicit options
    pub fn with_options(options: VmOptions) -> Self {
        Self {
            gc: GarbageCollector::new(
                options.gc_threshold,
                options.max_heap_objects,
                options.gc_stress,
            ),
            stack: Stack::with_capacity(options.max_stack_slots),
            handlers: HandlerStack::new(),
            strings: StringTable::new(),
            globals: FxHashMap::default(),
            exception: None,
            executor: Rc::new(NoopExecutor),
            ip: 0,
            options,
        }
    }

    /// Attach the interpreter that runs closures
    pub fn set_executor(&mut self, executor: Rc<dyn ClosureExecutor>) {
        self.executor = executor;
    }

    /// Options the VM was created with
    pub fn options(&self) -> &VmOptions {
        &self.options
    }

    // ========================================================================
    // Memory
    // ========================================================================

    /// Collector
    pub fn gc(&self) -> &GarbageCollector {
        &self.gc
    }

    /// Collector, mutably
    pub fn gc_mut(&mut self) -> &mut GarbageCollector {
        &mut self.gc
    }

    /// Heap
    pub fn heap(&self) -> &Heap {
        self.gc.heap()
    }

    /// Heap, mutably
    pub fn heap_mut(&mut self) -> &mut Heap {
        self.gc.heap_mut()
    }

    /// Allocate a heap object, collecting first when the collector asks for it
    ///
    /// Every object the caller built but has not yet made reachable must be
    /// rooted before calling this. Throws [`Status::MallocFail`] when the heap
    /// limit is still exceeded after a full collection.
    pub fn alloc(&mut self, object: HeapObject) -> VmResult<GcRef> {
        if self.gc.should_collect() {
            self.collect_garbage();
        }

        match self.gc.allocate(object) {
            Ok(r) => Ok(r),
            Err(object) => {
                self.collect_garbage();
                self.gc
                    .allocate(object)
                    .map_err(|_| self.throw(Status::MallocFail))
            }
        }
    }

    /// Run a full collection; returns the number of objects freed
    pub fn collect_garbage(&mut self) -> usize {
        let mut external: Vec<Value> = self.stack.iter_values().collect();
        external.extend(self.globals.values().copied());
        if let Some(exception) = self.exception {
            external.push(exception.kind);
            external.push(exception.message);
        }

        self.gc.collect(external)
    }

    // ========================================================================
    // Stack
    // ========================================================================

    /// Operand stack
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Operand stack, mutably
    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    /// Instruction pointer
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Set the instruction pointer (maintained by the interpreter)
    pub fn set_ip(&mut self, ip: usize) {
        self.ip = ip;
    }

    // ========================================================================
    // Strings and globals
    // ========================================================================

    /// Intern a string
    pub fn intern(&mut self, s: &str) -> Symbol {
        self.strings.intern(s)
    }

    /// Intern a string as a value
    pub fn str_value(&mut self, s: &str) -> Value {
        Value::Str(self.strings.intern(s))
    }

    /// Resolve an interned string
    pub fn string(&self, sym: Symbol) -> Option<&str> {
        self.strings.resolve(sym)
    }

    /// Define or overwrite a global
    pub fn set_global(&mut self, name: &str, value: Value) {
        let name = self.strings.intern(name);
        self.globals.insert(name, value);
    }

    /// Read a global
    pub fn global(&self, name: &str) -> Option<Value> {
        self.strings
            .lookup(name)
            .and_then(|sym| self.globals.get(&sym).copied())
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// Pending exception
    pub fn exception(&self) -> Option<&Exception> {
        self.exception.as_ref()
    }

    /// Take the pending exception, marking it handled
    pub fn take_exception(&mut self) -> Option<Exception> {
        self.exception.take()
    }

    /// Raise a user exception and throw it toward the nearest region
    ///
    /// ```ignore
    /// return Err(vm.raise("value_error", "negative age"));
    /// ```
    pub fn raise(&mut self, kind: &str, message: &str) -> VmError {
        let kind = self.str_value(kind);
        let message = self.str_value(message);
        self.exception = Some(Exception { kind, message });
        self.throw(Status::Exception)
    }

    /// Report a parse error and throw it toward the nearest region
    ///
    /// [`Vm::protected_parse`] records the error as a `syntax_error` exception
    /// when it receives it.
    pub fn syntax_error(&mut self, source_name: &str, line: u32, message: &str) -> VmError {
        self.propagate(VmError::Syntax {
            source_name: source_name.to_string(),
            line,
            message: message.to_string(),
        })
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call a callable with `args`
    ///
    /// A call frame holding the arguments as locals is pushed for the duration
    /// of the call. When the call fails the frame is left in place; the
    /// protected region receiving the error discards it.
    pub fn call(&mut self, callee: Value, args: &[Value]) -> VmResult<Value> {
        match callee {
            Value::Class(class) => self.construct(class, args),
            Value::Native(function) => self.in_frame(callee, args, |vm| function.call(vm, args)),
            Value::Closure(closure) => {
                let executor = Rc::clone(&self.executor);
                self.in_frame(callee, args, |vm| executor.execute(vm, closure, args))
            }
            other => Err(VmError::TypeError(format!(
                "'{}' value is not callable",
                other.type_name()
            ))),
        }
    }

    fn in_frame<F>(&mut self, callee: Value, args: &[Value], f: F) -> VmResult<Value>
    where
        F: FnOnce(&mut Vm) -> VmResult<Value>,
    {
        let return_ip = self.ip;
        self.stack
            .push_frame(callee, return_ip, args.len(), args.len())?;
        for (index, arg) in args.iter().enumerate() {
            self.stack.store_local(index, *arg)?;
        }

        let result = f(self)?;
        self.stack.pop_frame()?;
        self.ip = return_ip;
        Ok(result)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::NativeFn;

    fn add(_vm: &mut Vm, args: &[Value]) -> VmResult<Value> {
        match (args[0], args[1]) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            _ => Err(VmError::TypeError("expected ints".to_string())),
        }
    }

    fn depth(vm: &mut Vm, _args: &[Value]) -> VmResult<Value> {
        Ok(Value::Int(vm.stack().frame_count() as i64))
    }

    #[test]
    fn test_vm_creation() {
        let vm = Vm::new();
        assert_eq!(vm.stack().depth(), 0);
        assert_eq!(vm.handlers().len(), 0);
        assert_eq!(vm.heap().live_count(), 0);
        assert!(vm.exception().is_none());
    }

    #[test]
    fn test_globals() {
        let mut vm = Vm::new();
        assert_eq!(vm.global("answer"), None);

        vm.set_global("answer", Value::Int(42));
        assert_eq!(vm.global("answer"), Some(Value::Int(42)));
    }

    #[test]
    fn test_call_native() {
        let mut vm = Vm::new();
        let result = vm
            .call(Value::Native(NativeFn(add)), &[Value::Int(2), Value::Int(3)])
            .unwrap();

        assert_eq!(result, Value::Int(5));
        assert_eq!(vm.stack().frame_count(), 0);
        assert_eq!(vm.stack().depth(), 0);
    }

    #[test]
    fn test_call_pushes_frame() {
        let mut vm = Vm::new();
        let result = vm.call(Value::Native(NativeFn(depth)), &[]).unwrap();
        assert_eq!(result, Value::Int(1));
    }

    #[test]
    fn test_call_not_callable() {
        let mut vm = Vm::new();
        let result = vm.call(Value::Int(1), &[]);
        assert!(matches!(result, Err(VmError::TypeError(_))));
    }

    #[test]
    fn test_call_closure_without_executor() {
        let mut vm = Vm::new();
        let name = vm.intern("f");
        let proto = Rc::new(crate::object::Proto::new(name, 0));
        let closure = vm.new_closure(proto).unwrap();

        let result = vm.call(Value::Closure(closure), &[]);
        assert!(matches!(result, Err(VmError::RuntimeError(_))));
    }

    #[test]
    fn test_raise_without_region_is_fatal() {
        let mut vm = Vm::new();
        let error = vm.raise("value_error", "bad");

        assert!(matches!(error, VmError::Fatal(Status::Exception)));
        let exception = vm.exception().copied().unwrap();
        assert_eq!(exception.kind, vm.str_value("value_error"));
        assert_eq!(exception.message, vm.str_value("bad"));
    }

    #[test]
    fn test_syntax_error_leaves_no_pending_exception() {
        let mut vm = Vm::new();
        let error = vm.syntax_error("input", 2, "unexpected ')'");

        assert!(matches!(error, VmError::Fatal(Status::SyntaxError)));
        assert!(vm.exception().is_none());
    }

    #[test]
    fn test_heap_limit_throws_malloc_fail() {
        let mut vm = Vm::with_options(VmOptions::default().with_heap_limit(1));
        let name = vm.intern("A");
        let first = vm
            .alloc(HeapObject::Class(crate::object::Class::new(name, None)))
            .unwrap();
        vm.set_global("A", Value::Class(first));

        let result = vm.alloc(HeapObject::Class(crate::object::Class::new(name, None)));
        assert!(matches!(result, Err(VmError::Fatal(Status::MallocFail))));
    }
}
