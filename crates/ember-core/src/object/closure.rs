//! Function prototypes, closures and native functions

use crate::string::Symbol;
use crate::value::Value;
use crate::vm::Vm;
use crate::VmResult;
use std::fmt;
use std::rc::Rc;

/// Where a captured upvalue comes from when a closure is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpvalDesc {
    /// Capture a local of the enclosing frame (otherwise an upvalue of the
    /// enclosing closure)
    pub in_stack: bool,
    /// Local or upvalue index
    pub index: u8,
}

impl UpvalDesc {
    /// Capture local `index` of the enclosing frame
    pub const fn local(index: u8) -> Self {
        Self {
            in_stack: true,
            index,
        }
    }

    /// Capture upvalue `index` of the enclosing closure
    pub const fn upvalue(index: u8) -> Self {
        Self {
            in_stack: false,
            index,
        }
    }
}

/// Function prototype
///
/// Immutable once built and shared by every closure created from it. The
/// bytecode body belongs to the interpreter and is not modelled here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proto {
    name: Symbol,
    argc: u8,
    upvals: Vec<UpvalDesc>,
}

impl Proto {
    /// Create a prototype without captured state
    pub fn new(name: Symbol, argc: u8) -> Self {
        Self {
            name,
            argc,
            upvals: Vec::new(),
        }
    }

    /// Create a prototype that captures the given upvalues
    pub fn with_upvals(name: Symbol, argc: u8, upvals: Vec<UpvalDesc>) -> Self {
        Self { name, argc, upvals }
    }

    /// Function name
    pub fn name(&self) -> Symbol {
        self.name
    }

    /// Declared parameter count
    pub fn argc(&self) -> u8 {
        self.argc
    }

    /// Upvalue descriptors
    pub fn upvals(&self) -> &[UpvalDesc] {
        &self.upvals
    }

    /// Number of captured upvalues
    pub fn nupvals(&self) -> usize {
        self.upvals.len()
    }

    /// Check if closures of this prototype carry captured state
    pub fn captures(&self) -> bool {
        !self.upvals.is_empty()
    }
}

/// Closure: a prototype plus its captured upvalues
#[derive(Debug, Clone)]
pub struct Closure {
    proto: Rc<Proto>,
    upvals: Vec<Value>,
}

impl Closure {
    /// Create a closure with already captured upvalues
    pub fn new(proto: Rc<Proto>, upvals: Vec<Value>) -> Self {
        debug_assert_eq!(proto.nupvals(), upvals.len());
        Self { proto, upvals }
    }

    /// Prototype
    pub fn proto(&self) -> &Rc<Proto> {
        &self.proto
    }

    /// Captured upvalues
    pub fn upvals(&self) -> &[Value] {
        &self.upvals
    }

    /// Get a captured upvalue
    pub fn upval(&self, index: usize) -> Option<Value> {
        self.upvals.get(index).copied()
    }
}

/// Host-provided native function
#[derive(Clone, Copy)]
pub struct NativeFn(pub fn(&mut Vm, &[Value]) -> VmResult<Value>);

impl NativeFn {
    /// Invoke the function
    #[inline]
    pub fn call(self, vm: &mut Vm, args: &[Value]) -> VmResult<Value> {
        (self.0)(vm, args)
    }
}

impl PartialEq for NativeFn {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::fn_addr_eq(self.0, other.0)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native({:#x})", self.0 as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string::StringTable;

    fn answer(_vm: &mut Vm, _args: &[Value]) -> VmResult<Value> {
        Ok(Value::Int(42))
    }

    fn nothing(_vm: &mut Vm, _args: &[Value]) -> VmResult<Value> {
        Ok(Value::Nil)
    }

    #[test]
    fn test_proto_captures() {
        let mut strings = StringTable::new();
        let plain = Proto::new(strings.intern("speak"), 0);
        assert!(!plain.captures());
        assert_eq!(plain.nupvals(), 0);

        let bark = Proto::with_upvals(strings.intern("bark"), 0, vec![UpvalDesc::local(0)]);
        assert!(bark.captures());
        assert_eq!(bark.upvals(), &[UpvalDesc::local(0)]);
    }

    #[test]
    fn test_closure_upvals() {
        let mut strings = StringTable::new();
        let proto = Rc::new(Proto::with_upvals(
            strings.intern("f"),
            1,
            vec![UpvalDesc::local(0), UpvalDesc::upvalue(2)],
        ));
        let closure = Closure::new(Rc::clone(&proto), vec![Value::Int(1), Value::Nil]);

        assert!(Rc::ptr_eq(closure.proto(), &proto));
        assert_eq!(closure.upval(0), Some(Value::Int(1)));
        assert_eq!(closure.upval(2), None);
    }

    #[test]
    fn test_native_fn_identity() {
        assert_eq!(NativeFn(answer), NativeFn(answer));
        assert_ne!(NativeFn(answer), NativeFn(nothing));

        let mut vm = Vm::new();
        assert_eq!(NativeFn(answer).call(&mut vm, &[]).unwrap(), Value::Int(42));
    }
}
