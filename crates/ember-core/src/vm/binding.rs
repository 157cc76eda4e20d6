//! Class definition and member binding

use super::Vm;
use crate::gc::{GcRef, HeapObject};
use crate::object::{Class, Closure, Member, MemberKind, NativeFn, Proto};
use crate::string::Symbol;
use crate::value::Value;
use crate::{VmError, VmResult};
use std::rc::Rc;

impl Vm {
    /// Define a class with an empty member table
    pub fn new_class(&mut self, name: Symbol, superclass: Option<GcRef>) -> VmResult<GcRef> {
        if let Some(superclass) = superclass {
            self.heap().class(superclass)?;
        }

        let mut vm = self.root(superclass.map_or(Value::Nil, Value::Class));
        let class = vm.alloc(HeapObject::Class(Class::new(name, superclass)))?;
        tracing::debug!(class = vm.string(name).unwrap_or("?"), "new class");
        Ok(class)
    }

    /// Bind a data member to the next free slot; returns the slot index
    pub fn bind_data_member(&mut self, class: GcRef, name: Symbol) -> VmResult<usize> {
        self.check_redefinition(class, name)?;
        Ok(self.heap_mut().class_mut(class)?.bind_var(name))
    }

    /// Bind a method
    ///
    /// A prototype that captures nothing gets one closure shared by every
    /// instance. A capturing prototype takes the next free slot; each instance
    /// stores its own closure there.
    pub fn bind_method(&mut self, class: GcRef, name: Symbol, proto: Rc<Proto>) -> VmResult<()> {
        self.check_redefinition(class, name)?;

        if proto.captures() {
            self.heap_mut().class_mut(class)?.bind_deferred(name, proto);
        } else {
            let closure = {
                let mut vm = self.root(Value::Class(class));
                vm.new_closure(proto)?
            };
            self.heap_mut()
                .class_mut(class)?
                .insert(name, Member::Method(closure));
        }
        Ok(())
    }

    /// Bind a host-provided native method
    pub fn bind_primitive_method(
        &mut self,
        class: GcRef,
        name: Symbol,
        function: NativeFn,
    ) -> VmResult<()> {
        self.check_redefinition(class, name)?;
        self.heap_mut()
            .class_mut(class)?
            .insert(name, Member::Primitive(function));
        Ok(())
    }

    /// Kind of the member `name` as seen from `class`, walking superclasses
    pub fn attribute_kind(&self, class: GcRef, name: Symbol) -> VmResult<MemberKind> {
        let mut level = Some(class);
        while let Some(current) = level {
            let class = self.heap().class(current)?;
            if let Some(member) = class.get(name) {
                return Ok(member.kind());
            }
            level = class.superclass();
        }
        Ok(MemberKind::None)
    }

    /// Number of per-instance methods bound directly in `class`
    pub fn count_deferred_methods(&self, class: GcRef) -> VmResult<usize> {
        Ok(self.heap().class(class)?.deferred_count())
    }

    /// Release spare member table capacity once `class` is fully defined
    pub fn compact_class(&mut self, class: GcRef) -> VmResult<()> {
        self.heap_mut().class_mut(class)?.compact();
        Ok(())
    }

    /// Create a closure for `proto`, capturing its upvalues now
    ///
    /// Stack upvalues are read from the current frame's locals (or from the
    /// operand stack base at top level); the others are copied from the
    /// running closure's own upvalues.
    pub fn new_closure(&mut self, proto: Rc<Proto>) -> VmResult<GcRef> {
        let mut upvals = Vec::with_capacity(proto.nupvals());
        for desc in proto.upvals() {
            let index = desc.index as usize;
            let value = if desc.in_stack {
                self.stack.capture(index)?
            } else {
                self.enclosing_upval(index)?
            };
            upvals.push(value);
        }

        self.alloc(HeapObject::Closure(Closure::new(proto, upvals)))
    }

    fn enclosing_upval(&self, index: usize) -> VmResult<Value> {
        let enclosing = match self.stack.current_frame().map(|frame| frame.callee) {
            Some(Value::Closure(closure)) => closure,
            _ => {
                return Err(VmError::RuntimeError(
                    "upvalue capture outside a closure".to_string(),
                ))
            }
        };

        self.heap().closure(enclosing)?.upval(index).ok_or_else(|| {
            VmError::RuntimeError(format!("upvalue index {} out of bounds", index))
        })
    }

    fn check_redefinition(&self, class: GcRef, name: Symbol) -> VmResult<()> {
        let class = self.heap().class(class)?;
        if !class.contains(name) {
            return Ok(());
        }

        let class_name = self.string(class.name()).unwrap_or("?");
        let member = self.string(name).unwrap_or("?");
        if self.options.strict_redefinition {
            return Err(VmError::Redefinition {
                class: class_name.to_string(),
                member: member.to_string(),
            });
        }
        tracing::warn!(class = class_name, member, "member redefined");
        Ok(())
    }
}
