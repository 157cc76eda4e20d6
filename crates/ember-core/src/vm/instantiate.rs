//! Instantiation
//!
//! An instance is a chain of segments, one per class level, linked from the
//! most derived segment up to the root class. The head is rooted while the
//! rest of the chain is built; every further segment is linked into the chain
//! before the next allocation, so nothing half-built is ever unreachable.

use super::Vm;
use crate::gc::{GcRef, HeapObject};
use crate::object::{Instance, Lookup};
use crate::value::Value;
use crate::VmResult;

impl Vm {
    /// Build a fully populated instance of `class`
    ///
    /// Returns the most derived segment and the constructor, if the class
    /// chain binds a callable `init`. Calling the constructor is left to the
    /// caller; see [`Vm::construct`].
    pub fn instantiate(&mut self, class: GcRef) -> VmResult<(GcRef, Option<Value>)> {
        let instance = self.new_object(class)?;
        let init = self.intern("init");
        let constructor = match self.read(instance, init)? {
            Lookup::Method(callable) => Some(callable),
            Lookup::Data(_) | Lookup::NotFound => None,
        };
        Ok((instance, constructor))
    }

    /// Create an instance of `class` and run its constructor with `args`
    ///
    /// The constructor receives the instance first. The class and `args` are
    /// pushed as operands while the chain is allocated, so a collection cannot
    /// reclaim them; captures still see the caller's frame. Instantiation and the
    /// constructor call run inside a protected region, so a failure leaves the
    /// call depth, stack top and root depth as they were before the error is
    /// passed on unchanged.
    pub fn construct(&mut self, class: GcRef, args: &[Value]) -> VmResult<Value> {
        let mut result = Value::Nil;
        let outcome = self.run_protected(|vm| {
            let base = vm.stack.depth();
            vm.stack.push(Value::Class(class))?;
            for arg in args {
                vm.stack.push(*arg)?;
            }

            let (instance, constructor) = vm.instantiate(class)?;
            let receiver = Value::Instance(instance);

            if let Some(constructor) = constructor {
                let mut vm = vm.root(receiver);
                let mut call_args = Vec::with_capacity(args.len() + 1);
                call_args.push(receiver);
                call_args.extend_from_slice(args);
                vm.call(constructor, &call_args)?;
            }

            vm.stack.truncate(base);
            result = receiver;
            Ok(())
        });

        match outcome {
            Ok(()) => Ok(result),
            Err(error) => Err(self.propagate(error)),
        }
    }

    fn new_object(&mut self, class: GcRef) -> VmResult<GcRef> {
        let head = self.new_segment(class)?;
        let mut vm = self.root(Value::Instance(head));

        let mut segment = head;
        let mut level = vm.heap().class(class)?.superclass();
        while let Some(superclass) = level {
            let next = vm.new_segment(superclass)?;
            vm.heap_mut()
                .instance_mut(segment)?
                .set_superinstance(Some(next));
            segment = next;
            level = vm.heap().class(superclass)?.superclass();
        }

        Ok(head)
    }

    fn new_segment(&mut self, class: GcRef) -> VmResult<GcRef> {
        let (slot_count, deferred) = {
            let class = self.heap().class(class)?;
            (class.slot_count(), class.deferred_methods())
        };

        let segment = self.alloc(HeapObject::Instance(Instance::new(class, slot_count)))?;
        if !deferred.is_empty() {
            let mut vm = self.root(Value::Instance(segment));
            for (proto, slot) in deferred {
                let closure = vm.new_closure(proto)?;
                vm.heap_mut()
                    .instance_mut(segment)?
                    .set_slot(slot, Value::Closure(closure))?;
            }
        }

        tracing::debug!(%segment, %class, slot_count, "new instance segment");
        Ok(segment)
    }
}
