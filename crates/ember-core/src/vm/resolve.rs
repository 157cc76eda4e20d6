//! Member resolution through instance chains

use super::Vm;
use crate::gc::GcRef;
use crate::object::{Lookup, Member};
use crate::string::Symbol;
use crate::value::Value;
use crate::VmResult;

impl Vm {
    /// Find the first class level binding `name`, starting at `instance`
    ///
    /// Walks the instance chain and its class chain in lock-step. Returns the
    /// segment of the level that binds the name together with its descriptor.
    /// Levels more derived than `instance` are never consulted.
    pub fn resolve(&self, instance: GcRef, name: Symbol) -> VmResult<Option<(GcRef, Member)>> {
        let mut segment = Some(instance);
        while let Some(current) = segment {
            let seg = self.heap().instance(current)?;
            if let Some(member) = self.heap().class(seg.class())?.get(name) {
                return Ok(Some((current, member.clone())));
            }
            segment = seg.superinstance();
        }
        Ok(None)
    }

    /// Read member `name` through `instance`
    pub fn read(&self, instance: GcRef, name: Symbol) -> VmResult<Lookup> {
        let (segment, member) = match self.resolve(instance, name)? {
            Some(found) => found,
            None => return Ok(Lookup::NotFound),
        };

        Ok(match member {
            Member::Var(index) => Lookup::Data(self.heap().instance(segment)?.slot(index)?),
            Member::Deferred { slot, .. } => {
                Lookup::Method(self.heap().instance(segment)?.slot(slot)?)
            }
            Member::Method(closure) => Lookup::Method(Value::Closure(closure)),
            Member::Primitive(function) => Lookup::Method(Value::Native(function)),
        })
    }

    /// Write data member `name` through `instance`
    ///
    /// Returns false, leaving every slot untouched, when the name is unbound
    /// or bound to a method.
    pub fn write(&mut self, instance: GcRef, name: Symbol, value: Value) -> VmResult<bool> {
        match self.resolve(instance, name)? {
            Some((segment, Member::Var(index))) => {
                self.heap_mut().instance_mut(segment)?.set_slot(index, value)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
