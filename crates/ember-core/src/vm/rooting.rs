//! Allocation rooting
//!
//! An object built in several steps is published on the transient root set
//! before the next allocation and withdrawn once it is linked into something
//! the caller already holds. [`Rooted`] makes the withdrawal automatic: it
//! mutably borrows the VM, so guards nest and drop in strict LIFO order.
//!
//! ```ignore
//! let segment = vm.alloc(object)?;
//! let mut vm = vm.root(Value::Instance(segment));
//! vm.alloc(other)?; // `segment` survives a collection here
//! ```

use super::Vm;
use crate::value::Value;
use std::ops::{Deref, DerefMut};

/// Guard keeping a value on the transient root set
pub struct Rooted<'vm> {
    vm: &'vm mut Vm,
    depth: usize,
    value: Value,
}

impl Vm {
    /// Root `value` until the returned guard is dropped
    pub fn root(&mut self, value: Value) -> Rooted<'_> {
        let depth = self.gc.roots_mut().push(value);
        tracing::trace!(depth, ?value, "root");
        Rooted {
            vm: self,
            depth,
            value,
        }
    }
}

impl Rooted<'_> {
    /// The rooted value
    pub fn value(&self) -> Value {
        self.value
    }

    /// Position of this root on the root set
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Deref for Rooted<'_> {
    type Target = Vm;

    fn deref(&self) -> &Vm {
        self.vm
    }
}

impl DerefMut for Rooted<'_> {
    fn deref_mut(&mut self) -> &mut Vm {
        self.vm
    }
}

impl Drop for Rooted<'_> {
    fn drop(&mut self) {
        self.vm.gc.roots_mut().truncate(self.depth);
    }
}
