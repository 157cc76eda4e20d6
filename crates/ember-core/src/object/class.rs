//! Classes and member descriptors

use super::closure::{NativeFn, Proto};
use crate::gc::GcRef;
use crate::string::Symbol;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Per-class mapping from member name to descriptor
pub type MemberTable = FxHashMap<Symbol, Member>;

/// Member descriptor stored in a class's member table
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// Data slot index in the owning segment
    Var(usize),
    /// Closure without captured state, shared by every instance
    Method(GcRef),
    /// Prototype whose closure is built per instance and stored at `slot`
    Deferred {
        /// Method prototype
        proto: Rc<Proto>,
        /// Slot in the owning segment holding the materialized closure
        slot: usize,
    },
    /// Host-provided native method
    Primitive(NativeFn),
}

impl Member {
    /// Descriptor kind
    pub fn kind(&self) -> MemberKind {
        match self {
            Member::Var(_) => MemberKind::Var,
            Member::Method(_) => MemberKind::Method,
            Member::Deferred { .. } => MemberKind::Deferred,
            Member::Primitive(_) => MemberKind::Primitive,
        }
    }

    /// Slot this member occupies in the owning segment, if any
    pub fn slot(&self) -> Option<usize> {
        match self {
            Member::Var(index) => Some(*index),
            Member::Deferred { slot, .. } => Some(*slot),
            Member::Method(_) | Member::Primitive(_) => None,
        }
    }
}

/// Kind of a member, as reported by static introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Not bound anywhere in the class chain
    None,
    /// Data slot
    Var,
    /// Shared method
    Method,
    /// Per-instance method
    Deferred,
    /// Native method
    Primitive,
}

impl MemberKind {
    /// Check if this kind is callable
    pub fn is_method(self) -> bool {
        matches!(
            self,
            MemberKind::Method | MemberKind::Deferred | MemberKind::Primitive
        )
    }
}

/// Class definition
///
/// The member table is created on first bind; an absent table behaves like an
/// empty one. `slot_count` only ever grows.
#[derive(Debug, Clone)]
pub struct Class {
    name: Symbol,
    superclass: Option<GcRef>,
    members: Option<MemberTable>,
    slot_count: usize,
}

impl Class {
    /// Create a class with no members
    pub fn new(name: Symbol, superclass: Option<GcRef>) -> Self {
        Self {
            name,
            superclass,
            members: None,
            slot_count: 0,
        }
    }

    /// Class name
    pub fn name(&self) -> Symbol {
        self.name
    }

    /// Parent class
    pub fn superclass(&self) -> Option<GcRef> {
        self.superclass
    }

    /// Number of slots each instance segment of this class level owns
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Member table, if any member was ever bound
    pub fn members(&self) -> Option<&MemberTable> {
        self.members.as_ref()
    }

    /// Look up a member in this class level only
    pub fn get(&self, name: Symbol) -> Option<&Member> {
        self.members.as_ref().and_then(|table| table.get(&name))
    }

    /// Check if this class level binds `name`
    pub fn contains(&self, name: Symbol) -> bool {
        self.get(name).is_some()
    }

    /// Insert or overwrite a member, returning the previous descriptor
    pub fn insert(&mut self, name: Symbol, member: Member) -> Option<Member> {
        self.members
            .get_or_insert_with(MemberTable::default)
            .insert(name, member)
    }

    /// Bind a data member to the next free slot
    pub fn bind_var(&mut self, name: Symbol) -> usize {
        let index = self.next_slot();
        self.insert(name, Member::Var(index));
        index
    }

    /// Bind a per-instance method to the next free slot
    pub fn bind_deferred(&mut self, name: Symbol, proto: Rc<Proto>) -> usize {
        let slot = self.next_slot();
        self.insert(name, Member::Deferred { proto, slot });
        slot
    }

    fn next_slot(&mut self) -> usize {
        let slot = self.slot_count;
        self.slot_count += 1;
        slot
    }

    /// Number of deferred methods in this class level
    pub fn deferred_count(&self) -> usize {
        self.members.as_ref().map_or(0, |table| {
            table
                .values()
                .filter(|member| matches!(member, Member::Deferred { .. }))
                .count()
        })
    }

    /// Deferred methods of this class level with their slots
    pub fn deferred_methods(&self) -> Vec<(Rc<Proto>, usize)> {
        self.members
            .iter()
            .flat_map(|table| table.values())
            .filter_map(|member| match member {
                Member::Deferred { proto, slot } => Some((Rc::clone(proto), *slot)),
                _ => None,
            })
            .collect()
    }

    /// Shared method closures referenced by this class level
    pub fn shared_methods(&self) -> impl Iterator<Item = GcRef> + '_ {
        self.members
            .iter()
            .flat_map(|table| table.values())
            .filter_map(|member| match member {
                Member::Method(closure) => Some(*closure),
                _ => None,
            })
    }

    /// Release spare member table capacity once definition is complete
    pub fn compact(&mut self) {
        if let Some(table) = self.members.as_mut() {
            table.shrink_to_fit();
        }
    }
}
