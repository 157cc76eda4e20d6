//! Object model and class system
//!
//! Each class level owns exactly the instance slots it defines. An instance is
//! a chain of segments, one per class in the inheritance chain, so defining a
//! subclass never changes the slot layout of its ancestors:
//!
//! ```text
//! Dog ──super──▶ Animal            class chain
//!  │               │
//! seg(Dog) ─super─▶ seg(Animal)    instance chain, walked in lock-step
//! ```

mod class;
mod closure;
mod instance;

pub use class::{Class, Member, MemberKind, MemberTable};
pub use closure::{Closure, NativeFn, Proto, UpvalDesc};
pub use instance::{Instance, Lookup};
