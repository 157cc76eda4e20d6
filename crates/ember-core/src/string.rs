//! String interning
//!
//! Member names and string values are interned once per VM and handled as
//! [`Symbol`]s afterwards, so member tables hash and compare plain integers.

use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Handle to an interned string
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Get the raw index
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// Interned string table
#[derive(Debug, Default)]
pub struct StringTable {
    /// String to symbol mapping
    lookup: FxHashMap<Rc<str>, Symbol>,
    /// Symbol index to string
    strings: Vec<Rc<str>>,
}

impl StringTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning the existing symbol if already present
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.lookup.get(s) {
            return sym;
        }

        let sym = Symbol(self.strings.len() as u32);
        let shared: Rc<str> = Rc::from(s);
        self.strings.push(Rc::clone(&shared));
        self.lookup.insert(shared, sym);
        sym
    }

    /// Find the symbol for a string without interning it
    pub fn lookup(&self, s: &str) -> Option<Symbol> {
        self.lookup.get(s).copied()
    }

    /// Resolve a symbol back to its string
    pub fn resolve(&self, sym: Symbol) -> Option<&str> {
        self.strings.get(sym.0 as usize).map(|s| &**s)
    }

    /// Number of interned strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut table = StringTable::new();
        let a = table.intern("speak");
        let b = table.intern("speak");
        let c = table.intern("bark");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_resolve() {
        let mut table = StringTable::new();
        let sym = table.intern("init");
        assert_eq!(table.resolve(sym), Some("init"));
        assert_eq!(table.resolve(Symbol(99)), None);
    }

    #[test]
    fn test_lookup_does_not_intern() {
        let mut table = StringTable::new();
        assert_eq!(table.lookup("name"), None);
        assert!(table.is_empty());

        let sym = table.intern("name");
        assert_eq!(table.lookup("name"), Some(sym));
    }
}
