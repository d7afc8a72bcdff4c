//! String interning for the Latticec compiler middle-end.
//!
//! Interned strings ([`Symbol`]) are cheap to copy, compare and hash, which
//! matters because the middle-end keys type-map, method-mapping and scope
//! lookups by name constantly. The interner is a single global table guarded
//! by a lock, following the same "intern once, pass a small `Copy` handle
//! everywhere" discipline as the teacher's symbol crate, just without the
//! build-time-generated table of well-known symbols (this workspace has no
//! fixed keyword set to precompute).

use std::fmt;

use compact_str::CompactString;
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

struct Interner {
    strings: Vec<CompactString>,
    names: HashMap<CompactString, u32>,
}

impl Interner {
    fn new() -> Self {
        Self { strings: Vec::new(), names: HashMap::new() }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(id) = self.names.get(s) {
            return *id;
        }
        let id = self.strings.len() as u32;
        let owned = CompactString::from(s);
        self.strings.push(owned.clone());
        self.names.insert(owned, id);
        id
    }

    fn resolve(&self, id: u32) -> CompactString {
        self.strings[id as usize].clone()
    }
}

static INTERNER: Lazy<RwLock<Interner>> = Lazy::new(|| RwLock::new(Interner::new()));

/// A cheap, `Copy`-able handle to an interned string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    pub fn intern(s: &str) -> Self {
        Self(INTERNER.write().intern(s))
    }

    pub fn as_str(&self) -> CompactString {
        INTERNER.read().resolve(self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::intern(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol::intern(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = Symbol::intern("foo");
        let b = Symbol::intern("foo");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "foo");
    }

    #[test]
    fn distinct_strings_are_distinct_symbols() {
        let a = Symbol::intern("foo");
        let b = Symbol::intern("bar");
        assert_ne!(a, b);
    }
}
