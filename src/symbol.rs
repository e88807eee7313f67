//! Interned package and service names, backed by [`string_interner`].

use string_interner::{self, backend, symbol};

/// The initial capacity of an [`Interner`].
///
/// Package names dominate the interner; a mid-sized workspace together with
/// the platform catalogue declares a few thousand of them.
const INTERNER_CAPACITY: usize = 4096;

#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Symbol(symbol::SymbolU32);

#[derive(Debug)]
pub struct Interner(
    string_interner::StringInterner<backend::BucketBackend<symbol::SymbolU32>>,
);

impl Interner {
    pub fn new() -> Self {
        Interner(string_interner::StringInterner::with_capacity(
            INTERNER_CAPACITY,
        ))
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        Symbol(self.0.get_or_intern(s))
    }

    /// Looks up `s` without interning it.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.0.get(s).map(Symbol)
    }

    pub fn resolve(&self, sym: Symbol) -> Option<&str> {
        self.0.resolve(sym.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
