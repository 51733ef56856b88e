//! String interner for efficient string storage and comparison.
//!
//! Uses `Rc<str>` for cheap cloning (reference count increment instead of
//! allocation). The interner deduplicates strings so identical strings share
//! the same allocation. The analysis core is strictly single-threaded, so
//! `Rc` rather than `Arc` is the right tool.

use std::collections::HashSet;
use std::rc::Rc;

/// An interned name - cheap to clone (just Rc increment)
pub type Name = Rc<str>;

/// String interner that deduplicates strings.
///
/// Interning a string returns an `Rc<str>` that can be cheaply cloned.
/// If the same string is interned multiple times, the same `Rc` is returned.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    strings: HashSet<Rc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning a cheap-to-clone reference.
    ///
    /// If the string was already interned, returns the existing `Rc`.
    /// Otherwise, creates a new `Rc` and stores it.
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(existing) = self.strings.get(s) {
            Rc::clone(existing)
        } else {
            let rc: Rc<str> = Rc::from(s);
            self.strings.insert(Rc::clone(&rc));
            rc
        }
    }

    /// Intern an owned string, avoiding allocation if possible.
    pub fn intern_string(&mut self, s: String) -> Name {
        if let Some(existing) = self.strings.get(s.as_str()) {
            Rc::clone(existing)
        } else {
            let rc: Rc<str> = Rc::from(s);
            self.strings.insert(Rc::clone(&rc));
            rc
        }
    }

    /// Get an interned string if it exists, without creating it.
    pub fn get(&self, s: &str) -> Option<Name> {
        self.strings.get(s).cloned()
    }

    /// Number of unique strings interned.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns true if no strings have been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
