use std::cell::Cell;
use std::fmt::Display;
use std::rc::Rc;

use crate::ast::Symbol;

pub(crate) type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub(crate) type HashMap<K, V> = hashbrown::HashMap<K, V, BuildHasher>;
#[allow(unused)]
pub(crate) type HashSet<K> = hashbrown::HashSet<K, BuildHasher>;

pub type IndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type IndexSet<K> = indexmap::IndexSet<K, BuildHasher>;

pub(crate) struct ListDisplay<'a, TS>(pub TS, pub &'a str);

impl<'a, TS> Display for ListDisplay<'a, TS>
where
    TS: Clone + IntoIterator,
    TS::Item: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut did_something = false;
        for item in self.0.clone().into_iter() {
            if did_something {
                f.write_str(self.1)?;
            }
            Display::fmt(&item, f)?;
            did_something = true;
        }
        Ok(())
    }
}

/// Generates fresh variants of symbols for internal use during inference and
/// proof search. Freshness is guaranteed because source symbols always carry
/// generation 0 and the counter only ever grows.
///
/// The counter is shared: cloning a `VarGen` yields a handle onto the same
/// counter, so fresh names stay distinct across backtracking branches.
#[derive(Debug, Clone)]
pub struct VarGen {
    counter: Rc<Cell<u32>>,
}

impl Default for VarGen {
    fn default() -> Self {
        Self::new()
    }
}

impl VarGen {
    pub fn new() -> Self {
        Self {
            counter: Rc::new(Cell::new(0)),
        }
    }

    fn next(&self) -> u32 {
        // Generation 0 is reserved for symbols produced by the parser.
        let n = self.counter.get() + 1;
        self.counter.set(n);
        n
    }

    /// A brand-new symbol whose display name starts from `hint`.
    pub fn fresh(&self, hint: &str) -> Symbol {
        Symbol::with_gen(hint.into(), self.next())
    }

    /// A fresh variant of `sym`: same base name, new generation.
    pub fn variant(&self, sym: Symbol) -> Symbol {
        Symbol::with_gen(sym.base(), self.next())
    }

    pub fn has_been_used(&self) -> bool {
        self.counter.get() > 0
    }
}
