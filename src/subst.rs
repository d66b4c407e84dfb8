//! Substitutions over runtime terms: finite mappings from variables to
//! terms, kept in triangular form by the unifier so application terminates.

use std::fmt::Display;

use crate::ast::Symbol;
use crate::term::Term;
use crate::types::Rho;
use crate::util::{IndexMap, IndexSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subst {
    map: IndexMap<Symbol, Term>,
}

impl Subst {
    /// The identity substitution.
    pub fn success() -> Subst {
        Subst::default()
    }

    /// A singleton binding. Trusts its input: the occurs check lives in the
    /// unifier.
    pub fn bind(var: Symbol, term: Term) -> Subst {
        let mut map = IndexMap::default();
        map.insert(var, term);
        Subst { map }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn get(&self, var: Symbol) -> Option<&Term> {
        self.map.get(&var)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Term)> {
        self.map.iter()
    }

    /// Rewrite a term under this substitution. Bound variables resolve
    /// through chains; the triangular form maintained by the unifier keeps
    /// this bounded. Applying a substitution to a set abstraction folds any
    /// bound witnesses into the carrier.
    pub fn apply(&self, term: &Term) -> Term {
        match term {
            Term::Lit(_) | Term::Rigid(..) => term.clone(),
            Term::Flex(v, _) => match self.map.get(v) {
                Some(bound) => self.apply(bound),
                None => term.clone(),
            },
            Term::App(head, args) => Term::App(
                Box::new(self.apply(head)),
                args.iter().map(|a| self.apply(a)).collect(),
            ),
            Term::Tup(items) => Term::Tup(items.iter().map(|t| self.apply(t)).collect()),
            Term::Set(snapshot, witnesses) => {
                let mut snapshot: Vec<Term> = snapshot.iter().map(|t| self.apply(t)).collect();
                let mut remaining = Vec::with_capacity(witnesses.len());
                for (w, ty) in witnesses {
                    match self.map.get(w) {
                        None => remaining.push((*w, ty.clone())),
                        Some(bound) => match self.apply(bound) {
                            Term::Set(elems, ws) => {
                                snapshot.extend(elems);
                                remaining.extend(ws);
                            }
                            Term::Flex(w2, ty2) => remaining.push((w2, ty2)),
                            other => snapshot.push(other),
                        },
                    }
                }
                Term::Set(snapshot, remaining)
            }
        }
    }

    pub fn apply_all(&self, terms: &[Term]) -> Vec<Term> {
        terms.iter().map(|t| self.apply(t)).collect()
    }

    /// Composition: `apply(s1.combine(s2), t) == apply(s1, apply(s2, t))`.
    pub fn combine(&self, other: &Subst) -> Subst {
        let mut map = IndexMap::default();
        for (v, t) in &other.map {
            map.insert(*v, self.apply(t));
        }
        for (v, t) in &self.map {
            if !map.contains_key(v) {
                map.insert(*v, t.clone());
            }
        }
        Subst { map }
    }

    /// Keep only the bindings for `vars`, with right-hand sides fully
    /// resolved.
    pub fn restrict(&self, vars: &IndexSet<Symbol>) -> Subst {
        let mut map = IndexMap::default();
        for (v, t) in &self.map {
            if vars.contains(v) {
                map.insert(*v, self.apply(t));
            }
        }
        Subst { map }
    }

    /// Rename every variable of `term` to a fresh variant, per the pairs
    /// given. Used to produce clause variants.
    pub(crate) fn renaming(pairs: impl IntoIterator<Item = (Symbol, (Symbol, Rho))>) -> Subst {
        let mut map = IndexMap::default();
        for (from, (to, ty)) in pairs {
            map.insert(from, Term::Flex(to, ty));
        }
        Subst { map }
    }
}

impl Display for Subst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (v, t)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} -> {}", v, t)?;
        }
        write!(f, "}}")
    }
}
