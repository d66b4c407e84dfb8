//! The two-sort type grammar: individuals on one side, predicates on the
//! other, stratified so that argument positions may hold either.

use std::fmt::Display;

use crate::ast::Symbol;
use crate::util::{IndexMap, IndexSet, ListDisplay};

/// An argument-position type: the individual sort, a predicate type, or a
/// type variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rho {
    Ind,
    Pred(Pi),
    Var(Symbol),
}

/// A predicate type: propositions, functions from argument types to a
/// predicate type, or a predicate-type variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pi {
    Prop,
    Fun(Vec<Rho>, Box<Pi>),
    Var(Symbol),
}

impl Rho {
    pub fn prop() -> Rho {
        Rho::Pred(Pi::Prop)
    }

    pub fn is_pred(&self) -> bool {
        matches!(self, Rho::Pred(_))
    }

    /// The order of a type: 0 for individuals, 1 for predicates over
    /// individuals, higher when predicate arguments are themselves
    /// predicates. An unsolved variable counts as order 0.
    pub fn order(&self) -> usize {
        match self {
            Rho::Ind | Rho::Var(_) => 0,
            Rho::Pred(pi) => pi.order(),
        }
    }

    /// Structural arity, when the type determines one.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Rho::Ind => Some(0),
            Rho::Pred(pi) => pi.arity(),
            Rho::Var(_) => None,
        }
    }

    pub fn free_vars(&self) -> IndexSet<Symbol> {
        let mut acc = IndexSet::default();
        self.collect_free_vars(&mut acc);
        acc
    }

    pub(crate) fn collect_free_vars(&self, acc: &mut IndexSet<Symbol>) {
        match self {
            Rho::Ind => {}
            Rho::Pred(pi) => pi.collect_free_vars(acc),
            Rho::Var(v) => {
                acc.insert(*v);
            }
        }
    }

    pub(crate) fn occurs(&self, var: Symbol) -> bool {
        match self {
            Rho::Ind => false,
            Rho::Var(v) => *v == var,
            Rho::Pred(pi) => pi.occurs(var),
        }
    }
}

impl Pi {
    pub fn arity(&self) -> Option<usize> {
        match self {
            Pi::Prop => Some(0),
            Pi::Fun(args, _) => Some(args.len()),
            Pi::Var(_) => None,
        }
    }

    pub fn order(&self) -> usize {
        match self {
            Pi::Prop | Pi::Var(_) => 1,
            Pi::Fun(args, ret) => {
                let arg_order = args.iter().map(|a| a.order()).max().unwrap_or(0);
                ret.order().max(arg_order + 1)
            }
        }
    }

    pub fn free_vars(&self) -> IndexSet<Symbol> {
        let mut acc = IndexSet::default();
        self.collect_free_vars(&mut acc);
        acc
    }

    pub(crate) fn collect_free_vars(&self, acc: &mut IndexSet<Symbol>) {
        match self {
            Pi::Prop => {}
            Pi::Fun(args, ret) => {
                for a in args {
                    a.collect_free_vars(acc);
                }
                ret.collect_free_vars(acc);
            }
            Pi::Var(v) => {
                acc.insert(*v);
            }
        }
    }

    pub(crate) fn occurs(&self, var: Symbol) -> bool {
        match self {
            Pi::Prop => false,
            Pi::Var(v) => *v == var,
            Pi::Fun(args, ret) => args.iter().any(|a| a.occurs(var)) || ret.occurs(var),
        }
    }
}

impl Display for Rho {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rho::Ind => write!(f, "i"),
            Rho::Pred(pi) => Display::fmt(pi, f),
            Rho::Var(v) => Display::fmt(v, f),
        }
    }
}

impl Display for Pi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pi::Prop => write!(f, "o"),
            Pi::Fun(args, ret) => {
                write!(f, "({}) -> {}", ListDisplay(args, ", "), ret)
            }
            Pi::Var(v) => Display::fmt(v, f),
        }
    }
}

/// A type scheme `forall vars. body`, instantiated by freshening at each use
/// site.
#[derive(Debug, Clone, PartialEq)]
pub struct Poly {
    pub vars: Vec<Symbol>,
    pub body: Pi,
}

impl Poly {
    /// A scheme with nothing quantified.
    pub fn mono(body: Pi) -> Self {
        Poly { vars: vec![], body }
    }

    /// Free type variables: those of the body minus the quantified ones.
    pub fn free_vars(&self) -> IndexSet<Symbol> {
        let mut acc = self.body.free_vars();
        acc.retain(|v| !self.vars.contains(v));
        acc
    }
}

impl Display for Poly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.vars.is_empty() {
            Display::fmt(&self.body, f)
        } else {
            write!(f, "forall {}. {}", ListDisplay(&self.vars, " "), self.body)
        }
    }
}

/// A substitution over type variables. The two variable namespaces are
/// disjoint by construction: a symbol only ever stands for an
/// argument-position variable or a predicate-type variable, never both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeSubst {
    rho: IndexMap<Symbol, Rho>,
    pi: IndexMap<Symbol, Pi>,
}

impl TypeSubst {
    pub fn is_empty(&self) -> bool {
        self.rho.is_empty() && self.pi.is_empty()
    }

    pub fn bind_rho(var: Symbol, ty: Rho) -> Self {
        let mut s = Self::default();
        s.rho.insert(var, ty);
        s
    }

    pub fn bind_pi(var: Symbol, ty: Pi) -> Self {
        let mut s = Self::default();
        s.pi.insert(var, ty);
        s
    }

    pub fn apply_rho(&self, ty: &Rho) -> Rho {
        match ty {
            Rho::Ind => Rho::Ind,
            Rho::Pred(pi) => Rho::Pred(self.apply_pi(pi)),
            Rho::Var(v) => match self.rho.get(v) {
                Some(t) => t.clone(),
                None => Rho::Var(*v),
            },
        }
    }

    pub fn apply_pi(&self, ty: &Pi) -> Pi {
        match ty {
            Pi::Prop => Pi::Prop,
            Pi::Fun(args, ret) => Pi::Fun(
                args.iter().map(|a| self.apply_rho(a)).collect(),
                Box::new(self.apply_pi(ret)),
            ),
            Pi::Var(v) => match self.pi.get(v) {
                Some(t) => t.clone(),
                None => Pi::Var(*v),
            },
        }
    }

    /// A pure renaming. Each pair is entered in both namespaces; a symbol
    /// only ever occurs in one role, so the other entry is inert.
    pub fn renaming(pairs: impl IntoIterator<Item = (Symbol, Symbol)>) -> TypeSubst {
        let mut s = TypeSubst::default();
        for (from, to) in pairs {
            s.rho.insert(from, Rho::Var(to));
            s.pi.insert(from, Pi::Var(to));
        }
        s
    }

    /// Composition: `compose(self, other)` first rewrites with `other`, then
    /// with `self`. Bindings of `other` get `self` applied to their
    /// right-hand sides, keeping the result idempotent.
    pub fn compose(&self, other: &TypeSubst) -> TypeSubst {
        let mut out = TypeSubst::default();
        for (v, t) in &other.rho {
            out.rho.insert(*v, self.apply_rho(t));
        }
        for (v, t) in &other.pi {
            out.pi.insert(*v, self.apply_pi(t));
        }
        for (v, t) in &self.rho {
            if !out.rho.contains_key(v) {
                out.rho.insert(*v, t.clone());
            }
        }
        for (v, t) in &self.pi {
            if !out.pi.contains_key(v) {
                out.pi.insert(*v, t.clone());
            }
        }
        out
    }
}
