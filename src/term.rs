//! Runtime terms for proof search. Expressions here are immutable values;
//! substitutions are constructed and then applied to produce new values.

use std::fmt::Display;

use crate::ast::{Literal, Symbol};
use crate::types::{Pi, Rho};
use crate::util::{IndexMap, IndexSet, ListDisplay};

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Lit(Literal),
    /// A named predicate or function symbol with known type (hence arity).
    Rigid(Symbol, Rho),
    /// A logic variable, typed.
    Flex(Symbol, Rho),
    App(Box<Term>, Vec<Term>),
    /// Tuples encode multi-argument clause heads and bodies.
    Tup(Vec<Term>),
    /// A set abstraction: the enumerated-so-far elements of a predicate's
    /// extension plus the witness variables used to grow it lazily. The last
    /// witness is the continuation.
    Set(Vec<Term>, Vec<(Symbol, Rho)>),
}

impl Term {
    pub fn app(head: Term, args: Vec<Term>) -> Term {
        Term::App(Box::new(head), args)
    }

    /// An individual constant.
    pub fn cst(name: impl Into<Symbol>) -> Term {
        Term::Rigid(name.into(), Rho::Ind)
    }

    pub fn int(n: i64) -> Term {
        Term::Lit(Literal::Int(n))
    }

    /// A logic variable for hand-built goals. Its type is a variable named
    /// after itself; lowered programs carry inferred types instead.
    pub fn var(name: impl Into<Symbol>) -> Term {
        let name = name.into();
        Term::Flex(name, Rho::Var(name))
    }

    /// A goal atom `name(args...)`, typing the head from its arguments.
    pub fn atom(name: impl Into<Symbol>, args: Vec<Term>) -> Term {
        let arg_tys = args.iter().map(|a| a.type_of()).collect();
        let head = Term::Rigid(
            name.into(),
            Rho::Pred(Pi::Fun(arg_tys, Box::new(Pi::Prop))),
        );
        Term::app(head, args)
    }

    /// A nullary goal atom.
    pub fn atom0(name: impl Into<Symbol>) -> Term {
        Term::app(Term::Rigid(name.into(), Rho::prop()), vec![])
    }

    pub fn nil() -> Term {
        Term::cst("[]")
    }

    pub fn cons(head: Term, tail: Term) -> Term {
        Term::app(Term::cst("."), vec![head, tail])
    }

    pub fn list(items: Vec<Term>) -> Term {
        items
            .into_iter()
            .rev()
            .fold(Term::nil(), |tail, head| Term::cons(head, tail))
    }

    pub fn name_of(&self) -> Option<Symbol> {
        match self {
            Term::Rigid(name, _) | Term::Flex(name, _) => Some(*name),
            Term::App(head, _) => head.name_of(),
            _ => None,
        }
    }

    /// The type of a term. Applications step under the head's function type;
    /// tuples and literals live in the individual sort.
    pub fn type_of(&self) -> Rho {
        match self {
            Term::Lit(_) | Term::Tup(_) => Rho::Ind,
            Term::Rigid(_, ty) | Term::Flex(_, ty) => ty.clone(),
            Term::App(head, _) => match head.type_of() {
                Rho::Pred(Pi::Fun(_, ret)) => Rho::Pred(*ret),
                other => other,
            },
            Term::Set(_, witnesses) => match witnesses.last() {
                Some((_, ty)) => ty.clone(),
                None => Rho::Ind,
            },
        }
    }

    pub fn arity_of(&self) -> usize {
        self.type_of().arity().unwrap_or(0)
    }

    /// Free variables in order of first occurrence, without duplicates. Set
    /// witnesses count as variables.
    pub fn vars_of(&self) -> IndexSet<Symbol> {
        let mut acc = IndexMap::default();
        self.collect_vars(&mut acc);
        acc.into_keys().collect()
    }

    /// Free variables together with their types, for building renamings.
    pub(crate) fn collect_vars(&self, acc: &mut IndexMap<Symbol, Rho>) {
        match self {
            Term::Lit(_) | Term::Rigid(..) => {}
            Term::Flex(v, ty) => {
                acc.entry(*v).or_insert_with(|| ty.clone());
            }
            Term::App(head, args) => {
                head.collect_vars(acc);
                for a in args {
                    a.collect_vars(acc);
                }
            }
            Term::Tup(items) => {
                for t in items {
                    t.collect_vars(acc);
                }
            }
            Term::Set(snapshot, witnesses) => {
                for t in snapshot {
                    t.collect_vars(acc);
                }
                for (w, ty) in witnesses {
                    acc.entry(*w).or_insert_with(|| ty.clone());
                }
            }
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Lit(l) => Display::fmt(l, f),
            Term::Rigid(name, _) | Term::Flex(name, _) => Display::fmt(name, f),
            Term::App(head, args) => {
                if args.is_empty() {
                    Display::fmt(head, f)
                } else {
                    write!(f, "{}({})", head, ListDisplay(args, ", "))
                }
            }
            Term::Tup(items) => write!(f, "({})", ListDisplay(items, ", ")),
            Term::Set(snapshot, witnesses) => {
                let names: Vec<_> = witnesses.iter().map(|(w, _)| *w).collect();
                write!(
                    f,
                    "{{{} | {}}}",
                    ListDisplay(snapshot, ", "),
                    ListDisplay(&names, ", ")
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vars_in_first_occurrence_order() {
        let t = Term::atom(
            "append",
            vec![Term::var("Xs"), Term::var("Ys"), Term::var("Xs")],
        );
        let vars: Vec<_> = t.vars_of().into_iter().collect();
        assert_eq!(vars, vec![Symbol::new("Xs"), Symbol::new("Ys")]);
    }

    #[test]
    fn set_witnesses_are_variables() {
        let w = Symbol::new("w");
        let t = Term::Set(vec![Term::int(1)], vec![(w, Rho::prop())]);
        assert!(t.vars_of().contains(&w));
    }

    #[test]
    fn application_type_steps_under_the_head() {
        let atom = Term::atom("p", vec![Term::int(1)]);
        assert_eq!(atom.type_of(), Rho::prop());
        assert_eq!(atom.name_of(), Some(Symbol::new("p")));
    }

    #[test]
    fn list_builds_cons_cells() {
        let t = Term::list(vec![Term::int(1), Term::int(2)]);
        assert_eq!(
            t,
            Term::cons(Term::int(1), Term::cons(Term::int(2), Term::nil()))
        );
    }
}
