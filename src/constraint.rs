//! Type constraints and the solver that discharges them: first-order
//! unification over the stratified type grammar, with an occurs check.

use crate::ast::Span;
use crate::typecheck::TypeError;
use crate::types::{Pi, Rho, TypeSubst};

/// An equation `lhs == rhs` between argument-position types. The origin node
/// is retained for error reporting only.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub lhs: Rho,
    pub rhs: Rho,
    pub origin: Span,
}

impl Constraint {
    pub fn new(lhs: Rho, rhs: Rho, origin: Span) -> Self {
        Constraint { lhs, rhs, origin }
    }
}

/// Solve a constraint set left to right, threading the accumulated
/// substitution through the remaining equations.
pub fn solve(constraints: &[Constraint]) -> Result<TypeSubst, TypeError> {
    let mut subst = TypeSubst::default();
    for c in constraints {
        let lhs = subst.apply_rho(&c.lhs);
        let rhs = subst.apply_rho(&c.rhs);
        let unifier = unify_rho(&lhs, &rhs, &c.origin)?;
        subst = unifier.compose(&subst);
    }
    Ok(subst)
}

fn unify_rho(lhs: &Rho, rhs: &Rho, origin: &Span) -> Result<TypeSubst, TypeError> {
    match (lhs, rhs) {
        (Rho::Var(x), Rho::Var(y)) if x == y => Ok(TypeSubst::default()),
        (Rho::Var(x), t) | (t, Rho::Var(x)) => {
            if t.occurs(*x) {
                Err(TypeError::OccursCheck {
                    var: *x,
                    ty: t.clone(),
                    origin: origin.clone(),
                })
            } else {
                Ok(TypeSubst::bind_rho(*x, t.clone()))
            }
        }
        (Rho::Ind, Rho::Ind) => Ok(TypeSubst::default()),
        (Rho::Pred(p), Rho::Pred(q)) => unify_pi(p, q, origin),
        _ => Err(TypeError::TypeClash {
            expected: lhs.clone(),
            found: rhs.clone(),
            origin: origin.clone(),
        }),
    }
}

fn unify_pi(lhs: &Pi, rhs: &Pi, origin: &Span) -> Result<TypeSubst, TypeError> {
    match (lhs, rhs) {
        (Pi::Prop, Pi::Prop) => Ok(TypeSubst::default()),
        (Pi::Var(x), Pi::Var(y)) if x == y => Ok(TypeSubst::default()),
        (Pi::Var(x), t) | (t, Pi::Var(x)) => {
            if t.occurs(*x) {
                Err(TypeError::OccursCheck {
                    var: *x,
                    ty: Rho::Pred(t.clone()),
                    origin: origin.clone(),
                })
            } else {
                Ok(TypeSubst::bind_pi(*x, t.clone()))
            }
        }
        (Pi::Fun(args1, ret1), Pi::Fun(args2, ret2)) => {
            if args1.len() != args2.len() {
                return Err(TypeError::TypeClash {
                    expected: Rho::Pred(lhs.clone()),
                    found: Rho::Pred(rhs.clone()),
                    origin: origin.clone(),
                });
            }
            let mut subst = TypeSubst::default();
            for (a, b) in args1.iter().zip(args2) {
                let a = subst.apply_rho(a);
                let b = subst.apply_rho(b);
                let unifier = unify_rho(&a, &b, origin)?;
                subst = unifier.compose(&subst);
            }
            let r1 = subst.apply_pi(ret1);
            let r2 = subst.apply_pi(ret2);
            let unifier = unify_pi(&r1, &r2, origin)?;
            Ok(unifier.compose(&subst))
        }
        _ => Err(TypeError::TypeClash {
            expected: Rho::Pred(lhs.clone()),
            found: Rho::Pred(rhs.clone()),
            origin: origin.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Symbol, DUMMY_SPAN};

    fn var(name: &str) -> Rho {
        Rho::Var(Symbol::new(name))
    }

    fn fun(args: Vec<Rho>, ret: Pi) -> Rho {
        Rho::Pred(Pi::Fun(args, Box::new(ret)))
    }

    fn c(lhs: Rho, rhs: Rho) -> Constraint {
        Constraint::new(lhs, rhs, DUMMY_SPAN.clone())
    }

    #[test]
    fn solves_a_chain_through_composition() {
        // a == b, b == i  ==>  both map to i
        let subst = solve(&[c(var("a"), var("b")), c(var("b"), Rho::Ind)]).unwrap();
        assert_eq!(subst.apply_rho(&var("a")), Rho::Ind);
        assert_eq!(subst.apply_rho(&var("b")), Rho::Ind);
    }

    #[test]
    fn unifies_predicate_types_pointwise() {
        let lhs = fun(vec![var("a"), var("a")], Pi::Var(Symbol::new("phi")));
        let rhs = fun(vec![Rho::Ind, var("b")], Pi::Prop);
        let subst = solve(&[c(lhs, rhs)]).unwrap();
        assert_eq!(subst.apply_rho(&var("a")), Rho::Ind);
        assert_eq!(subst.apply_rho(&var("b")), Rho::Ind);
        assert_eq!(subst.apply_pi(&Pi::Var(Symbol::new("phi"))), Pi::Prop);
    }

    #[test]
    fn individual_against_proposition_is_a_clash() {
        let err = solve(&[c(Rho::Ind, Rho::prop())]).unwrap_err();
        assert!(matches!(err, TypeError::TypeClash { .. }));
    }

    #[test]
    fn occurs_check_rejects_cyclic_types() {
        let phi = Symbol::new("phi");
        let recursive = fun(vec![Rho::Pred(Pi::Var(phi))], Pi::Prop);
        let err = solve(&[c(Rho::Pred(Pi::Var(phi)), recursive)]).unwrap_err();
        assert!(matches!(err, TypeError::OccursCheck { .. }));
    }

    #[test]
    fn arity_mismatch_between_funs_is_a_clash() {
        let lhs = fun(vec![Rho::Ind], Pi::Prop);
        let rhs = fun(vec![Rho::Ind, Rho::Ind], Pi::Prop);
        let err = solve(&[c(lhs, rhs)]).unwrap_err();
        assert!(matches!(err, TypeError::TypeClash { .. }));
    }

    #[test]
    fn solved_constraints_are_closed_under_the_result() {
        let cs = vec![
            c(var("a"), fun(vec![var("b")], Pi::Prop)),
            c(var("b"), Rho::Ind),
        ];
        let subst = solve(&cs).unwrap();
        for eqn in &cs {
            assert_eq!(subst.apply_rho(&eqn.lhs), subst.apply_rho(&eqn.rhs));
        }
    }
}
