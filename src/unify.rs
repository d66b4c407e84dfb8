//! First-order syntactic unification over runtime terms, with an occurs
//! check. The returned substitutions are triangular and idempotent.

use thiserror::Error;

use crate::ast::Symbol;
use crate::subst::Subst;
use crate::term::Term;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnifyError {
    #[error("cannot unify {0} with {1}")]
    Clash(Term, Term),
    #[error("occurs check: {0} occurs in {1}")]
    OccursCheck(Symbol, Term),
    #[error("arity mismatch: {0} against {1} arguments")]
    Arity(usize, usize),
}

fn occurs(var: Symbol, term: &Term) -> bool {
    match term {
        Term::Lit(_) | Term::Rigid(..) => false,
        Term::Flex(v, _) => *v == var,
        Term::App(head, args) => occurs(var, head) || args.iter().any(|a| occurs(var, a)),
        Term::Tup(items) => items.iter().any(|t| occurs(var, t)),
        Term::Set(snapshot, witnesses) => {
            snapshot.iter().any(|t| occurs(var, t)) || witnesses.iter().any(|(w, _)| *w == var)
        }
    }
}

pub fn unify(lhs: &Term, rhs: &Term) -> Result<Subst, UnifyError> {
    match (lhs, rhs) {
        (Term::Flex(v, _), Term::Flex(w, _)) if v == w => Ok(Subst::success()),
        (Term::Flex(v, _), t) | (t, Term::Flex(v, _)) => {
            if occurs(*v, t) {
                Err(UnifyError::OccursCheck(*v, t.clone()))
            } else {
                Ok(Subst::bind(*v, t.clone()))
            }
        }
        (Term::Lit(a), Term::Lit(b)) => {
            if a == b {
                Ok(Subst::success())
            } else {
                Err(UnifyError::Clash(lhs.clone(), rhs.clone()))
            }
        }
        (Term::Rigid(p, _), Term::Rigid(q, _)) => {
            if p == q {
                Ok(Subst::success())
            } else {
                Err(UnifyError::Clash(lhs.clone(), rhs.clone()))
            }
        }
        (Term::App(h1, args1), Term::App(h2, args2)) => {
            let s = unify(h1, h2)?;
            let u = unify_all(&s.apply_all(args1), &s.apply_all(args2))?;
            Ok(u.combine(&s))
        }
        (Term::Tup(items1), Term::Tup(items2)) => unify_all(items1, items2),
        _ => Err(UnifyError::Clash(lhs.clone(), rhs.clone())),
    }
}

/// Pointwise unification of equal-length lists, threading the substitution
/// left to right.
pub fn unify_all(lhs: &[Term], rhs: &[Term]) -> Result<Subst, UnifyError> {
    if lhs.len() != rhs.len() {
        return Err(UnifyError::Arity(lhs.len(), rhs.len()));
    }
    let mut subst = Subst::success();
    for (a, b) in lhs.iter().zip(rhs) {
        let u = unify(&subst.apply(a), &subst.apply(b))?;
        subst = u.combine(&subst);
    }
    Ok(subst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unifier_equalizes_its_inputs() {
        let lhs = Term::atom("p", vec![Term::var("X"), Term::int(2)]);
        let rhs = Term::atom("p", vec![Term::int(1), Term::var("Y")]);
        let s = unify(&lhs, &rhs).unwrap();
        assert_eq!(s.apply(&lhs), s.apply(&rhs));
    }

    #[test]
    fn same_variable_unifies_without_bindings() {
        let t = Term::var("X");
        assert_eq!(unify(&t, &t).unwrap(), Subst::success());
    }

    #[test]
    fn occurs_check_fails() {
        let v = Term::var("V");
        let t = Term::app(Term::cst("f"), vec![Term::var("V")]);
        let err = unify(&v, &t).unwrap_err();
        assert!(matches!(err, UnifyError::OccursCheck(..)));
    }

    #[test]
    fn rigid_symbols_clash_unless_equal() {
        assert!(unify(&Term::cst("a"), &Term::cst("a")).is_ok());
        let err = unify(&Term::cst("a"), &Term::cst("b")).unwrap_err();
        assert!(matches!(err, UnifyError::Clash(..)));
    }

    #[test]
    fn tuple_lengths_must_match() {
        let a = Term::Tup(vec![Term::int(1)]);
        let b = Term::Tup(vec![Term::int(1), Term::int(2)]);
        let err = unify(&a, &b).unwrap_err();
        assert!(matches!(err, UnifyError::Arity(1, 2)));
    }

    #[test]
    fn bindings_thread_through_argument_lists() {
        // p(X, X) against p(1, Y) forces Y = 1
        let lhs = Term::atom("p", vec![Term::var("X"), Term::var("X")]);
        let rhs = Term::atom("p", vec![Term::int(1), Term::var("Y")]);
        let s = unify(&lhs, &rhs).unwrap();
        assert_eq!(s.apply(&Term::var("Y")), Term::int(1));
    }

    #[test]
    fn literals_clash_with_rigid_shapes() {
        let err = unify(&Term::int(1), &Term::cst("a")).unwrap_err();
        assert!(matches!(err, UnifyError::Clash(..)));
    }
}
