//! Resolution rules for proof search. Rigid atoms resolve against fresh
//! clause variants; flexible atoms are lifted into set abstractions whose
//! carriers grow one element per demand, refined through the waybelow
//! relation.

use std::rc::Rc;

use thiserror::Error;

use crate::ast::Symbol;
use crate::logic::Search;
use crate::lower::{ClauseDb, RtClause};
use crate::solve::Goal;
use crate::subst::Subst;
use crate::term::Term;
use crate::types::Rho;
use crate::unify::{unify, unify_all, UnifyError};
use crate::util::VarGen;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("no resolution rule applies to {0}")]
    NoRule(Term),
    #[error("higher-order approximation of rigid symbol {0} is not implemented")]
    NotImpl(Symbol),
    #[error("rigid symbols {0} and {1} are incomparable")]
    IncomparableRigid(Symbol, Symbol),
    #[error(transparent)]
    Unify(#[from] UnifyError),
}

/// Resolve one atom into `(subgoal, substitution)` branches. Recoverable
/// failures become empty branches; `NotImpl` is surfaced as an error answer.
pub(crate) fn resolve(
    db: Rc<ClauseDb>,
    gen: VarGen,
    atom: Term,
) -> Search<Result<(Goal, Subst), crate::Error>> {
    match atom {
        Term::App(head, args) => match *head {
            Term::Rigid(name, _) => rigid_resolve(db, gen, name, args),
            Term::Flex(v, ty) => set_resolve(gen, lift_set(v, ty), args),
            set @ Term::Set(..) => set_resolve(gen, set, args),
            other => {
                let err = ResolveError::NoRule(Term::app(other, args));
                log::debug!("branch failed: {err}");
                Search::empty()
            }
        },
        other => {
            let err = ResolveError::NoRule(other);
            log::debug!("branch failed: {err}");
            Search::empty()
        }
    }
}

/// Rigid resolution: try every program clause for the atom's head symbol, on
/// a fresh variant of each.
fn rigid_resolve(
    db: Rc<ClauseDb>,
    gen: VarGen,
    name: Symbol,
    args: Vec<Term>,
) -> Search<Result<(Goal, Subst), crate::Error>> {
    let clauses = db.clauses_of(name, args.len()).to_vec();
    log::trace!("resolving {}/{} against {} clauses", name, args.len(), clauses.len());
    Search::choice(clauses.into_iter().map(move |clause| {
        let gen = gen.clone();
        let args = args.clone();
        Search::suspend(move || {
            let (params, body) = variant(&clause, &gen);
            match unify_all(&args, &params) {
                Ok(s) => Search::unit(Ok((body, s))),
                Err(err) => {
                    log::trace!("clause failed: {err}");
                    Search::empty()
                }
            }
        })
    }))
}

/// Rename every clause variable to a fresh variant.
fn variant(clause: &RtClause, gen: &VarGen) -> (Vec<Term>, Vec<Term>) {
    let renaming = Subst::renaming(
        clause
            .vars()
            .into_iter()
            .map(|(v, ty)| (v, (gen.variant(v), ty))),
    );
    (
        renaming.apply_all(&clause.params),
        renaming.apply_all(&clause.body),
    )
}

/// Wrap a flexible head as a set abstraction with an empty carrier and the
/// variable itself as the continuation witness.
pub(crate) fn lift_set(var: Symbol, ty: Rho) -> Term {
    Term::Set(vec![], vec![(var, ty)])
}

/// Set resolution: grow the carrier by one element derived from the current
/// demand. The last witness is the continuation by construction.
fn set_resolve(
    gen: VarGen,
    set: Term,
    args: Vec<Term>,
) -> Search<Result<(Goal, Subst), crate::Error>> {
    let Term::Set(_, witnesses) = &set else {
        unreachable!("set_resolve called on a non-set")
    };
    let Some((cont, cont_ty)) = witnesses.last().cloned() else {
        log::debug!("branch failed: set abstraction without a continuation witness");
        return Search::empty();
    };

    let elem = Term::Flex(gen.fresh("x"), Rho::Var(gen.fresh("a")));
    match waybelow(&elem, &Term::Tup(args), &gen) {
        Ok(s) => {
            let next = (gen.variant(cont), cont_ty);
            let grown = Term::Set(vec![elem], vec![next]);
            let s = s.combine(&Subst::bind(cont, grown));
            Search::unit(Ok((vec![], s)))
        }
        Err(err @ ResolveError::NotImpl(_)) => Search::unit(Err(err.into())),
        Err(err) => {
            log::debug!("branch failed: {err}");
            Search::empty()
        }
    }
}

/// The approximation relation `x` way-below `t`: any directed cover of `t`
/// is eventually above `x`. Used to finitize higher-order search.
pub(crate) fn waybelow(x: &Term, t: &Term, gen: &VarGen) -> Result<Subst, ResolveError> {
    match (x, t) {
        (Term::Flex(..), Term::Rigid(q, _)) => {
            if t.arity_of() == 0 {
                Ok(unify(x, t)?)
            } else {
                // Would require enumerating proofs of q with fresh
                // arguments.
                Err(ResolveError::NotImpl(*q))
            }
        }
        (Term::Flex(..), Term::Lit(_)) => Ok(unify(x, t)?),
        // no partial application in the language, so an application cannot
        // be higher-order here
        (Term::Flex(..), Term::App(..)) => Ok(unify(x, t)?),
        (Term::Flex(xv, x_ty), Term::Set(_, witnesses)) => {
            let Some((cont, cont_ty)) = witnesses.last().cloned() else {
                return Err(ResolveError::NoRule(t.clone()));
            };
            // force t's carrier to include x
            let next = (gen.variant(cont), cont_ty);
            let grown = Term::Set(vec![], vec![(*xv, x_ty.clone()), next]);
            Ok(Subst::bind(cont, grown))
        }
        (Term::Flex(..), Term::Flex(w, w_ty)) => {
            if w_ty.order() == 0 {
                Ok(unify(x, t)?)
            } else {
                waybelow(x, &lift_set(*w, w_ty.clone()), gen)
            }
        }
        (Term::Flex(xv, _), Term::Tup(items)) => {
            let fresh: Vec<Term> = items
                .iter()
                .map(|item| Term::Flex(gen.fresh("x"), item.type_of()))
                .collect();
            let mut s = Subst::success();
            for (xi, item) in fresh.iter().zip(items) {
                let u = waybelow(&s.apply(xi), &s.apply(item), gen)?;
                s = u.combine(&s);
            }
            Ok(s.combine(&Subst::bind(*xv, Term::Tup(fresh))))
        }
        (Term::Tup(xs), Term::Tup(ts)) => {
            if xs.len() != ts.len() {
                return Err(UnifyError::Arity(xs.len(), ts.len()).into());
            }
            let mut s = Subst::success();
            for (a, b) in xs.iter().zip(ts) {
                let u = waybelow(&s.apply(a), &s.apply(b), gen)?;
                s = u.combine(&s);
            }
            Ok(s)
        }
        (Term::Rigid(p, _), Term::Rigid(q, _)) => {
            if p == q {
                Ok(Subst::success())
            } else {
                Err(ResolveError::IncomparableRigid(*p, *q))
            }
        }
        _ => Err(UnifyError::Clash(x.clone(), t.clone()).into()),
    }
}
