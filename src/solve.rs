//! The SLD resolution driver: leftmost-atom selection, derivation, and
//! answer restriction. Answers stream out fairly; recoverable branch
//! failures are silent, while `NotImpl` surfaces as an error item.

use std::rc::Rc;

use crate::logic::{Answers, Search};
use crate::lower::ClauseDb;
use crate::resolve::resolve;
use crate::subst::Subst;
use crate::term::Term;
use crate::util::{IndexSet, VarGen};

/// A conjunction of atoms. The empty goal is success.
pub type Goal = Vec<Term>;

/// Refute `goal` against the program and report each answer restricted to
/// the goal's free variables.
pub fn prove(db: Rc<ClauseDb>, gen: VarGen, goal: Goal) -> Answers<Result<Subst, crate::Error>> {
    let mut vars = IndexSet::default();
    for atom in &goal {
        vars.extend(atom.vars_of());
    }
    log::debug!("proving a goal of {} atoms", goal.len());
    refute(db, gen, goal)
        .map(move |res| res.map(|ans| ans.restrict(&vars)))
        .answers()
}

fn refute(db: Rc<ClauseDb>, gen: VarGen, goal: Goal) -> Search<Result<Subst, crate::Error>> {
    if goal.is_empty() {
        return Search::unit(Ok(Subst::success()));
    }
    let db2 = db.clone();
    let gen2 = gen.clone();
    derive(db, gen, goal).and_then(move |step| match step {
        Err(err) => Search::unit(Err(err)),
        Ok((next, s)) => {
            let next = s.apply_all(&next);
            let db = db2.clone();
            let gen = gen2.clone();
            Search::suspend(move || refute(db, gen, next))
                .map(move |res| res.map(|ans| ans.combine(&s)))
        }
    })
}

/// One derivation step: pick the leftmost atom, resolve it, and graft the
/// subgoal onto the remaining conjunction.
fn derive(
    db: Rc<ClauseDb>,
    gen: VarGen,
    mut goal: Goal,
) -> Search<Result<(Goal, Subst), crate::Error>> {
    let atom = goal.remove(0);
    let rest = goal;
    resolve(db, gen, atom).map(move |res| {
        res.map(|(mut subgoal, s)| {
            subgoal.extend(rest.iter().cloned());
            (subgoal, s)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Symbol;
    use crate::lower::RtClause;

    fn builtins() -> (Rc<ClauseDb>, VarGen) {
        let gen = VarGen::new();
        let db = ClauseDb::with_builtins(&gen);
        (Rc::new(db), gen)
    }

    #[test]
    fn the_empty_goal_succeeds_once() {
        let (db, gen) = builtins();
        let answers: Vec<_> = prove(db, gen, vec![]).collect();
        assert_eq!(answers.len(), 1);
        assert!(answers[0].as_ref().unwrap().is_empty());
    }

    #[test]
    fn true_succeeds_and_fail_fails() {
        let (db, gen) = builtins();
        let answers: Vec<_> = prove(db.clone(), gen.clone(), vec![Term::atom0("true")]).collect();
        assert_eq!(answers.len(), 1);
        let answers: Vec<_> = prove(db, gen, vec![Term::atom0("fail")]).collect();
        assert!(answers.is_empty());
    }

    #[test]
    fn equality_unifies_its_arguments() {
        let (db, gen) = builtins();
        let goal = vec![Term::atom("=", vec![Term::var("X"), Term::int(3)])];
        let answers: Vec<_> = prove(db, gen, goal).collect();
        assert_eq!(answers.len(), 1);
        let ans = answers[0].as_ref().unwrap();
        assert_eq!(ans.apply(&Term::var("X")), Term::int(3));
    }

    #[test]
    fn facts_resolve_in_clause_order() {
        let gen = VarGen::new();
        let mut db = ClauseDb::with_builtins(&gen);
        let p = Symbol::new("p");
        for n in 1..=3 {
            db.add(
                p,
                1,
                RtClause {
                    params: vec![Term::int(n)],
                    body: vec![],
                },
            );
        }
        let goal = vec![Term::atom("p", vec![Term::var("X")])];
        let answers: Vec<_> = prove(Rc::new(db), gen, goal)
            .map(|r| r.unwrap().apply(&Term::var("X")))
            .collect();
        assert_eq!(answers, vec![Term::int(1), Term::int(2), Term::int(3)]);
    }
}
