//! Lowering from the typed surface program to the runtime clause database:
//! list and conjunction desugaring, head flattening, and the built-in
//! clauses proof search expects to find.

use thiserror::Error;

use crate::ast::{Clause, Expr, ExprKind, Gets, Program, Span, Symbol, Typed};
use crate::term::Term;
use crate::types::{Pi, Rho};
use crate::util::{HashMap, IndexMap, VarGen};

#[derive(Debug, Clone, Error)]
pub enum LowerError {
    #[error("{0}\nlambda terms outside definition bodies are not implemented")]
    NotImpl(Span),
}

/// A runtime clause: flattened head parameters and the body as a list of
/// atoms (empty for a fact).
#[derive(Debug, Clone, PartialEq)]
pub struct RtClause {
    pub params: Vec<Term>,
    pub body: Vec<Term>,
}

impl RtClause {
    /// Every variable of the clause with its type, params first.
    pub(crate) fn vars(&self) -> IndexMap<Symbol, Rho> {
        let mut acc = IndexMap::default();
        for t in self.params.iter().chain(&self.body) {
            t.collect_vars(&mut acc);
        }
        acc
    }
}

/// The program as seen by proof search: clauses indexed by `(name, arity)`,
/// read-only and shared by all branches.
#[derive(Debug, Clone, Default)]
pub struct ClauseDb {
    clauses: HashMap<(Symbol, usize), Vec<RtClause>>,
}

impl ClauseDb {
    /// An otherwise-empty database carrying the built-in clauses: `=(X, X).`
    /// and `true.`; `fail` simply has no clauses.
    pub fn with_builtins(gen: &VarGen) -> Self {
        let mut db = ClauseDb::default();
        let x = gen.fresh("X");
        let a = Rho::Var(gen.fresh("a"));
        db.add(
            Symbol::new("="),
            2,
            RtClause {
                params: vec![Term::Flex(x, a.clone()), Term::Flex(x, a)],
                body: vec![],
            },
        );
        db.add(
            Symbol::new("true"),
            0,
            RtClause {
                params: vec![],
                body: vec![],
            },
        );
        db
    }

    pub fn add(&mut self, name: Symbol, arity: usize, clause: RtClause) {
        self.clauses.entry((name, arity)).or_default().push(clause);
    }

    pub fn clauses_of(&self, name: Symbol, arity: usize) -> &[RtClause] {
        self.clauses
            .get(&(name, arity))
            .map(|cs| cs.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.clauses.values().map(|cs| cs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Lower a typed program into a clause database seeded with the built-ins.
pub fn lower(program: &Program<Typed>, gen: &VarGen) -> Result<ClauseDb, LowerError> {
    let mut db = ClauseDb::with_builtins(gen);
    for group in &program.groups {
        for pred in &group.preds {
            for clause in &pred.clauses {
                let rt = lower_clause(clause, gen)?;
                // Poly clauses fold lambda parameters onto the head, so the
                // runtime arity is the parameter count, not the declared one.
                let arity = rt.params.len();
                db.add(pred.name, arity, rt);
            }
        }
    }
    log::debug!("lowered {} clauses", db.len());
    Ok(db)
}

fn lower_clause(clause: &Clause<Typed>, gen: &VarGen) -> Result<RtClause, LowerError> {
    let mut params = Vec::with_capacity(clause.head.arity);
    for group in &clause.head.args {
        for arg in group {
            params.push(lower_expr(arg, gen)?);
        }
    }

    let body = match &clause.body {
        None => vec![],
        Some((Gets::Mono, body)) => {
            let mut atoms = Vec::new();
            flatten_conj(body, gen, &mut atoms)?;
            atoms
        }
        Some((Gets::Poly, body)) => match &body.kind {
            // A lambda body folds its parameters onto the head: the
            // flattened-application reading of a curried definition.
            ExprKind::Lam(lam_params, inner) => {
                let param_tys = match &body.info.ty {
                    Rho::Pred(Pi::Fun(args, _)) => args.clone(),
                    _ => vec![Rho::Ind; lam_params.len()],
                };
                for (p, ty) in lam_params.iter().zip(param_tys) {
                    params.push(Term::Flex(*p, ty));
                }
                let mut atoms = Vec::new();
                flatten_conj(inner, gen, &mut atoms)?;
                atoms
            }
            // A non-lambda predicate body is eta-expanded to the head's
            // argument arity: `q = p` becomes `q(X1...Xn) :- p(X1...Xn)`.
            _ => match &body.info.ty {
                Rho::Pred(Pi::Fun(arg_tys, _)) => {
                    let fresh: Vec<Term> = arg_tys
                        .iter()
                        .map(|ty| Term::Flex(gen.fresh("X"), ty.clone()))
                        .collect();
                    let head = lower_expr(body, gen)?;
                    params.extend(fresh.iter().cloned());
                    vec![Term::app(head, fresh)]
                }
                _ => vec![as_atom(lower_expr(body, gen)?)],
            },
        },
    };

    Ok(RtClause { params, body })
}

/// Flatten a conjunction into its atom list.
fn flatten_conj(
    expr: &Expr<Typed>,
    gen: &VarGen,
    atoms: &mut Vec<Term>,
) -> Result<(), LowerError> {
    match &expr.kind {
        ExprKind::Op {
            name,
            is_pred: true,
            args,
        } if name.name() == "," && args.len() == 2 => {
            flatten_conj(&args[0], gen, atoms)?;
            flatten_conj(&args[1], gen, atoms)?;
        }
        ExprKind::Paren(inner) => flatten_conj(inner, gen, atoms)?,
        _ => atoms.push(as_atom(lower_expr(expr, gen)?)),
    }
    Ok(())
}

/// Nullary predicate references become nullary applications, so resolution
/// can dispatch on the application head uniformly.
fn as_atom(term: Term) -> Term {
    match term {
        Term::Rigid(_, Rho::Pred(_)) => Term::app(term, vec![]),
        other => other,
    }
}

fn lower_expr(expr: &Expr<Typed>, gen: &VarGen) -> Result<Term, LowerError> {
    let ty = &expr.info.ty;
    Ok(match &expr.kind {
        ExprKind::Num(l) => Term::Lit(l.clone()),
        ExprKind::Const {
            name,
            is_pred: false,
            ..
        } => Term::Rigid(*name, Rho::Ind),
        ExprKind::Const { name, .. } => Term::Rigid(*name, ty.clone()),
        ExprKind::PredConst { name, .. } => Term::Rigid(*name, ty.clone()),
        ExprKind::Var(v) => Term::Flex(*v, ty.clone()),
        ExprKind::Anon => Term::Flex(gen.fresh("_"), ty.clone()),
        ExprKind::App(head, args) => {
            let head = lower_expr(head, gen)?;
            let args = args
                .iter()
                .map(|a| lower_expr(a, gen))
                .collect::<Result<Vec<_>, _>>()?;
            match head {
                // currying was flattened away by the preprocessor; collapse
                // any leftover nesting
                Term::App(inner, mut first) => {
                    first.extend(args);
                    Term::App(inner, first)
                }
                head => Term::app(head, args),
            }
        }
        ExprKind::Op {
            name,
            is_pred,
            args,
        } => {
            let lowered = args
                .iter()
                .map(|a| lower_expr(a, gen))
                .collect::<Result<Vec<_>, _>>()?;
            let head_ty = if *is_pred {
                let ret = match ty {
                    Rho::Pred(pi) => pi.clone(),
                    _ => Pi::Prop,
                };
                Rho::Pred(Pi::Fun(
                    args.iter().map(|a| a.info.ty.clone()).collect(),
                    Box::new(ret),
                ))
            } else {
                Rho::Ind
            };
            Term::app(Term::Rigid(*name, head_ty), lowered)
        }
        ExprKind::List(items, tail) => {
            let mut term = match tail {
                Some(t) => lower_expr(t, gen)?,
                None => Term::nil(),
            };
            for item in items.iter().rev() {
                term = Term::cons(lower_expr(item, gen)?, term);
            }
            term
        }
        ExprKind::Eq(lhs, rhs) => {
            let head_ty = Rho::Pred(Pi::Fun(
                vec![lhs.info.ty.clone(), rhs.info.ty.clone()],
                Box::new(Pi::Prop),
            ));
            Term::app(
                Term::Rigid(Symbol::new("="), head_ty),
                vec![lower_expr(lhs, gen)?, lower_expr(rhs, gen)?],
            )
        }
        ExprKind::Paren(inner) => lower_expr(inner, gen)?,
        ExprKind::Lam(..) | ExprKind::Ann(..) => {
            return Err(LowerError::NotImpl(expr.info.span.clone()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Clause, Expr, Program};
    use crate::typecheck::typecheck_with;

    fn lower_program(clauses: Vec<Clause<Span>>) -> ClauseDb {
        let gen = VarGen::new();
        let (typed, _) = typecheck_with(Program::single_group(clauses), &gen).unwrap();
        lower(&typed, &gen).unwrap()
    }

    #[test]
    fn builtins_are_seeded() {
        let db = ClauseDb::with_builtins(&VarGen::new());
        assert_eq!(db.clauses_of(Symbol::new("="), 2).len(), 1);
        assert_eq!(db.clauses_of(Symbol::new("true"), 0).len(), 1);
        assert!(db.clauses_of(Symbol::new("fail"), 0).is_empty());
    }

    #[test]
    fn lists_become_cons_cells() {
        let db = lower_program(vec![Clause::fact(
            "p",
            vec![Expr::list(vec![Expr::num(1), Expr::num(2)])],
        )]);
        let clause = &db.clauses_of(Symbol::new("p"), 1)[0];
        assert_eq!(
            clause.params[0],
            Term::list(vec![Term::int(1), Term::int(2)])
        );
    }

    #[test]
    fn conjunctions_flatten_to_atom_lists() {
        let body = Expr::conj(
            Expr::call("q", vec![Expr::var("X")]),
            Expr::call("r", vec![Expr::var("X")]),
        );
        let db = lower_program(vec![
            Clause::rule("p", vec![Expr::var("X")], body),
            Clause::fact("q", vec![Expr::num(1)]),
            Clause::fact("r", vec![Expr::num(1)]),
        ]);
        let clause = &db.clauses_of(Symbol::new("p"), 1)[0];
        assert_eq!(clause.body.len(), 2);
    }

    #[test]
    fn poly_lambda_bodies_fold_params_onto_the_head() {
        // twice = \F, X. (F(X), F(X))  --- two extra head params
        let f = Symbol::new("F");
        let x = Symbol::new("X");
        let body = Expr::lam(
            vec![f, x],
            Expr::conj(
                Expr::apply(Expr::var("F"), vec![Expr::var("X")]),
                Expr::apply(Expr::var("F"), vec![Expr::var("X")]),
            ),
        );
        let db = lower_program(vec![Clause::poly("twice", vec![], body)]);
        let clause = &db.clauses_of(Symbol::new("twice"), 2)[0];
        assert_eq!(clause.params.len(), 2);
        assert_eq!(clause.body.len(), 2);
    }

    #[test]
    fn flex_headed_atoms_survive_lowering() {
        let db = lower_program(vec![
            Clause::rule(
                "call",
                vec![Expr::var("P"), Expr::var("X")],
                Expr::apply(Expr::var("P"), vec![Expr::var("X")]),
            ),
            Clause::fact("p", vec![Expr::num(1)]),
        ]);
        let clause = &db.clauses_of(Symbol::new("call"), 2)[0];
        match &clause.body[0] {
            Term::App(head, args) => {
                assert!(matches!(**head, Term::Flex(..)));
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected an application, got {other}"),
        }
    }
}
