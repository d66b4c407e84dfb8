//! The type inference engine: constraint generation over the surface syntax,
//! predicate-type environment management, and per-group generalization.
//!
//! Input programs arrive as a DAG of dependency groups in reverse
//! topological order (the collaborating preprocessor's contract). Each group
//! is inferred monomorphically, solved, then generalized into the outer
//! environment.

use thiserror::Error;

use crate::ast::{
    Clause, DepGroup, Expr, ExprKind, Gets, Head, PredDef, Program, Span, Symbol, Typed,
};
use crate::constraint::{solve, Constraint};
use crate::types::{Pi, Poly, Rho, TypeSubst};
use crate::util::{HashMap, IndexMap, IndexSet, VarGen};

#[derive(Debug, Clone, Error)]
pub enum TypeError {
    #[error("{origin}\ntype clash: expected {expected}, found {found}")]
    TypeClash {
        expected: Rho,
        found: Rho,
        origin: Span,
    },
    #[error("{origin}\noccurs check: cannot construct the infinite type {var} = {ty}")]
    OccursCheck { var: Symbol, ty: Rho, origin: Span },
    #[error("{origin}\narity mismatch for {name}: declared {declared}, used with {used}")]
    Arity {
        name: Symbol,
        declared: usize,
        used: usize,
        origin: Span,
    },
    #[error("{0}\ntype annotations are not implemented yet")]
    NotImpl(Span),
}

/// The predicate-type environment: `(name, arity)` to type scheme.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pred_types: HashMap<(Symbol, usize), Poly>,
}

impl Default for TypeInfo {
    fn default() -> Self {
        let mut info = TypeInfo {
            pred_types: Default::default(),
        };
        let a = Symbol::new("a");
        info.insert(
            Symbol::new("="),
            2,
            Poly {
                vars: vec![a],
                body: Pi::Fun(vec![Rho::Var(a), Rho::Var(a)], Box::new(Pi::Prop)),
            },
        );
        info.insert(Symbol::new("true"), 0, Poly::mono(Pi::Prop));
        info.insert(Symbol::new("fail"), 0, Poly::mono(Pi::Prop));
        info.insert(
            Symbol::new(","),
            2,
            Poly::mono(Pi::Fun(
                vec![Rho::prop(), Rho::prop()],
                Box::new(Pi::Prop),
            )),
        );
        info
    }
}

impl TypeInfo {
    pub fn lookup(&self, name: Symbol, arity: usize) -> Option<&Poly> {
        self.pred_types.get(&(name, arity))
    }

    pub fn insert(&mut self, name: Symbol, arity: usize, poly: Poly) {
        self.pred_types.insert((name, arity), poly);
    }

    /// Instantiate the scheme registered for `(name, arity)`, or fabricate
    /// the most general type of that arity for an unknown predicate.
    pub fn find_poly(&self, name: Symbol, arity: usize, gen: &VarGen) -> Pi {
        match self.lookup(name, arity) {
            Some(poly) => freshen(poly, gen),
            None => most_general(arity, gen),
        }
    }

    /// Type variables free somewhere in the environment. Generalization must
    /// not quantify over these.
    fn free_vars(&self) -> IndexSet<Symbol> {
        let mut acc = IndexSet::default();
        for poly in self.pred_types.values() {
            acc.extend(poly.free_vars());
        }
        acc
    }
}

/// Rename a scheme's quantified variables to fresh ones.
pub fn freshen(poly: &Poly, gen: &VarGen) -> Pi {
    if poly.vars.is_empty() {
        return poly.body.clone();
    }
    let renaming = TypeSubst::renaming(poly.vars.iter().map(|v| (*v, gen.variant(*v))));
    renaming.apply_pi(&poly.body)
}

/// The most general predicate type of a given arity: fresh argument
/// variables under a fresh return variable. Nullary predicates get a bare
/// return variable, which solves to `o` or stays open.
fn most_general(arity: usize, gen: &VarGen) -> Pi {
    if arity == 0 {
        return Pi::Var(gen.fresh("t"));
    }
    let args = (0..arity).map(|_| Rho::Var(gen.fresh("a"))).collect();
    Pi::Fun(args, Box::new(Pi::Var(gen.fresh("t"))))
}

/// Infer a whole program, group by group. The first failing group aborts
/// with its error; groups before it are already installed in the returned
/// environment's stead but the caller only sees the error.
pub fn typecheck(program: Program<Span>) -> Result<(Program<Typed>, TypeInfo), TypeError> {
    typecheck_with(program, &VarGen::new())
}

pub fn typecheck_with(
    program: Program<Span>,
    gen: &VarGen,
) -> Result<(Program<Typed>, TypeInfo), TypeError> {
    let mut info = TypeInfo::default();
    let mut groups = Vec::with_capacity(program.groups.len());
    for group in program.groups {
        groups.push(infer_group(&mut info, gen, group)?);
    }
    Ok((Program { groups }, info))
}

fn infer_group(
    info: &mut TypeInfo,
    gen: &VarGen,
    group: DepGroup<Span>,
) -> Result<DepGroup<Typed>, TypeError> {
    let ambient_free = info.free_vars();

    // Tentative monomorphic types for every predicate in the clique.
    let mut tentative = Vec::with_capacity(group.preds.len());
    for pred in &group.preds {
        let pi = most_general(pred.arity, gen);
        info.insert(pred.name, pred.arity, Poly::mono(pi.clone()));
        tentative.push((pred.name, pred.arity, pi));
    }

    let mut inf = Inferencer {
        info,
        gen,
        constraints: Vec::new(),
        exists: IndexMap::default(),
        locals: Vec::new(),
    };

    let mut preds = Vec::with_capacity(group.preds.len());
    for pred in group.preds {
        log::debug!("inferring {}/{}", pred.name, pred.arity);
        let mut clauses = Vec::with_capacity(pred.clauses.len());
        for clause in pred.clauses {
            clauses.push(inf.infer_clause(clause)?);
        }
        preds.push(PredDef {
            name: pred.name,
            arity: pred.arity,
            clauses,
        });
    }

    let constraints = std::mem::take(&mut inf.constraints);
    let subst = solve(&constraints)?;

    let preds: Vec<_> = preds
        .into_iter()
        .map(|p| {
            p.map_info(&mut |Typed { ty, span }| Typed {
                ty: subst.apply_rho(&ty),
                span,
            })
        })
        .collect();

    // Generalize: quantify the solved types over everything not pinned by
    // the ambient environment.
    for (name, arity, pi) in tentative {
        let solved = subst.apply_pi(&pi);
        let mut qvars = solved.free_vars();
        qvars.retain(|v| !ambient_free.contains(v));
        let poly = Poly {
            vars: qvars.into_iter().collect(),
            body: solved,
        };
        log::debug!("generalized {}/{} : {}", name, arity, poly);
        info.insert(name, arity, poly);
    }

    Ok(DepGroup { preds })
}

struct Inferencer<'a> {
    info: &'a mut TypeInfo,
    gen: &'a VarGen,
    constraints: Vec<Constraint>,
    /// Existential variables introduced inside the current clause.
    exists: IndexMap<Symbol, Rho>,
    /// Scoped bindings: head variables and lambda parameters. Pushed on
    /// entry, truncated on exit; lookup scans from the back so inner
    /// bindings shadow outer ones.
    locals: Vec<(Symbol, Rho)>,
}

impl Inferencer<'_> {
    fn constrain(&mut self, lhs: Rho, rhs: Rho, origin: &Span) {
        self.constraints.push(Constraint::new(lhs, rhs, origin.clone()));
    }

    fn fresh_rho(&self) -> Rho {
        Rho::Var(self.gen.fresh("a"))
    }

    fn fresh_pi(&self) -> Pi {
        Pi::Var(self.gen.fresh("t"))
    }

    fn infer_clause(&mut self, clause: Clause<Span>) -> Result<Clause<Typed>, TypeError> {
        self.exists.clear();
        let depth = self.locals.len();
        for v in clause.head.vars() {
            let ty = self.fresh_rho();
            self.locals.push((v, ty));
        }

        let (head, head_ty) = self.infer_head(clause.head)?;

        // The body reuses the head-variable bindings.
        let body = match clause.body {
            None => {
                self.constrain(head_ty, Rho::prop(), &head.info.span);
                None
            }
            Some((Gets::Mono, body)) => {
                let body = self.infer_expr(body)?;
                self.constrain(head_ty, Rho::prop(), &head.info.span);
                self.constrain(body.info.ty.clone(), Rho::prop(), &body.info.span);
                Some((Gets::Mono, body))
            }
            Some((Gets::Poly, body)) => {
                let body = self.infer_expr(body)?;
                self.constrain(body.info.ty.clone(), head_ty, &body.info.span);
                Some((Gets::Poly, body))
            }
        };

        self.locals.truncate(depth);

        // Clauses are propositions by convention.
        Ok(Clause {
            head,
            body,
            info: Typed::new(Rho::prop(), clause.info),
        })
    }

    fn infer_head(&mut self, head: Head<Span>) -> Result<(Head<Typed>, Rho), TypeError> {
        let pi = self.info.find_poly(head.name, head.arity, self.gen);
        let mut cur = Rho::Pred(pi);

        // Grouping is a parse artifact of curried heads; the predicate's
        // type speaks about the flattened argument list, so collect every
        // group's types into one constraint.
        let mut groups = Vec::with_capacity(head.args.len());
        let mut arg_tys = Vec::with_capacity(head.arity);
        for group in head.args {
            let typed: Vec<Expr<Typed>> = group
                .into_iter()
                .map(|e| self.infer_expr(e))
                .collect::<Result<_, _>>()?;
            arg_tys.extend(typed.iter().map(|e| e.info.ty.clone()));
            groups.push(typed);
        }
        if !arg_tys.is_empty() {
            let ret = self.fresh_pi();
            self.constrain(
                cur,
                Rho::Pred(Pi::Fun(arg_tys, Box::new(ret.clone()))),
                &head.info,
            );
            cur = Rho::Pred(ret);
        }

        let info = Typed::new(cur.clone(), head.info);
        Ok((
            Head {
                name: head.name,
                args: groups,
                arity: head.arity,
                info,
            },
            cur,
        ))
    }

    fn lookup_var(&mut self, v: Symbol) -> Rho {
        if let Some((_, ty)) = self.locals.iter().rev().find(|(name, _)| *name == v) {
            return ty.clone();
        }
        if let Some(ty) = self.exists.get(&v) {
            return ty.clone();
        }
        let ty = self.fresh_rho();
        self.exists.insert(v, ty.clone());
        ty
    }

    fn check_given_arity(
        &self,
        name: Symbol,
        given: Option<usize>,
        used: usize,
        origin: &Span,
    ) -> Result<(), TypeError> {
        match given {
            Some(declared) if declared != used => Err(TypeError::Arity {
                name,
                declared,
                used,
                origin: origin.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn infer_expr(&mut self, expr: Expr<Span>) -> Result<Expr<Typed>, TypeError> {
        let span = expr.info;
        let (kind, ty) = match expr.kind {
            ExprKind::Num(l) => (ExprKind::Num(l), Rho::Ind),
            ExprKind::Const {
                name,
                is_pred: false,
                given_arity,
                arity,
            } => (
                ExprKind::Const {
                    name,
                    is_pred: false,
                    given_arity,
                    arity,
                },
                Rho::Ind,
            ),
            ExprKind::Const {
                name,
                is_pred: true,
                given_arity,
                arity,
            } => {
                self.check_given_arity(name, given_arity, arity, &span)?;
                let pi = self.info.find_poly(name, arity, self.gen);
                (
                    ExprKind::Const {
                        name,
                        is_pred: true,
                        given_arity,
                        arity,
                    },
                    Rho::Pred(pi),
                )
            }
            ExprKind::PredConst {
                name,
                given_arity,
                arity,
            } => {
                self.check_given_arity(name, given_arity, arity, &span)?;
                let pi = self.info.find_poly(name, arity, self.gen);
                (
                    ExprKind::PredConst {
                        name,
                        given_arity,
                        arity,
                    },
                    Rho::Pred(pi),
                )
            }
            ExprKind::Var(v) => {
                let ty = self.lookup_var(v);
                (ExprKind::Var(v), ty)
            }
            ExprKind::Anon => (ExprKind::Anon, self.fresh_rho()),
            ExprKind::App(head, args) => {
                let functional = matches!(head.kind, ExprKind::Const { is_pred: false, .. });
                let head = self.infer_expr(*head)?;
                let args: Vec<Expr<Typed>> = args
                    .into_iter()
                    .map(|a| self.infer_expr(a))
                    .collect::<Result<_, _>>()?;
                if functional {
                    // Functional applications live in the individual sort.
                    for a in &args {
                        self.constrain(a.info.ty.clone(), Rho::Ind, &a.info.span);
                    }
                    (ExprKind::App(Box::new(head), args), Rho::Ind)
                } else {
                    let arg_tys: Vec<Rho> = args.iter().map(|a| a.info.ty.clone()).collect();
                    let ret = self.fresh_pi();
                    self.constrain(
                        head.info.ty.clone(),
                        Rho::Pred(Pi::Fun(arg_tys, Box::new(ret.clone()))),
                        &span,
                    );
                    (ExprKind::App(Box::new(head), args), Rho::Pred(ret))
                }
            }
            ExprKind::Op {
                name,
                is_pred: false,
                args,
            } => {
                let args: Vec<Expr<Typed>> = args
                    .into_iter()
                    .map(|a| self.infer_expr(a))
                    .collect::<Result<_, _>>()?;
                for a in &args {
                    self.constrain(a.info.ty.clone(), Rho::Ind, &a.info.span);
                }
                (
                    ExprKind::Op {
                        name,
                        is_pred: false,
                        args,
                    },
                    Rho::Ind,
                )
            }
            ExprKind::Op {
                name,
                is_pred: true,
                args,
            } => {
                let pi = self.info.find_poly(name, args.len(), self.gen);
                let args: Vec<Expr<Typed>> = args
                    .into_iter()
                    .map(|a| self.infer_expr(a))
                    .collect::<Result<_, _>>()?;
                let arg_tys: Vec<Rho> = args.iter().map(|a| a.info.ty.clone()).collect();
                let ret = self.fresh_pi();
                self.constrain(
                    Rho::Pred(pi),
                    Rho::Pred(Pi::Fun(arg_tys, Box::new(ret.clone()))),
                    &span,
                );
                (
                    ExprKind::Op {
                        name,
                        is_pred: true,
                        args,
                    },
                    Rho::Pred(ret),
                )
            }
            ExprKind::List(items, tail) => {
                let items: Vec<Expr<Typed>> = items
                    .into_iter()
                    .map(|e| self.infer_expr(e))
                    .collect::<Result<_, _>>()?;
                for e in &items {
                    self.constrain(e.info.ty.clone(), Rho::Ind, &e.info.span);
                }
                let tail = match tail {
                    Some(t) => {
                        let t = self.infer_expr(*t)?;
                        self.constrain(t.info.ty.clone(), Rho::Ind, &t.info.span);
                        Some(Box::new(t))
                    }
                    None => None,
                };
                (ExprKind::List(items, tail), Rho::Ind)
            }
            ExprKind::Eq(lhs, rhs) => {
                let lhs = self.infer_expr(*lhs)?;
                let rhs = self.infer_expr(*rhs)?;
                self.constrain(lhs.info.ty.clone(), rhs.info.ty.clone(), &span);
                (ExprKind::Eq(Box::new(lhs), Box::new(rhs)), Rho::prop())
            }
            ExprKind::Lam(params, body) => {
                let depth = self.locals.len();
                let mut param_tys = Vec::with_capacity(params.len());
                for p in &params {
                    let ty = self.fresh_rho();
                    param_tys.push(ty.clone());
                    self.locals.push((*p, ty));
                }
                let body = self.infer_expr(*body)?;
                self.locals.truncate(depth);
                let ret = self.fresh_pi();
                self.constrain(
                    body.info.ty.clone(),
                    Rho::Pred(ret.clone()),
                    &body.info.span,
                );
                (
                    ExprKind::Lam(params, Box::new(body)),
                    Rho::Pred(Pi::Fun(param_tys, Box::new(ret))),
                )
            }
            ExprKind::Paren(inner) => {
                let inner = self.infer_expr(*inner)?;
                let ty = inner.info.ty.clone();
                (ExprKind::Paren(Box::new(inner)), ty)
            }
            ExprKind::Ann(_, _) => return Err(TypeError::NotImpl(span)),
        };
        Ok(Expr {
            kind,
            info: Typed::new(ty, span),
        })
    }
}
