//! A higher-order logic programming core.
//!
//! Two subsystems make up the crate. Type inference takes a
//! dependency-grouped program of predicate definitions, generates equality
//! constraints over a two-sort type grammar (individuals vs. predicates),
//! solves them, and generalizes each group into a polymorphic predicate
//! environment. Proof search then runs SLD resolution over the lowered
//! clauses, extended with set abstractions and the waybelow relation so
//! that goals with flexible (higher-order) heads can be answered by growing
//! finite approximations of predicate extensions.
//!
//! Surface parsing, operator tables, and the REPL are external
//! collaborators; programs arrive here already grouped into a dependency
//! DAG, and goals as runtime terms.

pub mod ast;
mod constraint;
mod logic;
mod lower;
mod resolve;
mod solve;
mod subst;
mod term;
mod typecheck;
pub mod types;
mod unify;
mod util;

use std::rc::Rc;

use thiserror::Error;

pub use ast::{
    Clause, DepGroup, Expr, ExprKind, Gets, Head, Literal, PredDef, Program, Span, SrcFile,
    Symbol, Typed, DUMMY_SPAN,
};
pub use constraint::Constraint;
pub use logic::{Answers, Poll, Search};
pub use lower::{lower, ClauseDb, LowerError, RtClause};
pub use resolve::ResolveError;
pub use solve::{prove, Goal};
pub use subst::Subst;
pub use term::Term;
pub use typecheck::{freshen, typecheck, typecheck_with, TypeError, TypeInfo};
pub use types::{Pi, Poly, Rho, TypeSubst};
pub use unify::{unify, unify_all, UnifyError};
pub use util::{IndexMap, IndexSet, VarGen};

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Unify(#[from] UnifyError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Lower(#[from] LowerError),
}

/// Ties the two halves together: typecheck a program, lower it, and answer
/// queries against it.
pub struct Engine {
    info: TypeInfo,
    db: Rc<ClauseDb>,
    gen: VarGen,
}

impl Default for Engine {
    fn default() -> Self {
        let gen = VarGen::new();
        Engine {
            info: TypeInfo::default(),
            db: Rc::new(ClauseDb::with_builtins(&gen)),
            gen,
        }
    }
}

impl Engine {
    /// Typecheck and lower a program. The first type error aborts the load.
    pub fn load(program: Program<Span>) -> Result<Engine, Error> {
        let gen = VarGen::new();
        let (typed, info) = typecheck_with(program, &gen)?;
        let db = lower(&typed, &gen)?;
        Ok(Engine {
            info,
            db: Rc::new(db),
            gen,
        })
    }

    /// The generalized predicate-type environment.
    pub fn type_info(&self) -> &TypeInfo {
        &self.info
    }

    pub fn db(&self) -> &ClauseDb {
        &self.db
    }

    /// Prove a goal; answers are substitutions restricted to the goal's
    /// variables, streamed fairly. Dropping the stream cancels the search.
    pub fn prove(&self, goal: Goal) -> Answers<Result<Subst, Error>> {
        prove(self.db.clone(), self.gen.clone(), goal)
    }
}
