use std::fmt::{Debug, Display};
use std::sync::Arc;

pub use symbol_table::GlobalSymbol;

use crate::types::Rho;
use crate::util::IndexSet;

mod expr;
pub use expr::*;

/// An interned name plus a generation counter. Parser-produced symbols carry
/// generation 0; every fresh variant minted by a [`VarGen`](crate::VarGen)
/// gets a generation nobody else has, so it can never collide with a source
/// name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    name: GlobalSymbol,
    gen: u32,
}

impl Symbol {
    pub fn new(name: impl Into<GlobalSymbol>) -> Self {
        Self {
            name: name.into(),
            gen: 0,
        }
    }

    pub(crate) fn with_gen(name: GlobalSymbol, gen: u32) -> Self {
        Self { name, gen }
    }

    /// The interned base name, without the generation.
    pub fn base(&self) -> GlobalSymbol {
        self.name
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The anonymous (wildcard) variable. The parser never produces `_` as a
    /// user identifier, so this name is distinguished.
    pub fn underscore() -> Self {
        Self::new("_")
    }

    pub fn is_underscore(&self) -> bool {
        self.gen == 0 && self.name.as_str() == "_"
    }

    pub fn is_fresh(&self) -> bool {
        self.gen != 0
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.gen == 0 {
            write!(f, "{}", self.name)
        } else {
            // `#` never appears in parser-produced names.
            write!(f, "{}#{}", self.name, self.gen)
        }
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// A [`Span`] contains the source file and a pair of byte offsets.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Span(Arc<SrcFile>, usize, usize);

lazy_static::lazy_static! {
    pub static ref DUMMY_SPAN: Span =
        Span(Arc::new(SrcFile { name: None, contents: String::new() }), 0, 0);
}

impl Span {
    pub fn new(file: Arc<SrcFile>, start: usize, end: usize) -> Self {
        Span(file, start, end)
    }

    pub fn string(&self) -> &str {
        &self.0.contents[self.1..self.2]
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SrcFile {
    pub name: Option<String>,
    pub contents: String,
}

struct Location {
    line: usize,
    col: usize,
}

impl SrcFile {
    fn get_location(&self, offset: usize) -> Location {
        let mut line = 1;
        let mut col = 1;
        for (i, c) in self.contents.char_indices() {
            if i == offset {
                break;
            }
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        Location { line, col }
    }
}

// `unwrap` and `expect` would print the entire source program without this.
impl Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let start = self.0.get_location(self.1);
        let end = self.0.get_location((self.2.saturating_sub(1)).max(self.1));
        let quote = self.string();
        match (&self.0.name, start.line == end.line) {
            (Some(file), true) => write!(
                f,
                "in {}:{}-{} of {file}: {quote}",
                start.line, start.col, end.col
            ),
            (Some(file), false) => write!(
                f,
                "in {}:{}-{}:{} of {file}: {quote}",
                start.line, start.col, end.line, end.col
            ),
            (None, true) => write!(f, "in {}:{}-{}: {quote}", start.line, start.col, end.col),
            (None, false) => write!(
                f,
                "in {}:{}-{}:{}: {quote}",
                start.line, start.col, end.line, end.col
            ),
        }
    }
}

/// Info payload after type inference: the node's type plus its original span.
#[derive(Debug, Clone, PartialEq)]
pub struct Typed {
    pub ty: Rho,
    pub span: Span,
}

impl Typed {
    pub fn new(ty: Rho, span: Span) -> Self {
        Typed { ty, span }
    }
}

/// Whether a clause body was given with `:-` (truth-valued) or with a
/// polymorphic `=`-style definition that commits the body to the head's type
/// rather than to `o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gets {
    Mono,
    Poly,
}

/// A clause head. `args` is a list of argument *groups* because heads may be
/// curried across several applications at parse time; the flattened list has
/// length `arity`.
#[derive(Debug, Clone, PartialEq)]
pub struct Head<I> {
    pub name: Symbol,
    pub args: Vec<Vec<Expr<I>>>,
    pub arity: usize,
    pub info: I,
}

impl<I> Head<I> {
    /// Named variables appearing in the head, in order of first occurrence.
    pub fn vars(&self) -> IndexSet<Symbol> {
        let mut acc = IndexSet::default();
        for group in &self.args {
            for arg in group {
                arg.collect_free_vars(&mut Vec::new(), &mut acc);
            }
        }
        acc
    }

    pub fn map_info<J>(self, f: &mut impl FnMut(I) -> J) -> Head<J> {
        Head {
            name: self.name,
            args: self
                .args
                .into_iter()
                .map(|group| group.into_iter().map(|e| e.map_info(f)).collect())
                .collect(),
            arity: self.arity,
            info: f(self.info),
        }
    }
}

/// A definite rule `H :- B`, a polymorphic definition, or (with no body) a
/// fact.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause<I> {
    pub head: Head<I>,
    pub body: Option<(Gets, Expr<I>)>,
    pub info: I,
}

impl<I> Clause<I> {
    pub fn map_info<J>(self, f: &mut impl FnMut(I) -> J) -> Clause<J> {
        Clause {
            head: self.head.map_info(f),
            body: self.body.map(|(gets, e)| (gets, e.map_info(f))),
            info: f(self.info),
        }
    }
}

impl Clause<Span> {
    fn with_head(name: Symbol, args: Vec<Expr<Span>>, body: Option<(Gets, Expr<Span>)>) -> Self {
        let arity = args.len();
        // a nullary head is a bare constant, not an empty application
        let args = if args.is_empty() { vec![] } else { vec![args] };
        Clause {
            head: Head {
                name,
                args,
                arity,
                info: DUMMY_SPAN.clone(),
            },
            body,
            info: DUMMY_SPAN.clone(),
        }
    }

    pub fn fact(name: impl Into<Symbol>, args: Vec<Expr<Span>>) -> Self {
        Self::with_head(name.into(), args, None)
    }

    pub fn rule(name: impl Into<Symbol>, args: Vec<Expr<Span>>, body: Expr<Span>) -> Self {
        Self::with_head(name.into(), args, Some((Gets::Mono, body)))
    }

    pub fn poly(name: impl Into<Symbol>, args: Vec<Expr<Span>>, body: Expr<Span>) -> Self {
        Self::with_head(name.into(), args, Some((Gets::Poly, body)))
    }
}

/// All clauses of one `(name, arity)` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct PredDef<I> {
    pub name: Symbol,
    pub arity: usize,
    pub clauses: Vec<Clause<I>>,
}

impl<I> PredDef<I> {
    pub fn map_info<J>(self, f: &mut impl FnMut(I) -> J) -> PredDef<J> {
        PredDef {
            name: self.name,
            arity: self.arity,
            clauses: self.clauses.into_iter().map(|c| c.map_info(f)).collect(),
        }
    }
}

/// A mutually recursive clique of predicate definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct DepGroup<I> {
    pub preds: Vec<PredDef<I>>,
}

impl<I> DepGroup<I> {
    pub fn map_info<J>(self, f: &mut impl FnMut(I) -> J) -> DepGroup<J> {
        DepGroup {
            preds: self.preds.into_iter().map(|p| p.map_info(f)).collect(),
        }
    }
}

/// A whole program: dependency groups in reverse topological order, as
/// produced by the collaborating preprocessor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program<I> {
    pub groups: Vec<DepGroup<I>>,
}

impl<I> Program<I> {
    pub fn new(groups: Vec<DepGroup<I>>) -> Self {
        Program { groups }
    }

    pub fn map_info<J>(self, f: &mut impl FnMut(I) -> J) -> Program<J> {
        Program {
            groups: self.groups.into_iter().map(|g| g.map_info(f)).collect(),
        }
    }
}

impl Program<Span> {
    /// Group a flat clause list by `(name, arity)` into a single dependency
    /// group, preserving first-occurrence order. Convenient for programs
    /// small enough that the dependency analysis would be a single clique
    /// anyway; real front ends hand us a proper DAG instead.
    pub fn single_group(clauses: Vec<Clause<Span>>) -> Self {
        let mut preds: Vec<PredDef<Span>> = Vec::new();
        for clause in clauses {
            let key = (clause.head.name, clause.head.arity);
            match preds.iter_mut().find(|p| (p.name, p.arity) == key) {
                Some(def) => def.clauses.push(clause),
                None => preds.push(PredDef {
                    name: key.0,
                    arity: key.1,
                    clauses: vec![clause],
                }),
            }
        }
        Program {
            groups: vec![DepGroup { preds }],
        }
    }
}
