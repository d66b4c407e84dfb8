use std::fmt::Display;

use ordered_float::OrderedFloat;

use super::{Span, Symbol, DUMMY_SPAN};
use crate::types::Rho;
use crate::util::IndexSet;

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Literal {
    Int(i64),
    Float(OrderedFloat<f64>),
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Int(n)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Float(OrderedFloat(n))
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Int(i) => Display::fmt(i, f),
            Literal::Float(n) => {
                // display with a decimal point even when there is none
                let str = n.to_string();
                if str.parse::<i64>().is_ok() {
                    write!(f, "{}.0", str)
                } else {
                    write!(f, "{}", str)
                }
            }
        }
    }
}

/// A surface expression, polymorphic in the info payload `I` attached to
/// every node: a span straight out of the parser, a [`Typed`] pair after
/// inference.
///
/// [`Typed`]: super::Typed
#[derive(Debug, Clone, PartialEq)]
pub struct Expr<I> {
    pub kind: ExprKind<I>,
    pub info: I,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind<I> {
    Num(Literal),
    /// A named constant. `is_pred` records whether the front end resolved it
    /// to predicate status; `given_arity` is a user arity declaration, if
    /// any, and `arity` the arity assigned by the preprocessor.
    Const {
        name: Symbol,
        is_pred: bool,
        given_arity: Option<usize>,
        arity: usize,
    },
    /// A predicate constant used as a value rather than applied.
    PredConst {
        name: Symbol,
        given_arity: Option<usize>,
        arity: usize,
    },
    Var(Symbol),
    Anon,
    App(Box<Expr<I>>, Vec<Expr<I>>),
    Op {
        name: Symbol,
        is_pred: bool,
        args: Vec<Expr<I>>,
    },
    Lam(Vec<Symbol>, Box<Expr<I>>),
    List(Vec<Expr<I>>, Option<Box<Expr<I>>>),
    /// A unification goal `lhs = rhs`.
    Eq(Box<Expr<I>>, Box<Expr<I>>),
    Paren(Box<Expr<I>>),
    /// A user type annotation. Reserved; inference currently rejects it.
    Ann(Box<Expr<I>>, Rho),
}

impl<I> Expr<I> {
    pub fn map_info<J>(self, f: &mut impl FnMut(I) -> J) -> Expr<J> {
        let kind = match self.kind {
            ExprKind::Num(l) => ExprKind::Num(l),
            ExprKind::Const {
                name,
                is_pred,
                given_arity,
                arity,
            } => ExprKind::Const {
                name,
                is_pred,
                given_arity,
                arity,
            },
            ExprKind::PredConst {
                name,
                given_arity,
                arity,
            } => ExprKind::PredConst {
                name,
                given_arity,
                arity,
            },
            ExprKind::Var(v) => ExprKind::Var(v),
            ExprKind::Anon => ExprKind::Anon,
            ExprKind::App(head, args) => ExprKind::App(
                Box::new(head.map_info(f)),
                args.into_iter().map(|a| a.map_info(f)).collect(),
            ),
            ExprKind::Op {
                name,
                is_pred,
                args,
            } => ExprKind::Op {
                name,
                is_pred,
                args: args.into_iter().map(|a| a.map_info(f)).collect(),
            },
            ExprKind::Lam(params, body) => ExprKind::Lam(params, Box::new(body.map_info(f))),
            ExprKind::List(items, tail) => ExprKind::List(
                items.into_iter().map(|e| e.map_info(f)).collect(),
                tail.map(|t| Box::new(t.map_info(f))),
            ),
            ExprKind::Eq(a, b) => ExprKind::Eq(Box::new(a.map_info(f)), Box::new(b.map_info(f))),
            ExprKind::Paren(e) => ExprKind::Paren(Box::new(e.map_info(f))),
            ExprKind::Ann(e, ty) => ExprKind::Ann(Box::new(e.map_info(f)), ty),
        };
        Expr {
            kind,
            info: f(self.info),
        }
    }

    /// Named free variables, in order of first occurrence, no duplicates.
    pub fn free_vars(&self) -> IndexSet<Symbol> {
        let mut acc = IndexSet::default();
        self.collect_free_vars(&mut Vec::new(), &mut acc);
        acc
    }

    pub(crate) fn collect_free_vars(&self, bound: &mut Vec<Symbol>, acc: &mut IndexSet<Symbol>) {
        match &self.kind {
            ExprKind::Var(v) => {
                if !bound.contains(v) {
                    acc.insert(*v);
                }
            }
            ExprKind::Num(_)
            | ExprKind::Const { .. }
            | ExprKind::PredConst { .. }
            | ExprKind::Anon => {}
            ExprKind::App(head, args) => {
                head.collect_free_vars(bound, acc);
                for a in args {
                    a.collect_free_vars(bound, acc);
                }
            }
            ExprKind::Op { args, .. } => {
                for a in args {
                    a.collect_free_vars(bound, acc);
                }
            }
            ExprKind::Lam(params, body) => {
                let depth = bound.len();
                bound.extend(params.iter().copied());
                body.collect_free_vars(bound, acc);
                bound.truncate(depth);
            }
            ExprKind::List(items, tail) => {
                for e in items {
                    e.collect_free_vars(bound, acc);
                }
                if let Some(t) = tail {
                    t.collect_free_vars(bound, acc);
                }
            }
            ExprKind::Eq(a, b) => {
                a.collect_free_vars(bound, acc);
                b.collect_free_vars(bound, acc);
            }
            ExprKind::Paren(e) | ExprKind::Ann(e, _) => e.collect_free_vars(bound, acc),
        }
    }
}

impl<I: Clone + PartialEq> Expr<I> {
    /// Structural equality that ignores the info payloads. Inference compares
    /// shapes this way; proof search over concrete programs compares whole
    /// nodes instead.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.clone().map_info(&mut |_| ()) == other.clone().map_info(&mut |_| ())
    }
}

/// Constructors producing parser-shaped expressions with dummy spans. Real
/// front ends attach genuine spans; these are for tests and embedding.
impl Expr<Span> {
    fn node(kind: ExprKind<Span>) -> Self {
        Expr {
            kind,
            info: DUMMY_SPAN.clone(),
        }
    }

    pub fn num(n: impl Into<Literal>) -> Self {
        Self::node(ExprKind::Num(n.into()))
    }

    pub fn var(name: impl Into<Symbol>) -> Self {
        Self::node(ExprKind::Var(name.into()))
    }

    pub fn anon() -> Self {
        Self::node(ExprKind::Anon)
    }

    /// An individual (non-predicate) constant.
    pub fn cst(name: impl Into<Symbol>) -> Self {
        Self::node(ExprKind::Const {
            name: name.into(),
            is_pred: false,
            given_arity: None,
            arity: 0,
        })
    }

    /// A predicate constant used as a value, e.g. the `p` in `call(p, X)`.
    pub fn pred(name: impl Into<Symbol>, arity: usize) -> Self {
        Self::node(ExprKind::PredConst {
            name: name.into(),
            given_arity: None,
            arity,
        })
    }

    /// A predicate applied to arguments: `name(args...)`. With no arguments
    /// this is the bare proposition constant `name`.
    pub fn call(name: impl Into<Symbol>, args: Vec<Self>) -> Self {
        let head = Self::node(ExprKind::Const {
            name: name.into(),
            is_pred: true,
            given_arity: None,
            arity: args.len(),
        });
        if args.is_empty() {
            head
        } else {
            Self::node(ExprKind::App(Box::new(head), args))
        }
    }

    /// A functional (individual-valued) application: `name(args...)`.
    pub fn func(name: impl Into<Symbol>, args: Vec<Self>) -> Self {
        let head = Self::node(ExprKind::Const {
            name: name.into(),
            is_pred: false,
            given_arity: None,
            arity: args.len(),
        });
        Self::node(ExprKind::App(Box::new(head), args))
    }

    /// A generic application with an arbitrary head, e.g. `P(X)`.
    pub fn apply(head: Self, args: Vec<Self>) -> Self {
        Self::node(ExprKind::App(Box::new(head), args))
    }

    pub fn op(name: impl Into<Symbol>, is_pred: bool, args: Vec<Self>) -> Self {
        Self::node(ExprKind::Op {
            name: name.into(),
            is_pred,
            args,
        })
    }

    /// The conjunction `a , b`.
    pub fn conj(a: Self, b: Self) -> Self {
        Self::op(",", true, vec![a, b])
    }

    pub fn lam(params: Vec<Symbol>, body: Self) -> Self {
        Self::node(ExprKind::Lam(params, Box::new(body)))
    }

    pub fn list(items: Vec<Self>) -> Self {
        Self::node(ExprKind::List(items, None))
    }

    pub fn list_with_tail(items: Vec<Self>, tail: Self) -> Self {
        Self::node(ExprKind::List(items, Some(Box::new(tail))))
    }

    pub fn eq(lhs: Self, rhs: Self) -> Self {
        Self::node(ExprKind::Eq(Box::new(lhs), Box::new(rhs)))
    }

    pub fn paren(inner: Self) -> Self {
        Self::node(ExprKind::Paren(Box::new(inner)))
    }

    pub fn ann(inner: Self, ty: Rho) -> Self {
        Self::node(ExprKind::Ann(Box::new(inner), ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_vars_in_first_occurrence_order() {
        let e = Expr::call(
            "append",
            vec![
                Expr::var("Xs"),
                Expr::var("Ys"),
                Expr::list_with_tail(vec![Expr::var("Xs")], Expr::var("Zs")),
            ],
        );
        let vars: Vec<_> = e.free_vars().into_iter().collect();
        assert_eq!(
            vars,
            vec![Symbol::new("Xs"), Symbol::new("Ys"), Symbol::new("Zs")]
        );
    }

    #[test]
    fn lambda_binds_its_params() {
        let e = Expr::lam(
            vec![Symbol::new("X")],
            Expr::conj(
                Expr::call("p", vec![Expr::var("X")]),
                Expr::call("q", vec![Expr::var("Y")]),
            ),
        );
        let vars: Vec<_> = e.free_vars().into_iter().collect();
        assert_eq!(vars, vec![Symbol::new("Y")]);
    }

    #[test]
    fn same_shape_ignores_payloads() {
        let a = Expr::call("p", vec![Expr::var("X")]);
        let b = a.clone().map_info(&mut |_| DUMMY_SPAN.clone());
        assert!(a.same_shape(&b));
        let c = Expr::call("p", vec![Expr::var("Y")]);
        assert!(!a.same_shape(&c));
    }

    #[test]
    fn anonymous_variables_are_not_named() {
        let e = Expr::call("p", vec![Expr::anon(), Expr::var("X")]);
        assert_eq!(e.free_vars().len(), 1);
    }
}
