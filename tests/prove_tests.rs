//! Proof search over loaded programs: resolution order, backtracking,
//! higher-order goals, and fairness of the answer stream.

use hoplog::{
    unify, Clause, DepGroup, Engine, Error, Expr, Head, Pi, Poll, PredDef, Program,
    ResolveError, Rho, Subst, Symbol, Term, UnifyError, DUMMY_SPAN,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn append_program() -> Program<hoplog::Span> {
    Program::single_group(vec![
        Clause::fact(
            "append",
            vec![Expr::list(vec![]), Expr::var("Ys"), Expr::var("Ys")],
        ),
        Clause::rule(
            "append",
            vec![
                Expr::list_with_tail(vec![Expr::var("X")], Expr::var("Xs")),
                Expr::var("Ys"),
                Expr::list_with_tail(vec![Expr::var("X")], Expr::var("Zs")),
            ],
            Expr::call(
                "append",
                vec![Expr::var("Xs"), Expr::var("Ys"), Expr::var("Zs")],
            ),
        ),
    ])
}

fn member_program() -> Program<hoplog::Span> {
    Program::single_group(vec![
        Clause::fact(
            "member",
            vec![
                Expr::var("X"),
                Expr::list_with_tail(vec![Expr::var("X")], Expr::anon()),
            ],
        ),
        Clause::rule(
            "member",
            vec![
                Expr::var("X"),
                Expr::list_with_tail(vec![Expr::anon()], Expr::var("T")),
            ],
            Expr::call("member", vec![Expr::var("X"), Expr::var("T")]),
        ),
    ])
}

fn answers_for(engine: &Engine, goal: Vec<Term>, var: &str) -> Vec<Term> {
    engine
        .prove(goal)
        .map(|r| r.unwrap().apply(&Term::var(var)))
        .collect()
}

#[test]
fn append_yields_exactly_one_answer() {
    init();
    let engine = Engine::load(append_program()).unwrap();
    let goal = vec![Term::atom(
        "append",
        vec![
            Term::list(vec![Term::int(1), Term::int(2)]),
            Term::list(vec![Term::int(3)]),
            Term::var("R"),
        ],
    )];
    let answers: Vec<_> = engine.prove(goal).collect();
    assert_eq!(answers.len(), 1);
    let ans = answers[0].as_ref().unwrap();
    assert_eq!(
        ans.apply(&Term::var("R")),
        Term::list(vec![Term::int(1), Term::int(2), Term::int(3)])
    );
}

#[test]
fn append_can_run_backwards() {
    init();
    // append(Xs, Ys, [1, 2]) has three splits
    let engine = Engine::load(append_program()).unwrap();
    let goal = vec![Term::atom(
        "append",
        vec![
            Term::var("Xs"),
            Term::var("Ys"),
            Term::list(vec![Term::int(1), Term::int(2)]),
        ],
    )];
    let answers: Vec<_> = engine.prove(goal).take(4).collect();
    assert_eq!(answers.len(), 3);
}

#[test]
fn member_backtracks_in_clause_order() {
    init();
    let engine = Engine::load(member_program()).unwrap();
    let goal = vec![Term::atom(
        "member",
        vec![
            Term::var("X"),
            Term::list(vec![Term::int(1), Term::int(2), Term::int(3)]),
        ],
    )];
    let answers = answers_for(&engine, goal, "X");
    assert_eq!(answers, vec![Term::int(1), Term::int(2), Term::int(3)]);
}

#[test]
fn conjunctions_constrain_earlier_answers() {
    init();
    let engine = Engine::load(member_program()).unwrap();
    let goal = vec![
        Term::atom(
            "member",
            vec![Term::var("X"), Term::list(vec![Term::int(1), Term::int(2)])],
        ),
        Term::atom("=", vec![Term::var("X"), Term::int(2)]),
    ];
    let answers = answers_for(&engine, goal, "X");
    assert_eq!(answers, vec![Term::int(2)]);
}

#[test]
fn call_threads_a_rigid_predicate_through_a_variable() {
    init();
    // call(P, X) :- P(X).  p(1).  p(2).
    let program = Program::single_group(vec![
        Clause::rule(
            "call",
            vec![Expr::var("P"), Expr::var("X")],
            Expr::apply(Expr::var("P"), vec![Expr::var("X")]),
        ),
        Clause::fact("p", vec![Expr::num(1)]),
        Clause::fact("p", vec![Expr::num(2)]),
    ]);
    let engine = Engine::load(program).unwrap();
    let p = Term::Rigid(
        Symbol::new("p"),
        Rho::Pred(Pi::Fun(vec![Rho::Ind], Box::new(Pi::Prop))),
    );
    let goal = vec![Term::atom("call", vec![p, Term::var("Y")])];
    let answers = answers_for(&engine, goal, "Y");
    assert_eq!(answers, vec![Term::int(1), Term::int(2)]);
}

#[test]
fn curried_heads_resolve_like_flat_ones() {
    init();
    // pair(1)(2): two application groups lower to one flat pair/2 clause
    let head = Head {
        name: Symbol::new("pair"),
        args: vec![vec![Expr::num(1)], vec![Expr::num(2)]],
        arity: 2,
        info: DUMMY_SPAN.clone(),
    };
    let clause = Clause {
        head,
        body: None,
        info: DUMMY_SPAN.clone(),
    };
    let program = Program::new(vec![DepGroup {
        preds: vec![PredDef {
            name: Symbol::new("pair"),
            arity: 2,
            clauses: vec![clause],
        }],
    }]);
    let engine = Engine::load(program).unwrap();
    let goal = vec![Term::atom("pair", vec![Term::int(1), Term::var("Y")])];
    let answers = answers_for(&engine, goal, "Y");
    assert_eq!(answers, vec![Term::int(2)]);
}

#[test]
fn flexible_goals_grow_a_set_abstraction() {
    init();
    // Q(5): the answer approximates Q by a set whose carrier contains (5)
    let engine = Engine::default();
    let q = Symbol::new("Q");
    let goal = vec![Term::app(
        Term::Flex(q, Rho::Pred(Pi::Fun(vec![Rho::Ind], Box::new(Pi::Prop)))),
        vec![Term::int(5)],
    )];
    let first = engine.prove(goal).next().unwrap().unwrap();
    match first.get(q) {
        Some(Term::Set(snapshot, witnesses)) => {
            assert_eq!(snapshot.as_slice(), [Term::Tup(vec![Term::int(5)])]);
            assert_eq!(witnesses.len(), 1);
        }
        other => panic!("expected a set abstraction for Q, got {other:?}"),
    }
}

#[test]
fn higher_order_waybelow_is_surfaced_as_not_implemented() {
    init();
    // approximating a set element against a non-nullary rigid is reserved
    let engine = Engine::default();
    let q = Symbol::new("Q");
    let p = Term::Rigid(
        Symbol::new("p"),
        Rho::Pred(Pi::Fun(vec![Rho::Ind], Box::new(Pi::Prop))),
    );
    let goal = vec![Term::app(
        Term::Flex(
            q,
            Rho::Pred(Pi::Fun(
                vec![Rho::Pred(Pi::Fun(vec![Rho::Ind], Box::new(Pi::Prop)))],
                Box::new(Pi::Prop),
            )),
        ),
        vec![p],
    )];
    let first = engine.prove(goal).next().unwrap();
    match first {
        Err(Error::Resolve(ResolveError::NotImpl(_))) => {}
        other => panic!("expected a surfaced NotImpl, got {other:?}"),
    }
}

#[test]
fn a_diverging_clause_cannot_starve_an_answer() {
    init();
    // q :- q.  q.
    let program = Program::single_group(vec![
        Clause::rule("q", vec![], Expr::call("q", vec![])),
        Clause::fact("q", vec![]),
    ]);
    let engine = Engine::load(program).unwrap();
    let answers: Vec<_> = engine.prove(vec![Term::atom0("q")]).take(1).collect();
    assert_eq!(answers.len(), 1);
    assert!(answers[0].is_ok());
}

#[test]
fn search_can_be_bounded_by_steps() {
    init();
    // loop :- loop.  -- no answers, but polling stays in control
    let program = Program::single_group(vec![Clause::rule(
        "loop",
        vec![],
        Expr::call("loop", vec![]),
    )]);
    let engine = Engine::load(program).unwrap();
    let mut answers = engine.prove(vec![Term::atom0("loop")]);
    assert!(matches!(answers.poll(500), Poll::OutOfFuel));
}

#[test]
fn answers_are_restricted_to_goal_variables() {
    init();
    let engine = Engine::load(append_program()).unwrap();
    let goal = vec![Term::atom(
        "append",
        vec![
            Term::list(vec![Term::int(1)]),
            Term::list(vec![Term::int(2)]),
            Term::var("R"),
        ],
    )];
    let ans = engine.prove(goal).next().unwrap().unwrap();
    let keys: Vec<_> = ans.iter().map(|(v, _)| *v).collect();
    assert_eq!(keys, vec![Symbol::new("R")]);
}

#[test]
fn occurs_check_rejects_cyclic_bindings() {
    init();
    // S6 at the embedding surface
    let v = Term::var("V");
    let t = Term::app(Term::cst("f"), vec![Term::var("V")]);
    let err = unify(&v, &t).unwrap_err();
    assert!(matches!(err, UnifyError::OccursCheck(..)));
}

#[test]
fn equality_goals_unify_like_the_builtin() {
    init();
    let engine = Engine::default();
    let goal = vec![Term::atom(
        "=",
        vec![
            Term::Tup(vec![Term::var("A"), Term::int(2)]),
            Term::Tup(vec![Term::int(1), Term::var("B")]),
        ],
    )];
    let ans = engine.prove(goal).next().unwrap().unwrap();
    assert_eq!(ans.apply(&Term::var("A")), Term::int(1));
    assert_eq!(ans.apply(&Term::var("B")), Term::int(2));
}

#[test]
fn failed_branches_produce_no_answers() {
    init();
    let engine = Engine::load(member_program()).unwrap();
    let goal = vec![Term::atom(
        "member",
        vec![Term::int(9), Term::list(vec![Term::int(1), Term::int(2)])],
    )];
    let answers: Vec<_> = engine.prove(goal).collect();
    assert!(answers.is_empty());
}

#[test]
fn answer_substitutions_are_idempotent() {
    init();
    let engine = Engine::load(append_program()).unwrap();
    let goal = vec![Term::atom(
        "append",
        vec![
            Term::var("Xs"),
            Term::var("Ys"),
            Term::list(vec![Term::int(1), Term::int(2)]),
        ],
    )];
    for ans in engine.prove(goal).take(3) {
        let ans: Subst = ans.unwrap();
        for var in ["Xs", "Ys"] {
            let t = Term::var(var);
            assert_eq!(ans.apply(&ans.apply(&t)), ans.apply(&t));
        }
    }
}
