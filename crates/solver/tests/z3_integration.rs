//! Integration tests against a real Z3 binary.
//!
//! Every test returns early when Z3 is not installed.

use solhorn_smtlib::{Sort, Term};
use solhorn_solver::{CheckResult, CliHornSolver, HornBackend, Relation, SolverConfig};

// ---- Helper ----

fn solver_or_skip() -> Option<CliHornSolver> {
    match SolverConfig::auto_detect() {
        Ok(config) => Some(CliHornSolver::new(config.with_timeout(10_000))),
        Err(e) => {
            eprintln!("skipping: {e}");
            None
        }
    }
}

fn x() -> Term {
    Term::var("x")
}

/// inv(0); inv(x) /\ x < limit => inv(x + 1); inv(x) /\ x > bad => err
fn counter(solver: &mut CliHornSolver, limit: i64, bad: i64) {
    solver.register_relation(&Relation::new("inv", vec![Sort::Int]));
    solver.register_relation(&Relation::new("err", vec![]));
    let vars = || vec![("x".to_string(), Sort::Int)];
    solver.add_rule(&Term::app("inv", vec![Term::int(0)]), "init");
    solver.add_rule(
        &Term::forall(
            vars(),
            Term::implies(
                Term::and(vec![
                    Term::app("inv", vec![x()]),
                    Term::lt(x(), Term::int(limit)),
                ]),
                Term::app("inv", vec![Term::add(x(), Term::int(1))]),
            ),
        ),
        "step",
    );
    solver.add_rule(
        &Term::forall(
            vars(),
            Term::implies(
                Term::and(vec![
                    Term::app("inv", vec![x()]),
                    Term::gt(x(), Term::int(bad)),
                ]),
                Term::app("err", vec![]),
            ),
        ),
        "bad",
    );
}

#[test]
fn unreachable_goal_is_unsat() {
    let Some(mut solver) = solver_or_skip() else {
        return;
    };
    counter(&mut solver, 10, 10);
    let outcome = solver.query(&Term::app("err", vec![])).unwrap();
    assert_eq!(outcome.result, CheckResult::Unsat);
}

#[test]
fn reachable_goal_is_sat_with_derivation() {
    let Some(mut solver) = solver_or_skip() else {
        return;
    };
    counter(&mut solver, 10, 2);
    assert!(solver.set_preprocessing(false));
    let outcome = solver.query(&Term::app("err", vec![])).unwrap();
    assert_eq!(outcome.result, CheckResult::Sat);
    if !outcome.graph.is_empty() {
        assert!(outcome.graph.find_node("inv").is_some());
    }
}

#[test]
fn reset_starts_a_fresh_system() {
    let Some(mut solver) = solver_or_skip() else {
        return;
    };
    counter(&mut solver, 10, 2);
    solver.reset();
    counter(&mut solver, 10, 10);
    let outcome = solver.query(&Term::app("err", vec![])).unwrap();
    assert_eq!(outcome.result, CheckResult::Unsat);
}
