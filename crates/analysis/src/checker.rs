//! Reachability checks for the collected verification targets.
//!
//! Each check adds a fresh nullary error relation, one rule deriving it
//! from the target's reachable state when the error flag carries the
//! target's id, and asks the backend whether the relation is derivable.

use std::collections::{BTreeMap, BTreeSet};

use solhorn_smtlib::Term;
use solhorn_solver::{CheckResult, HornBackend, QueryOutcome};

use crate::ChcSettings;
use crate::ast::{AstIndex, NodeId, SourceLocation, Type};
use crate::counterexample;
use crate::diagnostics::{DiagnosticSink, ErrorCode, format_number_readable};
use crate::predicate::PredicateKind;
use crate::session::Session;
use crate::verification_target::{TargetKind, VerificationTarget};

/// Scope node -> target kinds with that verdict.
pub type Verdicts = BTreeMap<NodeId, BTreeSet<TargetKind>>;

/// One concrete query: a target kind, the node it is reported at and the
/// error id that identifies it.
struct Check<'t> {
    target: &'t VerificationTarget,
    kind: TargetKind,
    node: NodeId,
    location: SourceLocation,
    error_id: u64,
}

pub struct TargetChecker<'a, 's> {
    ast: &'a AstIndex<'a>,
    session: &'s mut Session,
    backend: &'s mut dyn HornBackend,
    settings: &'s ChcSettings,
    sink: &'s mut dyn DiagnosticSink,
    pub safe: Verdicts,
    pub unsafe_targets: Verdicts,
    /// Pairs with at least one query that did not come back unreachable.
    /// A pair is safe only when every one of its error ids is.
    undecided: BTreeSet<(NodeId, TargetKind)>,
}

impl<'a, 's> TargetChecker<'a, 's> {
    pub fn new(
        ast: &'a AstIndex<'a>,
        session: &'s mut Session,
        backend: &'s mut dyn HornBackend,
        settings: &'s ChcSettings,
        sink: &'s mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            ast,
            session,
            backend,
            settings,
            sink,
            safe: Verdicts::new(),
            unsafe_targets: Verdicts::new(),
            undecided: BTreeSet::new(),
        }
    }

    /// Check every target in the order it was recorded.
    pub fn run(&mut self) {
        let targets = std::mem::take(&mut self.session.targets);
        tracing::info!(targets = targets.len(), "Checking verification targets");
        self.session.context.clear_assertions();
        if self.settings.eager_precise_models && !self.backend.set_preprocessing(false) {
            tracing::debug!("Backend has no preprocessing switch; using default models");
        }

        for target in &targets {
            for check in self.expand(target) {
                self.check(&check);
            }
        }
        for (node, kinds) in &mut self.safe {
            kinds.retain(|kind| !self.undecided.contains(&(*node, *kind)));
        }
        self.safe.retain(|_, kinds| !kinds.is_empty());
        self.session.targets = targets;
    }

    /// Concrete checks of one target.
    ///
    /// Assertion targets fan out to every assertion reachable from the
    /// transaction root; two-sided range targets split into their two
    /// directions.
    fn expand<'t>(&self, target: &'t VerificationTarget) -> Vec<Check<'t>> {
        match target.kind {
            TargetKind::Assert => self
                .session
                .call_graph
                .transaction_assertions(target.scope)
                .into_iter()
                .flat_map(|assertion| {
                    let ids = self.session.error_ids.ids(assertion);
                    assert!(!ids.is_empty(), "assertion {assertion} has no error id");
                    let location = self
                        .session
                        .error_ids
                        .location(assertion)
                        .cloned()
                        .unwrap_or_else(|| target.location.clone());
                    // A site visited twice (do-while bodies) owns one id per visit.
                    ids.iter().map(move |&error_id| Check {
                        target,
                        kind: TargetKind::Assert,
                        node: assertion,
                        location: location.clone(),
                        error_id,
                    })
                })
                .collect(),
            TargetKind::UnderOverflow => {
                let &[under, over] = target.error_ids.as_slice() else {
                    panic!("two-sided target {} needs two error ids", target.scope);
                };
                vec![
                    self.single(target, TargetKind::Underflow, under),
                    self.single(target, TargetKind::Overflow, over),
                ]
            }
            kind => {
                let error_id = *target
                    .error_ids
                    .first()
                    .unwrap_or_else(|| panic!("{kind} target {} has no error id", target.scope));
                vec![self.single(target, kind, error_id)]
            }
        }
    }

    fn single<'t>(&self, target: &'t VerificationTarget, kind: TargetKind, error_id: u64) -> Check<'t> {
        Check {
            target,
            kind,
            node: target.scope,
            location: target.location.clone(),
            error_id,
        }
    }

    fn check(&mut self, check: &Check<'_>) {
        if self
            .unsafe_targets
            .get(&check.node)
            .is_some_and(|kinds| kinds.contains(&check.kind))
        {
            tracing::trace!(node = %check.node, kind = %check.kind, "Already unsafe, skipping");
            return;
        }

        let goal = self.add_error_rule(check);
        let outcome = self.query(&goal, &check.location);
        let (code, sat_message, unknown_message) = messages(check.kind, &check.target.ty, self.settings.report_unknown);

        if outcome.result != CheckResult::Unsat {
            self.undecided.insert((check.node, check.kind));
        }
        match outcome.result {
            CheckResult::Unsat => {
                self.safe.entry(check.node).or_default().insert(check.kind);
            }
            CheckResult::Sat => {
                self.unsafe_targets.entry(check.node).or_default().insert(check.kind);
                let name = goal.head_name().unwrap_or_default();
                let trace = counterexample::reconstruct(&outcome.graph, name, &self.session.registry, self.ast);
                if trace.is_none() && !outcome.graph.is_empty() {
                    tracing::debug!(graph = %outcome.graph.to_dot(), "Could not reconstruct a trace");
                }
                self.sink.warning(
                    code,
                    &check.location,
                    format!("CHC: {sat_message}"),
                    trace.map(|t| format!("\nCounterexample:\n{t}")),
                );
            }
            CheckResult::Unknown => {
                if let Some(message) = unknown_message {
                    self.sink.warning(code, &check.location, format!("CHC: {message}"), None);
                }
            }
            // Already reported by `query`.
            CheckResult::Conflicting | CheckResult::Error => {}
        }
    }

    /// `from ∧ constraints ∧ error = id ⇒ error_target_N`; returns the goal.
    fn add_error_rule(&mut self, check: &Check<'_>) -> Term {
        let name = format!("error_target_{}", self.session.context.new_unique_id());
        let id = self
            .session
            .registry
            .create(&mut *self.backend, Vec::new(), name.clone(), PredicateKind::Error, None, None);
        let goal = self.session.registry.get(id).apply(Vec::new());

        let target = check.target;
        let body = Term::and([
            target.from.clone(),
            target.constraints.clone(),
            Term::eq(target.error_flag.clone(), Term::int(check.error_id)),
        ]);
        let rule = self.session.context.quantify(Term::implies(body, goal.clone()));
        self.backend.add_rule(&rule, &format!("{}_to_{name}", target.from.head_name().unwrap_or("rule")));
        self.session.rule_count += 1;
        goal
    }

    /// Ask the backend; a reachable answer is re-asked with preprocessing
    /// off when the backend allows it, since preprocessing can drop
    /// variables from the derivation.
    fn query(&mut self, goal: &Term, location: &SourceLocation) -> QueryOutcome {
        let first = self.ask(goal);
        if first.result.is_sat() && !self.settings.eager_precise_models && self.backend.set_preprocessing(false) {
            let second = self.backend.query(goal);
            self.backend.set_preprocessing(true);
            match second {
                Ok(outcome) if outcome.result.is_sat() => return outcome,
                Ok(outcome) => {
                    tracing::debug!(result = ?outcome.result, "Precise re-query did not confirm, keeping first model")
                }
                Err(err) => tracing::warn!(error = %err, "Precise re-query failed, keeping first model"),
            }
        }

        match first.result {
            CheckResult::Conflicting => {
                tracing::warn!(goal = %goal, "Backends disagree");
                self.sink.warning(
                    ErrorCode::CONFLICTING_ANSWERS,
                    location,
                    "CHC: At least two SMT solvers provided conflicting answers. Results might not be sound."
                        .to_string(),
                    None,
                );
            }
            CheckResult::Error => {
                self.sink.warning(
                    ErrorCode::SOLVER_ERROR,
                    location,
                    "CHC: Error trying to invoke SMT solver.".to_string(),
                    None,
                );
            }
            _ => {}
        }
        first
    }

    fn ask(&mut self, goal: &Term) -> QueryOutcome {
        match self.backend.query(goal) {
            Ok(outcome) => {
                tracing::debug!(goal = %goal, result = ?outcome.result, "Query answered");
                outcome
            }
            Err(err) => {
                tracing::warn!(goal = %goal, error = %err, "Backend query failed");
                QueryOutcome::verdict(CheckResult::Error)
            }
        }
    }
}

/// Diagnostic code, message when reachable, and message when undecided.
fn messages(kind: TargetKind, ty: &Type, report_unknown: bool) -> (ErrorCode, String, Option<String>) {
    let bounded = if ty.is_integer() { ty.clone() } else { Type::uint256() };
    let (code, sat, unknown) = match kind {
        TargetKind::Assert => (ErrorCode::ASSERTION, "Assertion violation happens here.".to_string(), None),
        TargetKind::PopEmptyArray => {
            return (
                ErrorCode::POP_EMPTY_ARRAY,
                "Empty array \"pop\" detected here.".to_string(),
                Some("Empty array \"pop\" might happen here.".to_string()),
            );
        }
        TargetKind::DivByZero => (
            ErrorCode::DIVISION_BY_ZERO,
            "Division by zero happens here.".to_string(),
            Some("Division by zero might happen here.".to_string()),
        ),
        TargetKind::Underflow | TargetKind::UnderOverflow => {
            let min = bounded.min_value().map(|v| format_number_readable(&v)).unwrap_or_default();
            let what = format!("Underflow (resulting value less than {min})");
            (
                ErrorCode::UNDERFLOW,
                format!("{what} happens here."),
                Some(format!("{what} might happen here.")),
            )
        }
        TargetKind::Overflow => {
            let max = bounded.max_value().map(|v| format_number_readable(&v)).unwrap_or_default();
            let what = format!("Overflow (resulting value larger than {max})");
            (
                ErrorCode::OVERFLOW,
                format!("{what} happens here."),
                Some(format!("{what} might happen here.")),
            )
        }
    };
    (code, sat, unknown.filter(|_| report_unknown))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_messages_use_readable_bounds() {
        let (code, sat, _) = messages(TargetKind::Overflow, &Type::uint256(), true);
        assert_eq!(code, ErrorCode::OVERFLOW);
        assert_eq!(sat, "Overflow (resulting value larger than 2**256 - 1) happens here.");
        let (code, sat, _) = messages(TargetKind::Underflow, &Type::int(8), true);
        assert_eq!(code, ErrorCode::UNDERFLOW);
        assert_eq!(sat, "Underflow (resulting value less than -128) happens here.");
    }

    #[test]
    fn unknown_messages_follow_the_setting() {
        assert_eq!(messages(TargetKind::Assert, &Type::Bool, true).2, None);
        assert!(messages(TargetKind::Overflow, &Type::uint(8), true).2.is_some());
        assert_eq!(messages(TargetKind::Overflow, &Type::uint(8), false).2, None);
        assert_eq!(messages(TargetKind::DivByZero, &Type::uint(8), false).2, None);
        // Empty pops are always worth mentioning.
        assert!(messages(TargetKind::PopEmptyArray, &Type::uint256(), false).2.is_some());
    }
}
