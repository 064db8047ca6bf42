//! Backend that replays recorded solver answers.
//!
//! Answers are keyed by the SHA-256 of the exact query script, so a
//! recorded answer is only reused for a byte-identical query. Queries with
//! no recorded answer are answered unknown and kept for later inspection.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use solhorn_smtlib::Term;

use crate::backend::HornBackend;
use crate::error::SolverError;
use crate::parser::parse_horn_output;
use crate::result::{CheckResult, QueryOutcome};
use crate::system::{HornSystem, Relation};

/// Hex SHA-256 digest of a query script.
pub fn query_key(script: &str) -> String {
    let digest = Sha256::digest(script.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug)]
pub struct RecordedHornSolver {
    responses: HashMap<String, String>,
    system: HornSystem,
    unhandled: Vec<String>,
}

impl RecordedHornSolver {
    /// `responses` maps [`query_key`] digests to raw solver output.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            system: HornSystem::new(),
            unhandled: Vec::new(),
        }
    }

    /// Record `response` as the answer to `script`.
    pub fn record(&mut self, script: &str, response: impl Into<String>) {
        self.responses.insert(query_key(script), response.into());
    }

    pub fn system(&self) -> &HornSystem {
        &self.system
    }

    /// Render the script `query(goal)` would look up.
    ///
    /// There is no preprocessing switch: each goal has exactly one script,
    /// so one recorded answer covers it.
    pub fn render_query(&self, goal: &Term) -> String {
        format!("{}\n", self.system.query_script(goal, &[], true))
    }
}

impl Default for RecordedHornSolver {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl HornBackend for RecordedHornSolver {
    fn register_relation(&mut self, relation: &Relation) {
        self.system.register(relation);
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        self.system.add_rule(rule, name);
    }

    fn query(&mut self, goal: &Term) -> Result<QueryOutcome, SolverError> {
        let script = self.render_query(goal);
        match self.responses.get(&query_key(&script)) {
            Some(response) => parse_horn_output(response, ""),
            None => {
                tracing::debug!(goal = %goal, "No recorded response for query");
                if !self.unhandled.contains(&script) {
                    self.unhandled.push(script);
                }
                Ok(QueryOutcome::verdict(CheckResult::Unknown))
            }
        }
    }

    fn reset(&mut self) {
        self.system.clear();
        self.unhandled.clear();
    }

    fn unhandled_queries(&self) -> &[String] {
        &self.unhandled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal() -> Term {
        Term::app("err", vec![])
    }

    fn solver() -> RecordedHornSolver {
        let mut s = RecordedHornSolver::default();
        s.register_relation(&Relation::new("err", vec![]));
        s.add_rule(&goal(), "err_fact");
        s
    }

    #[test]
    fn query_key_is_hex_sha256() {
        assert_eq!(
            query_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn recorded_answer_is_replayed() {
        let mut s = solver();
        let script = s.render_query(&goal());
        s.record(&script, "unsat\n");
        let outcome = s.query(&goal()).unwrap();
        assert_eq!(outcome.result, CheckResult::Sat);
        assert!(s.unhandled_queries().is_empty());
    }

    #[test]
    fn missing_answer_is_unknown_and_kept_once() {
        let mut s = solver();
        assert_eq!(s.query(&goal()).unwrap().result, CheckResult::Unknown);
        assert_eq!(s.query(&goal()).unwrap().result, CheckResult::Unknown);
        assert_eq!(s.unhandled_queries().len(), 1);
        assert!(s.unhandled_queries()[0].contains("(assert (=> err false))"));
    }

    #[test]
    fn reachable_answer_needs_no_second_recording() {
        let mut s = solver();
        let script = s.render_query(&goal());
        s.record(&script, "unsat\n");
        assert!(s.query(&goal()).unwrap().result.is_sat());
        // No switch, so callers never re-ask with a different script.
        assert!(!s.set_preprocessing(false));
        assert_eq!(s.render_query(&goal()), script);
        assert!(s.unhandled_queries().is_empty());
    }

    #[test]
    fn reset_clears_unhandled() {
        let mut s = solver();
        let _ = s.query(&goal());
        s.reset();
        assert!(s.unhandled_queries().is_empty());
        assert!(s.system.rules().is_empty());
    }
}
