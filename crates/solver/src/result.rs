use crate::cex_graph::CexGraph;

/// Verdict of a reachability query against a Horn system.
///
/// `Sat` means the queried goal is derivable: the property the goal
/// encodes can be violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckResult {
    /// The goal is reachable.
    Sat,
    /// The goal is unreachable; the property holds.
    Unsat,
    /// The solver could not decide (timeout, resource limit, ...).
    Unknown,
    /// Several solvers disagreed on the answer.
    Conflicting,
    /// The solver could not be invoked or its answer was unusable.
    Error,
}

impl CheckResult {
    pub fn is_sat(&self) -> bool {
        matches!(self, CheckResult::Sat)
    }

    pub fn is_unsat(&self) -> bool {
        matches!(self, CheckResult::Unsat)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CheckResult::Unknown)
    }
}

/// A verdict plus, when the goal is reachable and the backend could
/// provide one, the derivation graph that reaches it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub result: CheckResult,
    pub graph: CexGraph,
}

impl QueryOutcome {
    pub fn new(result: CheckResult, graph: CexGraph) -> Self {
        Self { result, graph }
    }

    /// An outcome that carries no derivation.
    pub fn verdict(result: CheckResult) -> Self {
        Self::new(result, CexGraph::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_predicates() {
        assert!(CheckResult::Sat.is_sat());
        assert!(!CheckResult::Sat.is_unsat());
        assert!(CheckResult::Unsat.is_unsat());
        assert!(CheckResult::Unknown.is_unknown());
        assert!(!CheckResult::Conflicting.is_unknown());
    }

    #[test]
    fn verdict_outcome_has_empty_graph() {
        let outcome = QueryOutcome::verdict(CheckResult::Unknown);
        assert!(outcome.graph.is_empty());
        assert_eq!(outcome.result, CheckResult::Unknown);
    }
}
