//! The Horn-solving backend boundary.
//!
//! A backend accumulates relation declarations and closed rules for one
//! analysis pass and answers reachability queries over them. Two backends
//! ship with this crate: [`CliHornSolver`] drives a solver subprocess and
//! [`RecordedHornSolver`] replays previously captured answers.

use solhorn_smtlib::Term;

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::recorded::RecordedHornSolver;
use crate::result::QueryOutcome;
use crate::solver::CliHornSolver;
use crate::system::Relation;

/// Trait abstracting over Horn solvers.
pub trait HornBackend {
    /// Declare a relation. Registering the same relation twice is harmless.
    fn register_relation(&mut self, relation: &Relation);

    /// Add a closed rule (`forall vars. body => head`, or a fact).
    fn add_rule(&mut self, rule: &Term, name: &str);

    /// Ask whether `goal` (a nullary relation application) is derivable.
    fn query(&mut self, goal: &Term) -> Result<QueryOutcome, SolverError>;

    /// Forget every relation and rule.
    fn reset(&mut self);

    /// Toggle solver preprocessing that may shorten derivations. Returns
    /// `false` when the backend has no such knob.
    fn set_preprocessing(&mut self, _enabled: bool) -> bool {
        false
    }

    /// Queries the backend could not answer, as rendered scripts.
    fn unhandled_queries(&self) -> &[String] {
        &[]
    }
}

impl<B: HornBackend + ?Sized> HornBackend for Box<B> {
    fn register_relation(&mut self, relation: &Relation) {
        (**self).register_relation(relation)
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        (**self).add_rule(rule, name)
    }

    fn query(&mut self, goal: &Term) -> Result<QueryOutcome, SolverError> {
        (**self).query(goal)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn set_preprocessing(&mut self, enabled: bool) -> bool {
        (**self).set_preprocessing(enabled)
    }

    fn unhandled_queries(&self) -> &[String] {
        (**self).unhandled_queries()
    }
}

/// Create a subprocess backend for `config`.
pub fn create_backend(config: SolverConfig) -> Box<dyn HornBackend> {
    tracing::debug!("Using {} subprocess backend", config.kind);
    Box::new(CliHornSolver::new(config))
}

/// Create a Z3 backend if Z3 can be found, otherwise a recorded-response
/// backend with no recorded answers (every query then comes back unknown
/// and is kept as unhandled).
pub fn create_default_backend() -> Box<dyn HornBackend> {
    match SolverConfig::auto_detect() {
        Ok(config) => create_backend(config),
        Err(e) => {
            tracing::warn!(error = %e, "No Horn solver found, falling back to recorded responses");
            Box::new(RecordedHornSolver::default())
        }
    }
}
