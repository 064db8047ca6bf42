use std::io::Write;
use std::process::{Command, Stdio};

use solhorn_smtlib::Term;

use crate::backend::HornBackend;
use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::parser::parse_horn_output;
use crate::result::{CheckResult, QueryOutcome};
use crate::system::{HornSystem, Relation};

/// Spacer options that rewrite the system before solving. Turning them off
/// keeps every relation visible in the derivation.
const PREPROCESSING_OPTIONS: [&str; 3] = [
    "fp.xform.slice",
    "fp.xform.inline_linear",
    "fp.xform.inline_eager",
];

/// Horn solver driven as a subprocess over SMT-LIB2 text.
///
/// Every query writes the complete system plus the goal to a fresh solver
/// process.
#[derive(Debug)]
pub struct CliHornSolver {
    config: SolverConfig,
    system: HornSystem,
    preprocessing: bool,
}

impl CliHornSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            system: HornSystem::new(),
            preprocessing: true,
        }
    }

    /// Create a solver with auto-detected Z3 location and default settings.
    pub fn with_default_config() -> Result<Self, SolverError> {
        Ok(Self::new(SolverConfig::auto_detect()?))
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn system(&self) -> &HornSystem {
        &self.system
    }

    /// Options prepended to every query script.
    fn query_options(&self) -> Vec<(String, String)> {
        let mut options = Vec::new();
        if self.config.produce_proofs {
            options.push(("produce-proofs".to_string(), "true".to_string()));
        }
        if !self.preprocessing && self.config.kind.supports_proofs() {
            options.extend(
                PREPROCESSING_OPTIONS
                    .iter()
                    .map(|opt| (opt.to_string(), "false".to_string())),
            );
        }
        options
    }

    /// Render the script that `query(goal)` would send.
    pub fn render_query(&self, goal: &Term) -> String {
        let script =
            self.system
                .query_script(goal, &self.query_options(), self.config.produce_proofs);
        format!("{script}\n")
    }

    /// Run the solver on raw SMT-LIB2 text.
    pub fn run_raw(&self, smtlib: &str) -> Result<QueryOutcome, SolverError> {
        self.config.validate()?;

        let args = self.config.build_args();
        let mut child = Command::new(&self.config.solver_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SolverError::ProcessError(format!("Failed to start {}: {e}", self.config.kind))
            })?;

        {
            let stdin = child.stdin.as_mut().ok_or_else(|| {
                SolverError::ProcessError(format!("Failed to open {} stdin", self.config.kind))
            })?;
            stdin.write_all(smtlib.as_bytes()).map_err(|e| {
                SolverError::ProcessError(format!("Failed to write to solver stdin: {e}"))
            })?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| SolverError::ProcessError(format!("Failed to wait for solver: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if stdout.trim() == "timeout" {
            return Ok(QueryOutcome::verdict(CheckResult::Unknown));
        }

        parse_horn_output(&stdout, &stderr)
    }
}

impl HornBackend for CliHornSolver {
    fn register_relation(&mut self, relation: &Relation) {
        self.system.register(relation);
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        self.system.add_rule(rule, name);
    }

    fn query(&mut self, goal: &Term) -> Result<QueryOutcome, SolverError> {
        let smtlib = self.render_query(goal);
        tracing::debug!(
            solver = %self.config.kind,
            relations = self.system.relations().len(),
            rules = self.system.rules().len(),
            "Running Horn query"
        );
        self.run_raw(&smtlib)
    }

    fn reset(&mut self) {
        self.system.clear();
        self.preprocessing = true;
    }

    fn set_preprocessing(&mut self, enabled: bool) -> bool {
        if !self.config.kind.supports_proofs() {
            return false;
        }
        self.preprocessing = enabled;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use solhorn_smtlib::Sort;

    use super::*;
    use crate::config::SolverKind;

    fn offline(kind: SolverKind) -> CliHornSolver {
        let mut solver = CliHornSolver::new(SolverConfig::new(kind, PathBuf::from("/nonexistent")));
        solver.register_relation(&Relation::new("err", vec![]));
        solver.register_relation(&Relation::new("p", vec![Sort::Int]));
        solver.add_rule(&Term::app("p", vec![Term::int(1)]), "fact");
        solver
    }

    #[test]
    fn render_includes_proof_request_for_z3() {
        let solver = offline(SolverKind::Z3);
        let text = solver.render_query(&Term::app("err", vec![]));
        assert!(text.starts_with("(set-option :produce-proofs true)\n(set-logic HORN)\n"));
        assert!(text.ends_with("(check-sat)\n(get-proof)\n"));
        assert!(!text.contains("fp.xform"));
    }

    #[test]
    fn disabling_preprocessing_adds_spacer_options() {
        let mut solver = offline(SolverKind::Z3);
        assert!(solver.set_preprocessing(false));
        let text = solver.render_query(&Term::app("err", vec![]));
        for opt in PREPROCESSING_OPTIONS {
            assert!(text.contains(&format!("(set-option :{opt} false)")));
        }
        solver.reset();
        assert!(solver.system().rules().is_empty());
    }

    #[test]
    fn eldarica_has_no_preprocessing_knob() {
        let mut solver = offline(SolverKind::Eldarica);
        assert!(!solver.set_preprocessing(false));
        let text = solver.render_query(&Term::app("err", vec![]));
        assert!(!text.contains("get-proof"));
        assert!(!text.contains("produce-proofs"));
    }

    #[test]
    fn missing_binary_is_an_error() {
        let mut solver = offline(SolverKind::Z3);
        assert!(matches!(
            solver.query(&Term::app("err", vec![])),
            Err(SolverError::NotFound(SolverKind::Z3, _))
        ));
    }
}
