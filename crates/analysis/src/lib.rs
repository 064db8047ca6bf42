//! # solhorn-analysis
//!
//! Safety analysis of smart contracts through constrained Horn clauses.
//!
//! Every contract is translated into a Horn system whose relations stand
//! for program points, function summaries and the contract's state between
//! transactions. Each risky operation (assertion, arithmetic, division,
//! `pop()`) becomes a reachability query for a dedicated error relation:
//! unreachable means proved safe, reachable means a concrete transaction
//! sequence violates it.
//!
//! ## Usage
//!
//! ```no_run
//! use solhorn_analysis::{ChcAnalyzer, ChcSettings, ErrorReporter};
//! use solhorn_analysis::ast::{ArithmeticOp, AstBuilder, Type};
//! use solhorn_solver::create_default_backend;
//!
//! let mut b = AstBuilder::new("Counter.sol");
//! let count = b.var("count", Type::uint(8));
//! let lhs = b.ident(&count);
//! let one = b.number(1, Type::uint(8));
//! let sum = b.arith(ArithmeticOp::Add, lhs, one);
//! let target = b.ident(&count);
//! let assign = b.assign(target, sum);
//! let stmt = b.expr_stmt(assign);
//! let inc = b.function("inc", vec![], vec![], vec![stmt]);
//! let counter = b.contract("Counter", vec![count], vec![inc]);
//! let units = vec![b.unit(vec![counter])];
//!
//! let mut analyzer = ChcAnalyzer::new(create_default_backend(), ChcSettings::default());
//! let mut reporter = ErrorReporter::new();
//! let report = analyzer.analyze(&units, &mut reporter);
//! for warning in reporter.diagnostics() {
//!     println!("{warning}");
//! }
//! println!("{} rules", report.rule_count);
//! ```

pub mod ast;
pub mod call_graph;
pub mod checker;
pub mod counterexample;
pub mod diagnostics;
pub mod encoder;
pub mod encoding_context;
pub mod predicate;
pub mod session;
pub mod symbolic;
pub mod verification_target;

use solhorn_solver::HornBackend;

use crate::ast::{AstIndex, SourceUnit};
use crate::checker::{TargetChecker, Verdicts};
use crate::encoder::Encoder;
use crate::session::Session;

pub use diagnostics::{Diagnostic, DiagnosticSink, ErrorCode, ErrorReporter};
pub use verification_target::TargetKind;

/// Knobs of the analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChcSettings {
    /// Turn backend preprocessing off for every query instead of re-asking
    /// reachable queries without it.
    pub eager_precise_models: bool,
    /// Also warn about arithmetic and division targets the backend could
    /// not decide. Undecided empty pops are always reported.
    pub report_unknown: bool,
}

/// Outcome of one pass.
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    /// Scope -> target kinds proved unreachable.
    pub safe: Verdicts,
    /// Scope -> target kinds shown reachable.
    pub unsafe_targets: Verdicts,
    pub rule_count: usize,
    pub predicate_count: usize,
    /// Query scripts the backend had no answer for.
    pub unhandled_queries: Vec<String>,
}

impl AnalysisReport {
    pub fn is_safe(&self, scope: ast::NodeId, kind: TargetKind) -> bool {
        self.safe.get(&scope).is_some_and(|kinds| kinds.contains(&kind))
    }

    pub fn is_unsafe(&self, scope: ast::NodeId, kind: TargetKind) -> bool {
        self.unsafe_targets.get(&scope).is_some_and(|kinds| kinds.contains(&kind))
    }
}

/// Runs complete analysis passes against one backend.
pub struct ChcAnalyzer<B: HornBackend> {
    backend: B,
    settings: ChcSettings,
}

impl<B: HornBackend> ChcAnalyzer<B> {
    pub fn new(backend: B, settings: ChcSettings) -> Self {
        Self { backend, settings }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &ChcSettings {
        &self.settings
    }

    /// Encode every contract of `units` and check every target.
    ///
    /// Each call starts from an empty backend and a fresh session, so
    /// consecutive passes over different sources never share predicates,
    /// rules or error ids.
    pub fn analyze(&mut self, units: &[SourceUnit], sink: &mut dyn DiagnosticSink) -> AnalysisReport {
        tracing::info!(units = units.len(), "Analyzing sources");
        self.backend.reset();
        let ast = AstIndex::build(units);
        let mut session = Session::new();

        Encoder::new(&ast, &mut session, &mut self.backend).encode(units);
        tracing::info!(
            rules = session.rule_count,
            predicates = session.registry.len(),
            targets = session.targets.len(),
            "Encoding finished"
        );

        let mut checker = TargetChecker::new(&ast, &mut session, &mut self.backend, &self.settings, sink);
        checker.run();
        let (safe, unsafe_targets) = (checker.safe, checker.unsafe_targets);

        let report = AnalysisReport {
            safe,
            unsafe_targets,
            rule_count: session.rule_count,
            predicate_count: session.registry.len(),
            unhandled_queries: self.backend.unhandled_queries().to_vec(),
        };
        tracing::info!(
            safe_count = report.safe.values().map(|k| k.len()).sum::<usize>(),
            unsafe_count = report.unsafe_targets.values().map(|k| k.len()).sum::<usize>(),
            unhandled = report.unhandled_queries.len(),
            "Analysis finished"
        );
        report
    }
}
