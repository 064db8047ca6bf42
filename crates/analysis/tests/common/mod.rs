//! Shared helpers for the analysis integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use solhorn_analysis::ast::{ArithmeticOp, AstBuilder, NodeId, SourceUnit, Type};
use solhorn_analysis::{AnalysisReport, ChcAnalyzer, ChcSettings, ErrorReporter};
use solhorn_smtlib::Term;
use solhorn_solver::{CexGraph, CheckResult, HornBackend, QueryOutcome, Relation, SolverError};

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

/// One query as seen by the backend.
#[derive(Debug, Clone)]
pub struct AskedQuery {
    pub goal: String,
    /// Preprocessing state when the query was asked; `None` when the
    /// backend has no preprocessing switch.
    pub preprocessing: Option<bool>,
}

type Responder = Box<dyn FnMut(&Term, &[Relation]) -> Result<QueryOutcome, SolverError>>;

/// Backend that records everything it is given and answers queries from a
/// script instead of solving them.
pub struct ScriptedBackend {
    pub relations: Vec<Relation>,
    pub rules: Vec<(String, Term)>,
    pub queries: Vec<AskedQuery>,
    pub resets: usize,
    preprocessing: Option<bool>,
    responder: Responder,
}

impl ScriptedBackend {
    /// Answers every query with `result`.
    pub fn always(result: CheckResult) -> Self {
        Self::with_responder(move |_, _| Ok(QueryOutcome::verdict(result)))
    }

    /// Answers queries in order from `outcomes`, then unsat.
    pub fn queue(outcomes: impl IntoIterator<Item = QueryOutcome>) -> Self {
        let mut outcomes: VecDeque<QueryOutcome> = outcomes.into_iter().collect();
        Self::with_responder(move |_, _| {
            Ok(outcomes
                .pop_front()
                .unwrap_or_else(|| QueryOutcome::verdict(CheckResult::Unsat)))
        })
    }

    pub fn with_responder(
        responder: impl FnMut(&Term, &[Relation]) -> Result<QueryOutcome, SolverError> + 'static,
    ) -> Self {
        Self {
            relations: Vec::new(),
            rules: Vec::new(),
            queries: Vec::new(),
            resets: 0,
            preprocessing: None,
            responder: Box::new(responder),
        }
    }

    /// Give the backend a preprocessing switch, initially on.
    pub fn with_preprocessing_switch(mut self) -> Self {
        self.preprocessing = Some(true);
        self
    }

    pub fn preprocessing(&self) -> Option<bool> {
        self.preprocessing
    }

    pub fn relation_named(&self, predicate: impl Fn(&str) -> bool) -> Option<&Relation> {
        self.relations.iter().find(|r| predicate(&r.name))
    }
}

impl HornBackend for ScriptedBackend {
    fn register_relation(&mut self, relation: &Relation) {
        if !self.relations.iter().any(|r| r.name == relation.name) {
            self.relations.push(relation.clone());
        }
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        self.rules.push((name.to_string(), rule.clone()));
    }

    fn query(&mut self, goal: &Term) -> Result<QueryOutcome, SolverError> {
        self.queries.push(AskedQuery {
            goal: goal.to_string(),
            preprocessing: self.preprocessing,
        });
        (self.responder)(goal, &self.relations)
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.relations.clear();
        self.rules.clear();
    }

    fn set_preprocessing(&mut self, enabled: bool) -> bool {
        match &mut self.preprocessing {
            Some(state) => {
                *state = enabled;
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// `contract C { T x; function f(T a) public { x = x op a; } }`
pub struct BinaryOpContract {
    pub unit: SourceUnit,
    pub contract: NodeId,
    pub function: NodeId,
    /// The `x op a` expression.
    pub operation: NodeId,
}

pub fn binary_op_contract(op: ArithmeticOp, ty: Type) -> BinaryOpContract {
    let mut b = AstBuilder::new("c.sol");
    let x = b.var("x", ty.clone());
    let a = b.var("a", ty);
    let lhs = b.ident(&x);
    let rhs = b.ident(&a);
    let value = b.arith(op, lhs, rhs);
    let operation = value.id;
    let target = b.ident(&x);
    let assign = b.assign(target, value);
    let stmt = b.expr_stmt(assign);
    let f = b.function("f", vec![a], vec![], vec![stmt]);
    let function = f.id;
    let c = b.contract("C", vec![x], vec![f]);
    let contract = c.id;
    BinaryOpContract {
        unit: b.unit(vec![c]),
        contract,
        function,
        operation,
    }
}

/// Run one analysis pass and collect its diagnostics.
pub fn analyze<B: HornBackend>(
    analyzer: &mut ChcAnalyzer<B>,
    units: &[SourceUnit],
) -> (AnalysisReport, ErrorReporter) {
    let mut reporter = ErrorReporter::new();
    let report = analyzer.analyze(units, &mut reporter);
    (report, reporter)
}

pub fn analyzer(backend: ScriptedBackend) -> ChcAnalyzer<ScriptedBackend> {
    ChcAnalyzer::new(backend, ChcSettings::default())
}

/// A reachable outcome with the given derivation.
pub fn sat_with(graph: CexGraph) -> QueryOutcome {
    QueryOutcome::new(CheckResult::Sat, graph)
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
