//! Mutable state of one analysis pass.

use rustc_hash::FxHashMap;

use crate::ast::{NodeId, SourceLocation};
use crate::call_graph::CallGraph;
use crate::encoding_context::EncodingContext;
use crate::predicate::{PredicateId, PredicateRegistry};
use crate::verification_target::{ErrorIdTable, VerificationTarget};

/// Everything the encoder accumulates over one pass; built fresh for every
/// pass so nothing leaks between independent source sets.
#[derive(Debug, Default)]
pub struct Session {
    pub context: EncodingContext,
    pub registry: PredicateRegistry,
    pub call_graph: CallGraph,
    pub targets: Vec<VerificationTarget>,
    pub error_ids: ErrorIdTable,
    /// Contract -> interface predicate
    pub interfaces: FxHashMap<NodeId, PredicateId>,
    /// Contract -> nondeterministic interface predicate
    pub nondet_interfaces: FxHashMap<NodeId, PredicateId>,
    /// Contract -> constructor summary
    pub constructor_summaries: FxHashMap<NodeId, PredicateId>,
    /// (contract, function) -> function summary
    pub summaries: FxHashMap<(NodeId, NodeId), PredicateId>,
    pub rule_count: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint an error id for `node`.
    pub fn new_error_id(&mut self, node: NodeId, location: &SourceLocation) -> u64 {
        let id = self.context.new_unique_id();
        self.error_ids.record(node, location, id);
        id
    }

    pub fn interface(&self, contract: NodeId) -> PredicateId {
        *self
            .interfaces
            .get(&contract)
            .unwrap_or_else(|| panic!("no interface predicate for contract {contract}"))
    }

    pub fn nondet_interface(&self, contract: NodeId) -> PredicateId {
        *self
            .nondet_interfaces
            .get(&contract)
            .unwrap_or_else(|| panic!("no nondeterministic interface for contract {contract}"))
    }

    pub fn constructor_summary(&self, contract: NodeId) -> PredicateId {
        *self
            .constructor_summaries
            .get(&contract)
            .unwrap_or_else(|| panic!("no constructor summary for contract {contract}"))
    }

    pub fn summary(&self, contract: NodeId, function: NodeId) -> PredicateId {
        *self
            .summaries
            .get(&(contract, function))
            .unwrap_or_else(|| panic!("no summary for function {function} in contract {contract}"))
    }
}
