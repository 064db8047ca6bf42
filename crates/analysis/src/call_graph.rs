//! Call graph and assertion scoping.
//!
//! Records which functions each transaction root (a function, or a contract
//! standing for its constructor) calls internally, and which `assert` call
//! sites each scope contains. The encoder itself never walks this graph:
//! calls are summarized. It is only used to decide which assertions must be
//! checked from which transaction root.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::ast::NodeId;

/// Caller -> callees, plus per-scope assertion sets.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    /// Edges: caller -> callees
    edges: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Scope -> assertion call sites inside it
    assertions: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_call(&mut self, caller: NodeId, callee: NodeId) {
        self.edges.entry(caller).or_default().insert(callee);
    }

    pub fn add_assertion(&mut self, scope: NodeId, assertion: NodeId) {
        self.assertions.entry(scope).or_default().insert(assertion);
    }

    pub fn callees(&self, caller: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.get(&caller).into_iter().flatten().copied()
    }

    pub fn assertions_in(&self, scope: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.assertions.get(&scope).into_iter().flatten().copied()
    }

    /// Every assertion reachable from `root` through recorded calls.
    ///
    /// Breadth-first; each scope is visited once, so recursive call chains
    /// terminate.
    pub fn transaction_assertions(&self, root: NodeId) -> BTreeSet<NodeId> {
        let mut result = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([root]);
        visited.insert(root);

        while let Some(scope) = queue.pop_front() {
            result.extend(self.assertions_in(scope));
            for callee in self.callees(scope) {
                if visited.insert(callee) {
                    queue.push_back(callee);
                }
            }
        }

        tracing::trace!(root = %root, count = result.len(), "Collected transaction assertions");
        result
    }

    pub fn clear(&mut self) {
        self.edges.clear();
        self.assertions.clear();
    }
}
