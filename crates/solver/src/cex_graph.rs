//! Derivation graphs returned by Horn solvers for reachable goals.
//!
//! Each node is one instantiated relation application (`name(args...)`),
//! each edge points from a derived fact to one of the facts it was derived
//! from. Node `0` is the root when the graph is non-empty.

use std::collections::BTreeMap;
use std::fmt::Write;

/// Identifier of a node inside a [`CexGraph`].
pub type CexNodeId = u32;

/// One instantiated relation in a derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CexNode {
    /// Relation name.
    pub name: String,
    /// Concrete argument values as rendered by the solver.
    pub args: Vec<String>,
}

impl CexNode {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// `name(arg1, arg2, ...)`
    pub fn label(&self) -> String {
        format!("{}({})", self.name, self.args.join(", "))
    }
}

/// A rooted directed acyclic derivation graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CexGraph {
    pub nodes: BTreeMap<CexNodeId, CexNode>,
    pub edges: BTreeMap<CexNodeId, Vec<CexNodeId>>,
}

impl CexGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Insert a node and return its id. Ids are assigned densely from 0.
    pub fn add_node(&mut self, node: CexNode) -> CexNodeId {
        let id = self.nodes.len() as CexNodeId;
        self.nodes.insert(id, node);
        self.edges.entry(id).or_default();
        id
    }

    /// Record that `parent` was derived using `child`.
    pub fn add_edge(&mut self, parent: CexNodeId, child: CexNodeId) {
        self.edges.entry(parent).or_default().push(child);
    }

    pub fn node(&self, id: CexNodeId) -> Option<&CexNode> {
        self.nodes.get(&id)
    }

    pub fn children(&self, id: CexNodeId) -> &[CexNodeId] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First node (in id order) whose relation is `name`.
    pub fn find_node(&self, name: &str) -> Option<CexNodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| *id)
    }

    /// Render the graph in Graphviz DOT syntax, edges pointing from a
    /// derived fact to its premises.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph {\n");
        for (id, node) in &self.nodes {
            let label = node.label().replace('"', "\\\"");
            let _ = writeln!(dot, "  n{id} [label=\"{label}\"];");
        }
        for (parent, children) in &self.edges {
            for child in children {
                let _ = writeln!(dot, "  n{parent} -> n{child};");
            }
        }
        dot.push('}');
        dot
    }
}
