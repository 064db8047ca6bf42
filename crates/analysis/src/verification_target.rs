//! Risky operations recorded during encoding and checked afterwards.

use std::collections::BTreeMap;
use std::fmt;

use solhorn_smtlib::Term;

use crate::ast::{ArithmeticOp, NodeId, SourceLocation, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetKind {
    Assert,
    Underflow,
    Overflow,
    /// Both directions of a signed operation; split before checking.
    UnderOverflow,
    DivByZero,
    PopEmptyArray,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetKind::Assert => "assertion",
            TargetKind::Underflow => "underflow",
            TargetKind::Overflow => "overflow",
            TargetKind::UnderOverflow => "underflow/overflow",
            TargetKind::DivByZero => "division by zero",
            TargetKind::PopEmptyArray => "empty array pop",
        };
        write!(f, "{s}")
    }
}

/// Which range checks an arithmetic operation needs.
///
/// `None` for `%` and for unsigned `/`; signed `/` can only overflow
/// (`min / -1`).
pub fn arithmetic_target(op: ArithmeticOp, ty: &Type) -> Option<TargetKind> {
    let signed = ty.is_signed();
    match op {
        ArithmeticOp::Mod => None,
        ArithmeticOp::Div if signed => Some(TargetKind::Overflow),
        ArithmeticOp::Div => None,
        _ if signed => Some(TargetKind::UnderOverflow),
        ArithmeticOp::Sub => Some(TargetKind::Underflow),
        ArithmeticOp::Add | ArithmeticOp::Mul => Some(TargetKind::Overflow),
    }
}

/// A place where the error flag may be set.
#[derive(Debug, Clone)]
pub struct VerificationTarget {
    pub kind: TargetKind,
    /// Expression for operation targets; function or contract for
    /// assertion targets.
    pub scope: NodeId,
    pub location: SourceLocation,
    /// Type of the guarded value (bounds in messages).
    pub ty: Type,
    /// Reachable-state application the error is derived from.
    pub from: Term,
    pub constraints: Term,
    /// Error flag value at the end of the guarded path.
    pub error_flag: Term,
    /// Ids minted for this target; two for `UnderOverflow` (under, over),
    /// none for assertion targets, whose ids come from the call graph.
    pub error_ids: Vec<u64>,
}

/// Ids minted per AST node, in minting order.
#[derive(Debug, Clone, Default)]
pub struct ErrorIdTable {
    ids: BTreeMap<NodeId, Vec<u64>>,
    locations: BTreeMap<NodeId, SourceLocation>,
}

impl ErrorIdTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node: NodeId, location: &SourceLocation, id: u64) {
        assert_ne!(id, 0, "error id 0 is reserved for \"no error\"");
        self.ids.entry(node).or_default().push(id);
        self.locations.entry(node).or_insert_with(|| location.clone());
    }

    pub fn ids(&self, node: NodeId) -> &[u64] {
        self.ids.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn location(&self, node: NodeId) -> Option<&SourceLocation> {
        self.locations.get(&node)
    }

    /// Every id of the pass, node by node.
    pub fn all_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids.values().flatten().copied()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.locations.clear();
    }
}
