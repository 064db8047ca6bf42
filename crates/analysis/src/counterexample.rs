//! Transaction traces from derivation graphs.
//!
//! A reachable error node derives from the summary of the transaction that
//! failed and, unless that transaction is the constructor, from the
//! interface the contract was in before it. That interface derives from the
//! previous transaction's summary and the interface before it, and so on.
//! Walking this chain from the error node visits transactions newest first.

use solhorn_solver::{CexGraph, CexNode, CexNodeId};

use crate::ast::{AstIndex, FunctionDefinition, VariableDeclaration};
use crate::predicate::{Predicate, PredicateKind, PredicateRegistry};
use crate::symbolic::component_count;

/// The children of one derivation step, classified by predicate kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Derivation {
    summary: CexNodeId,
    /// State before the transaction; absent for the constructor.
    interface: Option<CexNodeId>,
}

/// Render the trace leading to `root`, or `None` when the graph does not
/// contain `root` or does not have the expected shape.
pub fn reconstruct(graph: &CexGraph, root: &str, registry: &PredicateRegistry, ast: &AstIndex<'_>) -> Option<String> {
    let mut node = graph.find_node(root)?;
    let mut path = Vec::new();
    let mut local_state: Option<String> = None;

    while !graph.children(node).is_empty() {
        let step = classify(graph, registry, node)?;
        let summary_node = graph.node(step.summary)?;
        let predicate = registry.by_name(&summary_node.name)?;
        let summary = Summary::read(predicate, summary_node, ast)?;

        match &local_state {
            None => local_state = Some(summary.local_state()),
            Some(_) => path.push(format!("State: {}", summary.state())),
        }
        path.push(summary.call());

        match step.interface {
            Some(interface) => node = interface,
            None => break,
        }
    }

    path.reverse();
    Some(format!(
        "{}\n\nTransaction trace:\n{}",
        local_state.unwrap_or_default(),
        path.join("\n")
    ))
}

fn kind_of(graph: &CexGraph, registry: &PredicateRegistry, id: CexNodeId) -> Option<PredicateKind> {
    let node = graph.node(id)?;
    registry.by_name(&node.name).map(|p| p.kind)
}

fn classify(graph: &CexGraph, registry: &PredicateRegistry, node: CexNodeId) -> Option<Derivation> {
    let derivation = match *graph.children(node) {
        [summary] => Derivation {
            summary,
            interface: None,
        },
        [first, second] => {
            let (summary, interface) = if kind_of(graph, registry, first)?.is_summary() {
                (first, second)
            } else {
                (second, first)
            };
            Derivation {
                summary,
                interface: Some(interface),
            }
        }
        ref children => {
            tracing::warn!(node, count = children.len(), "Unexpected number of premises in derivation");
            return None;
        }
    };

    let summary_ok = kind_of(graph, registry, derivation.summary)?.is_summary();
    let interface_ok = match derivation.interface {
        Some(id) => kind_of(graph, registry, id)?.is_interface(),
        None => true,
    };
    if !(summary_ok && interface_ok) {
        tracing::warn!(node, "Derivation step is not a summary over an interface");
        return None;
    }
    Some(derivation)
}

/// Argument values of a summary application, split by role.
struct Summary<'a> {
    function: Option<&'a FunctionDefinition>,
    state_variables: Vec<&'a VariableDeclaration>,
    state: Vec<String>,
    pre_params: Vec<String>,
    post_params: Vec<String>,
    returns: Vec<String>,
}

impl<'a> Summary<'a> {
    fn read(predicate: &Predicate, node: &CexNode, ast: &AstIndex<'a>) -> Option<Self> {
        let contract = ast.contract(predicate.contract?)?;
        let state_variables = ast.state_variables(contract);
        let function = match predicate.kind {
            PredicateKind::FunctionSummary => Some(ast.function(predicate.node?)?),
            _ => None,
        };

        let sv_width = width(&state_variables);
        let mut args = Arguments(&node.args);

        // error, this, pre-state
        args.skip(3)?;
        let summary = match function {
            None => {
                let state = args.take(sv_width)?;
                Summary {
                    function,
                    state_variables,
                    state,
                    pre_params: Vec::new(),
                    post_params: Vec::new(),
                    returns: Vec::new(),
                }
            }
            Some(f) => {
                let params: Vec<&VariableDeclaration> = f.parameters.iter().collect();
                let returns: Vec<&VariableDeclaration> = f.returns.iter().collect();
                args.skip(sv_width)?;
                let pre_params = args.take(width(&params))?;
                // post-state
                args.skip(1)?;
                let state = args.take(sv_width)?;
                let post_params = args.take(width(&params))?;
                let returns = args.take(width(&returns))?;
                Summary {
                    function,
                    state_variables,
                    state,
                    pre_params,
                    post_params,
                    returns,
                }
            }
        };
        if !args.0.is_empty() {
            tracing::warn!(predicate = %predicate.name, "Summary has more arguments than its signature");
            return None;
        }
        Some(summary)
    }

    fn state(&self) -> String {
        format_model(self.state_variables.iter().copied(), &self.state, ", ")
    }

    /// State, parameters and return values where the transaction failed.
    fn local_state(&self) -> String {
        let mut lines = vec![self.state()];
        if let Some(function) = self.function {
            lines.push(format_model(&function.parameters, &self.post_params, "\n"));
            lines.push(format_model(&function.returns, &self.returns, "\n"));
        }
        lines.retain(|line| !line.is_empty());
        lines.join("\n")
    }

    fn call(&self) -> String {
        match self.function {
            Some(function) => {
                let args: Vec<String> = self.pre_params.iter().map(|v| readable_value(v)).collect();
                format!("{}({})", function.display_name(), args.join(", "))
            }
            None => "constructor()".to_string(),
        }
    }
}

/// Number of predicate arguments the declarations occupy.
fn width(decls: &[&VariableDeclaration]) -> usize {
    decls.iter().map(|d| component_count(&d.ty)).sum()
}

/// Cursor over raw argument strings.
struct Arguments<'v>(&'v [String]);

impl Arguments<'_> {
    fn skip(&mut self, n: usize) -> Option<()> {
        self.0 = self.0.get(n..)?;
        Some(())
    }

    fn take(&mut self, n: usize) -> Option<Vec<String>> {
        let taken = self.0.get(..n)?.to_vec();
        self.0 = &self.0[n..];
        Some(taken)
    }
}

/// `name = value` per declaration; arrays consume two values.
fn format_model<'d>(decls: impl IntoIterator<Item = &'d VariableDeclaration>, values: &[String], separator: &str) -> String {
    let mut values = values.iter();
    let mut parts = Vec::new();
    for decl in decls {
        let rendered = match component_count(&decl.ty) {
            1 => values.next().map(|v| readable_value(v)),
            _ => match (values.next(), values.next()) {
                (Some(elements), Some(length)) => {
                    Some(format!("{} (length {})", readable_value(elements), readable_value(length)))
                }
                _ => None,
            },
        };
        match rendered {
            Some(value) => parts.push(format!("{} = {value}", decl.name)),
            None => break,
        }
    }
    parts.join(separator)
}

/// `(- 5)` as `-5`; anything else unchanged.
fn readable_value(raw: &str) -> String {
    raw.strip_prefix("(- ")
        .and_then(|rest| rest.strip_suffix(')'))
        .filter(|digits| digits.chars().all(|c| c.is_ascii_digit()))
        .map(|digits| format!("-{digits}"))
        .unwrap_or_else(|| raw.to_string())
}
