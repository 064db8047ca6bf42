//! Transaction traces rebuilt from scripted derivation graphs.

mod common;

use common::*;
use solhorn_analysis::ast::{ArithmeticOp, AstBuilder, BinaryOp, NodeId, Type};
use solhorn_analysis::{ErrorCode, ErrorReporter};
use solhorn_smtlib::Term;
use solhorn_solver::{CexGraph, CexNode, CheckResult, QueryOutcome, Relation};

/// Relation names of contract `C` with public function `f`.
struct Names {
    interface: String,
    constructor: String,
    summary: String,
}

fn names(relations: &[Relation], contract: NodeId, function: NodeId) -> Names {
    let label = format!("function_f_{function}_{contract}");
    let summary = relations
        .iter()
        .map(|r| r.name.clone())
        .find(|name| name.starts_with("summary_") && name.ends_with(&label))
        .expect("summary of f");
    Names {
        interface: format!("interface_C_{contract}"),
        constructor: format!("summary_constructor_C_{contract}"),
        summary,
    }
}

fn goal_name(goal: &Term) -> String {
    goal.head_name().expect("nullary goal").to_string()
}

fn overflow_warning(reporter: &ErrorReporter) -> String {
    let warnings: Vec<_> = reporter.with_code(ErrorCode::OVERFLOW).collect();
    assert_eq!(warnings.len(), 1);
    warnings[0].secondary.clone().expect("counterexample")
}

#[test]
fn single_transaction_trace() {
    let source = binary_op_contract(ArithmeticOp::Add, Type::uint(8));
    let (contract, function) = (source.contract, source.function);
    let backend = ScriptedBackend::with_responder(move |goal, relations| {
        let names = names(relations, contract, function);
        let mut graph = CexGraph::new();
        let root = graph.add_node(CexNode::new(goal_name(goal), vec![]));
        let iface = graph.add_node(CexNode::new(&names.interface, strings(&["0", "s", "0"])));
        // err, this, state0, x0, a0, state1, x1, a1
        let call = graph.add_node(CexNode::new(
            &names.summary,
            strings(&["1", "0", "s", "0", "255", "s", "255", "255"]),
        ));
        let ctor = graph.add_node(CexNode::new(&names.constructor, strings(&["0", "0", "s", "0"])));
        graph.add_edge(root, iface);
        graph.add_edge(root, call);
        graph.add_edge(iface, ctor);
        Ok(sat_with(graph))
    });
    let mut analyzer = analyzer(backend);
    let (_, reporter) = analyze(&mut analyzer, std::slice::from_ref(&source.unit));

    assert_eq!(
        overflow_warning(&reporter),
        "\nCounterexample:\nx = 255\na = 255\n\nTransaction trace:\nconstructor()\nState: x = 0\nf(255)"
    );
}

#[test]
fn multi_transaction_trace_is_oldest_first() {
    let source = binary_op_contract(ArithmeticOp::Add, Type::uint(8));
    let (contract, function) = (source.contract, source.function);
    let backend = ScriptedBackend::with_responder(move |goal, relations| {
        let names = names(relations, contract, function);
        let mut graph = CexGraph::new();
        let root = graph.add_node(CexNode::new(goal_name(goal), vec![]));
        let second = graph.add_node(CexNode::new(
            &names.summary,
            strings(&["1", "0", "s", "100", "200", "s", "100", "200"]),
        ));
        let iface2 = graph.add_node(CexNode::new(&names.interface, strings(&["0", "s", "100"])));
        let first = graph.add_node(CexNode::new(
            &names.summary,
            strings(&["0", "0", "s", "0", "100", "s", "100", "100"]),
        ));
        let iface1 = graph.add_node(CexNode::new(&names.interface, strings(&["0", "s", "0"])));
        let ctor = graph.add_node(CexNode::new(&names.constructor, strings(&["0", "0", "s", "0"])));
        // Premise order is not significant.
        graph.add_edge(root, second);
        graph.add_edge(root, iface2);
        graph.add_edge(iface2, iface1);
        graph.add_edge(iface2, first);
        graph.add_edge(iface1, ctor);
        Ok(sat_with(graph))
    });
    let mut analyzer = analyzer(backend);
    let (_, reporter) = analyze(&mut analyzer, std::slice::from_ref(&source.unit));

    let trace = overflow_warning(&reporter);
    let (local, transactions) = trace.split_once("\n\nTransaction trace:\n").expect("trace header");
    assert_eq!(local, "\nCounterexample:\nx = 100\na = 200");
    assert_eq!(
        transactions.lines().collect::<Vec<_>>(),
        vec!["constructor()", "State: x = 0", "f(100)", "State: x = 100", "f(200)"]
    );
}

#[test]
fn negative_values_are_readable() {
    let source = binary_op_contract(ArithmeticOp::Sub, Type::int(8));
    let (contract, function) = (source.contract, source.function);
    let backend = ScriptedBackend::with_responder(move |goal, relations| {
        let names = names(relations, contract, function);
        let mut graph = CexGraph::new();
        let root = graph.add_node(CexNode::new(goal_name(goal), vec![]));
        let iface = graph.add_node(CexNode::new(&names.interface, strings(&["0", "s", "0"])));
        let call = graph.add_node(CexNode::new(
            &names.summary,
            strings(&["1", "0", "s", "(- 100)", "100", "s", "(- 100)", "100"]),
        ));
        let ctor = graph.add_node(CexNode::new(&names.constructor, strings(&["0", "0", "s", "0"])));
        graph.add_edge(root, iface);
        graph.add_edge(root, call);
        graph.add_edge(iface, ctor);
        Ok(sat_with(graph))
    });
    let mut analyzer = analyzer(backend);
    let (_, reporter) = analyze(&mut analyzer, std::slice::from_ref(&source.unit));

    let trace = reporter
        .with_code(ErrorCode::UNDERFLOW)
        .next()
        .and_then(|d| d.secondary.clone())
        .expect("underflow counterexample");
    assert!(trace.contains("x = -100\na = 100"), "{trace}");
    assert!(trace.ends_with("f(100)"), "{trace}");
}

#[test]
fn constructor_assertion_trace() {
    let mut b = AstBuilder::new("c.sol");
    let x = b.var("x", Type::uint256());
    let lhs = b.ident(&x);
    let one = b.number(1, Type::uint256());
    let cond = b.compare(BinaryOp::Eq, lhs, one);
    let assertion = b.assert_(cond);
    let ctor = b.constructor(vec![], vec![assertion]);
    let c = b.contract("C", vec![x], vec![ctor]);
    let contract = c.id;
    let unit = b.unit(vec![c]);

    let backend = ScriptedBackend::with_responder(move |goal, _| {
        let mut graph = CexGraph::new();
        let root = graph.add_node(CexNode::new(goal_name(goal), vec![]));
        let ctor = graph.add_node(CexNode::new(
            format!("summary_constructor_C_{contract}"),
            strings(&["3", "0", "s", "0"]),
        ));
        graph.add_edge(root, ctor);
        Ok(sat_with(graph))
    });
    let mut analyzer = analyzer(backend);
    let (_, reporter) = analyze(&mut analyzer, std::slice::from_ref(&unit));

    let warnings: Vec<_> = reporter.with_code(ErrorCode::ASSERTION).collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].secondary.as_deref(),
        Some("\nCounterexample:\nx = 0\n\nTransaction trace:\nconstructor()")
    );
}

#[test]
fn malformed_derivations_are_dropped() {
    let source = binary_op_contract(ArithmeticOp::Add, Type::uint(8));
    let backend = ScriptedBackend::with_responder(|goal, _| {
        let mut graph = CexGraph::new();
        let root = graph.add_node(CexNode::new(goal_name(goal), vec![]));
        let stray = graph.add_node(CexNode::new("block_7_unknown", strings(&["1"])));
        graph.add_edge(root, stray);
        Ok(sat_with(graph))
    });
    let mut analyzer = analyzer(backend);
    let (report, reporter) = analyze(&mut analyzer, std::slice::from_ref(&source.unit));

    // Still unsafe, just without a trace.
    assert!(report.is_unsafe(source.operation, solhorn_analysis::TargetKind::Overflow));
    let warnings: Vec<_> = reporter.with_code(ErrorCode::OVERFLOW).collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].secondary, None);
}

#[test]
fn unanswered_derivation_keeps_the_verdict() {
    let source = binary_op_contract(ArithmeticOp::Add, Type::uint(8));
    let mut analyzer = analyzer(ScriptedBackend::queue([QueryOutcome::verdict(CheckResult::Sat)]));
    let (report, _) = analyze(&mut analyzer, std::slice::from_ref(&source.unit));
    assert!(report.is_unsafe(source.operation, solhorn_analysis::TargetKind::Overflow));
}
