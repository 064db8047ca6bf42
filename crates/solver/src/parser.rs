//! Parsing of Horn solver answers.
//!
//! A Horn query script asserts `(=> goal false)`, so the solver's `unsat`
//! means the goal is derivable and maps to [`CheckResult::Sat`], while `sat`
//! (a model of the system exists) maps to [`CheckResult::Unsat`]. After an
//! `unsat` answer Z3 may print a hyper-resolution proof that is turned into a
//! [`CexGraph`].

use std::collections::HashMap;
use std::fmt;

use crate::cex_graph::{CexGraph, CexNode, CexNodeId};
use crate::error::SolverError;
use crate::result::{CheckResult, QueryOutcome};

/// Parse a Horn solver's stdout into a [`QueryOutcome`].
pub fn parse_horn_output(stdout: &str, stderr: &str) -> Result<QueryOutcome, SolverError> {
    let stdout = stdout.trim();

    if stdout.is_empty() {
        if stderr.contains("timeout") {
            return Ok(QueryOutcome::verdict(CheckResult::Unknown));
        }
        return Err(SolverError::ParseError(format!(
            "Empty solver output. stderr: {stderr}"
        )));
    }

    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    let first_line = lines.next().unwrap_or("");

    match first_line {
        "sat" => Ok(QueryOutcome::verdict(CheckResult::Unsat)),
        "unsat" => {
            let rest: Vec<&str> = lines.collect();
            let graph = match parse_proof_graph(&rest.join("\n")) {
                Ok(graph) => graph,
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring unparsable proof");
                    CexGraph::new()
                }
            };
            Ok(QueryOutcome::new(CheckResult::Sat, graph))
        }
        "unknown" | "timeout" => Ok(QueryOutcome::verdict(CheckResult::Unknown)),
        _ => Err(SolverError::ParseError(format!(
            "Unexpected solver output: {first_line}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// S-expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(a) => Some(a),
            SExpr::List(_) => None,
        }
    }

    fn head(&self) -> Option<&SExpr> {
        match self {
            SExpr::List(items) => items.first(),
            SExpr::Atom(_) => None,
        }
    }

    fn is_headed_by(&self, name: &str) -> bool {
        self.head().and_then(SExpr::as_atom) == Some(name)
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Atom(a) => write!(f, "{a}"),
            // `(- 5)` is how solvers print negative numerals
            SExpr::List(items)
                if items.len() == 2
                    && items[0].as_atom() == Some("-")
                    && items[1]
                        .as_atom()
                        .is_some_and(|a| a.chars().all(|c| c.is_ascii_digit())) =>
            {
                write!(f, "-{}", items[1])
            }
            SExpr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Parse every top-level S-expression in `text`.
pub(crate) fn parse_sexprs(text: &str) -> Result<Vec<SExpr>, SolverError> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut out = Vec::new();
    loop {
        skip_trivia(&chars, &mut pos);
        if pos >= chars.len() {
            return Ok(out);
        }
        out.push(parse_one(&chars, &mut pos)?);
    }
}

fn skip_trivia(chars: &[char], pos: &mut usize) {
    while *pos < chars.len() {
        if chars[*pos].is_whitespace() {
            *pos += 1;
        } else if chars[*pos] == ';' {
            while *pos < chars.len() && chars[*pos] != '\n' {
                *pos += 1;
            }
        } else {
            break;
        }
    }
}

fn parse_one(chars: &[char], pos: &mut usize) -> Result<SExpr, SolverError> {
    skip_trivia(chars, pos);
    match chars.get(*pos) {
        None => Err(SolverError::ParseError("unexpected end of input".to_string())),
        Some(')') => Err(SolverError::ParseError(format!(
            "unbalanced ')' at offset {pos}"
        ))),
        Some('(') => {
            *pos += 1;
            let mut items = Vec::new();
            loop {
                skip_trivia(chars, pos);
                match chars.get(*pos) {
                    None => {
                        return Err(SolverError::ParseError("unclosed '('".to_string()));
                    }
                    Some(')') => {
                        *pos += 1;
                        return Ok(SExpr::List(items));
                    }
                    Some(_) => items.push(parse_one(chars, pos)?),
                }
            }
        }
        Some(&delim @ ('|' | '"')) => {
            let start = *pos;
            *pos += 1;
            while *pos < chars.len() && chars[*pos] != delim {
                *pos += 1;
            }
            if *pos >= chars.len() {
                return Err(SolverError::ParseError(format!("unterminated {delim}")));
            }
            *pos += 1;
            let quoted: String = chars[start..*pos].iter().collect();
            // `|name|` and `name` denote the same symbol
            Ok(SExpr::Atom(if delim == '|' {
                quoted.trim_matches('|').to_string()
            } else {
                quoted
            }))
        }
        Some(_) => {
            let start = *pos;
            while *pos < chars.len()
                && !chars[*pos].is_whitespace()
                && !matches!(chars[*pos], '(' | ')' | ';')
            {
                *pos += 1;
            }
            Ok(SExpr::Atom(chars[start..*pos].iter().collect()))
        }
    }
}

// ---------------------------------------------------------------------------
// Proofs
// ---------------------------------------------------------------------------

/// Turn the text printed by `(get-proof)` into a derivation graph.
///
/// Only `hyper-res` steps produce nodes; `asserted` clauses and
/// bookkeeping steps (`mp`, ...) are looked through. Returns an empty graph
/// when the text carries no proof.
pub(crate) fn parse_proof_graph(text: &str) -> Result<CexGraph, SolverError> {
    let mut graph = CexGraph::new();
    if text.trim().is_empty() {
        return Ok(graph);
    }
    let exprs = parse_sexprs(text)?;
    let Some(proof) = exprs.iter().find_map(find_proof) else {
        return Ok(graph);
    };
    let expanded = expand_lets(proof, &HashMap::new());
    collect_steps(&expanded, &mut graph);
    Ok(graph)
}

fn find_proof(expr: &SExpr) -> Option<&SExpr> {
    match expr {
        SExpr::List(items) if expr.is_headed_by("proof") => items.get(1),
        SExpr::List(items) => items.iter().find_map(find_proof),
        SExpr::Atom(_) => None,
    }
}

fn expand_lets(expr: &SExpr, env: &HashMap<String, SExpr>) -> SExpr {
    match expr {
        SExpr::Atom(a) => env.get(a).cloned().unwrap_or_else(|| expr.clone()),
        SExpr::List(items) if expr.is_headed_by("let") && items.len() == 3 => {
            let mut inner = env.clone();
            if let SExpr::List(bindings) = &items[1] {
                for binding in bindings {
                    if let SExpr::List(pair) = binding
                        && let [SExpr::Atom(name), value] = pair.as_slice()
                    {
                        inner.insert(name.clone(), expand_lets(value, env));
                    }
                }
            }
            expand_lets(&items[2], &inner)
        }
        SExpr::List(items) => SExpr::List(items.iter().map(|i| expand_lets(i, env)).collect()),
    }
}

fn is_hyper_res(expr: &SExpr) -> bool {
    match expr.head() {
        Some(head @ SExpr::List(parts)) => {
            head.is_headed_by("_") && parts.get(1).and_then(SExpr::as_atom) == Some("hyper-res")
        }
        _ => false,
    }
}

/// Add the first `hyper-res` step found in `expr` (and, recursively, its
/// premises) to `graph`; returns the node created for it.
fn collect_steps(expr: &SExpr, graph: &mut CexGraph) -> Option<CexNodeId> {
    let SExpr::List(items) = expr else {
        return None;
    };
    if !is_hyper_res(expr) {
        return items.iter().find_map(|item| collect_steps(item, graph));
    }
    let (conclusion, premises) = items[1..].split_last()?;
    let id = graph.add_node(conclusion_node(conclusion));
    for premise in premises {
        if is_hyper_res(premise)
            && let Some(child) = collect_steps(premise, graph)
        {
            graph.add_edge(id, child);
        }
    }
    Some(id)
}

fn conclusion_node(conclusion: &SExpr) -> CexNode {
    match conclusion {
        SExpr::Atom(name) => CexNode::new(name.clone(), Vec::new()),
        SExpr::List(items) => {
            let name = items.first().map(ToString::to_string).unwrap_or_default();
            let args = items[1..].iter().map(ToString::to_string).collect();
            CexNode::new(name, args)
        }
    }
}
