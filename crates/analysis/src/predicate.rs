//! Named relations ("predicates") with fixed argument sorts.
//!
//! Every predicate of a pass is minted by the [`PredicateRegistry`], which
//! registers the relation with the backend before handing out a handle, so
//! no rule can ever mention an undeclared relation. The argument layout of
//! each [`PredicateKind`] is fixed by the `*_sort` functions below and the
//! matching `*_args` functions that render an application at given SSA
//! versions.

use rustc_hash::FxHashMap;
use solhorn_smtlib::{Sort, Term};
use solhorn_solver::{HornBackend, Relation};

use crate::ast::{FunctionDefinition, NodeId, VariableDeclaration};
use crate::encoding_context::EncodingContext;
use crate::symbolic::sorts_of;

/// What a predicate stands for; decides how its application is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    /// Contract state between transactions.
    Interface,
    /// Any number of transactions of a contract, from one state to another.
    NondetInterface,
    ConstructorSummary,
    ImplicitConstructor,
    FunctionEntry,
    FunctionSummary,
    /// A program point inside a function body.
    FunctionBlock,
    /// Nullary goal of one reachability query.
    Error,
    Custom,
}

impl PredicateKind {
    pub fn is_summary(self) -> bool {
        matches!(self, PredicateKind::ConstructorSummary | PredicateKind::FunctionSummary)
    }

    pub fn is_interface(self) -> bool {
        self == PredicateKind::Interface
    }
}

/// Handle of a predicate inside its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PredicateId(usize);

#[derive(Debug, Clone)]
pub struct Predicate {
    pub name: String,
    pub sort: Vec<Sort>,
    pub kind: PredicateKind,
    /// Function (for function-shaped predicates) or contract it represents.
    pub node: Option<NodeId>,
    /// Contract whose state variables appear in the arguments.
    pub contract: Option<NodeId>,
}

impl Predicate {
    /// Apply the relation.
    ///
    /// # Panics
    ///
    /// When the number of arguments differs from the predicate's arity.
    pub fn apply(&self, args: Vec<Term>) -> Term {
        assert_eq!(
            args.len(),
            self.sort.len(),
            "predicate {} applied to {} arguments, expected {}",
            self.name,
            args.len(),
            self.sort.len()
        );
        Term::app(self.name.clone(), args)
    }

    pub fn relation(&self) -> Relation {
        Relation::new(self.name.clone(), self.sort.clone())
    }

    /// Function this predicate summarizes or belongs to.
    pub fn function(&self) -> Option<NodeId> {
        match self.kind {
            PredicateKind::FunctionEntry
            | PredicateKind::FunctionSummary
            | PredicateKind::FunctionBlock => self.node,
            _ => None,
        }
    }
}

/// All predicates of one analysis pass.
#[derive(Debug, Default)]
pub struct PredicateRegistry {
    predicates: Vec<Predicate>,
    by_name: FxHashMap<String, PredicateId>,
    block_counter: u64,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a predicate and declare it to `backend`.
    ///
    /// # Panics
    ///
    /// When a predicate with the same name already exists in this pass.
    pub fn create(
        &mut self,
        backend: &mut dyn HornBackend,
        sort: Vec<Sort>,
        name: String,
        kind: PredicateKind,
        node: Option<NodeId>,
        contract: Option<NodeId>,
    ) -> PredicateId {
        assert!(
            !self.by_name.contains_key(&name),
            "predicate {name} created twice in one pass"
        );
        let predicate = Predicate {
            name,
            sort,
            kind,
            node,
            contract,
        };
        backend.register_relation(&predicate.relation());
        tracing::debug!(
            predicate = %predicate.name,
            arity = predicate.sort.len(),
            ?kind,
            "Created predicate"
        );
        let id = PredicateId(self.predicates.len());
        self.by_name.insert(predicate.name.clone(), id);
        self.predicates.push(predicate);
        id
    }

    pub fn get(&self, id: PredicateId) -> &Predicate {
        &self.predicates[id.0]
    }

    pub fn by_name(&self, name: &str) -> Option<&Predicate> {
        self.by_name.get(name).map(|id| self.get(*id))
    }

    /// Monotonic counter that keeps block and summary names unique.
    pub fn next_prefix(&mut self) -> u64 {
        let prefix = self.block_counter;
        self.block_counter += 1;
        prefix
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter()
    }
}

// ---------------------------------------------------------------------------
// Sorts
// ---------------------------------------------------------------------------

fn state_sort() -> Sort {
    Sort::array(Sort::Int, Sort::Int)
}

/// `(this, state, state variables...)`
pub fn interface_sort(state_vars: &[&VariableDeclaration]) -> Vec<Sort> {
    let mut sort = vec![Sort::Int, state_sort()];
    sort.extend(sorts_of(state_vars.iter().copied()));
    sort
}

/// `(state, state variables..., state', state variables'...)`
pub fn nondet_interface_sort(state_vars: &[&VariableDeclaration]) -> Vec<Sort> {
    let vars = sorts_of(state_vars.iter().copied());
    let mut sort = vec![state_sort()];
    sort.extend(vars.iter().cloned());
    sort.push(state_sort());
    sort.extend(vars);
    sort
}

/// `(error, this, state)`
pub fn implicit_constructor_sort() -> Vec<Sort> {
    vec![Sort::Int, Sort::Int, state_sort()]
}

/// `(error, this, state, state variables...)`
pub fn constructor_sort(state_vars: &[&VariableDeclaration]) -> Vec<Sort> {
    let mut sort = implicit_constructor_sort();
    sort.extend(sorts_of(state_vars.iter().copied()));
    sort
}

/// `(error, this, state₀, vars₀..., params₀..., state, vars..., params..., returns...)`
pub fn function_sort(function: &FunctionDefinition, state_vars: &[&VariableDeclaration]) -> Vec<Sort> {
    let vars = sorts_of(state_vars.iter().copied());
    let params = sorts_of(&function.parameters);
    let mut sort = vec![Sort::Int, Sort::Int, state_sort()];
    sort.extend(vars.iter().cloned());
    sort.extend(params.iter().cloned());
    sort.push(state_sort());
    sort.extend(vars);
    sort.extend(params);
    sort.extend(sorts_of(&function.returns));
    sort
}

/// Function sort followed by every local variable of the body.
pub fn function_body_sort(
    function: &FunctionDefinition,
    state_vars: &[&VariableDeclaration],
    locals: &[&VariableDeclaration],
) -> Vec<Sort> {
    let mut sort = function_sort(function, state_vars);
    sort.extend(sorts_of(locals.iter().copied()));
    sort
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

/// Current (or version `at`) component terms of several declarations.
pub fn values(ctx: &mut EncodingContext, decls: &[&VariableDeclaration], at: Option<u32>) -> Vec<Term> {
    decls
        .iter()
        .flat_map(|decl| ctx.variable_values(decl, at))
        .collect()
}

/// Interface arguments at version `at` (`Some(0)` is the transaction start).
pub fn interface_args(ctx: &mut EncodingContext, state_vars: &[&VariableDeclaration], at: Option<u32>) -> Vec<Term> {
    let mut args = vec![ctx.this_address(), ctx.state_at(at)];
    args.extend(values(ctx, state_vars, at));
    args
}

pub fn nondet_interface_args(
    ctx: &mut EncodingContext,
    state_vars: &[&VariableDeclaration],
    pre: u32,
    post: u32,
) -> Vec<Term> {
    let mut args = vec![ctx.state_at(Some(pre))];
    args.extend(values(ctx, state_vars, Some(pre)));
    args.push(ctx.state_at(Some(post)));
    args.extend(values(ctx, state_vars, Some(post)));
    args
}

pub fn implicit_constructor_args(ctx: &mut EncodingContext) -> Vec<Term> {
    vec![ctx.error_flag(), ctx.this_address(), ctx.state_at(None)]
}

pub fn constructor_args(ctx: &mut EncodingContext, state_vars: &[&VariableDeclaration]) -> Vec<Term> {
    let mut args = implicit_constructor_args(ctx);
    args.extend(values(ctx, state_vars, None));
    args
}

/// SSA versions used for the two halves of a function-shaped predicate;
/// `None` means the current version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionVersions {
    pub pre_state: Option<u32>,
    pub post_state: Option<u32>,
    pub pre_params: Option<u32>,
    pub post_params: Option<u32>,
}

impl FunctionVersions {
    /// Transaction start against the current program point.
    pub const TRANSACTION: FunctionVersions = FunctionVersions {
        pre_state: Some(0),
        post_state: None,
        pre_params: Some(0),
        post_params: None,
    };
}

pub fn function_args(
    ctx: &mut EncodingContext,
    function: &FunctionDefinition,
    state_vars: &[&VariableDeclaration],
    versions: FunctionVersions,
) -> Vec<Term> {
    let params: Vec<&VariableDeclaration> = function.parameters.iter().collect();
    let returns: Vec<&VariableDeclaration> = function.returns.iter().collect();
    let mut args = vec![ctx.error_flag(), ctx.this_address(), ctx.state_at(versions.pre_state)];
    args.extend(values(ctx, state_vars, versions.pre_state));
    args.extend(values(ctx, &params, versions.pre_params));
    args.push(ctx.state_at(versions.post_state));
    args.extend(values(ctx, state_vars, versions.post_state));
    args.extend(values(ctx, &params, versions.post_params));
    args.extend(values(ctx, &returns, versions.post_params));
    args
}

pub fn function_block_args(
    ctx: &mut EncodingContext,
    function: &FunctionDefinition,
    state_vars: &[&VariableDeclaration],
    locals: &[&VariableDeclaration],
) -> Vec<Term> {
    let mut args = function_args(ctx, function, state_vars, FunctionVersions::TRANSACTION);
    args.extend(values(ctx, locals, None));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstBuilder, Type};
    use solhorn_solver::RecordedHornSolver;

    #[test]
    fn sorts_follow_the_argument_layout() {
        let mut b = AstBuilder::new("t");
        let x = b.var("x", Type::uint(8));
        let arr = b.var("arr", Type::array(Type::Bool));
        let p = b.var("p", Type::Bool);
        let r = b.var("r", Type::int(16));
        let f = b.function("f", vec![p], vec![r], vec![]);
        let svs = vec![&x, &arr];

        let array_int_int = Sort::array(Sort::Int, Sort::Int);
        assert_eq!(
            interface_sort(&svs),
            vec![Sort::Int, array_int_int.clone(), Sort::Int, Sort::array(Sort::Int, Sort::Bool), Sort::Int]
        );
        assert_eq!(nondet_interface_sort(&svs).len(), 8);
        assert_eq!(constructor_sort(&svs).len(), 6);
        // error, this, state, 3 svs, p, state, 3 svs, p, r
        assert_eq!(function_sort(&f, &svs).len(), 13);
        let local = b.var("l", Type::uint256());
        assert_eq!(function_body_sort(&f, &svs, &[&local]).len(), 14);
    }

    #[test]
    fn registry_registers_with_the_backend() {
        let mut backend = RecordedHornSolver::default();
        let mut registry = PredicateRegistry::new();
        let id = registry.create(
            &mut backend,
            vec![Sort::Int],
            "block_0_f".into(),
            PredicateKind::FunctionBlock,
            Some(NodeId(3)),
            Some(NodeId(1)),
        );
        assert_eq!(registry.get(id).name, "block_0_f");
        assert_eq!(registry.by_name("block_0_f").map(|p| p.kind), Some(PredicateKind::FunctionBlock));
        assert!(backend.system().relation("block_0_f").is_some());
        assert_eq!(registry.get(id).function(), Some(NodeId(3)));
        assert_eq!(registry.next_prefix(), 0);
        assert_eq!(registry.next_prefix(), 1);
    }

    #[test]
    #[should_panic(expected = "created twice")]
    fn duplicate_names_are_rejected() {
        let mut backend = RecordedHornSolver::default();
        let mut registry = PredicateRegistry::new();
        for _ in 0..2 {
            registry.create(&mut backend, vec![], "error_target_1".into(), PredicateKind::Error, None, None);
        }
    }

    #[test]
    #[should_panic(expected = "expected 2")]
    fn arity_is_checked_on_application() {
        let predicate = Predicate {
            name: "p".into(),
            sort: vec![Sort::Int, Sort::Int],
            kind: PredicateKind::Custom,
            node: None,
            contract: None,
        };
        predicate.apply(vec![Term::int(1)]);
    }

    #[test]
    fn summary_and_interface_kinds() {
        assert!(PredicateKind::FunctionSummary.is_summary());
        assert!(PredicateKind::ConstructorSummary.is_summary());
        assert!(!PredicateKind::FunctionEntry.is_summary());
        assert!(PredicateKind::Interface.is_interface());
        assert!(!PredicateKind::NondetInterface.is_interface());
    }

    #[test]
    fn function_args_at_transaction_versions() {
        let mut b = AstBuilder::new("t");
        let x = b.var("x", Type::uint(8));
        let p = b.var("p", Type::uint(8));
        let f = b.function("f", vec![p], vec![], vec![]);
        let mut ctx = EncodingContext::new();
        ctx.declare_variable(&x);
        ctx.increase_index(crate::encoding_context::VarKey::Value(x.id));
        let args = function_args(&mut ctx, &f, &[&x], FunctionVersions::TRANSACTION);
        let rendered: Vec<String> = args.iter().map(|t| t.to_string()).collect();
        let (xn, pn) = (format!("x_{}", x.id), format!("p_{}", f.parameters[0].id));
        assert_eq!(
            rendered,
            vec![
                "error_0".to_string(),
                "this".into(),
                "state_0".into(),
                format!("{xn}_0"),
                format!("{pn}_0"),
                "state_0".into(),
                format!("{xn}_1"),
                format!("{pn}_0"),
            ]
        );
    }
}
