//! Translation of contract control flow into Horn rules.
//!
//! The encoder walks one function body at a time. Each program point that
//! control can reach is a predicate ("block"); moving between program points
//! adds a rule `from ∧ path assertions ∧ constraints ⇒ to`. Calls are never
//! inlined: they are replaced by the callee's summary predicate.
//!
//! The central piece of traversal state is the current block, the predicate
//! application describing "control is here". [`Encoder::set_current_block`]
//! starts a fresh basic block: it drops the accumulated path assertions and
//! moves every variable of the current scope to a fresh SSA version, keeping
//! version 0 of each state variable for the transaction start.

mod calls;
mod expressions;
mod statements;

use rustc_hash::FxHashSet;
use solhorn_smtlib::Term;
use solhorn_solver::HornBackend;

use crate::ast::{AstIndex, Contract, FunctionDefinition, FunctionKind, NodeId, SourceLocation, SourceUnit, Type, VariableDeclaration};
use crate::encoding_context::VarKey;
use crate::predicate::{self, FunctionVersions, PredicateId, PredicateKind};
use crate::session::Session;
use crate::symbolic::{SymbolicValue, default_symbolic, type_constraint};
use crate::verification_target::{TargetKind, VerificationTarget};

/// Destinations of `break` and `continue` inside the innermost loop.
#[derive(Debug, Clone, Copy)]
struct LoopTargets {
    break_to: PredicateId,
    continue_to: PredicateId,
}

pub struct Encoder<'a, 's> {
    ast: &'a AstIndex<'a>,
    session: &'s mut Session,
    backend: &'s mut dyn HornBackend,
    contract: Option<&'a Contract>,
    function: Option<&'a FunctionDefinition>,
    /// State variables of the current contract's hierarchy, base first.
    state_variables: Vec<&'a VariableDeclaration>,
    current_block: Term,
    loops: Vec<LoopTargets>,
    return_block: Option<PredicateId>,
    /// A call that may have changed arbitrary state was seen since the
    /// innermost branch or loop was entered.
    unknown_call_seen: bool,
    /// Conditions under which the expression being evaluated runs
    /// (short-circuit operands, conditional branches).
    path_conditions: Vec<Term>,
}

impl<'a, 's> Encoder<'a, 's> {
    pub fn new(ast: &'a AstIndex<'a>, session: &'s mut Session, backend: &'s mut dyn HornBackend) -> Self {
        Self {
            ast,
            session,
            backend,
            contract: None,
            function: None,
            state_variables: Vec::new(),
            current_block: Term::BoolLit(true),
            loops: Vec::new(),
            return_block: None,
            unknown_call_seen: false,
            path_conditions: Vec::new(),
        }
    }

    /// Encode every contract of `units`.
    ///
    /// Interfaces and summaries of all contracts are created before any body
    /// is visited, since bodies refer to summaries of other contracts.
    pub fn encode(&mut self, units: &'a [SourceUnit]) {
        let contracts: Vec<&'a Contract> = units.iter().flat_map(|u| &u.contracts).collect();
        for contract in &contracts {
            self.define_interfaces_and_summaries(contract);
        }
        for contract in contracts {
            self.encode_contract(contract);
        }
    }

    // -----------------------------------------------------------------------
    // Interfaces and summaries
    // -----------------------------------------------------------------------

    fn define_interfaces_and_summaries(&mut self, contract: &'a Contract) {
        let svs = self.ast.state_variables(contract);
        let suffix = format!("{}_{}", contract.name, contract.id);
        let cid = Some(contract.id);

        let iface = self.create_predicate(
            predicate::interface_sort(&svs),
            format!("interface_{suffix}"),
            PredicateKind::Interface,
            cid,
            cid,
        );
        let nondet = self.create_predicate(
            predicate::nondet_interface_sort(&svs),
            format!("nondet_interface_{suffix}"),
            PredicateKind::NondetInterface,
            cid,
            cid,
        );
        let constructor = self.create_predicate(
            predicate::constructor_sort(&svs),
            format!("summary_constructor_{suffix}"),
            PredicateKind::ConstructorSummary,
            cid,
            cid,
        );
        self.session.interfaces.insert(contract.id, iface);
        self.session.nondet_interfaces.insert(contract.id, nondet);
        self.session.constructor_summaries.insert(contract.id, constructor);

        let ctx = &mut self.session.context;
        ctx.reset_all_indices();
        ctx.clear_assertions();

        // Zero transactions.
        let args = predicate::nondet_interface_args(ctx, &svs, 0, 0);
        let base = self.session.registry.get(nondet).apply(args);
        self.add_rule(base, "base_nondet");

        for base in self.ast.bases(contract) {
            for function in &base.functions {
                if function.is_constructor() {
                    continue;
                }
                let prefix = self.session.registry.next_prefix();
                let summary = self.create_predicate(
                    predicate::function_sort(function, &svs),
                    format!("summary_{prefix}_{}", function_label(function, contract.id)),
                    PredicateKind::FunctionSummary,
                    Some(function.id),
                    cid,
                );
                self.session.summaries.insert((contract.id, function.id), summary);

                if function.is_public() && !base.is_library() && !base.is_interface() {
                    // One more transaction: nondet(s0, s1) ∧ f(s1 -> s2) ⇒ nondet(s0, s2)
                    let ctx = &mut self.session.context;
                    let pre = predicate::nondet_interface_args(ctx, &svs, 0, 1);
                    let post = predicate::nondet_interface_args(ctx, &svs, 0, 2);
                    let versions = FunctionVersions {
                        pre_state: Some(1),
                        post_state: Some(2),
                        pre_params: Some(0),
                        post_params: Some(1),
                    };
                    let call_args = predicate::function_args(ctx, function, &svs, versions);
                    let registry = &self.session.registry;
                    let from = registry.get(nondet).apply(pre);
                    let to = registry.get(nondet).apply(post);
                    let call = registry.get(summary).apply(call_args);
                    self.add_implication(from, to, call);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Contracts and functions
    // -----------------------------------------------------------------------

    fn encode_contract(&mut self, contract: &'a Contract) {
        tracing::info!(contract = %contract.name, kind = ?contract.kind, "Encoding contract");
        self.contract = Some(contract);
        self.state_variables = self.ast.state_variables(contract);
        self.unknown_call_seen = false;
        self.loops.clear();

        let mut seen = FxHashSet::default();
        for base in self.ast.bases(contract) {
            for function in &base.functions {
                if function.is_constructor() {
                    continue;
                }
                if !seen.insert(function.signature()) {
                    tracing::trace!(function = %function.signature(), base = %base.name, "Skipping overridden function");
                    continue;
                }
                self.encode_function(function);
            }
        }

        self.encode_constructor(contract);
        self.contract = None;
    }

    fn encode_function(&mut self, function: &'a FunctionDefinition) {
        let contract = self.current_contract();
        tracing::debug!(function = %function.signature(), contract = %contract.name, "Encoding function");
        self.function = Some(function);
        self.session.context.clear_assertions();
        self.session.context.reset_all_indices();

        let summary = self.session.summary(contract.id, function.id);
        if !function.is_implemented() {
            let fact = self.render(summary);
            self.add_rule(fact, &format!("summary_function_{}", function.id));
            self.function = None;
            return;
        }

        self.declare_function_variables(function);
        let entry = self.create_block(PredicateKind::FunctionEntry, function.id, "");
        let entry_app = self.render(entry);
        let name = head(&entry_app);
        self.add_rule(entry_app.clone(), &name);

        self.encode_body(function, entry_app);

        let error = self.session.context.error_flag();
        let sum = self.render(summary);
        self.connect(self.current_block.clone(), sum.clone(), Term::BoolLit(true));

        let iface_id = self.session.interface(contract.id);
        let iface = self.render(iface_id);
        self.set_current_block(iface_id);
        let pre_args = predicate::interface_args(&mut self.session.context, &self.state_variables, Some(0));
        let iface_pre = self.session.registry.get(iface_id).apply(pre_args);

        if function.is_public() {
            self.session.targets.push(VerificationTarget {
                kind: TargetKind::Assert,
                scope: function.id,
                location: function.location.clone(),
                ty: Type::Bool,
                from: iface_pre.clone(),
                constraints: sum.clone(),
                error_flag: error.clone(),
                error_ids: Vec::new(),
            });
            let success = Term::eq(error, Term::int(0));
            self.connect(iface_pre, iface, Term::and([sum, success]));
        }
        self.function = None;
    }

    /// Entry checks, body, and the function's return block.
    fn encode_body(&mut self, function: &'a FunctionDefinition, entry_app: Term) {
        let Some(body) = &function.body else {
            return;
        };
        let body_block = self.create_block(PredicateKind::FunctionBlock, body.id, "");
        let return_block = self.create_block(PredicateKind::FunctionBlock, function.id, "return_");

        let ctx = &mut self.session.context;
        if !function.is_constructor() {
            let error = ctx.error_flag();
            ctx.add_assertion(Term::eq(error, Term::int(0)));
        }
        for sv in &self.state_variables {
            let initial = ctx.variable_values(sv, Some(0));
            let current = ctx.variable_values(sv, None);
            ctx.add_assertion(equal_all(initial, current));
        }
        for param in &function.parameters {
            let initial = ctx.variable_values(param, Some(0));
            let current = ctx.symbolic_value(param);
            ctx.add_assertion(equal_all(initial, current.clone().into_terms()));
            if let SymbolicValue::Scalar(value) = &current {
                ctx.add_assertion(type_constraint(&param.ty, value));
            } else if let SymbolicValue::Array { length, .. } = &current {
                ctx.add_assertion(type_constraint(&Type::uint256(), length));
            }
        }
        let initial_state = ctx.state_at(Some(0));
        let state = ctx.state_at(None);
        ctx.add_assertion(Term::eq(initial_state, state));
        for ret in &function.returns {
            self.assign_variable(ret, default_symbolic(&ret.ty));
        }

        let body_app = self.render(body_block);
        self.connect(entry_app, body_app, Term::BoolLit(true));
        self.set_current_block(body_block);

        let outer_return = self.return_block.replace(return_block);
        self.visit_block(body);

        let return_app = self.render(return_block);
        self.connect(self.current_block.clone(), return_app, Term::BoolLit(true));
        self.set_current_block(return_block);
        self.return_block = outer_return;
    }

    /// Implicit constructor, state-variable initialization and the explicit
    /// constructors of the hierarchy, base first.
    fn encode_constructor(&mut self, contract: &'a Contract) {
        let suffix = format!("{}_{}", contract.name, contract.id);
        let implicit = self.create_predicate(
            predicate::implicit_constructor_sort(),
            format!("implicit_constructor_{suffix}"),
            PredicateKind::ImplicitConstructor,
            Some(contract.id),
            Some(contract.id),
        );
        let ctx = &mut self.session.context;
        ctx.reset_all_indices();
        ctx.clear_assertions();
        let args = vec![Term::int(0), ctx.this_address(), ctx.state_at(None)];
        let fact = self.session.registry.get(implicit).apply(args);
        self.add_rule(fact, &format!("implicit_constructor_{suffix}"));
        self.set_current_block(implicit);

        for sv in self.state_variables.clone() {
            self.assign_variable(sv, default_symbolic(&sv.ty));
        }
        for base in self.ast.bases(contract).into_iter().rev() {
            for sv in &base.state_variables {
                if let Some(init) = &sv.value {
                    let value = self.expression(init);
                    self.assign_variable(sv, value);
                }
            }
            if let Some(constructor) = base.constructor()
                && constructor.is_implemented()
            {
                self.encode_constructor_function(constructor, contract);
            }
        }

        let summary_id = self.session.constructor_summary(contract.id);
        let summary = self.render(summary_id);
        self.connect(self.current_block.clone(), summary, Term::BoolLit(true));
        self.set_current_block(summary_id);

        let error = self.session.context.error_flag();
        self.session.targets.push(VerificationTarget {
            kind: TargetKind::Assert,
            scope: contract.id,
            location: contract.location.clone(),
            ty: Type::Bool,
            from: self.current_block.clone(),
            constraints: Term::BoolLit(true),
            error_flag: error.clone(),
            error_ids: Vec::new(),
        });
        let iface_id = self.session.interface(contract.id);
        let iface = self.render(iface_id);
        self.connect(self.current_block.clone(), iface, Term::eq(error, Term::int(0)));
    }

    /// One link of the constructor chain. Base-constructor arguments are not
    /// tracked, so parameters enter unconstrained.
    fn encode_constructor_function(&mut self, constructor: &'a FunctionDefinition, contract: &'a Contract) {
        tracing::debug!(constructor = %constructor.id, contract = %contract.name, "Encoding constructor");
        self.function = Some(constructor);
        self.declare_function_variables(constructor);

        let entry = self.create_block(PredicateKind::FunctionEntry, constructor.id, "");
        let entry_app = self.render(entry);
        self.connect(self.current_block.clone(), entry_app.clone(), Term::BoolLit(true));
        self.session.context.clear_assertions();
        self.encode_body(constructor, entry_app);

        let exit = self.create_predicate(
            predicate::constructor_sort(&self.state_variables),
            format!("constructor_exit_{}_{}", constructor.id, contract.id),
            PredicateKind::ConstructorSummary,
            Some(contract.id),
            Some(contract.id),
        );
        self.function = None;
        let exit_app = self.render(exit);
        self.connect(self.current_block.clone(), exit_app, Term::BoolLit(true));
        self.set_current_block(exit);
    }

    fn declare_function_variables(&mut self, function: &'a FunctionDefinition) {
        let ctx = &mut self.session.context;
        for var in function.parameters.iter().chain(&function.returns) {
            ctx.declare_variable(var);
        }
        for var in self.ast.local_variables(function.id) {
            ctx.declare_variable(var);
        }
    }

    // -----------------------------------------------------------------------
    // Blocks and rules
    // -----------------------------------------------------------------------

    fn create_predicate(
        &mut self,
        sort: Vec<solhorn_smtlib::Sort>,
        name: String,
        kind: PredicateKind,
        node: Option<NodeId>,
        contract: Option<NodeId>,
    ) -> PredicateId {
        self.session
            .registry
            .create(&mut *self.backend, sort, name, kind, node, contract)
    }

    /// A block of the current function, named after `node`.
    fn create_block(&mut self, kind: PredicateKind, node: NodeId, label: &str) -> PredicateId {
        let function = self.current_function();
        let contract = self.current_contract();
        let prefix = self.session.registry.next_prefix();
        let name = if node == function.id {
            format!("block_{prefix}_{label}{}", function_label(function, contract.id))
        } else {
            format!("block_{prefix}_{label}{}_{node}_{}", function.display_name(), contract.id)
        };
        let sort = match kind {
            PredicateKind::FunctionEntry => predicate::function_sort(function, &self.state_variables),
            _ => predicate::function_body_sort(
                function,
                &self.state_variables,
                self.ast.local_variables(function.id),
            ),
        };
        self.create_predicate(sort, name, kind, Some(function.id), Some(contract.id))
    }

    /// Application of `id` at the current SSA versions.
    fn render(&mut self, id: PredicateId) -> Term {
        let kind = self.session.registry.get(id).kind;
        let ctx = &mut self.session.context;
        let svs = &self.state_variables;
        let args = match kind {
            PredicateKind::Interface => predicate::interface_args(ctx, svs, None),
            PredicateKind::ImplicitConstructor => predicate::implicit_constructor_args(ctx),
            PredicateKind::ConstructorSummary => predicate::constructor_args(ctx, svs),
            PredicateKind::FunctionEntry | PredicateKind::FunctionSummary => {
                let function = self.function.unwrap_or_else(|| panic!("{kind:?} rendered outside a function"));
                predicate::function_args(ctx, function, svs, FunctionVersions::TRANSACTION)
            }
            PredicateKind::FunctionBlock => {
                let function = self.function.unwrap_or_else(|| panic!("block rendered outside a function"));
                let locals = self.ast.local_variables(function.id);
                predicate::function_block_args(ctx, function, svs, locals)
            }
            PredicateKind::Error => Vec::new(),
            PredicateKind::NondetInterface | PredicateKind::Custom => {
                panic!("{kind:?} predicates are applied with explicit arguments")
            }
        };
        self.session.registry.get(id).apply(args)
    }

    /// Start a new basic block at `id`.
    fn set_current_block(&mut self, id: PredicateId) {
        let ctx = &mut self.session.context;
        ctx.clear_assertions();
        ctx.reset_all_indices();
        for sv in &self.state_variables {
            ctx.new_value(sv);
        }
        if let Some(function) = self.function {
            for var in function.parameters.iter().chain(&function.returns) {
                ctx.new_value(var);
            }
            for var in self.ast.local_variables(function.id) {
                ctx.new_value(var);
            }
        }
        ctx.increase_index(VarKey::State);
        self.current_block = self.render(id);
    }

    /// `from ∧ path assertions ∧ constraints ⇒ to`
    fn connect(&mut self, from: Term, to: Term, constraints: Term) {
        let mut conjuncts = vec![from.clone()];
        conjuncts.extend(self.session.context.assertions().iter().cloned());
        conjuncts.push(constraints);
        let name = format!("{}_to_{}", head(&from), head(&to));
        self.add_rule(Term::implies(Term::and(conjuncts), to), &name);
    }

    /// `from ∧ constraints ⇒ to`, ignoring path assertions.
    fn add_implication(&mut self, from: Term, to: Term, constraints: Term) {
        let name = format!("{}_to_{}", head(&from), head(&to));
        self.add_rule(Term::implies(Term::and([from, constraints]), to), &name);
    }

    fn add_rule(&mut self, rule: Term, name: &str) {
        let closed = self.session.context.quantify(rule);
        tracing::trace!(rule = %name, "Adding rule");
        self.backend.add_rule(&closed, name);
        self.session.rule_count += 1;
    }

    fn current_contract(&self) -> &'a Contract {
        self.contract.unwrap_or_else(|| panic!("no contract is being encoded"))
    }

    fn current_function(&self) -> &'a FunctionDefinition {
        self.function.unwrap_or_else(|| panic!("no function is being encoded"))
    }

    /// Summary application of the enclosing transaction scope: the current
    /// function's summary, or the constructor summary outside functions and
    /// in constructors.
    fn enclosing_summary(&mut self) -> Term {
        let contract = self.current_contract();
        match self.function {
            Some(function) if !function.is_constructor() => {
                let id = self.session.summary(contract.id, function.id);
                self.render(id)
            }
            _ => {
                let id = self.session.constructor_summary(contract.id);
                self.render(id)
            }
        }
    }

    /// Node standing for the current transaction root in the call graph.
    fn call_graph_scope(&self) -> NodeId {
        match self.function {
            Some(function) if !function.is_constructor() => function.id,
            _ => self.current_contract().id,
        }
    }

    /// Record a target guarded by the current error flag.
    fn add_target(&mut self, kind: TargetKind, scope: NodeId, location: &SourceLocation, ty: &Type, error_ids: Vec<u64>) {
        let contract = self.current_contract();
        let error_flag = self.session.context.error_flag();
        let (from, constraints) = match self.function {
            Some(function) if !function.is_constructor() => {
                let iface = self.session.interface(contract.id);
                let args = predicate::interface_args(&mut self.session.context, &self.state_variables, Some(0));
                let iface_pre = self.session.registry.get(iface).apply(args);
                (iface_pre, self.enclosing_summary())
            }
            _ => (self.enclosing_summary(), Term::BoolLit(true)),
        };
        tracing::debug!(%kind, scope = %scope, ids = ?error_ids, "Recorded verification target");
        self.session.targets.push(VerificationTarget {
            kind,
            scope,
            location: location.clone(),
            ty: ty.clone(),
            from,
            constraints,
            error_flag,
            error_ids,
        });
    }

    /// `condition` restricted to the current expression path.
    fn under_path(&self, condition: Term) -> Term {
        Term::and(self.path_conditions.iter().cloned().chain([condition]))
    }

    /// Mint an error id for `node` and let the error flag take it when
    /// `condition` holds.
    fn add_guard(&mut self, node: NodeId, location: &SourceLocation, kind: TargetKind, ty: &Type, condition: Term) {
        let previous = self.session.context.error_flag();
        let error = self.session.context.increase_index(VarKey::Error);
        let id = self.session.new_error_id(node, location);
        self.add_target(kind, node, location, ty, vec![id]);
        let fired = self.under_path(Term::and([condition, Term::eq(error.clone(), Term::int(id))]));
        self.session
            .context
            .add_assertion(Term::or([Term::eq(error, previous), fired]));
    }

    /// Give every state variable and every reference-typed variable in scope
    /// an unknown value.
    fn erase_knowledge(&mut self) {
        tracing::trace!("Erasing knowledge after unknown call");
        let ctx = &mut self.session.context;
        for sv in &self.state_variables {
            ctx.new_unknown_value(sv);
        }
        if let Some(function) = self.function {
            let locals = self.ast.local_variables(function.id).iter().copied();
            for var in function.parameters.iter().chain(&function.returns).chain(locals) {
                if var.ty.is_reference_or_mapping() {
                    ctx.new_unknown_value(var);
                }
            }
        }
    }
}

/// `function_<name>_<id>_<contract>` and friends.
fn function_label(function: &FunctionDefinition, contract: NodeId) -> String {
    let name = match function.kind {
        FunctionKind::Function => format!("function_{}", function.name),
        _ => function.display_name().to_string(),
    };
    format!("{name}_{}_{contract}", function.id)
}

fn head(term: &Term) -> String {
    term.head_name().unwrap_or("rule").to_string()
}

fn equal_all(lhs: Vec<Term>, rhs: Vec<Term>) -> Term {
    Term::and(lhs.into_iter().zip(rhs).map(|(l, r)| Term::eq(l, r)))
}
