//! Call sites: assertions, summarized internal calls, external calls and
//! builtins.

use solhorn_smtlib::{Sort, Term};

use super::Encoder;
use super::expressions::Place;
use crate::ast::{CallKind, Expression, FunctionCall, NodeId, Type};
use crate::encoding_context::{SymbolicVariable, VarKey};
use crate::predicate;
use crate::symbolic::{SymbolicValue, default_value, temporary_name, type_constraint, value_sort};
use crate::verification_target::TargetKind;

impl<'a, 's> Encoder<'a, 's> {
    pub(super) fn function_call(&mut self, e: &'a Expression, call: &'a FunctionCall) -> SymbolicValue {
        match &call.kind {
            CallKind::Assert => self.visit_assert(e, call),
            CallKind::Require => {
                let condition = self.argument(e, call, 0);
                self.session.context.add_assertion(condition);
                SymbolicValue::Scalar(Term::BoolLit(true))
            }
            CallKind::Internal(function) => self.internal_call(e, call, *function),
            CallKind::External(callee) => self.external_call(e, call, *callee),
            CallKind::BareStaticCall | CallKind::Builtin(_) => {
                self.evaluate_operands(call);
                tracing::trace!(call = %e.id, kind = ?call.kind, "Unconstrained call result");
                self.fresh_value(e)
            }
            CallKind::DelegateCall
            | CallKind::BareCall
            | CallKind::BareCallCode
            | CallKind::BareDelegateCall
            | CallKind::Creation => {
                self.evaluate_operands(call);
                let value = self.fresh_value(e);
                tracing::debug!(call = %e.id, kind = ?call.kind, "Call may change any state");
                self.erase_knowledge();
                self.unknown_call_seen = true;
                value
            }
            CallKind::ArrayPush => self.array_push(e, call),
            CallKind::ArrayPop => self.array_pop(e, call),
            CallKind::AddMod | CallKind::MulMod => self.modular_arithmetic(e, call),
        }
    }

    /// `assert(c)`: a failing assertion ends the transaction in the
    /// enclosing summary with a fresh error id.
    fn visit_assert(&mut self, e: &'a Expression, call: &'a FunctionCall) -> SymbolicValue {
        let condition = self.argument(e, call, 0);
        let scope = self.call_graph_scope();
        self.session.call_graph.add_assertion(scope, e.id);

        let previous = self.session.context.error_flag();
        let error = self.session.context.increase_index(VarKey::Error);
        let id = self.session.new_error_id(e.id, &e.location);
        let summary = self.enclosing_summary();
        let failed = self.under_path(Term::and([Term::not(condition), Term::eq(error.clone(), Term::int(id))]));
        self.connect(self.current_block.clone(), summary, failed);
        self.session.context.add_assertion(Term::eq(error, previous));
        SymbolicValue::Scalar(Term::BoolLit(true))
    }

    /// Call of a function with a visible body, replaced by its summary.
    ///
    /// An error inside the callee propagates to the caller's summary; the
    /// normal continuation assumes it did not happen.
    fn internal_call(&mut self, e: &'a Expression, call: &'a FunctionCall, function: NodeId) -> SymbolicValue {
        let callee = self
            .ast
            .function(function)
            .unwrap_or_else(|| panic!("call {} of unknown function {function}", e.id));
        let defining = self
            .ast
            .defining_contract(function)
            .unwrap_or_else(|| panic!("function {function} has no contract"));
        let scope = self.call_graph_scope();
        self.session.call_graph.add_call(scope, function);

        let library = defining.is_library();
        let called = if library { defining } else { self.current_contract() };
        let called_svs = self.ast.state_variables(called);

        if library {
            let iface = self.session.interface(called.id);
            let args = predicate::interface_args(&mut self.session.context, &called_svs, None);
            let assumption = self.session.registry.get(iface).apply(args);
            self.session.context.add_assertion(assumption);
        }

        let mut arguments = Vec::new();
        for argument in &call.arguments {
            arguments.extend(self.expression(argument).into_terms());
        }

        let ctx = &mut self.session.context;
        let previous = ctx.error_flag();
        let error = ctx.increase_index(VarKey::Error);
        let mut args = vec![error.clone(), ctx.this_address(), ctx.state_at(None)];
        args.extend(predicate::values(ctx, &called_svs, None));
        args.extend(arguments);

        if !library && !callee.is_read_only() {
            ctx.increase_index(VarKey::State);
            for sv in &self.state_variables {
                ctx.new_value(sv);
            }
        }
        args.push(ctx.state_at(None));
        args.extend(predicate::values(ctx, &called_svs, None));
        for var in callee.parameters.iter().chain(&callee.returns) {
            args.extend(ctx.new_value(var).into_terms());
        }

        let summary = self.session.summary(called.id, function);
        let application = self.session.registry.get(summary).apply(args);
        self.session.context.add_assertion(application);

        let enclosing = self.enclosing_summary();
        self.connect(
            self.current_block.clone(),
            enclosing,
            Term::gt(error.clone(), Term::int(0)),
        );
        let ctx = &mut self.session.context;
        ctx.add_assertion(Term::eq(error, Term::int(0)));
        let after = ctx.increase_index(VarKey::Error);
        ctx.add_assertion(Term::eq(after, previous));

        match callee.returns.first() {
            Some(ret) => self.session.context.symbolic_value(ret),
            None => SymbolicValue::Scalar(Term::BoolLit(true)),
        }
    }

    /// Message call to another contract. Any number of transactions of the
    /// current contract may happen during it (reentrancy); the callee
    /// itself is not analyzed.
    fn external_call(&mut self, e: &'a Expression, call: &'a FunctionCall, callee: Option<NodeId>) -> SymbolicValue {
        self.evaluate_operands(call);
        let Some(callee) = callee.and_then(|id| self.ast.function(id)) else {
            return self.fresh_value(e);
        };
        let contract = self.current_contract();
        let nondet = self.session.nondet_interface(contract.id);

        let ctx = &mut self.session.context;
        let mut args = vec![ctx.state_at(None)];
        args.extend(predicate::values(ctx, &self.state_variables, None));
        if !callee.is_read_only() {
            ctx.increase_index(VarKey::State);
            for sv in &self.state_variables {
                ctx.new_unknown_value(sv);
            }
        }
        args.push(ctx.state_at(None));
        args.extend(predicate::values(ctx, &self.state_variables, None));
        for ret in &callee.returns {
            ctx.new_unknown_value(ret);
        }

        let application = self.session.registry.get(nondet).apply(args);
        let ctx = &mut self.session.context;
        ctx.add_assertion(application);
        let error = ctx.error_flag();
        ctx.add_assertion(Term::eq(error, Term::int(0)));

        match callee.returns.first() {
            Some(ret) => self.session.context.symbolic_value(ret),
            None => SymbolicValue::Scalar(Term::BoolLit(true)),
        }
    }

    fn array_push(&mut self, e: &'a Expression, call: &'a FunctionCall) -> SymbolicValue {
        let receiver = self.receiver(e, call);
        let place = self.place(receiver);
        let value = match call.arguments.first() {
            Some(argument) => self.expression(argument).scalar(),
            None => match &receiver.ty {
                Type::Array(element) => default_value(element),
                other => panic!("push on non-array type {other}"),
            },
        };
        let SymbolicValue::Array { elements, length } = self.read_place(&place) else {
            panic!("push on non-array expression {}", receiver.id);
        };
        let updated = SymbolicValue::Array {
            elements: Term::store(elements, length.clone(), value.clone()),
            length: Term::add(length, Term::int(1)),
        };
        self.write_place(place, updated);
        SymbolicValue::Scalar(value)
    }

    fn array_pop(&mut self, e: &'a Expression, call: &'a FunctionCall) -> SymbolicValue {
        let receiver = self.receiver(e, call);
        let place: Place<'a> = self.place(receiver);
        let SymbolicValue::Array { elements, length } = self.read_place(&place) else {
            panic!("pop on non-array expression {}", receiver.id);
        };
        self.add_guard(
            e.id,
            &e.location,
            TargetKind::PopEmptyArray,
            &Type::uint256(),
            Term::le(length.clone(), Term::int(0)),
        );
        let new_length = Term::sub(length, Term::int(1));
        let popped = Term::select(elements.clone(), new_length.clone());
        self.write_place(
            place,
            SymbolicValue::Array {
                elements,
                length: new_length,
            },
        );
        SymbolicValue::Scalar(popped)
    }

    /// `addmod(a, b, k)` / `mulmod(a, b, k)`: exact intermediate result,
    /// `k == 0` is a division by zero.
    fn modular_arithmetic(&mut self, e: &'a Expression, call: &'a FunctionCall) -> SymbolicValue {
        let a = self.argument(e, call, 0);
        let b = self.argument(e, call, 1);
        let k = self.argument(e, call, 2);
        let k_is_zero = Term::eq(k.clone(), Term::int(0));
        self.add_guard(e.id, &e.location, TargetKind::DivByZero, &Type::uint256(), k_is_zero.clone());
        let exact = if call.kind == CallKind::AddMod {
            Term::add(a, b)
        } else {
            Term::mul(a, b)
        };
        SymbolicValue::Scalar(Term::ite(k_is_zero, Term::int(0), Term::modulo(exact, k)))
    }

    fn argument(&mut self, e: &'a Expression, call: &'a FunctionCall, position: usize) -> Term {
        let argument = call
            .arguments
            .get(position)
            .unwrap_or_else(|| panic!("call {} is missing argument {position}", e.id));
        self.expression(argument).scalar()
    }

    fn receiver(&self, e: &'a Expression, call: &'a FunctionCall) -> &'a Expression {
        call.receiver
            .as_deref()
            .unwrap_or_else(|| panic!("member call {} has no receiver", e.id))
    }

    fn evaluate_operands(&mut self, call: &'a FunctionCall) {
        if let Some(receiver) = &call.receiver {
            self.expression(receiver);
        }
        for argument in &call.arguments {
            self.expression(argument);
        }
    }

    /// Unconstrained value of the call's type, within its range.
    fn fresh_value(&mut self, e: &Expression) -> SymbolicValue {
        match &e.ty {
            Type::Array(element) => {
                let elements = self.temporary(e.id, 0, Sort::array(Sort::Int, value_sort(element)), &e.ty);
                let length = self.temporary(e.id, 1, Sort::Int, &Type::uint256());
                SymbolicValue::Array { elements, length }
            }
            ty => SymbolicValue::Scalar(self.temporary(e.id, 0, value_sort(ty), ty)),
        }
    }

    fn temporary(&mut self, node: NodeId, slot: usize, sort: Sort, ty: &Type) -> Term {
        let ctx = &mut self.session.context;
        let key = VarKey::Temporary(node, slot);
        if !ctx.is_declared(key) {
            ctx.declare(key, SymbolicVariable::new(temporary_name(node, slot), sort, ty.clone()));
        }
        let value = ctx.increase_index(key);
        ctx.add_assertion(type_constraint(ty, &value));
        value
    }
}
