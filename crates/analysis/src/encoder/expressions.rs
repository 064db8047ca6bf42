//! Expression evaluation and assignment.
//!
//! Evaluating an expression yields its [`SymbolicValue`] and, as a side
//! effect, adds path assertions (assignments, error-flag guards) to the
//! context.

use solhorn_smtlib::Term;

use super::{Encoder, equal_all};
use crate::ast::{ArithmeticOp, BinaryOp, Expression, ExpressionKind, NodeId, Type, UnaryOp, VariableDeclaration};
use crate::encoding_context::VarKey;
use crate::symbolic::{SymbolicValue, wrap};
use crate::verification_target::{TargetKind, arithmetic_target};

/// Something that can be assigned to.
#[derive(Debug, Clone)]
pub(super) enum Place<'a> {
    Variable(&'a VariableDeclaration),
    /// `base[index]` of a mapping or array.
    Element { base: Box<Place<'a>>, index: Term },
}

impl<'a, 's> Encoder<'a, 's> {
    pub(super) fn expression(&mut self, e: &'a Expression) -> SymbolicValue {
        match &e.kind {
            ExpressionKind::BoolLiteral(b) => SymbolicValue::Scalar(Term::BoolLit(*b)),
            ExpressionKind::NumberLiteral(n) => SymbolicValue::Scalar(Term::IntLit(n.clone())),
            ExpressionKind::Identifier(id) => {
                let decl = self.declaration(*id);
                self.session.context.symbolic_value(decl)
            }
            ExpressionKind::Unary { op, operand } => self.unary(e, *op, operand),
            ExpressionKind::Binary { op, lhs, rhs } => self.binary(e, *op, lhs, rhs),
            ExpressionKind::Conditional {
                condition,
                true_expr,
                false_expr,
            } => {
                let condition = self.expression(condition).scalar();
                self.path_conditions.push(condition.clone());
                let t = self.expression(true_expr);
                self.path_conditions.pop();
                self.path_conditions.push(Term::not(condition.clone()));
                let f = self.expression(false_expr);
                self.path_conditions.pop();
                select_value(condition, t, f)
            }
            ExpressionKind::Assignment { op, lhs, rhs } => self.assignment(e, *op, lhs, rhs),
            ExpressionKind::IndexAccess { base, index } => {
                let container = self.expression(base);
                let index = self.expression(index).scalar();
                SymbolicValue::Scalar(Term::select(elements_of(container), index))
            }
            ExpressionKind::Length(array) => match self.expression(array) {
                SymbolicValue::Array { length, .. } => SymbolicValue::Scalar(length),
                SymbolicValue::Scalar(_) => panic!("length of non-array expression {}", array.id),
            },
            ExpressionKind::FunctionCall(call) => self.function_call(e, call),
        }
    }

    /// Move `decl` to a fresh version equal to `value`.
    pub(super) fn assign_variable(&mut self, decl: &VariableDeclaration, value: SymbolicValue) {
        let ctx = &mut self.session.context;
        let fresh = ctx.new_value(decl);
        ctx.add_assertion(equal_all(fresh.into_terms(), value.into_terms()));
    }

    pub(super) fn declaration(&self, id: NodeId) -> &'a VariableDeclaration {
        self.ast
            .variable(id)
            .unwrap_or_else(|| panic!("reference to unknown declaration {id}"))
    }

    fn unary(&mut self, e: &'a Expression, op: UnaryOp, operand: &'a Expression) -> SymbolicValue {
        match op {
            UnaryOp::Not => SymbolicValue::Scalar(Term::not(self.expression(operand).scalar())),
            UnaryOp::Neg => {
                let value = self.expression(operand).scalar();
                SymbolicValue::Scalar(wrap(Term::neg(value), &e.ty))
            }
            UnaryOp::Increment { prefix } | UnaryOp::Decrement { prefix } => {
                let arithmetic = if matches!(op, UnaryOp::Increment { .. }) {
                    ArithmeticOp::Add
                } else {
                    ArithmeticOp::Sub
                };
                let place = self.place(operand);
                let old = self.read_place(&place).scalar();
                let new = self.arithmetic(e, arithmetic, old.clone(), Term::int(1), &operand.ty);
                self.write_place(place, SymbolicValue::Scalar(new.clone()));
                SymbolicValue::Scalar(if prefix { new } else { old })
            }
        }
    }

    fn binary(&mut self, e: &'a Expression, op: BinaryOp, lhs: &'a Expression, rhs: &'a Expression) -> SymbolicValue {
        let l = self.expression(lhs).scalar();
        // Short-circuit: the right operand only runs when the left one did
        // not decide the result.
        let guard = match op {
            BinaryOp::And => Some(l.clone()),
            BinaryOp::Or => Some(Term::not(l.clone())),
            _ => None,
        };
        if let Some(guard) = &guard {
            self.path_conditions.push(guard.clone());
        }
        let r = self.expression(rhs).scalar();
        if guard.is_some() {
            self.path_conditions.pop();
        }

        let value = match op {
            BinaryOp::Arithmetic(op) => self.arithmetic(e, op, l, r, &e.ty),
            BinaryOp::Lt => Term::lt(l, r),
            BinaryOp::Le => Term::le(l, r),
            BinaryOp::Gt => Term::gt(l, r),
            BinaryOp::Ge => Term::ge(l, r),
            BinaryOp::Eq => Term::eq(l, r),
            BinaryOp::Ne => Term::not(Term::eq(l, r)),
            BinaryOp::And => Term::and([l, r]),
            BinaryOp::Or => Term::or([l, r]),
        };
        SymbolicValue::Scalar(value)
    }

    fn assignment(
        &mut self,
        e: &'a Expression,
        op: Option<ArithmeticOp>,
        lhs: &'a Expression,
        rhs: &'a Expression,
    ) -> SymbolicValue {
        let place = self.place(lhs);
        let value = match op {
            None => self.expression(rhs),
            Some(op) => {
                let current = self.read_place(&place).scalar();
                let r = self.expression(rhs).scalar();
                SymbolicValue::Scalar(self.arithmetic(e, op, current, r, &lhs.ty))
            }
        };
        self.write_place(place, value.clone());
        value
    }

    /// Integer arithmetic in type `ty`, guarded for every way it can fail.
    ///
    /// Division and remainder by zero yield 0 and set the error flag under
    /// a division-by-zero target. Results outside the type's range set it
    /// under an underflow/overflow target, then wrap.
    pub(super) fn arithmetic(&mut self, e: &'a Expression, op: ArithmeticOp, lhs: Term, rhs: Term, ty: &Type) -> Term {
        let ty = if ty.is_integer() { ty.clone() } else { Type::uint256() };
        let signed = ty.is_signed();
        let zero = Term::int(0);
        let divisor_is_zero = Term::eq(rhs.clone(), zero.clone());

        let unbounded = match op {
            ArithmeticOp::Add => Term::add(lhs, rhs),
            ArithmeticOp::Sub => Term::sub(lhs, rhs),
            ArithmeticOp::Mul => Term::mul(lhs, rhs),
            ArithmeticOp::Div => {
                let quotient = if signed {
                    truncated_division(lhs, rhs)
                } else {
                    Term::div(lhs, rhs)
                };
                Term::ite(divisor_is_zero.clone(), zero.clone(), quotient)
            }
            ArithmeticOp::Mod => {
                let remainder = if signed {
                    truncated_remainder(lhs, rhs)
                } else {
                    Term::modulo(lhs, rhs)
                };
                Term::ite(divisor_is_zero.clone(), zero.clone(), remainder)
            }
        };

        if matches!(op, ArithmeticOp::Div | ArithmeticOp::Mod) {
            self.add_guard(e.id, &e.location, TargetKind::DivByZero, &ty, divisor_is_zero);
        }

        if let Some(kind) = arithmetic_target(op, &ty) {
            self.add_range_guard(e, kind, &ty, &unbounded);
        }

        wrap(unbounded, &ty)
    }

    fn add_range_guard(&mut self, e: &'a Expression, kind: TargetKind, ty: &Type, value: &Term) {
        let (Some(min), Some(max)) = (ty.min_value(), ty.max_value()) else {
            return;
        };
        let below = Term::lt(value.clone(), Term::IntLit(min));
        let above = Term::gt(value.clone(), Term::IntLit(max));

        let previous = self.session.context.error_flag();
        let error = self.session.context.increase_index(VarKey::Error);
        let takes = |id: u64| Term::eq(error.clone(), Term::int(id));

        let (ids, fired) = match kind {
            TargetKind::Underflow => {
                let id = self.session.new_error_id(e.id, &e.location);
                (vec![id], Term::and([below, takes(id)]))
            }
            TargetKind::Overflow => {
                let id = self.session.new_error_id(e.id, &e.location);
                (vec![id], Term::and([above, takes(id)]))
            }
            TargetKind::UnderOverflow => {
                let under = self.session.new_error_id(e.id, &e.location);
                let over = self.session.new_error_id(e.id, &e.location);
                let fired = Term::or([Term::and([below, takes(under)]), Term::and([above, takes(over)])]);
                (vec![under, over], fired)
            }
            other => panic!("{other} is not a range target"),
        };
        self.add_target(kind, e.id, &e.location, ty, ids);
        let fired = self.under_path(fired);
        self.session
            .context
            .add_assertion(Term::or([Term::eq(error, previous), fired]));
    }

    // -----------------------------------------------------------------------
    // Places
    // -----------------------------------------------------------------------

    pub(super) fn place(&mut self, e: &'a Expression) -> Place<'a> {
        match &e.kind {
            ExpressionKind::Identifier(id) => Place::Variable(self.declaration(*id)),
            ExpressionKind::IndexAccess { base, index } => {
                let base = self.place(base);
                let index = self.expression(index).scalar();
                Place::Element {
                    base: Box::new(base),
                    index,
                }
            }
            _ => panic!("expression {} is not assignable", e.id),
        }
    }

    pub(super) fn read_place(&mut self, place: &Place<'a>) -> SymbolicValue {
        match place {
            Place::Variable(decl) => self.session.context.symbolic_value(decl),
            Place::Element { base, index } => {
                let container = self.read_place(base);
                SymbolicValue::Scalar(Term::select(elements_of(container), index.clone()))
            }
        }
    }

    /// Store `value` at `place`, rebuilding every enclosing container.
    pub(super) fn write_place(&mut self, place: Place<'a>, value: SymbolicValue) {
        match place {
            Place::Variable(decl) => self.assign_variable(decl, value),
            Place::Element { base, index } => {
                let updated = match self.read_place(&base) {
                    SymbolicValue::Scalar(map) => SymbolicValue::Scalar(Term::store(map, index, value.scalar())),
                    SymbolicValue::Array { elements, length } => SymbolicValue::Array {
                        elements: Term::store(elements, index, value.scalar()),
                        length,
                    },
                };
                self.write_place(*base, updated);
            }
        }
    }
}

/// Element array of a mapping or array value.
fn elements_of(container: SymbolicValue) -> Term {
    match container {
        SymbolicValue::Scalar(map) => map,
        SymbolicValue::Array { elements, .. } => elements,
    }
}

fn select_value(condition: Term, t: SymbolicValue, f: SymbolicValue) -> SymbolicValue {
    match (t, f) {
        (SymbolicValue::Scalar(t), SymbolicValue::Scalar(f)) => SymbolicValue::Scalar(Term::ite(condition, t, f)),
        (
            SymbolicValue::Array {
                elements: te,
                length: tl,
            },
            SymbolicValue::Array {
                elements: fe,
                length: fl,
            },
        ) => SymbolicValue::Array {
            elements: Term::ite(condition.clone(), te, fe),
            length: Term::ite(condition, tl, fl),
        },
        _ => panic!("conditional branches have different shapes"),
    }
}

/// Quotient rounded toward zero.
fn truncated_division(lhs: Term, rhs: Term) -> Term {
    let zero = || Term::int(0);
    let lhs_nonneg = Term::ge(lhs.clone(), zero());
    let rhs_nonneg = Term::ge(rhs.clone(), zero());
    Term::ite(
        lhs_nonneg,
        Term::ite(
            rhs_nonneg.clone(),
            Term::div(lhs.clone(), rhs.clone()),
            Term::neg(Term::div(lhs.clone(), Term::neg(rhs.clone()))),
        ),
        Term::ite(
            rhs_nonneg,
            Term::neg(Term::div(Term::neg(lhs.clone()), rhs.clone())),
            Term::div(Term::neg(lhs), Term::neg(rhs)),
        ),
    )
}

/// Remainder with the sign of the dividend.
fn truncated_remainder(lhs: Term, rhs: Term) -> Term {
    Term::ite(
        Term::ge(lhs.clone(), Term::int(0)),
        Term::modulo(lhs.clone(), rhs.clone()),
        Term::neg(Term::modulo(Term::neg(lhs), rhs)),
    )
}
