//! Types as logical sorts and values.
//!
//! Fixed-width integers and addresses are mathematical integers whose range
//! is asserted where a value becomes unknown; arithmetic results are wrapped
//! back into range explicitly. Dynamic arrays are split into two
//! components, an element array and a length.

use num_bigint::BigInt;
use solhorn_smtlib::{Sort, Term};

use crate::ast::{NodeId, Type, VariableDeclaration};
use crate::encoding_context::VarKey;

/// Logical value of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolicValue {
    Scalar(Term),
    Array { elements: Term, length: Term },
}

impl SymbolicValue {
    /// The single term of a scalar value.
    ///
    /// # Panics
    ///
    /// On array values; the type checker never lets an array stand where a
    /// scalar is expected.
    pub fn scalar(self) -> Term {
        match self {
            SymbolicValue::Scalar(t) => t,
            SymbolicValue::Array { .. } => panic!("array value used as a scalar"),
        }
    }

    /// Component terms in predicate-argument order.
    pub fn into_terms(self) -> Vec<Term> {
        match self {
            SymbolicValue::Scalar(t) => vec![t],
            SymbolicValue::Array { elements, length } => vec![elements, length],
        }
    }
}

/// One SSA-tracked component of a declared variable.
#[derive(Debug, Clone)]
pub struct Component {
    pub key: VarKey,
    pub base_name: String,
    pub sort: Sort,
    /// Type used for range constraints.
    pub ty: Type,
}

/// Sort of a value of type `ty` (not valid for arrays, which have two
/// components).
///
/// # Panics
///
/// On array types and on mappings whose values are arrays.
pub fn value_sort(ty: &Type) -> Sort {
    match ty {
        Type::Bool => Sort::Bool,
        Type::Integer { .. } | Type::Address => Sort::Int,
        Type::Mapping(key, value) => Sort::array(value_sort(key), value_sort(value)),
        Type::Array(_) => panic!("array type {ty} has no single sort"),
    }
}

/// SSA components of a declaration, in predicate-argument order.
///
/// # Panics
///
/// On arrays of non-value types.
pub fn components(decl: &VariableDeclaration) -> Vec<Component> {
    let base = format!("{}_{}", sanitize(&decl.name), decl.id);
    match &decl.ty {
        Type::Array(element) => {
            assert!(element.is_value_type(), "unsupported array element type {element}");
            vec![
                Component {
                    key: VarKey::Value(decl.id),
                    base_name: base.clone(),
                    sort: Sort::array(Sort::Int, value_sort(element)),
                    ty: decl.ty.clone(),
                },
                Component {
                    key: VarKey::Length(decl.id),
                    base_name: format!("{}_length_{}", sanitize(&decl.name), decl.id),
                    sort: Sort::Int,
                    ty: Type::uint256(),
                },
            ]
        }
        ty => vec![Component {
            key: VarKey::Value(decl.id),
            base_name: base,
            sort: value_sort(ty),
            ty: ty.clone(),
        }],
    }
}

/// Number of predicate arguments a declaration occupies.
pub fn component_count(ty: &Type) -> usize {
    if matches!(ty, Type::Array(_)) { 2 } else { 1 }
}

/// Sorts of several declarations, flattened.
pub fn sorts_of<'a>(decls: impl IntoIterator<Item = &'a VariableDeclaration>) -> Vec<Sort> {
    decls
        .into_iter()
        .flat_map(components)
        .map(|c| c.sort)
        .collect()
}

/// Keep identifiers SMT-LIB friendly.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Range constraint for a value of type `ty`; `true` for unbounded types.
pub fn type_constraint(ty: &Type, value: &Term) -> Term {
    match (ty.min_value(), ty.max_value()) {
        (Some(min), Some(max)) => Term::and(vec![
            Term::le(Term::IntLit(min), value.clone()),
            Term::le(value.clone(), Term::IntLit(max)),
        ]),
        _ => Term::BoolLit(true),
    }
}

/// Zero value of a scalar or mapping type.
pub fn default_value(ty: &Type) -> Term {
    match ty {
        Type::Bool => Term::BoolLit(false),
        Type::Integer { .. } | Type::Address => Term::int(0),
        Type::Mapping(_, value) => Term::const_array(value_sort(ty), default_value(value)),
        Type::Array(_) => panic!("array type {ty} has no single default"),
    }
}

/// Zero value of any type, as a symbolic value.
pub fn default_symbolic(ty: &Type) -> SymbolicValue {
    match ty {
        Type::Array(element) => SymbolicValue::Array {
            elements: Term::const_array(
                Sort::array(Sort::Int, value_sort(element)),
                default_value(element),
            ),
            length: Term::int(0),
        },
        ty => SymbolicValue::Scalar(default_value(ty)),
    }
}

/// Two's-complement wrap of an unbounded result into the range of `ty`.
pub fn wrap(value: Term, ty: &Type) -> Term {
    let (Some(min), Some(max)) = (ty.min_value(), ty.max_value()) else {
        return value;
    };
    let modulus: BigInt = &max - &min + 1;
    let in_range = Term::and(vec![
        Term::le(Term::IntLit(min.clone()), value.clone()),
        Term::le(value.clone(), Term::IntLit(max)),
    ]);
    let wrapped = if min == BigInt::from(0) {
        Term::modulo(value.clone(), Term::IntLit(modulus))
    } else {
        Term::add(
            Term::modulo(Term::sub(value.clone(), Term::IntLit(min.clone())), Term::IntLit(modulus)),
            Term::IntLit(min),
        )
    };
    Term::ite(in_range, value, wrapped)
}

/// Name of a call-site temporary.
pub fn temporary_name(expression: NodeId, slot: usize) -> String {
    format!("expr_{expression}_{slot}")
}
