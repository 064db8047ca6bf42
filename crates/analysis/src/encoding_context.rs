//! SSA variable store and path assertions for one analysis pass.

use rustc_hash::FxHashMap;
use solhorn_smtlib::{Sort, Term};

use crate::ast::{NodeId, Type, VariableDeclaration};
use crate::symbolic::{SymbolicValue, components, type_constraint};

/// Key of an SSA-tracked variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VarKey {
    /// Value of a declared variable (elements, for arrays).
    Value(NodeId),
    /// Length of a declared array.
    Length(NodeId),
    /// Fresh value produced at a call site.
    Temporary(NodeId, usize),
    /// Balances of all accounts.
    State,
    /// Error flag of the current transaction.
    Error,
}

/// A variable with a sequence of SSA versions `base_0, base_1, ...`.
#[derive(Debug, Clone)]
pub struct SymbolicVariable {
    base_name: String,
    sort: Sort,
    ty: Type,
    current: u32,
    next_free: u32,
}

impl SymbolicVariable {
    pub fn new(base_name: impl Into<String>, sort: Sort, ty: Type) -> Self {
        Self {
            base_name: base_name.into(),
            sort,
            ty,
            current: 0,
            next_free: 1,
        }
    }

    pub fn name_at(&self, index: u32) -> String {
        format!("{}_{}", self.base_name, index)
    }

    pub fn index(&self) -> u32 {
        self.current
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    fn increase_index(&mut self) {
        self.current = self.next_free;
        self.next_free += 1;
    }

    fn reset_index(&mut self) {
        self.current = 0;
        self.next_free = 1;
    }
}

/// Symbolic state threaded through the encoder.
///
/// Every SSA name handed out is remembered with its sort so that rules can
/// later be closed under a `forall` over exactly their free variables.
#[derive(Debug)]
pub struct EncodingContext {
    variables: FxHashMap<VarKey, SymbolicVariable>,
    sorts: FxHashMap<String, Sort>,
    assertions: Vec<Term>,
    unique_id: u64,
}

/// Unindexed address of the contract under analysis.
pub const THIS: &str = "this";

impl Default for EncodingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodingContext {
    pub fn new() -> Self {
        let mut ctx = Self {
            variables: FxHashMap::default(),
            sorts: FxHashMap::default(),
            assertions: Vec::new(),
            unique_id: 0,
        };
        ctx.declare(
            VarKey::State,
            SymbolicVariable::new("state", Sort::array(Sort::Int, Sort::Int), Type::mapping(Type::Address, Type::uint256())),
        );
        ctx.declare(VarKey::Error, SymbolicVariable::new("error", Sort::Int, Type::uint256()));
        ctx.sorts.insert(THIS.to_string(), Sort::Int);
        ctx
    }

    /// Track `variable` under `key` unless it is already tracked.
    pub fn declare(&mut self, key: VarKey, variable: SymbolicVariable) {
        self.variables.entry(key).or_insert(variable);
    }

    pub fn is_declared(&self, key: VarKey) -> bool {
        self.variables.contains_key(&key)
    }

    pub fn variable(&self, key: VarKey) -> &SymbolicVariable {
        self.variables
            .get(&key)
            .unwrap_or_else(|| panic!("variable {key:?} used before declaration"))
    }

    fn variable_mut(&mut self, key: VarKey) -> &mut SymbolicVariable {
        self.variables
            .get_mut(&key)
            .unwrap_or_else(|| panic!("variable {key:?} used before declaration"))
    }

    fn term(&mut self, name: String, sort: Sort) -> Term {
        self.sorts.entry(name.clone()).or_insert(sort);
        Term::Const(name)
    }

    pub fn current_value(&mut self, key: VarKey) -> Term {
        let var = self.variable(key);
        let (name, sort) = (var.name_at(var.index()), var.sort().clone());
        self.term(name, sort)
    }

    pub fn value_at_index(&mut self, key: VarKey, index: u32) -> Term {
        let var = self.variable(key);
        let (name, sort) = (var.name_at(index), var.sort().clone());
        self.term(name, sort)
    }

    /// Move to a fresh version and return it.
    pub fn increase_index(&mut self, key: VarKey) -> Term {
        self.variable_mut(key).increase_index();
        self.current_value(key)
    }

    pub fn reset_index(&mut self, key: VarKey) {
        self.variable_mut(key).reset_index();
    }

    /// Reset every tracked variable to version 0.
    pub fn reset_all_indices(&mut self) {
        for var in self.variables.values_mut() {
            var.reset_index();
        }
    }

    /// Track every component of `decl`.
    pub fn declare_variable(&mut self, decl: &VariableDeclaration) {
        for component in components(decl) {
            self.declare(
                component.key,
                SymbolicVariable::new(component.base_name, component.sort, component.ty),
            );
        }
    }

    /// Component terms of `decl` at version `at`, or at the current version.
    pub fn variable_values(&mut self, decl: &VariableDeclaration, at: Option<u32>) -> Vec<Term> {
        self.declare_variable(decl);
        components(decl)
            .into_iter()
            .map(|c| match at {
                Some(index) => self.value_at_index(c.key, index),
                None => self.current_value(c.key),
            })
            .collect()
    }

    pub fn symbolic_value(&mut self, decl: &VariableDeclaration) -> SymbolicValue {
        let mut values = self.variable_values(decl, None);
        match values.len() {
            1 => SymbolicValue::Scalar(values.remove(0)),
            _ => {
                let length = values.remove(1);
                SymbolicValue::Array {
                    elements: values.remove(0),
                    length,
                }
            }
        }
    }

    /// Move every component of `decl` to a fresh version.
    pub fn new_value(&mut self, decl: &VariableDeclaration) -> SymbolicValue {
        self.declare_variable(decl);
        for component in components(decl) {
            self.increase_index(component.key);
        }
        self.symbolic_value(decl)
    }

    /// Fresh version of `decl` about which only its type range is known.
    pub fn new_unknown_value(&mut self, decl: &VariableDeclaration) -> SymbolicValue {
        let value = self.new_value(decl);
        for (component, term) in components(decl).iter().zip(value.clone().into_terms()) {
            self.add_assertion(type_constraint(&component.ty, &term));
        }
        value
    }

    /// Version `at` (or the current version) of the blockchain state.
    pub fn state_at(&mut self, at: Option<u32>) -> Term {
        match at {
            Some(index) => self.value_at_index(VarKey::State, index),
            None => self.current_value(VarKey::State),
        }
    }

    pub fn error_flag(&mut self) -> Term {
        self.current_value(VarKey::Error)
    }

    pub fn this_address(&self) -> Term {
        Term::var(THIS)
    }

    pub fn add_assertion(&mut self, assertion: Term) {
        if assertion != Term::BoolLit(true) {
            self.assertions.push(assertion);
        }
    }

    pub fn assertions(&self) -> &[Term] {
        &self.assertions
    }

    pub fn clear_assertions(&mut self) {
        self.assertions.clear();
    }

    /// Fresh id; never 0.
    pub fn new_unique_id(&mut self) -> u64 {
        self.unique_id += 1;
        self.unique_id
    }

    pub fn sort_of(&self, name: &str) -> Option<&Sort> {
        self.sorts.get(name)
    }

    /// Close `rule` universally over its free variables.
    ///
    /// # Panics
    ///
    /// When a free variable was not produced by this context.
    pub fn quantify(&self, rule: Term) -> Term {
        let vars = rule
            .free_constants()
            .into_iter()
            .map(|name| {
                let sort = self
                    .sort_of(&name)
                    .unwrap_or_else(|| panic!("free variable {name} has no known sort"))
                    .clone();
                (name, sort)
            })
            .collect();
        Term::forall(vars, rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_x() -> EncodingContext {
        let mut ctx = EncodingContext::new();
        ctx.declare(
            VarKey::Value(NodeId(7)),
            SymbolicVariable::new("x_7", Sort::Int, Type::uint(8)),
        );
        ctx
    }

    #[test]
    fn ssa_versions() {
        let mut ctx = ctx_with_x();
        let x = VarKey::Value(NodeId(7));
        assert_eq!(ctx.current_value(x), Term::var("x_7_0"));
        assert_eq!(ctx.increase_index(x), Term::var("x_7_1"));
        assert_eq!(ctx.increase_index(x), Term::var("x_7_2"));
        assert_eq!(ctx.value_at_index(x, 0), Term::var("x_7_0"));
        ctx.reset_index(x);
        assert_eq!(ctx.current_value(x), Term::var("x_7_0"));
        assert_eq!(ctx.increase_index(x), Term::var("x_7_1"));
    }

    #[test]
    fn redeclaring_keeps_existing_versions() {
        let mut ctx = ctx_with_x();
        let x = VarKey::Value(NodeId(7));
        ctx.increase_index(x);
        ctx.declare(x, SymbolicVariable::new("other", Sort::Bool, Type::Bool));
        assert_eq!(ctx.current_value(x), Term::var("x_7_1"));
    }

    #[test]
    fn unique_ids_start_above_zero() {
        let mut ctx = EncodingContext::new();
        let ids: Vec<u64> = (0..5).map(|_| ctx.new_unique_id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn quantify_uses_recorded_sorts() {
        let mut ctx = ctx_with_x();
        let x = ctx.current_value(VarKey::Value(NodeId(7)));
        let err = ctx.current_value(VarKey::Error);
        let state = ctx.current_value(VarKey::State);
        let rule = Term::implies(
            Term::app("p", vec![x, state, ctx.this_address()]),
            Term::app("q", vec![err]),
        );
        assert_eq!(
            ctx.quantify(rule).to_string(),
            "(forall ((x_7_0 Int) (state_0 (Array Int Int)) (this Int) (error_0 Int)) \
             (=> (p x_7_0 state_0 this) (q error_0)))"
        );
    }

    #[test]
    #[should_panic(expected = "no known sort")]
    fn quantify_rejects_foreign_names() {
        let ctx = EncodingContext::new();
        ctx.quantify(Term::app("p", vec![Term::var("stranger")]));
    }

    #[test]
    fn declarations_expand_to_components() {
        use crate::ast::AstBuilder;

        let mut b = AstBuilder::new("t");
        let arr = b.var("arr", Type::array(Type::uint(8)));
        let mut ctx = EncodingContext::new();
        let before = ctx.symbolic_value(&arr);
        assert_eq!(
            before,
            SymbolicValue::Array {
                elements: Term::var(format!("arr_{}_0", arr.id)),
                length: Term::var(format!("arr_length_{}_0", arr.id)),
            }
        );
        let after = ctx.new_unknown_value(&arr);
        assert_eq!(after.into_terms()[1], Term::var(format!("arr_length_{}_1", arr.id)));
        assert_eq!(ctx.assertions().len(), 1);
        assert_eq!(
            ctx.variable_values(&arr, Some(0)),
            vec![
                Term::var(format!("arr_{}_0", arr.id)),
                Term::var(format!("arr_length_{}_0", arr.id)),
            ]
        );
    }

    #[test]
    fn trivial_assertions_are_dropped() {
        let mut ctx = EncodingContext::new();
        ctx.add_assertion(Term::BoolLit(true));
        ctx.add_assertion(Term::var("b"));
        assert_eq!(ctx.assertions(), &[Term::var("b")]);
        ctx.clear_assertions();
        assert!(ctx.assertions().is_empty());
    }
}
