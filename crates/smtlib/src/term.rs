use num_bigint::BigInt;

use crate::sort::Sort;

/// SMT-LIB term (expression) representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    // === Literals ===
    /// Boolean literal
    BoolLit(bool),
    /// Integer literal (unbounded)
    IntLit(BigInt),

    // === Variables ===
    /// Named constant/variable reference
    Const(String),

    // === Boolean operations ===
    /// Logical NOT
    Not(Box<Term>),
    /// Logical AND (n-ary)
    And(Vec<Term>),
    /// Logical OR (n-ary)
    Or(Vec<Term>),
    /// Logical implication: `(=> a b)`
    Implies(Box<Term>, Box<Term>),

    // === Core ===
    /// Equality: `(= a b)`
    Eq(Box<Term>, Box<Term>),
    /// If-then-else: `(ite cond then else)`
    Ite(Box<Term>, Box<Term>, Box<Term>),

    // === Integer arithmetic ===
    /// `(+ a b)`
    IntAdd(Box<Term>, Box<Term>),
    /// `(- a b)`
    IntSub(Box<Term>, Box<Term>),
    /// `(* a b)`
    IntMul(Box<Term>, Box<Term>),
    /// `(div a b)`
    IntDiv(Box<Term>, Box<Term>),
    /// `(mod a b)`
    IntMod(Box<Term>, Box<Term>),
    /// `(- a)`
    IntNeg(Box<Term>),

    // === Integer comparison ===
    /// `(< a b)`
    IntLt(Box<Term>, Box<Term>),
    /// `(<= a b)`
    IntLe(Box<Term>, Box<Term>),
    /// `(> a b)`
    IntGt(Box<Term>, Box<Term>),
    /// `(>= a b)`
    IntGe(Box<Term>, Box<Term>),

    // === Array operations ===
    /// `(select array index)`
    Select(Box<Term>, Box<Term>),
    /// `(store array index value)`
    Store(Box<Term>, Box<Term>, Box<Term>),
    /// Constant array: `((as const (Array I E)) value)`
    ConstArray(Sort, Box<Term>),

    // === Quantifiers ===
    /// `(forall ((x Sort) ...) body)`
    Forall(Vec<(String, Sort)>, Box<Term>),

    // === Function application ===
    /// `(f arg1 arg2 ...)`; a nullary application prints as the bare name.
    App(String, Vec<Term>),
}

impl Term {
    pub fn int(value: impl Into<BigInt>) -> Self {
        Term::IntLit(value.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Term::Const(name.into())
    }

    pub fn app(name: impl Into<String>, args: Vec<Term>) -> Self {
        Term::App(name.into(), args)
    }

    /// Conjunction that drops literal `true` operands and collapses
    /// singletons.
    pub fn and(terms: impl IntoIterator<Item = Term>) -> Self {
        let mut conjuncts: Vec<Term> = terms
            .into_iter()
            .filter(|t| *t != Term::BoolLit(true))
            .collect();
        match conjuncts.len() {
            0 => Term::BoolLit(true),
            1 => conjuncts.remove(0),
            _ => Term::And(conjuncts),
        }
    }

    pub fn or(terms: impl IntoIterator<Item = Term>) -> Self {
        let mut disjuncts: Vec<Term> = terms.into_iter().collect();
        if disjuncts.len() == 1 {
            disjuncts.remove(0)
        } else {
            Term::Or(disjuncts)
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(term: Term) -> Self {
        Term::Not(Box::new(term))
    }

    pub fn implies(lhs: Term, rhs: Term) -> Self {
        Term::Implies(Box::new(lhs), Box::new(rhs))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn eq(lhs: Term, rhs: Term) -> Self {
        Term::Eq(Box::new(lhs), Box::new(rhs))
    }

    pub fn ite(cond: Term, then: Term, otherwise: Term) -> Self {
        Term::Ite(Box::new(cond), Box::new(then), Box::new(otherwise))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(lhs: Term, rhs: Term) -> Self {
        Term::IntAdd(Box::new(lhs), Box::new(rhs))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(lhs: Term, rhs: Term) -> Self {
        Term::IntSub(Box::new(lhs), Box::new(rhs))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn mul(lhs: Term, rhs: Term) -> Self {
        Term::IntMul(Box::new(lhs), Box::new(rhs))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn div(lhs: Term, rhs: Term) -> Self {
        Term::IntDiv(Box::new(lhs), Box::new(rhs))
    }

    pub fn modulo(lhs: Term, rhs: Term) -> Self {
        Term::IntMod(Box::new(lhs), Box::new(rhs))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn neg(term: Term) -> Self {
        Term::IntNeg(Box::new(term))
    }

    pub fn lt(lhs: Term, rhs: Term) -> Self {
        Term::IntLt(Box::new(lhs), Box::new(rhs))
    }

    pub fn le(lhs: Term, rhs: Term) -> Self {
        Term::IntLe(Box::new(lhs), Box::new(rhs))
    }

    pub fn gt(lhs: Term, rhs: Term) -> Self {
        Term::IntGt(Box::new(lhs), Box::new(rhs))
    }

    pub fn ge(lhs: Term, rhs: Term) -> Self {
        Term::IntGe(Box::new(lhs), Box::new(rhs))
    }

    pub fn select(array: Term, index: Term) -> Self {
        Term::Select(Box::new(array), Box::new(index))
    }

    pub fn store(array: Term, index: Term, value: Term) -> Self {
        Term::Store(Box::new(array), Box::new(index), Box::new(value))
    }

    pub fn const_array(sort: Sort, value: Term) -> Self {
        Term::ConstArray(sort, Box::new(value))
    }

    /// Universally close `body` over `vars`; no binder is emitted when
    /// `vars` is empty.
    pub fn forall(vars: Vec<(String, Sort)>, body: Term) -> Self {
        if vars.is_empty() {
            body
        } else {
            Term::Forall(vars, Box::new(body))
        }
    }

    /// The relation or constant name at the head of this term, if any.
    pub fn head_name(&self) -> Option<&str> {
        match self {
            Term::App(name, _) | Term::Const(name) => Some(name),
            _ => None,
        }
    }

    /// Names of all free `Const` occurrences, each reported once in order
    /// of first appearance. Names bound by an enclosing `forall` are skipped.
    pub fn free_constants(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut bound = Vec::new();
        self.collect_constants(&mut bound, &mut out);
        out
    }

    fn collect_constants(&self, bound: &mut Vec<String>, out: &mut Vec<String>) {
        match self {
            Term::BoolLit(_) | Term::IntLit(_) => {}
            Term::Const(name) => {
                if !bound.contains(name) && !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Term::Not(t) | Term::IntNeg(t) | Term::ConstArray(_, t) => {
                t.collect_constants(bound, out)
            }
            Term::And(ts) | Term::Or(ts) | Term::App(_, ts) => {
                for t in ts {
                    t.collect_constants(bound, out);
                }
            }
            Term::Implies(a, b)
            | Term::Eq(a, b)
            | Term::IntAdd(a, b)
            | Term::IntSub(a, b)
            | Term::IntMul(a, b)
            | Term::IntDiv(a, b)
            | Term::IntMod(a, b)
            | Term::IntLt(a, b)
            | Term::IntLe(a, b)
            | Term::IntGt(a, b)
            | Term::IntGe(a, b)
            | Term::Select(a, b) => {
                a.collect_constants(bound, out);
                b.collect_constants(bound, out);
            }
            Term::Ite(a, b, c) | Term::Store(a, b, c) => {
                a.collect_constants(bound, out);
                b.collect_constants(bound, out);
                c.collect_constants(bound, out);
            }
            Term::Forall(vars, body) => {
                let depth = bound.len();
                bound.extend(vars.iter().map(|(name, _)| name.clone()));
                body.collect_constants(bound, out);
                bound.truncate(depth);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_drops_true_and_collapses() {
        assert_eq!(Term::and(vec![]), Term::BoolLit(true));
        assert_eq!(
            Term::and(vec![Term::BoolLit(true), Term::var("x")]),
            Term::var("x")
        );
        assert_eq!(
            Term::and(vec![Term::var("x"), Term::var("y")]),
            Term::And(vec![Term::var("x"), Term::var("y")])
        );
    }

    #[test]
    fn forall_without_vars_is_body() {
        let body = Term::app("p", vec![]);
        assert_eq!(Term::forall(vec![], body.clone()), body);
    }

    #[test]
    fn free_constants_in_first_occurrence_order() {
        let t = Term::implies(
            Term::and(vec![
                Term::app("inv", vec![Term::var("x_0"), Term::var("s_1")]),
                Term::gt(Term::var("x_0"), Term::int(3)),
            ]),
            Term::app("inv", vec![Term::add(Term::var("x_0"), Term::int(1)), Term::var("s_1")]),
        );
        assert_eq!(t.free_constants(), vec!["x_0".to_string(), "s_1".to_string()]);
    }

    #[test]
    fn free_constants_skip_bound_names() {
        let t = Term::and(vec![
            Term::forall(
                vec![("y".into(), Sort::Int)],
                Term::eq(Term::var("y"), Term::var("z")),
            ),
            Term::var("y"),
        ]);
        assert_eq!(t.free_constants(), vec!["z".to_string(), "y".to_string()]);
    }

    #[test]
    fn head_name_of_application() {
        assert_eq!(Term::app("block_3", vec![Term::int(1)]).head_name(), Some("block_3"));
        assert_eq!(Term::int(1).head_name(), None);
    }
}
