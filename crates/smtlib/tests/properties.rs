//! Property-based tests for term formatting and rule closing.

use num_bigint::BigInt;
use proptest::prelude::*;
use solhorn_smtlib::{Sort, Term};

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "x_1_0", "state_2", "error_0"]).prop_map(str::to_string)
}

/// Small integer terms over a fixed pool of constants.
fn term() -> impl Strategy<Value = Term> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Term::int),
        name().prop_map(Term::var),
    ];
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Term::add(l, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Term::mul(l, r)),
            inner.clone().prop_map(Term::neg),
            (inner.clone(), inner).prop_map(|(l, r)| Term::ite(Term::lt(l.clone(), r.clone()), l, r)),
        ]
    })
}

proptest! {
    #[test]
    fn integer_literals_render_as_smtlib(value in any::<i128>()) {
        let rendered = Term::int(BigInt::from(value)).to_string();
        let expected = if value < 0 {
            format!("(- {})", value.unsigned_abs())
        } else {
            value.to_string()
        };
        prop_assert_eq!(rendered, expected);
    }

    #[test]
    fn free_constants_are_listed_once(t in term()) {
        let names = t.free_constants();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), names.len());
        for name in &names {
            prop_assert!(t.to_string().contains(name.as_str()));
        }
    }

    #[test]
    fn quantifying_free_constants_closes_the_term(t in term()) {
        let vars: Vec<(String, Sort)> = t.free_constants().into_iter().map(|n| (n, Sort::Int)).collect();
        let closed = Term::forall(vars, Term::eq(t.clone(), t));
        prop_assert!(closed.free_constants().is_empty());
    }
}
