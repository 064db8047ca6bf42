//! Property-based tests for error-id allocation, encoding determinism and
//! bound rendering.

use std::collections::BTreeSet;

use num_bigint::BigInt;
use proptest::prelude::*;
use solhorn_analysis::ast::{ArithmeticOp, AstBuilder, AstIndex, SourceUnit, Type};
use solhorn_analysis::diagnostics::format_number_readable;
use solhorn_analysis::encoder::Encoder;
use solhorn_analysis::session::Session;
use solhorn_solver::RecordedHornSolver;

// ============================================================================
// Helpers
// ============================================================================

fn arithmetic_op() -> impl Strategy<Value = ArithmeticOp> {
    prop_oneof![
        Just(ArithmeticOp::Add),
        Just(ArithmeticOp::Sub),
        Just(ArithmeticOp::Mul),
        Just(ArithmeticOp::Div),
        Just(ArithmeticOp::Mod),
    ]
}

fn integer_type() -> impl Strategy<Value = Type> {
    (prop::sample::select(vec![8u16, 16, 32, 64, 128, 256]), any::<bool>())
        .prop_map(|(bits, signed)| if signed { Type::int(bits) } else { Type::uint(bits) })
}

/// One public function per operation: `function f_i(T a) { x_i = x_i op a; }`
fn contract_with(operations: &[(ArithmeticOp, Type)]) -> SourceUnit {
    let mut b = AstBuilder::new("p.sol");
    let mut state = Vec::new();
    let mut functions = Vec::new();
    for (i, (op, ty)) in operations.iter().enumerate() {
        let x = b.var(&format!("x{i}"), ty.clone());
        let a = b.var("a", ty.clone());
        let lhs = b.ident(&x);
        let rhs = b.ident(&a);
        let value = b.arith(*op, lhs, rhs);
        let target = b.ident(&x);
        let assign = b.assign(target, value);
        let stmt = b.expr_stmt(assign);
        functions.push(b.function(&format!("f{i}"), vec![a], vec![], vec![stmt]));
        state.push(x);
    }
    let c = b.contract("P", state, functions);
    b.unit(vec![c])
}

fn encode(units: &[SourceUnit]) -> (Session, RecordedHornSolver) {
    let ast = AstIndex::build(units);
    let mut session = Session::new();
    let mut backend = RecordedHornSolver::default();
    Encoder::new(&ast, &mut session, &mut backend).encode(units);
    (session, backend)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn error_ids_are_distinct_and_nonzero(
        operations in prop::collection::vec((arithmetic_op(), integer_type()), 1..6)
    ) {
        let unit = contract_with(&operations);
        let (session, _) = encode(std::slice::from_ref(&unit));

        let ids: Vec<u64> = session.targets.iter().flat_map(|t| t.error_ids.iter().copied()).collect();
        let distinct: BTreeSet<u64> = ids.iter().copied().collect();
        prop_assert_eq!(distinct.len(), ids.len());
        prop_assert!(!distinct.contains(&0));
        // The table and the targets agree on the ids of the pass.
        let recorded: BTreeSet<u64> = session.error_ids.all_ids().collect();
        prop_assert_eq!(recorded, distinct);
    }

    #[test]
    fn encoding_is_deterministic(
        operations in prop::collection::vec((arithmetic_op(), integer_type()), 1..4)
    ) {
        let unit = contract_with(&operations);
        let (first_session, first) = encode(std::slice::from_ref(&unit));
        let (second_session, second) = encode(std::slice::from_ref(&unit));

        let render = |solver: &RecordedHornSolver| -> Vec<String> {
            solver.system().rules().iter().map(|(name, rule)| format!("{name}: {rule}")).collect()
        };
        prop_assert_eq!(render(&first), render(&second));
        prop_assert_eq!(first_session.rule_count, second_session.rule_count);
        prop_assert_eq!(first_session.targets.len(), second_session.targets.len());
    }

    #[test]
    fn small_magnitudes_stay_decimal(value in -(u32::MAX as i64)..=u32::MAX as i64) {
        prop_assert_eq!(format_number_readable(&BigInt::from(value)), value.to_string());
    }

    #[test]
    fn powers_of_two_are_compact(exponent in 33u32..512, negative in any::<bool>()) {
        let power = BigInt::from(1) << exponent;
        let sign = if negative { "-" } else { "" };
        let signed = |v: BigInt| if negative { -v } else { v };

        prop_assert_eq!(format_number_readable(&signed(power.clone())), format!("{sign}2**{exponent}"));
        prop_assert_eq!(
            format_number_readable(&signed(&power - 1)),
            format!("{sign}2**{exponent} - 1")
        );
    }
}
