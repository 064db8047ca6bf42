//! SMT-LIB2 text formatting for AST types.
//!
//! Implements `Display` for [`Sort`], [`Term`], [`Command`], and [`Script`],
//! producing valid SMT-LIB2 output that can be parsed by solvers such as Z3.

use std::fmt;

use num_traits::Signed;

use crate::command::Command;
use crate::script::Script;
use crate::sort::Sort;
use crate::term::Term;

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Array(index, element) => write!(f, "(Array {index} {element})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Term
// ---------------------------------------------------------------------------

/// Write a binary SMT-LIB operator: `(op lhs rhs)`.
fn fmt_binop(op: &str, lhs: &Term, rhs: &Term, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({op} {lhs} {rhs})")
}

/// Write a unary SMT-LIB operator: `(op arg)`.
fn fmt_unop(op: &str, arg: &Term, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({op} {arg})")
}

/// Write an n-ary operator, with `empty` standing in for zero operands.
fn fmt_nary(op: &str, terms: &[Term], empty: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if terms.is_empty() {
        return write!(f, "{empty}");
    }
    write!(f, "({op} ")?;
    fmt_term_list(terms, f)?;
    write!(f, ")")
}

/// Write sorted variable bindings: `((x Sort) (y Sort) ...)`.
fn fmt_sorted_vars(vars: &[(String, Sort)], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(")?;
    for (i, (name, sort)) in vars.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "({name} {sort})")?;
    }
    write!(f, ")")
}

/// Write a space-separated list of terms.
fn fmt_term_list(terms: &[Term], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, t) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{t}")?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // --- Literals ---
            Term::BoolLit(true) => write!(f, "true"),
            Term::BoolLit(false) => write!(f, "false"),
            Term::IntLit(n) => {
                if n.is_negative() {
                    // SMT-LIB represents negative integers as `(- N)`
                    write!(f, "(- {})", n.magnitude())
                } else {
                    write!(f, "{n}")
                }
            }

            // --- Variables ---
            Term::Const(name) => write!(f, "{name}"),

            // --- Boolean operations ---
            Term::Not(inner) => fmt_unop("not", inner, f),
            Term::And(terms) => fmt_nary("and", terms, "true", f),
            Term::Or(terms) => fmt_nary("or", terms, "false", f),
            Term::Implies(lhs, rhs) => fmt_binop("=>", lhs, rhs, f),

            // --- Core ---
            Term::Eq(lhs, rhs) => fmt_binop("=", lhs, rhs, f),
            Term::Ite(cond, then, otherwise) => write!(f, "(ite {cond} {then} {otherwise})"),

            // --- Integer arithmetic ---
            Term::IntAdd(lhs, rhs) => fmt_binop("+", lhs, rhs, f),
            Term::IntSub(lhs, rhs) => fmt_binop("-", lhs, rhs, f),
            Term::IntMul(lhs, rhs) => fmt_binop("*", lhs, rhs, f),
            Term::IntDiv(lhs, rhs) => fmt_binop("div", lhs, rhs, f),
            Term::IntMod(lhs, rhs) => fmt_binop("mod", lhs, rhs, f),
            Term::IntNeg(inner) => fmt_unop("-", inner, f),

            // --- Integer comparison ---
            Term::IntLt(lhs, rhs) => fmt_binop("<", lhs, rhs, f),
            Term::IntLe(lhs, rhs) => fmt_binop("<=", lhs, rhs, f),
            Term::IntGt(lhs, rhs) => fmt_binop(">", lhs, rhs, f),
            Term::IntGe(lhs, rhs) => fmt_binop(">=", lhs, rhs, f),

            // --- Arrays ---
            Term::Select(array, index) => fmt_binop("select", array, index, f),
            Term::Store(array, index, value) => write!(f, "(store {array} {index} {value})"),
            Term::ConstArray(sort, value) => write!(f, "((as const {sort}) {value})"),

            // --- Quantifiers ---
            Term::Forall(vars, body) => {
                write!(f, "(forall ")?;
                fmt_sorted_vars(vars, f)?;
                write!(f, " {body})")
            }

            // --- Application ---
            Term::App(name, args) => {
                if args.is_empty() {
                    write!(f, "{name}")
                } else {
                    write!(f, "({name} ")?;
                    fmt_term_list(args, f)?;
                    write!(f, ")")
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetLogic(logic) => write!(f, "(set-logic {logic})"),
            Command::SetOption(key, value) => write!(f, "(set-option :{key} {value})"),
            Command::DeclareFun(name, param_sorts, return_sort) => {
                write!(f, "(declare-fun {name} (")?;
                for (i, s) in param_sorts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{s}")?;
                }
                write!(f, ") {return_sort})")
            }
            Command::Assert(term) => write!(f, "(assert {term})"),
            Command::CheckSat => write!(f, "(check-sat)"),
            Command::GetProof => write!(f, "(get-proof)"),
            Command::Comment(text) => write!(f, ";; {text}"),
            Command::Exit => write!(f, "(exit)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{cmd}")?;
        }
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use crate::command::Command;
    use crate::script::Script;
    use crate::sort::Sort;
    use crate::term::Term;

    // -----------------------------------------------------------------------
    // Sort formatting
    // -----------------------------------------------------------------------

    #[test]
    fn sort_scalars() {
        assert_eq!(Sort::Bool.to_string(), "Bool");
        assert_eq!(Sort::Int.to_string(), "Int");
    }

    #[test]
    fn sort_array_nested() {
        let s = Sort::array(Sort::Int, Sort::array(Sort::Int, Sort::Bool));
        assert_eq!(s.to_string(), "(Array Int (Array Int Bool))");
    }

    // -----------------------------------------------------------------------
    // Term formatting
    // -----------------------------------------------------------------------

    #[test]
    fn term_int_lit_negative() {
        assert_eq!(Term::int(-42).to_string(), "(- 42)");
        assert_eq!(Term::int(0).to_string(), "0");
    }

    #[test]
    fn term_int_lit_beyond_machine_width() {
        let max = (BigInt::from(1) << 256u32) - 1;
        assert_eq!(
            Term::IntLit(max).to_string(),
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
    }

    #[test]
    fn term_empty_connectives() {
        assert_eq!(Term::And(vec![]).to_string(), "true");
        assert_eq!(Term::Or(vec![]).to_string(), "false");
    }

    #[test]
    fn term_arithmetic() {
        let t = Term::modulo(
            Term::add(Term::var("a"), Term::var("b")),
            Term::int(256),
        );
        assert_eq!(t.to_string(), "(mod (+ a b) 256)");
        assert_eq!(Term::neg(Term::var("a")).to_string(), "(- a)");
        assert_eq!(
            Term::div(Term::var("a"), Term::var("b")).to_string(),
            "(div a b)"
        );
    }

    #[test]
    fn term_ite_and_comparison() {
        let t = Term::ite(
            Term::le(Term::var("x"), Term::int(255)),
            Term::var("x"),
            Term::int(0),
        );
        assert_eq!(t.to_string(), "(ite (<= x 255) x 0)");
    }

    #[test]
    fn term_arrays() {
        let t = Term::select(
            Term::store(Term::var("m"), Term::int(1), Term::int(2)),
            Term::int(1),
        );
        assert_eq!(t.to_string(), "(select (store m 1 2) 1)");
        let zero = Term::const_array(Sort::array(Sort::Int, Sort::Int), Term::int(0));
        assert_eq!(zero.to_string(), "((as const (Array Int Int)) 0)");
    }

    #[test]
    fn term_application_nullary_and_nary() {
        assert_eq!(Term::app("error_target_3", vec![]).to_string(), "error_target_3");
        assert_eq!(
            Term::app("interface_C_4", vec![Term::var("this"), Term::var("x_2_0")]).to_string(),
            "(interface_C_4 this x_2_0)"
        );
    }

    #[test]
    fn term_forall_horn_rule() {
        let rule = Term::forall(
            vec![("x".into(), Sort::Int)],
            Term::implies(
                Term::app("p", vec![Term::var("x")]),
                Term::app("q", vec![Term::var("x")]),
            ),
        );
        assert_eq!(rule.to_string(), "(forall ((x Int)) (=> (p x) (q x)))");
    }

    // -----------------------------------------------------------------------
    // Command formatting
    // -----------------------------------------------------------------------

    #[test]
    fn cmd_declare_relation() {
        let cmd = Command::DeclareFun("nondet".into(), vec![Sort::Int, Sort::Int], Sort::Bool);
        assert_eq!(cmd.to_string(), "(declare-fun nondet (Int Int) Bool)");
        let nullary = Command::DeclareFun("err".into(), vec![], Sort::Bool);
        assert_eq!(nullary.to_string(), "(declare-fun err () Bool)");
    }

    #[test]
    fn cmd_misc() {
        assert_eq!(Command::GetProof.to_string(), "(get-proof)");
        assert_eq!(
            Command::SetOption("fp.xform.slice".into(), "false".into()).to_string(),
            "(set-option :fp.xform.slice false)"
        );
        assert_eq!(Command::Comment("rule".into()).to_string(), ";; rule");
    }

    // -----------------------------------------------------------------------
    // Script formatting
    // -----------------------------------------------------------------------

    #[test]
    fn script_horn_query() {
        let s = Script::with_commands(vec![
            Command::SetLogic("HORN".into()),
            Command::DeclareFun("err".into(), vec![], Sort::Bool),
            Command::Assert(Term::implies(Term::app("err", vec![]), Term::BoolLit(false))),
            Command::CheckSat,
        ]);
        let expected = "\
(set-logic HORN)\n\
(declare-fun err () Bool)\n\
(assert (=> err false))\n\
(check-sat)";
        assert_eq!(s.to_string(), expected);
    }
}
