//! # solhorn-smtlib
//!
//! SMT-LIB2 abstract syntax for constrained Horn clause encodings.
//!
//! Terms are built with the helper constructors on [`Term`] and rendered to
//! solver input through their `Display` implementations:
//!
//! ```
//! use solhorn_smtlib::{Sort, Term};
//!
//! let rule = Term::forall(
//!     vec![("x".into(), Sort::Int)],
//!     Term::implies(
//!         Term::app("inv", vec![Term::var("x")]),
//!         Term::app("inv", vec![Term::add(Term::var("x"), Term::int(1))]),
//!     ),
//! );
//! assert_eq!(rule.to_string(), "(forall ((x Int)) (=> (inv x) (inv (+ x 1))))");
//! ```

pub mod command;
mod formatter;
pub mod script;
pub mod sort;
pub mod term;

pub use command::Command;
pub use script::Script;
pub use sort::Sort;
pub use term::Term;
