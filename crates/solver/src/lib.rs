//! # solhorn-solver
//!
//! Constrained Horn clause solving for the contract encoder.
//!
//! Backends implement [`HornBackend`]: they receive relation declarations
//! and closed rules, then answer reachability queries. The subprocess
//! backend talks SMT-LIB2 (`HORN` logic) to Z3 or Eldarica.
//!
//! ## Usage
//!
//! ```no_run
//! use solhorn_smtlib::{Sort, Term};
//! use solhorn_solver::{CliHornSolver, HornBackend, Relation};
//!
//! let mut solver = CliHornSolver::with_default_config().unwrap();
//! solver.register_relation(&Relation::new("inv", vec![Sort::Int]));
//! solver.register_relation(&Relation::new("err", vec![]));
//! solver.add_rule(&Term::app("inv", vec![Term::int(0)]), "init");
//! solver.add_rule(
//!     &Term::forall(
//!         vec![("x".into(), Sort::Int)],
//!         Term::implies(
//!             Term::and(vec![
//!                 Term::app("inv", vec![Term::var("x")]),
//!                 Term::lt(Term::var("x"), Term::int(0)),
//!             ]),
//!             Term::app("err", vec![]),
//!         ),
//!     ),
//!     "inv_to_err",
//! );
//! let outcome = solver.query(&Term::app("err", vec![])).unwrap();
//! assert!(outcome.result.is_unsat());
//! ```

pub mod backend;
pub mod cex_graph;
pub mod config;
pub mod error;
mod parser;
pub mod recorded;
pub mod result;
pub mod solver;
pub mod system;

pub use backend::{HornBackend, create_backend, create_default_backend};
pub use cex_graph::{CexGraph, CexNode, CexNodeId};
pub use config::{SolverConfig, SolverKind};
pub use error::SolverError;
pub use recorded::{RecordedHornSolver, query_key};
pub use result::{CheckResult, QueryOutcome};
pub use solver::CliHornSolver;
pub use system::{HornSystem, Relation};
