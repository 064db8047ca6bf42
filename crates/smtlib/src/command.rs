use crate::sort::Sort;
use crate::term::Term;

/// SMT-LIB command representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `(set-logic LOGIC)`
    SetLogic(String),
    /// `(set-option :key value)`
    SetOption(String, String),
    /// `(declare-fun name (param_sorts...) return_sort)`
    ///
    /// Horn relations are declared as functions into `Bool`.
    DeclareFun(String, Vec<Sort>, Sort),
    /// `(assert term)`
    Assert(Term),
    /// `(check-sat)`
    CheckSat,
    /// `(get-proof)`
    GetProof,
    /// `;; comment`
    Comment(String),
    /// `(exit)`
    Exit,
}
