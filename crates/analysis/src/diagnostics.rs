//! Warnings emitted by the analysis.

use std::fmt;

use num_bigint::BigInt;
use num_traits::{One, Signed};

use crate::ast::SourceLocation;

/// Stable numeric identifier of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    pub const UNDERFLOW: ErrorCode = ErrorCode(3944);
    pub const OVERFLOW: ErrorCode = ErrorCode(4984);
    pub const POP_EMPTY_ARRAY: ErrorCode = ErrorCode(2529);
    pub const DIVISION_BY_ZERO: ErrorCode = ErrorCode(4281);
    pub const ASSERTION: ErrorCode = ErrorCode(6328);
    pub const CONFLICTING_ANSWERS: ErrorCode = ErrorCode(1988);
    pub const SOLVER_ERROR: ErrorCode = ErrorCode(1218);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub location: SourceLocation,
    pub message: String,
    /// Extra text shown below the message (counterexamples).
    pub secondary: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Warning ({}): {}\n  --> {}", self.code, self.message, self.location)?;
        if let Some(secondary) = &self.secondary {
            write!(f, "{secondary}")?;
        }
        Ok(())
    }
}

/// Receiver of analysis warnings.
pub trait DiagnosticSink {
    fn warning(&mut self, code: ErrorCode, location: &SourceLocation, message: String, secondary: Option<String>);
}

/// Collects diagnostics in emission order.
#[derive(Debug, Clone, Default)]
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn with_code(&self, code: ErrorCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticSink for ErrorReporter {
    fn warning(&mut self, code: ErrorCode, location: &SourceLocation, message: String, secondary: Option<String>) {
        tracing::debug!(%code, %location, "{message}");
        self.diagnostics.push(Diagnostic {
            code,
            location: location.clone(),
            message,
            secondary,
        });
    }
}

/// Render a bound compactly: small magnitudes in decimal, powers of two as
/// `2**n`, one below a power of two as `2**n - 1`.
pub fn format_number_readable(value: &BigInt) -> String {
    let sign = if value.is_negative() { "-" } else { "" };
    let magnitude = value.abs();
    if magnitude <= BigInt::from(u32::MAX) {
        return format!("{sign}{magnitude}");
    }
    if let Some(exponent) = power_of_two(&magnitude) {
        return format!("{sign}2**{exponent}");
    }
    if let Some(exponent) = power_of_two(&(&magnitude + 1)) {
        return format!("{sign}2**{exponent} - 1");
    }
    format!("{sign}{magnitude}")
}

fn power_of_two(value: &BigInt) -> Option<u64> {
    let exponent = value.bits().checked_sub(1)?;
    (*value == BigInt::one() << exponent).then_some(exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_bounds() {
        let two = BigInt::from(2);
        assert_eq!(format_number_readable(&BigInt::from(255)), "255");
        assert_eq!(format_number_readable(&BigInt::from(-128)), "-128");
        assert_eq!(format_number_readable(&BigInt::from(0)), "0");
        assert_eq!(format_number_readable(&(two.pow(256) - 1)), "2**256 - 1");
        assert_eq!(format_number_readable(&-two.pow(255)), "-2**255");
        assert_eq!(format_number_readable(&two.pow(160)), "2**160");
        assert_eq!(format_number_readable(&(two.pow(40) + 3)), "1099511627779");
    }

    #[test]
    fn reporter_keeps_order_and_filters_by_code() {
        let mut reporter = ErrorReporter::new();
        let loc = SourceLocation {
            source: "a.sol".into(),
            start: 3,
            end: 9,
        };
        reporter.warning(ErrorCode::OVERFLOW, &loc, "CHC: first".into(), None);
        reporter.warning(ErrorCode::ASSERTION, &loc, "CHC: second".into(), Some("\ntrace".into()));
        reporter.warning(ErrorCode::OVERFLOW, &loc, "CHC: third".into(), None);

        assert_eq!(reporter.len(), 3);
        let overflow: Vec<&str> = reporter
            .with_code(ErrorCode::OVERFLOW)
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(overflow, vec!["CHC: first", "CHC: third"]);
        assert_eq!(
            reporter.diagnostics()[1].to_string(),
            "Warning (6328): CHC: second\n  --> a.sol:3..9\ntrace"
        );
    }
}
