use std::fmt;
use std::path::PathBuf;

use crate::error::SolverError;

/// Supported Horn solver binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    /// Z3 with its Spacer engine.
    Z3,
    /// Eldarica from Uppsala University.
    Eldarica,
}

impl SolverKind {
    /// Binary name used for PATH lookup.
    pub fn binary_name(&self) -> &'static str {
        match self {
            SolverKind::Z3 => "z3",
            SolverKind::Eldarica => "eld",
        }
    }

    /// Common installation paths to check when PATH lookup fails.
    fn common_paths(&self) -> &'static [&'static str] {
        match self {
            SolverKind::Z3 => &["/opt/homebrew/bin/z3", "/usr/local/bin/z3", "/usr/bin/z3"],
            SolverKind::Eldarica => &["/opt/homebrew/bin/eld", "/usr/local/bin/eld", "/usr/bin/eld"],
        }
    }

    /// Build solver-specific CLI arguments for reading SMT-LIB2 Horn
    /// problems from stdin.
    pub fn stdin_args(&self) -> Vec<String> {
        match self {
            SolverKind::Z3 => vec!["-in".to_string()],
            SolverKind::Eldarica => vec!["-in".to_string(), "-hsmt".to_string()],
        }
    }

    /// Build solver-specific timeout argument, if supported.
    pub fn timeout_arg(&self, timeout_ms: u64) -> Option<String> {
        if timeout_ms == 0 {
            return None;
        }
        match self {
            SolverKind::Z3 => Some(format!("-t:{timeout_ms}")),
            SolverKind::Eldarica => Some(format!("-t:{}", timeout_ms.div_ceil(1000))),
        }
    }

    /// Whether the solver answers `(get-proof)` with a hyper-resolution
    /// derivation and honours Spacer preprocessing options.
    pub fn supports_proofs(&self) -> bool {
        matches!(self, SolverKind::Z3)
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Z3 => write!(f, "Z3"),
            SolverKind::Eldarica => write!(f, "Eldarica"),
        }
    }
}

impl std::str::FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "z3" | "spacer" => Ok(SolverKind::Z3),
            "eldarica" | "eld" => Ok(SolverKind::Eldarica),
            _ => Err(format!("Unknown solver: {s}. Valid options: z3, eldarica")),
        }
    }
}

/// Solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Which solver to use.
    pub kind: SolverKind,
    /// Path to the solver binary.
    pub solver_path: PathBuf,
    /// Timeout in milliseconds (0 = no timeout).
    pub timeout_ms: u64,
    /// Additional solver arguments.
    pub extra_args: Vec<String>,
    /// Request a derivation for reachable goals (Z3 only).
    pub produce_proofs: bool,
}

impl SolverConfig {
    /// Create a new config with the given solver kind and path.
    ///
    /// Proofs are requested whenever the solver can produce them.
    pub fn new(kind: SolverKind, solver_path: PathBuf) -> Self {
        Self {
            kind,
            solver_path,
            timeout_ms: 0,
            extra_args: Vec::new(),
            produce_proofs: kind.supports_proofs(),
        }
    }

    /// Create config with a specific timeout (in milliseconds).
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Add extra arguments for the solver.
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Enable or disable proof production. Ignored by solvers without
    /// proof support.
    pub fn with_proofs(mut self, enabled: bool) -> Self {
        self.produce_proofs = enabled && self.kind.supports_proofs();
        self
    }

    /// Auto-detect solver location for the given kind.
    ///
    /// Tries `which <binary>` first, then checks common installation paths.
    pub fn auto_detect_for(kind: SolverKind) -> Result<Self, SolverError> {
        let binary = kind.binary_name();

        if let Ok(output) = std::process::Command::new("which").arg(binary).output()
            && output.status.success()
        {
            let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path_str.is_empty() {
                let path = PathBuf::from(&path_str);
                if path.exists() {
                    return Ok(Self::new(kind, path));
                }
            }
        }

        for candidate in kind.common_paths() {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(Self::new(kind, path));
            }
        }

        Err(SolverError::NotFound(kind, PathBuf::from(binary)))
    }

    /// Auto-detect Z3.
    pub fn auto_detect() -> Result<Self, SolverError> {
        Self::auto_detect_for(SolverKind::Z3)
    }

    /// Build the full argument list for this solver invocation.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = self.kind.stdin_args();

        if let Some(timeout_arg) = self.kind.timeout_arg(self.timeout_ms) {
            args.push(timeout_arg);
        }

        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Validate that the configured solver binary exists.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.solver_path.exists() {
            return Err(SolverError::NotFound(self.kind, self.solver_path.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_defaults() {
        let config = SolverConfig::new(SolverKind::Z3, PathBuf::from("/opt/homebrew/bin/z3"));
        assert_eq!(config.timeout_ms, 0);
        assert!(config.extra_args.is_empty());
        assert!(config.produce_proofs);

        let eld = SolverConfig::new(SolverKind::Eldarica, PathBuf::from("/usr/bin/eld"));
        assert!(!eld.produce_proofs);
    }

    #[test]
    fn builder_pattern() {
        let config = SolverConfig::new(SolverKind::Z3, PathBuf::from("/usr/bin/z3"))
            .with_timeout(5000)
            .with_extra_args(vec!["-v:1".to_string()])
            .with_proofs(false);
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.extra_args, vec!["-v:1".to_string()]);
        assert!(!config.produce_proofs);
    }

    #[test]
    fn proofs_cannot_be_forced_on_eldarica() {
        let config =
            SolverConfig::new(SolverKind::Eldarica, PathBuf::from("/usr/bin/eld")).with_proofs(true);
        assert!(!config.produce_proofs);
    }

    #[test]
    fn validate_missing_binary() {
        let config = SolverConfig::new(SolverKind::Z3, PathBuf::from("/nonexistent/z3"));
        assert_eq!(
            config.validate(),
            Err(SolverError::NotFound(SolverKind::Z3, PathBuf::from("/nonexistent/z3")))
        );
    }

    #[test]
    fn solver_kind_from_str() {
        assert_eq!("z3".parse::<SolverKind>(), Ok(SolverKind::Z3));
        assert_eq!("Spacer".parse::<SolverKind>(), Ok(SolverKind::Z3));
        assert_eq!("eld".parse::<SolverKind>(), Ok(SolverKind::Eldarica));
        assert!("cvc5".parse::<SolverKind>().is_err());
    }

    #[test]
    fn solver_kind_timeout_args() {
        assert_eq!(SolverKind::Z3.timeout_arg(0), None);
        assert_eq!(SolverKind::Z3.timeout_arg(1500), Some("-t:1500".to_string()));
        assert_eq!(SolverKind::Eldarica.timeout_arg(1500), Some("-t:2".to_string()));
    }

    #[test]
    fn build_args_z3() {
        let config = SolverConfig::new(SolverKind::Z3, PathBuf::from("/usr/bin/z3"))
            .with_timeout(1000)
            .with_extra_args(vec!["-st".to_string()]);
        assert_eq!(config.build_args(), vec!["-in", "-t:1000", "-st"]);
    }

    #[test]
    fn build_args_eldarica() {
        let config = SolverConfig::new(SolverKind::Eldarica, PathBuf::from("/usr/bin/eld"));
        assert_eq!(config.build_args(), vec!["-in", "-hsmt"]);
    }
}
