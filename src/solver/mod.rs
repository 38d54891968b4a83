//! Solver backends for the canonical QP tuple.
//!
//! This module provides:
//! - The [`SolverAdapter`] trait every backend implements
//! - A registry mapping [`Backend`] tags to configured adapters
//! - Three interchangeable backends: operator-splitting (ADMM),
//!   interior-point (Clarabel) and dense active-set (quadprog)

pub mod active_set;
pub mod admm;
pub mod clarabel;

use std::str::FromStr;

use crate::error::{FolioError, Result};
use crate::formulate::QpTuple;

pub use active_set::ActiveSetSolver;
pub use admm::{AdmmSettings, AdmmSolver};
pub use clarabel::{ClarabelSettings, ClarabelSolver};

/// Identifier for a registered solver backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// OSQP-style operator-splitting solver.
    Admm,
    /// Clarabel interior-point solver.
    Clarabel,
    /// Goldfarb-Idnani dense active-set solver.
    ActiveSet,
}

impl Backend {
    /// All registered backends, in registry order.
    pub fn all() -> [Backend; 3] {
        [Backend::Admm, Backend::Clarabel, Backend::ActiveSet]
    }
}

impl FromStr for Backend {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admm" => Ok(Backend::Admm),
            "clarabel" => Ok(Backend::Clarabel),
            "active-set" => Ok(Backend::ActiveSet),
            other => Err(FolioError::UnsupportedSolver(other.to_string())),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Admm => write!(f, "admm"),
            Backend::Clarabel => write!(f, "clarabel"),
            Backend::ActiveSet => write!(f, "active-set"),
        }
    }
}

/// Solution status reported by a backend.
///
/// Backend-internal failures (non-convergence, infeasibility, numerical
/// breakdown) are data in the report, never an `Err`; the orchestrator
/// surfaces them unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Maximum iterations reached.
    MaxIterations,
    /// Numerical difficulties.
    NumericalError,
    /// Unknown status.
    Unknown,
}

/// Normalized result of one backend solve.
#[derive(Debug, Clone)]
pub struct SolveReport {
    /// Solution status.
    pub status: SolveStatus,
    /// Objective value `(1/2) x' P x + q' x`. Only meaningful when
    /// `status` is [`SolveStatus::Optimal`]; a `MaxIterations` report
    /// carries the value at the last, unconverged iterate.
    pub objective: Option<f64>,
    /// Primal solution. Same caveat as `objective`: check `status`
    /// before trusting it.
    pub x: Option<Vec<f64>>,
    /// Wall-clock solve time in seconds.
    pub solve_time: f64,
    /// Iterations used by the backend.
    pub iterations: usize,
}

impl SolveReport {
    /// Report for a solve that failed before producing a solution.
    pub(crate) fn failure(status: SolveStatus, solve_time: f64, iterations: usize) -> Self {
        SolveReport {
            status,
            objective: None,
            x: None,
            solve_time,
            iterations,
        }
    }
}

/// Common capability of all QP backends: solve `(P, q, A, l, u)` and
/// return a normalized report.
pub trait SolverAdapter {
    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    /// Solve the tuple. Must not mutate any shared state; concurrent calls
    /// against the same tuple are safe.
    fn solve(&self, tuple: &QpTuple) -> SolveReport;
}

/// Per-backend tuning configuration.
///
/// Opaque to the formulator and orchestrator; each settings record is
/// validated and consumed entirely within its backend.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Settings for the ADMM backend.
    pub admm: AdmmSettings,
    /// Settings for the Clarabel backend.
    pub clarabel: ClarabelSettings,
}

/// Eagerly constructed adapters, one per [`Backend`] variant.
///
/// Adding a backend means adding one variant and one registry entry here.
pub struct BackendRegistry {
    admm: AdmmSolver,
    clarabel: ClarabelSolver,
    active_set: ActiveSetSolver,
}

impl BackendRegistry {
    /// Build every adapter from its configuration record.
    pub fn new(config: BackendConfig) -> Self {
        BackendRegistry {
            admm: AdmmSolver::new(config.admm),
            clarabel: ClarabelSolver::new(config.clarabel),
            active_set: ActiveSetSolver::new(),
        }
    }

    /// Look up the adapter for a backend tag.
    pub fn adapter(&self, backend: Backend) -> &dyn SolverAdapter {
        match backend {
            Backend::Admm => &self.admm,
            Backend::Clarabel => &self.clarabel,
            Backend::ActiveSet => &self.active_set,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("admm".parse::<Backend>().unwrap(), Backend::Admm);
        assert_eq!("clarabel".parse::<Backend>().unwrap(), Backend::Clarabel);
        assert_eq!("active-set".parse::<Backend>().unwrap(), Backend::ActiveSet);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = "gurobi".parse::<Backend>().unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedSolver(_)));
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = BackendRegistry::new(BackendConfig::default());
        for backend in Backend::all() {
            assert_eq!(registry.adapter(backend).name(), backend.to_string());
        }
    }
}
