//! Portfolio problem orchestration.
//!
//! [`PortfolioProblem`] owns the problem data, formulates the canonical QP
//! tuple exactly once at construction and dispatches `solve` calls to the
//! backend registry. Every backend solves the identical cached tuple, so
//! timing comparisons are apples-to-apples.

use crate::data::ProblemData;
use crate::error::Result;
use crate::formulate::{formulate, QpTuple, Reformulation};
use crate::solver::{Backend, BackendConfig, BackendRegistry, SolveReport};

/// A portfolio QP instance with a fixed reformulation and eagerly
/// configured solver backends.
pub struct PortfolioProblem {
    data: ProblemData,
    mode: Reformulation,
    tuple: QpTuple,
    backends: BackendRegistry,
}

impl PortfolioProblem {
    /// Build a problem from existing data.
    ///
    /// The tuple is derived here and never regenerated; the reformulation
    /// mode is fixed for the lifetime of the object.
    pub fn new(data: ProblemData, mode: Reformulation, config: BackendConfig) -> Result<Self> {
        let tuple = formulate(&data, mode)?;
        Ok(PortfolioProblem {
            data,
            mode,
            tuple,
            backends: BackendRegistry::new(config),
        })
    }

    /// Generate a random instance and build the problem in one step.
    pub fn random(
        k: usize,
        n: usize,
        density: f64,
        mode: Reformulation,
        seed: u64,
        config: BackendConfig,
    ) -> Result<Self> {
        let data = ProblemData::random(k, n, density, seed)?;
        Self::new(data, mode, config)
    }

    /// Solve the cached tuple with the given backend.
    ///
    /// Calls are independent; nothing is mutated, so callers may invoke
    /// different backends concurrently against the same problem.
    pub fn solve(&self, backend: Backend) -> SolveReport {
        self.backends.adapter(backend).solve(&self.tuple)
    }

    /// Solve by backend name.
    ///
    /// Unknown names fail with [`crate::FolioError::UnsupportedSolver`];
    /// the problem remains usable for other backends afterwards.
    pub fn solve_named(&self, name: &str) -> Result<SolveReport> {
        Ok(self.solve(name.parse()?))
    }

    /// The immutable problem data.
    pub fn data(&self) -> &ProblemData {
        &self.data
    }

    /// The reformulation mode chosen at construction.
    pub fn mode(&self) -> Reformulation {
        self.mode
    }

    /// The cached canonical QP tuple.
    pub fn tuple(&self) -> &QpTuple {
        &self.tuple
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FolioError;
    use crate::solver::SolveStatus;

    #[test]
    fn test_construction_caches_tuple() {
        let problem =
            PortfolioProblem::random(3, 12, 0.5, Reformulation::Dense, 11, BackendConfig::default())
                .unwrap();
        assert_eq!(problem.mode(), Reformulation::Dense);
        assert_eq!(problem.tuple().num_vars(), 12);
        assert_eq!(problem.tuple().num_constraints(), 13);
    }

    #[test]
    fn test_sparse_mode_adds_auxiliaries() {
        let problem = PortfolioProblem::random(
            3,
            12,
            0.5,
            Reformulation::Sparse,
            11,
            BackendConfig::default(),
        )
        .unwrap();
        assert_eq!(problem.tuple().num_vars(), 15);
        assert_eq!(problem.tuple().num_constraints(), 16);
    }

    #[test]
    fn test_solve_named_rejects_unknown_backend() {
        let problem =
            PortfolioProblem::random(2, 6, 0.8, Reformulation::Dense, 3, BackendConfig::default())
                .unwrap();
        let err = problem.solve_named("cplex").unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedSolver(_)));
        // still usable afterwards
        let report = problem.solve_named("clarabel").unwrap();
        assert_eq!(report.status, SolveStatus::Optimal);
    }

    #[test]
    fn test_repeated_solves_are_independent() {
        let problem =
            PortfolioProblem::random(2, 8, 0.7, Reformulation::Dense, 21, BackendConfig::default())
                .unwrap();
        let a = problem.solve(Backend::Clarabel);
        let b = problem.solve(Backend::Clarabel);
        assert_eq!(a.status, SolveStatus::Optimal);
        assert_eq!(a.objective.unwrap(), b.objective.unwrap());
    }
}
