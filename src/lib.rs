//! # folioqp
//!
//! Markowitz portfolio optimization formulated as a convex quadratic
//! program, with interchangeable solver backends benchmarked against the
//! same formulation.
//!
//! The portfolio problem
//!
//! ```text
//! maximize    mu' x - gamma * x' (F F' + D) x
//! subject to  sum(x) = 1,  0 <= x <= 1
//! ```
//!
//! is encoded as a canonical box-constrained QP tuple `(P, q, A, l, u)`
//! meaning `minimize (1/2) x' P x + q' x  s.t.  l <= A x <= u`, in one of
//! two mathematically equivalent reformulations:
//!
//! - **dense** — materializes `P = 2 (F F' + D)` in full, `n` variables;
//! - **sparse** — introduces auxiliary variables `y = F' x` so the quadratic
//!   cost stays block-diagonal, `n + k` variables. Cheap to represent and
//!   factor when `F` is sparse and `k << n`.
//!
//! Both encodings reach the same optimum; solving each with every backend
//! makes objective values directly comparable and isolates solver timing.
//!
//! ## Quick Start
//!
//! ```ignore
//! use folioqp::{Backend, BackendConfig, PortfolioProblem, Reformulation};
//!
//! let problem = PortfolioProblem::random(
//!     20, 200, 0.3, Reformulation::Sparse, 1, BackendConfig::default(),
//! )?;
//!
//! for backend in Backend::all() {
//!     let report = problem.solve(backend);
//!     println!("{backend}: {:?} in {:.3}s", report.objective, report.solve_time);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`ProblemData`] — validated, immutable raw inputs
//! - [`formulate`] — pure transformation into the canonical [`QpTuple`]
//! - [`solver`] — backend adapters behind a common solve contract
//! - [`PortfolioProblem`] — formulates once, caches the tuple, dispatches

pub mod data;
pub mod error;
pub mod formulate;
pub mod problem;
pub mod solver;
pub mod sparse;

pub use data::ProblemData;
pub use error::{FolioError, Result};
pub use formulate::{formulate, QpTuple, Reformulation};
pub use problem::PortfolioProblem;
pub use solver::{Backend, BackendConfig, SolveReport, SolveStatus, SolverAdapter};
