//! Solver seam.
//!
//! The worker only talks to [`Solver`]; [`cbc::CbcSolver`] is the production
//! backend and tests substitute scripted implementations.

pub mod cbc;

use crate::{
    config::settings::SolverConfig,
    core::program::{LinearProgram, VarId},
    errors::Result,
};
use std::fmt;
use std::future::Future;
use std::time::Duration;

pub use cbc::CbcSolver;

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCondition {
    /// Proven optimal within the gap
    Optimal,
    /// No assignment satisfies every constraint
    Infeasible,
    /// The time budget ran out
    TimeLimit,
    /// The objective is unbounded
    Unbounded,
    /// Anything else the solver reported
    Other,
}

impl TerminationCondition {
    /// Lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::Infeasible => "infeasible",
            Self::TimeLimit => "time_limit",
            Self::Unbounded => "unbounded",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TerminationCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-solve budgets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOptions {
    /// Wall-clock limit
    pub time_limit: Duration,
    /// Relative optimality gap
    pub relative_gap: f64,
}

impl From<&SolverConfig> for SolveOptions {
    fn from(config: &SolverConfig) -> Self {
        Self {
            time_limit: Duration::from_secs(config.time_limit_secs),
            relative_gap: config.relative_gap,
        }
    }
}

/// Values the solver settled on, which may be partial or infeasible when
/// `termination` is not [`TerminationCondition::Optimal`].
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// How the solve ended
    pub termination: TerminationCondition,
    /// Objective value, when reported
    pub objective: Option<f64>,
    values: Vec<f64>,
}

impl Solution {
    /// Wraps one value per program variable; missing values read as 0.
    #[must_use]
    pub const fn new(
        termination: TerminationCondition,
        objective: Option<f64>,
        values: Vec<f64>,
    ) -> Self {
        Self {
            termination,
            objective,
            values,
        }
    }

    /// Value of a variable.
    #[must_use]
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }

    /// All values indexed by [`VarId::index`].
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A mixed-integer linear programming backend.
pub trait Solver: Send + Sync {
    /// Minimizes `program`.
    ///
    /// Non-optimal terminations are returned as a [`Solution`]; `Err` is
    /// reserved for failures to run the solver or read its answer.
    fn solve(
        &self,
        program: &LinearProgram,
        options: &SolveOptions,
    ) -> impl Future<Output = Result<Solution>> + Send;
}
