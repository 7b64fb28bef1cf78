//! # Solver adapter
//! The combinatorial search itself is delegated to an external MILP engine. This module defines
//! the contract such an engine has to satisfy ([Solver]) and the [LpSolver] adapter built on top
//! of [good_lp](https://crates.io/crates/good_lp).
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::Model;

mod lp;

pub use lp::LpSolver;

/// Outcome classification reported by a [Solver]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    /// proved optimal solution
    Optimal,
    /// no assignment satisfies all constraints
    Infeasible,
    /// objective can improve without limit
    Unbounded,
    /// time budget exhausted before optimality was proved
    Timeout,
}

/// Raw numeric result of a solve.
///
/// `values` are indexed by [VarId::index](crate::model::VarId::index) and are always present for
/// [SolveStatus::Optimal]. On [SolveStatus::Timeout] they hold the best incumbent, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSolution {
    pub status: SolveStatus,
    pub values: Option<Vec<f64>>,
}

impl RawSolution {
    pub fn optimal(values: Vec<f64>) -> Self {
        Self {
            status: SolveStatus::Optimal,
            values: Some(values),
        }
    }

    pub fn infeasible() -> Self {
        Self {
            status: SolveStatus::Infeasible,
            values: None,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            status: SolveStatus::Unbounded,
            values: None,
        }
    }

    pub fn timeout(incumbent: Option<Vec<f64>>) -> Self {
        Self {
            status: SolveStatus::Timeout,
            values: incumbent,
        }
    }
}

/// External constraint-optimization engine.
///
/// Implementations must not modify the model and should only fail with an error for backend
/// problems that none of the [SolveStatus] variants describes.
pub trait Solver {
    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<RawSolution>;
}

impl<S: Solver + ?Sized> Solver for &S {
    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<RawSolution> {
        (**self).solve(model, config)
    }
}

/// Configuration of the solve pipeline.
///
/// ## Example
/// ```
/// # extern crate tardiness;
/// use std::time::Duration;
/// use tardiness::SolverConfig;
///
/// let config = SolverConfig::default().with_time_limit(Duration::from_secs(10));
/// assert_eq!(config.time_limit, Some(Duration::from_secs(10)));
/// assert_eq!(config.threshold, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// wall-clock limit of a single solve (unlimited if `None`), enforced by the backend itself
    pub time_limit: Option<Duration>,
    /// big-M override, must be at least the bound derived from the instance
    pub big_m: Option<f64>,
    /// binary variables with values above this threshold are considered set
    pub threshold: f64,
    /// numeric tolerance when checking extracted schedules
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: None,
            big_m: None,
            threshold: 0.5,
            tolerance: 1e-6,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = Some(big_m);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_from_partial_input() {
        let config: SolverConfig =
            serde_json::from_str(r#"{ "threshold": 0.9 }"#).expect("config");

        assert_eq!(config.threshold, 0.9);
        assert_eq!(config.time_limit, None);
        assert_eq!(config.big_m, None);
        assert_eq!(config.tolerance, 1e-6);
    }

    #[test]
    fn raw_solution_constructors() {
        assert_eq!(RawSolution::optimal(vec![1.]).values, Some(vec![1.]));
        assert_eq!(RawSolution::infeasible().status, SolveStatus::Infeasible);
        assert_eq!(RawSolution::unbounded().values, None);
        assert_eq!(RawSolution::timeout(None).status, SolveStatus::Timeout);
    }
}
