use crate::schedule::Schedule;

/// Failures of the scheduling pipeline.
///
/// Instance errors are raised before any model is built, model errors before the solver is
/// called. The remaining variants classify what the solver reported and are propagated unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input, e.g. non-positive processing time or an unknown order in the setup table
    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    /// Big-M constant too small (or too large to be represented exactly) for the instance
    #[error("big-M {big_m} cannot express sequencing for this instance (required: {required})")]
    ConstraintOverflow { big_m: f64, required: f64 },

    /// No schedule satisfies the model constraints
    #[error("model is infeasible")]
    Infeasible,

    /// Objective decreases without limit, which means the model itself is wrong
    #[error("model is unbounded")]
    Unbounded,

    /// Solver ran out of its time budget before proving optimality
    #[error("solver timed out (incumbent available: {})", .incumbent.is_some())]
    Timeout { incumbent: Option<Box<Schedule>> },

    /// Solver claimed a solution whose values cannot be interpreted as a schedule
    #[error("malformed solution: {0}")]
    MalformedSolution(String),

    /// Backend failure that does not fit any of the solver statuses
    #[error("solver failure: {0}")]
    Solver(String),
}

pub type Result<T> = std::result::Result<T, Error>;
