use std::time::{Duration, Instant};

use good_lp::solvers::microlp::microlp;
use good_lp::{
    variable, Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus,
    SolverModel, WithTimeLimit,
};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::model::{LinearExpr, Model, Relation, VarKind};
use crate::solver::{RawSolution, Solver, SolverConfig};

/// [Solver] backed by the pure Rust `microlp` backend of [good_lp].
///
/// The time limit of [SolverConfig] is passed to the backend's branch and bound, which stops on
/// its own once the budget elapses. The best incumbent found so far is reported with
/// [SolveStatus::Timeout](crate::solver::SolveStatus::Timeout), if there is one.
#[derive(Debug, Clone, Copy, Default)]
pub struct LpSolver;

impl Solver for LpSolver {
    #[instrument(
        skip_all,
        name = "lp_solve",
        fields(variables = model.variables().len(), constraints = model.constraints().len())
    )]
    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<RawSolution> {
        let start = Instant::now();

        let mut vars = ProblemVariables::new();

        let handles = model
            .variables()
            .iter()
            .map(|v| {
                let definition = match v.kind {
                    VarKind::Binary => variable().binary(),
                    VarKind::Continuous { lower, upper } => variable().min(lower).max(upper),
                };
                vars.add(definition.name(v.name.as_str()))
            })
            .collect::<Vec<_>>();

        let objective = to_expression(model.objective(), &handles);

        let mut problem = vars.minimise(objective).using(microlp);

        if let Some(limit) = config.time_limit {
            problem = problem.with_time_limit(limit.as_secs_f64());
        }

        for c in model.constraints() {
            let lhs = to_expression(&c.lhs, &handles);
            let constraint = match c.relation {
                Relation::Eq => good_lp::constraint::eq(lhs, c.rhs),
                Relation::Le => good_lp::constraint::leq(lhs, c.rhs),
                Relation::Ge => good_lp::constraint::geq(lhs, c.rhs),
            };
            problem.add_constraint(constraint);
        }

        let result = match problem.solve() {
            Ok(solution) => {
                let values = handles.iter().map(|&v| solution.value(v)).collect();
                match solution.status() {
                    SolutionStatus::TimeLimit => {
                        warn!(limit = ?config.time_limit, "solver stopped at its time limit");
                        Ok(RawSolution::timeout(Some(values)))
                    }
                    SolutionStatus::Optimal | SolutionStatus::GapLimit => {
                        Ok(RawSolution::optimal(values))
                    }
                }
            }
            Err(ResolutionError::Infeasible) => Ok(RawSolution::infeasible()),
            Err(ResolutionError::Unbounded) => Ok(RawSolution::unbounded()),
            Err(e) if exhausted(config.time_limit, start.elapsed()) => {
                warn!(error = %e, limit = ?config.time_limit, "no incumbent within the time limit");
                Ok(RawSolution::timeout(None))
            }
            Err(e) => Err(Error::Solver(e.to_string())),
        };

        debug!(elapsed = ?start.elapsed(), "backend finished");

        result
    }
}

/// Whether a backend failure after `elapsed` is explained by the time limit
fn exhausted(limit: Option<Duration>, elapsed: Duration) -> bool {
    limit.is_some_and(|limit| elapsed >= limit)
}

fn to_expression(expr: &LinearExpr, handles: &[good_lp::Variable]) -> Expression {
    expr.terms()
        .iter()
        .fold(Expression::from(expr.offset()), |acc, &(v, a)| {
            acc + a * handles[v.index()]
        })
}
