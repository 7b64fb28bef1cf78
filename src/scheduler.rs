use std::time::{Duration, Instant};

use itertools::Itertools;
use tracing::{error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::model::Model;
use crate::schedule::Schedule;
use crate::solver::{LpSolver, RawSolution, SolveStatus, Solver, SolverConfig};

/// Data structure that contains various statistics collected during scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    /// number of orders
    pub num_orders: usize,
    /// number of machines
    pub num_machines: usize,
    /// number of decision variables of the model
    pub num_variables: usize,
    /// number of linear constraints of the model
    pub num_constraints: usize,
    /// big-M constant used in sequencing constraints
    pub big_m: f64,
    /// achieved objective value (weighted tardiness plus setup cost)
    pub objective: f64,
    /// elapsed time since scheduling started (model formulation included)
    pub elapsed: Duration,
}

impl Stats {
    fn new(model: &Model, objective: f64, elapsed: Duration) -> Self {
        let index = model.index();
        Self {
            num_orders: index.num_orders(),
            num_machines: index.num_machines(),
            num_variables: model.variables().len(),
            num_constraints: model.constraints().len(),
            big_m: model.big_m(),
            objective,
            elapsed,
        }
    }
}

/// Solver for the `P|s_jk|sum w_j T_j` scheduling problem where
///  1. `P` stands for **parallel identical machines**
///  2. `s_jk` denotes **sequence-dependent setup times** between consecutive orders
///  3. `sum w_j T_j` means that the objective is to **minimize total weighted tardiness**, here
///     increased by the total setup cost incurred on the machines
///
/// The problem is NP-hard. This scheduler formulates it as a MILP ([Model]) and delegates the
/// search to a [Solver], by default the [LpSolver].
///
/// ## Example
/// ```
/// # extern crate tardiness;
/// use tardiness::{InstanceBuilder, Scheduler, SolverConfig};
///
/// let instance = InstanceBuilder::new()
///     .order("A", 5, 10, 1)
///     .order("B", 3, 10, 1)
///     .machine("M1")
///     .setup("A", "B", 1)
///     .setup("B", "A", 1)
///     .build()
///     .expect("valid instance");
///
/// let (schedule, stats) = Scheduler::lp(SolverConfig::default())
///     .schedule(&instance)
///     .expect("optimal schedule");
///
/// // both orders finish in time, only a single setup is incurred
/// assert!((schedule.objective - 1.).abs() < 1e-6);
/// assert_eq!(stats.num_orders, 2);
/// ```
#[derive(Debug, Clone)]
pub struct Scheduler<S = LpSolver> {
    solver: S,
    config: SolverConfig,
}

impl Scheduler<LpSolver> {
    /// Scheduler backed by the [LpSolver]
    pub fn lp(config: SolverConfig) -> Self {
        Self::new(LpSolver, config)
    }
}

impl Default for Scheduler<LpSolver> {
    fn default() -> Self {
        Self::lp(SolverConfig::default())
    }
}

impl<S: Solver> Scheduler<S> {
    pub fn new(solver: S, config: SolverConfig) -> Self {
        Self { solver, config }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Find an optimal schedule of given `instance`.
    ///
    /// Solver statuses other than optimal are reported as errors:
    ///  - [Error::Infeasible] and [Error::Unbounded] never carry a partial schedule
    ///  - [Error::Timeout] carries the best incumbent if the solver provided one
    #[instrument(
        skip_all,
        fields(orders = instance.num_orders(), machines = instance.num_machines())
    )]
    pub fn schedule(&self, instance: &Instance) -> Result<(Schedule, Stats)> {
        let start = Instant::now();

        let model = Model::build(instance, self.config.big_m)?;

        if instance.num_orders() == 0 {
            info!("nothing to schedule");
            let stats = Stats::new(&model, 0., start.elapsed());
            return Ok((Schedule::empty(instance), stats));
        }

        let RawSolution { status, values } = self.solver.solve(&model, &self.config)?;

        match status {
            SolveStatus::Optimal => {
                let values = values.ok_or_else(|| {
                    Error::MalformedSolution("optimal status without values".to_string())
                })?;

                let schedule = self.read(&model, instance, &values)?;
                let stats = Stats::new(&model, schedule.objective, start.elapsed());

                info!(
                    objective = schedule.objective,
                    elapsed = ?stats.elapsed,
                    "found optimal schedule"
                );

                Ok((schedule, stats))
            }
            SolveStatus::Infeasible => {
                info!("no feasible schedule exists");
                Err(Error::Infeasible)
            }
            SolveStatus::Unbounded => {
                error!("objective is unbounded, the scheduling model is inconsistent");
                Err(Error::Unbounded)
            }
            SolveStatus::Timeout => {
                let incumbent = values.and_then(|values| {
                    match self.read(&model, instance, &values) {
                        Ok(schedule) => Some(Box::new(schedule)),
                        Err(e) => {
                            warn!(error = %e, "discarding unreadable incumbent");
                            None
                        }
                    }
                });

                warn!(
                    incumbent = incumbent.as_ref().map(|s| s.objective),
                    "solver timed out before proving optimality"
                );

                Err(Error::Timeout { incumbent })
            }
        }
    }

    /// Extract a schedule from solver `values` and check it against the instance.
    ///
    /// A schedule the solver considers feasible may still break the instance's constraints
    /// (e.g. due to numerical issues in the backend), which is reported as
    /// [Error::MalformedSolution].
    fn read(&self, model: &Model, instance: &Instance, values: &[f64]) -> Result<Schedule> {
        let schedule = Schedule::extract(model, instance, values, self.config.threshold)?;

        let violations = schedule.violations(instance, self.config.tolerance);
        if violations.is_empty() {
            return Ok(schedule);
        }

        warn!(violations = violations.len(), "solver values violate the instance");

        Err(Error::MalformedSolution(
            violations.iter().map(|v| v.message.as_str()).join("; "),
        ))
    }
}
