//! # MILP formulation
//! Translates an [Instance] into a mixed-integer linear program.
//!
//! ## Variables
//! For orders `j, k` (`j != k`) and machines `i`
//!  - `x[j,i] in {0, 1}` iff order `j` is processed on machine `i`
//!  - `y[j,k,i] in {0, 1}` iff order `j` precedes (immediately or eventually) order `k` on `i`
//!  - `S[j], C[j] in [0, H_max]` start and completion of `j`, where `H_max` is the
//!    [horizon](Instance::horizon)
//!  - `T[j] >= 0` tardiness of `j`
//!
//! ## Constraints
//!  1. `sum_i x[j,i] == 1` (each order is assigned exactly once)
//!  1. `C[j] == S[j] + p[j]`
//!  1. `T[j] >= C[j] - d[j]`
//!  1. `S[k] >= C[j] + s[j][k] - M * (1 - y[j,k,i])` (disjunctive sequencing with big-M `M`)
//!  1. `y[j,k,i] <= x[j,i]` and `y[j,k,i] <= x[k,i]`
//!  1. `y[j,k,i] + y[k,j,i] >= x[j,i] + x[k,i] - 1` for `j < k` (two orders sharing a machine
//!     must be ordered one way or the other)
//!
//! ## Objective
//! `min sum_j w[j] * T[j] + sum_{j,k,i} s[j][k] * y[j,k,i]`
//!
//! Processing times do not depend on the machine an order is assigned to.
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::instance::Instance;

pub mod expr;

pub use expr::{Constraint, LinearExpr, Relation, VarId, VarKind, Variable};

/// Largest magnitude up to which all integers are exactly representable in `f64` (`2^53`)
const MAX_EXACT: f64 = 9_007_199_254_740_992.;

/// Maps `(order, machine)` indices to variable ids. Variables are laid out in blocks
/// `x | y | S | C | T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarIndex {
    n: usize,
    r: usize,
}

impl VarIndex {
    pub(crate) fn new(n: usize, r: usize) -> Self {
        Self { n, r }
    }

    #[inline]
    pub fn num_orders(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn num_machines(&self) -> usize {
        self.r
    }

    #[inline]
    fn y_offset(&self) -> usize {
        self.n * self.r
    }

    #[inline]
    fn s_offset(&self) -> usize {
        self.y_offset() + self.n * self.n.saturating_sub(1) * self.r
    }

    /// Total number of variables
    #[inline]
    pub fn len(&self) -> usize {
        self.s_offset() + 3 * self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assignment indicator `x[j,i]`
    #[inline]
    pub fn x(&self, j: usize, i: usize) -> VarId {
        debug_assert!(j < self.n && i < self.r);
        VarId(j * self.r + i)
    }

    /// Precedence indicator `y[j,k,i]` (`j != k`)
    #[inline]
    pub fn y(&self, j: usize, k: usize, i: usize) -> VarId {
        debug_assert!(j != k && j < self.n && k < self.n && i < self.r);
        // self-precedence has no variable, so skip the diagonal
        let k = if k > j { k - 1 } else { k };
        VarId(self.y_offset() + (j * (self.n - 1) + k) * self.r + i)
    }

    /// Start time `S[j]`
    #[inline]
    pub fn start(&self, j: usize) -> VarId {
        VarId(self.s_offset() + j)
    }

    /// Completion time `C[j]`
    #[inline]
    pub fn completion(&self, j: usize) -> VarId {
        VarId(self.s_offset() + self.n + j)
    }

    /// Tardiness `T[j]`
    #[inline]
    pub fn tardiness(&self, j: usize) -> VarId {
        VarId(self.s_offset() + 2 * self.n + j)
    }

    /// All ordered pairs `(j, k)` of distinct orders
    pub(crate) fn pairs(&self) -> impl Iterator<Item = (usize, usize)> {
        let n = self.n;
        (0..n).flat_map(move |j| (0..n).filter(move |&k| k != j).map(move |k| (j, k)))
    }
}

/// Immutable MILP model of a scheduling [Instance].
///
/// Once built, the model is a self-contained description handed over to a
/// [Solver](crate::solver::Solver); nothing in it changes afterwards.
#[derive(Debug, Clone)]
pub struct Model {
    index: VarIndex,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    /// minimised
    objective: LinearExpr,
    big_m: f64,
    horizon: f64,
}

impl Model {
    /// Formulate the MILP for given `instance`.
    ///
    /// The big-M constant is derived from the instance as `horizon + max_setup + max_due_date`
    /// which makes sequencing constraints vacuous whenever the precedence indicator is off. An
    /// explicit `big_m` may be given, but it must not be smaller than the derived bound.
    ///
    /// Fails with [Error::ConstraintOverflow] if the big-M constant is too small or too large to
    /// keep integer time points exact in floating point arithmetic.
    ///
    /// ## Example
    /// ```
    /// # extern crate tardiness;
    /// use tardiness::{InstanceBuilder, Model};
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
    /// let model = Model::build(&instance, None).expect("model");
    ///
    /// // x: 2, y: 2, S/C/T: 6
    /// assert_eq!(model.variables().len(), 10);
    /// // horizon 10 + max setup 1 + max due date 10
    /// assert_eq!(model.big_m(), 21.);
    /// ```
    #[instrument(skip_all, fields(orders = instance.num_orders(), machines = instance.num_machines()))]
    pub fn build(instance: &Instance, big_m: Option<f64>) -> Result<Self> {
        let n = instance.num_orders();
        let r = instance.num_machines();
        let index = VarIndex::new(n, r);

        let horizon = instance.horizon();
        let required = horizon + instance.max_setup() + instance.max_due_date();
        let h = big_m.unwrap_or(required);

        if !h.is_finite() || h < required || h > MAX_EXACT {
            return Err(Error::ConstraintOverflow { big_m: h, required });
        }

        debug!(horizon, big_m = h, "derived time scale");

        let variables = Self::declare(instance, &index, horizon);
        let constraints = Self::constrain(instance, &index, h);
        let objective = Self::formulate_objective(instance, &index);

        debug_assert_eq!(variables.len(), index.len());

        debug!(
            variables = variables.len(),
            constraints = constraints.len(),
            "formulated scheduling model"
        );

        Ok(Self {
            index,
            variables,
            constraints,
            objective,
            big_m: h,
            horizon,
        })
    }

    fn declare(instance: &Instance, index: &VarIndex, horizon: f64) -> Vec<Variable> {
        let orders = instance.orders();
        let machines = instance.machines();

        let mut variables = Vec::with_capacity(index.len());

        // declaration order has to follow the block layout of `VarIndex`
        for order in orders {
            for machine in machines {
                variables.push(Variable {
                    name: format!("x[{},{}]", order.id, machine.id),
                    kind: VarKind::Binary,
                });
            }
        }

        for (j, k) in index.pairs() {
            for machine in machines {
                variables.push(Variable {
                    name: format!("y[{},{},{}]", orders[j].id, orders[k].id, machine.id),
                    kind: VarKind::Binary,
                });
            }
        }

        let timing = [("S", horizon), ("C", horizon), ("T", f64::INFINITY)];
        for (prefix, upper) in timing {
            for order in orders {
                variables.push(Variable {
                    name: format!("{prefix}[{}]", order.id),
                    kind: VarKind::Continuous { lower: 0., upper },
                });
            }
        }

        variables
    }

    fn constrain(instance: &Instance, index: &VarIndex, h: f64) -> Vec<Constraint> {
        let n = index.num_orders();
        let r = index.num_machines();
        let orders = instance.orders();
        let machines = instance.machines();

        let mut constraints = Vec::with_capacity(3 * n + r * n * n.saturating_sub(1) * 7 / 2);

        for (j, order) in orders.iter().enumerate() {
            // sum_i x[j,i] == 1
            let assign = (0..r).map(|i| (index.x(j, i), 1.)).collect();
            constraints.push(Constraint::new(
                format!("assign[{}]", order.id),
                assign,
                Relation::Eq,
                1.,
            ));

            // C[j] - S[j] == p[j]
            let completion = LinearExpr::new()
                .term(index.completion(j), 1.)
                .term(index.start(j), -1.);
            constraints.push(Constraint::new(
                format!("completion[{}]", order.id),
                completion,
                Relation::Eq,
                order.processing_time,
            ));

            // T[j] - C[j] >= -d[j]
            let tardiness = LinearExpr::new()
                .term(index.tardiness(j), 1.)
                .term(index.completion(j), -1.);
            constraints.push(Constraint::new(
                format!("tardiness[{}]", order.id),
                tardiness,
                Relation::Ge,
                -order.due_date,
            ));
        }

        for (j, k) in index.pairs() {
            let (oj, ok) = (&orders[j].id, &orders[k].id);

            for (i, machine) in machines.iter().enumerate() {
                let m = &machine.id;
                let y = index.y(j, k, i);

                // S[k] - C[j] - M * y[j,k,i] >= s[j][k] - M
                let seq = LinearExpr::new()
                    .term(index.start(k), 1.)
                    .term(index.completion(j), -1.)
                    .term(y, -h);
                constraints.push(Constraint::new(
                    format!("seq[{oj},{ok},{m}]"),
                    seq,
                    Relation::Ge,
                    instance.setup(j, k) - h,
                ));

                // y[j,k,i] - x[j,i] <= 0
                let pred = LinearExpr::new().term(y, 1.).term(index.x(j, i), -1.);
                constraints.push(Constraint::new(
                    format!("link_pred[{oj},{ok},{m}]"),
                    pred,
                    Relation::Le,
                    0.,
                ));

                // y[j,k,i] - x[k,i] <= 0
                let succ = LinearExpr::new().term(y, 1.).term(index.x(k, i), -1.);
                constraints.push(Constraint::new(
                    format!("link_succ[{oj},{ok},{m}]"),
                    succ,
                    Relation::Le,
                    0.,
                ));

                if j < k {
                    // y[j,k,i] + y[k,j,i] - x[j,i] - x[k,i] >= -1
                    let order = LinearExpr::new()
                        .term(y, 1.)
                        .term(index.y(k, j, i), 1.)
                        .term(index.x(j, i), -1.)
                        .term(index.x(k, i), -1.);
                    constraints.push(Constraint::new(
                        format!("order[{oj},{ok},{m}]"),
                        order,
                        Relation::Ge,
                        -1.,
                    ));
                }
            }
        }

        constraints
    }

    fn formulate_objective(instance: &Instance, index: &VarIndex) -> LinearExpr {
        let n = index.num_orders();
        let r = index.num_machines();

        let tardiness = (0..n).map(|j| (index.tardiness(j), instance.priority(j)));

        let setups = index
            .pairs()
            .flat_map(|(j, k)| (0..r).map(move |i| (j, k, i)))
            .map(|(j, k, i)| (index.y(j, k, i), instance.setup(j, k)));

        tardiness.chain(setups).collect()
    }

    pub fn index(&self) -> &VarIndex {
        &self.index
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Objective to be minimised
    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Big-M constant used in sequencing constraints
    pub fn big_m(&self) -> f64 {
        self.big_m
    }

    /// Upper bound on start and completion times
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Objective value of given variable assignment
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.evaluate(values)
    }

    /// Largest constraint or bound violation of given variable assignment (non-positive if the
    /// assignment is feasible).
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let constraints = self.constraints.iter().map(|c| c.violation(values));

        let bounds = self.variables.iter().zip(values).map(|(v, &x)| match v.kind {
            VarKind::Binary => x.min(1. - x).max(-x).max(x - 1.),
            VarKind::Continuous { lower, upper } => (lower - x).max(x - upper),
        });

        constraints.chain(bounds).fold(f64::NEG_INFINITY, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceBuilder;
    use itertools::Itertools;
    use rstest::*;

    fn instance(n: usize, r: usize) -> Instance {
        let builder = (0..n).fold(InstanceBuilder::new(), |b, j| {
            b.order(format!("O{j}"), 2, 4, 1)
        });
        let builder = (0..r).fold(builder, |b, i| b.machine(format!("M{i}")));
        let builder = (0..n)
            .cartesian_product(0..n)
            .filter(|(j, k)| j != k)
            .fold(builder, |b, (j, k)| {
                b.setup(format!("O{j}"), format!("O{k}"), 1)
            });
        builder.build().expect("valid instance")
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 1)]
    #[case(3, 2)]
    #[case(4, 3)]
    fn variable_ids_are_unique_and_dense(#[case] n: usize, #[case] r: usize) {
        let index = VarIndex::new(n, r);

        let x = (0..n).cartesian_product(0..r).map(|(j, i)| index.x(j, i));
        let y = index
            .pairs()
            .cartesian_product(0..r)
            .map(|((j, k), i)| index.y(j, k, i));
        let timing = (0..n).flat_map(|j| [index.start(j), index.completion(j), index.tardiness(j)]);

        let ids = x.chain(y).chain(timing).map(VarId::index).sorted().collect_vec();
        assert_eq!(ids, (0..index.len()).collect_vec());
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 1)]
    #[case(3, 2)]
    #[case(4, 3)]
    fn model_size(#[case] n: usize, #[case] r: usize) {
        let model = Model::build(&instance(n, r), None).expect("model");

        let pairs = n * (n - 1);
        assert_eq!(model.variables().len(), n * r + pairs * r + 3 * n);
        assert_eq!(model.constraints().len(), 3 * n + 3 * pairs * r + pairs / 2 * r);
    }

    #[test]
    fn derived_big_m() {
        let model = Model::build(&instance(3, 2), None).expect("model");
        // horizon: 3 * 2 + 3 * 1, max setup: 1, max due date: 4
        assert_eq!(model.horizon(), 9.);
        assert_eq!(model.big_m(), 14.);
    }

    #[rstest]
    #[case::too_small(Some(13.))]
    #[case::infinite(Some(f64::INFINITY))]
    #[case::inexact(Some(1e17))]
    fn big_m_overflow(#[case] big_m: Option<f64>) {
        let result = Model::build(&instance(3, 2), big_m);
        assert!(matches!(result, Err(Error::ConstraintOverflow { .. })));
    }

    #[test]
    fn larger_big_m_is_accepted() {
        let model = Model::build(&instance(3, 2), Some(1000.)).expect("model");
        assert_eq!(model.big_m(), 1000.);
    }

    #[test]
    fn time_scale_overflow() {
        let instance = InstanceBuilder::new()
            .order("A", 1e16, 1e16, 1)
            .machine("M")
            .build()
            .expect("valid instance");
        let result = Model::build(&instance, None);
        assert!(matches!(result, Err(Error::ConstraintOverflow { .. })));
    }

    #[test]
    fn sequencing_is_vacuous_without_precedence() {
        let instance = instance(2, 1);
        let model = Model::build(&instance, None).expect("model");
        let index = model.index();

        // both orders run at the same time, which only violates the pair-ordering row
        let mut values = vec![0.; index.len()];
        for j in 0..2 {
            values[index.x(j, 0).index()] = 1.;
            values[index.start(j).index()] = model.horizon() - 2.;
            values[index.completion(j).index()] = model.horizon();
            values[index.tardiness(j).index()] = model.horizon() - 4.;
        }

        let violated = model
            .constraints()
            .iter()
            .filter(|c| c.violation(&values) > 1e-9)
            .map(|c| c.name.as_str())
            .collect_vec();

        assert_eq!(violated, vec!["order[O0,O1,M0]"]);
    }

    #[test]
    fn objective_weights() {
        let instance = instance(2, 1);
        let model = Model::build(&instance, None).expect("model");
        let index = model.index();

        let mut values = vec![0.; index.len()];
        values[index.tardiness(0).index()] = 3.;
        values[index.y(0, 1, 0).index()] = 1.;

        // 1 * 3 (tardiness) + 1 (setup O0 -> O1)
        assert_eq!(model.objective_value(&values), 4.);

        // two tardiness and two precedence terms, no constant
        assert_eq!(model.objective().terms().len(), 4);
        assert_eq!(model.objective().offset(), 0.);
    }

    #[test]
    fn empty_model() {
        let instance = InstanceBuilder::new().build().expect("valid instance");
        let model = Model::build(&instance, None).expect("model");
        assert!(model.index().is_empty());
        assert!(model.constraints().is_empty());
        assert_eq!(model.objective_value(&[]), 0.);
    }
}
