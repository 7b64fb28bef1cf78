//! # Schedule extraction
//! Interprets raw solver values of a [Model] as an assignment of orders to machines together with
//! timing and per-machine execution sequences.
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::model::Model;

/// Timeline of a single order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledOrder {
    pub order: String,
    pub machine: String,
    pub start: f64,
    pub completion: f64,
    pub tardiness: f64,
}

/// Orders processed by a machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSchedule {
    pub machine: String,
    /// orders in the order of execution (non-decreasing start times)
    pub sequence: Vec<String>,
    /// pairs `(j, k)` for which the solver decided that `j` runs before `k` on this machine
    pub precedences: Vec<(String, String)>,
}

/// Complete solution of a scheduling instance.
///
/// Orders are listed in the same order as in the instance, machines likewise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub orders: Vec<ScheduledOrder>,
    pub machines: Vec<MachineSchedule>,
    /// weighted tardiness plus incurred setup cost
    pub objective: f64,
}

/// Kinds of inconsistencies [Schedule::violations] detects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// order of the instance does not appear in the schedule
    Unscheduled,
    /// order appears more than once, or in a sequence of a machine it is not assigned to
    Duplicate,
    /// schedule refers to an order or machine the instance does not know
    Unknown,
    /// `C[j] != S[j] + p[j]` or a negative start time
    Timing,
    /// `T[j] != max(0, C[j] - d[j])`
    Tardiness,
    /// two orders on the same machine overlap, setup time included
    Overlap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub order: String,
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, order: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            order: order.into(),
            message: message.into(),
        }
    }
}

impl Schedule {
    /// Empty schedule of an instance without orders
    pub fn empty(instance: &Instance) -> Self {
        Self {
            orders: Vec::new(),
            machines: instance
                .machines()
                .iter()
                .map(|m| MachineSchedule {
                    machine: m.id.clone(),
                    sequence: Vec::new(),
                    precedences: Vec::new(),
                })
                .collect(),
            objective: 0.,
        }
    }

    /// Reconstruct the schedule from variable `values` of a solved `model`.
    ///
    /// Binary variables are considered set iff their value exceeds `threshold` which absorbs
    /// floating point noise of the solver. Fails with [Error::MalformedSolution] if the number of
    /// values does not match the model or if an order is not assigned to exactly one machine.
    pub fn extract(
        model: &Model,
        instance: &Instance,
        values: &[f64],
        threshold: f64,
    ) -> Result<Self> {
        let index = model.index();
        let n = index.num_orders();
        let r = index.num_machines();

        if n != instance.num_orders() || r != instance.num_machines() {
            return Err(Error::MalformedSolution(
                "model was built for a different instance".to_string(),
            ));
        }

        if values.len() != index.len() {
            return Err(Error::MalformedSolution(format!(
                "expected {} values, got {}",
                index.len(),
                values.len()
            )));
        }

        let is_set = |v: crate::model::VarId| values[v.index()] > threshold;

        let mut z = Vec::with_capacity(n);
        for j in 0..n {
            let assigned = (0..r).filter(|&i| is_set(index.x(j, i))).collect_vec();
            match assigned.as_slice() {
                [i] => z.push(*i),
                _ => {
                    return Err(Error::MalformedSolution(format!(
                        "order '{}' is assigned to {} machines",
                        instance.orders()[j].id,
                        assigned.len()
                    )))
                }
            }
        }

        let orders = instance
            .orders()
            .iter()
            .enumerate()
            .map(|(j, order)| ScheduledOrder {
                order: order.id.clone(),
                machine: instance.machines()[z[j]].id.clone(),
                start: values[index.start(j).index()],
                completion: values[index.completion(j).index()],
                tardiness: values[index.tardiness(j).index()],
            })
            .collect_vec();

        let machines = instance
            .machines()
            .iter()
            .enumerate()
            .map(|(i, machine)| {
                let sequence = (0..n)
                    .filter(|&j| z[j] == i)
                    .sorted_by_key(|&j| (OrderedFloat(orders[j].start), j))
                    .map(|j| orders[j].order.clone())
                    .collect_vec();

                let precedences = index
                    .pairs()
                    .filter(|&(j, k)| is_set(index.y(j, k, i)))
                    .map(|(j, k)| (orders[j].order.clone(), orders[k].order.clone()))
                    .collect_vec();

                MachineSchedule {
                    machine: machine.id.clone(),
                    sequence,
                    precedences,
                }
            })
            .collect_vec();

        let objective = model.objective_value(values);

        debug!(objective, "extracted schedule");

        Ok(Self {
            orders,
            machines,
            objective,
        })
    }

    /// Generate the schedule in the form of a Gantt chart, i.e. as mapping
    /// `machine -> [orders in execution order]`.
    pub fn gantt(&self) -> HashMap<&str, Vec<&str>> {
        self.machines
            .iter()
            .map(|m| {
                let sequence = m.sequence.iter().map(String::as_str).collect();
                (m.machine.as_str(), sequence)
            })
            .collect()
    }

    pub fn order(&self, id: &str) -> Option<&ScheduledOrder> {
        self.orders.iter().find(|o| o.order == id)
    }

    pub fn machine(&self, id: &str) -> Option<&MachineSchedule> {
        self.machines.iter().find(|m| m.machine == id)
    }

    /// Unweighted sum of tardiness over all orders
    pub fn total_tardiness(&self) -> f64 {
        self.orders.iter().map(|o| o.tardiness).sum()
    }

    /// Maximum completion time over all orders (zero for an empty schedule)
    pub fn makespan(&self) -> f64 {
        self.orders.iter().map(|o| o.completion).fold(0., f64::max)
    }

    /// Sum of `w[j] * max(0, C[j] - d[j])` over reported completion times
    pub fn weighted_tardiness(&self, instance: &Instance) -> Result<f64> {
        self.orders.iter().try_fold(0., |acc, o| {
            let j = instance
                .order_index(&o.order)
                .ok_or_else(|| Error::MalformedSolution(format!("unknown order '{}'", o.order)))?;
            Ok(acc + instance.priority(j) * (o.completion - instance.due_date(j)).max(0.))
        })
    }

    /// Objective recomputed from the reported completion times and precedences, without re-timing
    pub fn replay_objective(&self, instance: &Instance) -> Result<f64> {
        let mut objective = self.weighted_tardiness(instance)?;
        for (j, k) in self.machines.iter().flat_map(|m| m.precedences.iter()) {
            let (j, k) = instance
                .order_index(j)
                .zip(instance.order_index(k))
                .ok_or_else(|| {
                    Error::MalformedSolution(format!("unknown precedence '{j}' -> '{k}'"))
                })?;
            objective += instance.setup(j, k);
        }
        Ok(objective)
    }

    /// Re-time this schedule with its machine assignment and precedence decisions held fixed.
    ///
    /// Each order starts as early as all of its reported predecessors (plus setup) allow. The
    /// objective is recomputed from these times. Since left-shifting never increases tardiness,
    /// the replayed objective of an optimal schedule equals the one reported by the solver.
    pub fn replay(&self, instance: &Instance) -> Result<Self> {
        let lookup = |id: &str| {
            instance
                .order_index(id)
                .ok_or_else(|| Error::MalformedSolution(format!("unknown order '{id}'")))
        };

        let mut completion: HashMap<&str, f64> = HashMap::with_capacity(self.orders.len());
        let mut timeline: HashMap<&str, (f64, f64)> = HashMap::with_capacity(self.orders.len());
        let mut setup_cost = 0.;

        for machine in self.machines.iter() {
            let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::new();
            for (j, k) in machine.precedences.iter() {
                predecessors.entry(k.as_str()).or_default().push(j.as_str());
                setup_cost += instance.setup(lookup(j)?, lookup(k)?);
            }

            for k in machine.sequence.iter().map(String::as_str) {
                let kk = lookup(k)?;

                let mut start = 0f64;
                for &j in predecessors.get(k).into_iter().flatten() {
                    let c = completion.get(j).copied().ok_or_else(|| {
                        Error::MalformedSolution(format!(
                            "'{j}' precedes '{k}' but is not sequenced before it"
                        ))
                    })?;
                    start = start.max(c + instance.setup(lookup(j)?, kk));
                }

                let c = start + instance.processing_time(kk);
                completion.insert(k, c);
                timeline.insert(k, (start, c));
            }
        }

        let mut objective = setup_cost;
        let mut orders = Vec::with_capacity(self.orders.len());

        for scheduled in self.orders.iter() {
            let j = lookup(&scheduled.order)?;
            let (start, completion) = timeline.get(scheduled.order.as_str()).copied().ok_or_else(
                || Error::MalformedSolution(format!("order '{}' is not sequenced", scheduled.order)),
            )?;

            let tardiness = (completion - instance.due_date(j)).max(0.);
            objective += instance.priority(j) * tardiness;

            orders.push(ScheduledOrder {
                order: scheduled.order.clone(),
                machine: scheduled.machine.clone(),
                start,
                completion,
                tardiness,
            });
        }

        let mut machines = self.machines.clone();
        for m in machines.iter_mut() {
            m.sequence.sort_by_key(|id| {
                let start = timeline.get(id.as_str()).map_or(0., |&(s, _)| s);
                OrderedFloat(start)
            });
        }

        Ok(Self {
            orders,
            machines,
            objective,
        })
    }

    /// Check this schedule against `instance` and list every inconsistency found.
    ///
    /// Numeric comparisons allow an absolute error of `tolerance`. An empty result means that
    ///  - every order is scheduled on exactly one machine
    ///  - `C[j] == S[j] + p[j]` and `T[j] == max(0, C[j] - d[j])` for all orders `j`
    ///  - for any two orders `j, k` sharing a machine, either `S[k] >= C[j] + s[j][k]` or
    ///    `S[j] >= C[k] + s[k][j]`
    pub fn violations(&self, instance: &Instance, tolerance: f64) -> Vec<Violation> {
        let mut violations = Vec::new();

        let mut seen: HashMap<&str, &ScheduledOrder> = HashMap::with_capacity(self.orders.len());
        for o in self.orders.iter() {
            match seen.entry(o.order.as_str()) {
                Entry::Occupied(_) => violations.push(Violation::new(
                    ViolationKind::Duplicate,
                    &o.order,
                    "order scheduled more than once",
                )),
                Entry::Vacant(e) => {
                    e.insert(o);
                }
            }
        }

        for order in instance.orders() {
            if !seen.contains_key(order.id.as_str()) {
                violations.push(Violation::new(
                    ViolationKind::Unscheduled,
                    &order.id,
                    "order is not scheduled",
                ));
            }
        }

        for o in seen.values() {
            let Some(j) = instance.order_index(&o.order) else {
                violations.push(Violation::new(
                    ViolationKind::Unknown,
                    &o.order,
                    "order is not part of the instance",
                ));
                continue;
            };

            if instance.machine_index(&o.machine).is_none() {
                violations.push(Violation::new(
                    ViolationKind::Unknown,
                    &o.order,
                    format!("unknown machine '{}'", o.machine),
                ));
            }

            let p = instance.processing_time(j);
            if o.start < -tolerance || (o.completion - o.start - p).abs() > tolerance {
                violations.push(Violation::new(
                    ViolationKind::Timing,
                    &o.order,
                    format!(
                        "runs [{}, {}] but has processing time {p}",
                        o.start, o.completion
                    ),
                ));
            }

            let expected = (o.completion - instance.due_date(j)).max(0.);
            if (o.tardiness - expected).abs() > tolerance {
                violations.push(Violation::new(
                    ViolationKind::Tardiness,
                    &o.order,
                    format!("tardiness {} differs from {expected}", o.tardiness),
                ));
            }
        }

        let mut sequenced = HashSet::with_capacity(self.orders.len());
        for m in self.machines.iter() {
            for id in m.sequence.iter() {
                let assigned = seen.get(id.as_str()).map(|o| o.machine == m.machine);
                if !sequenced.insert(id.as_str()) || assigned != Some(true) {
                    violations.push(Violation::new(
                        ViolationKind::Duplicate,
                        id,
                        format!("unexpected in the sequence of machine '{}'", m.machine),
                    ));
                }
            }
        }

        let by_machine = seen
            .values()
            .copied()
            .filter_map(|o| instance.order_index(&o.order).map(|j| (j, o)))
            .into_group_map_by(|&(_, o)| o.machine.as_str());

        for orders in by_machine.values() {
            for (&(j, a), &(k, b)) in orders.iter().tuple_combinations() {
                let a_first = b.start + tolerance >= a.completion + instance.setup(j, k);
                let b_first = a.start + tolerance >= b.completion + instance.setup(k, j);
                if !a_first && !b_first {
                    violations.push(Violation::new(
                        ViolationKind::Overlap,
                        &a.order,
                        format!("overlaps with '{}' on machine '{}'", b.order, a.machine),
                    ));
                }
            }
        }

        violations
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "objective: {:.2}", self.objective)?;
        for m in self.machines.iter() {
            write!(f, "{}:", m.machine)?;
            if m.sequence.is_empty() {
                write!(f, " idle")?;
            }
            for id in m.sequence.iter() {
                if let Some(o) = self.order(id) {
                    write!(f, " {} [{:.2}, {:.2}]", o.order, o.start, o.completion)?;
                    if o.tardiness > 0. {
                        write!(f, " (late {:.2})", o.tardiness)?;
                    }
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
