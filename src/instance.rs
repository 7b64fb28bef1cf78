//! # Problem instance
//! A scheduling instance consists of
//!  - a set of orders `j`, each with processing time `p[j] > 0`, due date `d[j] >= 0` and
//!    priority (tardiness weight) `w[j] > 0`
//!  - a set of identical machines, each processing at most one order at a time
//!  - a (possibly asymmetric) table of sequence-dependent setup times `s[j][k] >= 0` incurred when
//!    `k` follows `j` on the same machine, with `s[j][j] = 0`
//!
//! Instances are immutable once built and can only be obtained through validation, either from an
//! [InstanceBuilder] or by deserializing the same shape.
use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Unit of work with fixed duration, weight and deadline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub processing_time: f64,
    pub due_date: f64,
    pub priority: f64,
}

/// Resource processing at most one order at a time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Machine {
    pub id: String,
}

/// Setup time incurred when order `to` is processed after order `from` on the same machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupEntry {
    pub from: String,
    pub to: String,
    pub time: f64,
}

/// Unvalidated instance data. This is also the serialized shape of an [Instance].
///
/// ## Example
/// ```
/// # extern crate tardiness;
/// use tardiness::InstanceBuilder;
///
/// let instance = InstanceBuilder::new()
///     .order("A", 5, 10, 1)
///     .order("B", 3, 10, 1)
///     .machine("M1")
///     .setup("A", "B", 1)
///     .setup("B", "A", 2)
///     .build()
///     .expect("valid instance");
///
/// assert_eq!(instance.num_orders(), 2);
/// assert_eq!(instance.setup(0, 1), 1.);
/// assert_eq!(instance.setup(1, 0), 2.);
/// assert_eq!(instance.setup(1, 1), 0.);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceBuilder {
    pub orders: Vec<Order>,
    pub machines: Vec<Machine>,
    #[serde(default)]
    pub setup: Vec<SetupEntry>,
}

impl InstanceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(
        mut self,
        id: impl Into<String>,
        processing_time: impl Into<f64>,
        due_date: impl Into<f64>,
        priority: impl Into<f64>,
    ) -> Self {
        self.orders.push(Order {
            id: id.into(),
            processing_time: processing_time.into(),
            due_date: due_date.into(),
            priority: priority.into(),
        });
        self
    }

    pub fn machine(mut self, id: impl Into<String>) -> Self {
        self.machines.push(Machine { id: id.into() });
        self
    }

    /// Set the setup time of `to` following `from`. Pairs that are never set have zero setup.
    pub fn setup(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        time: impl Into<f64>,
    ) -> Self {
        self.setup.push(SetupEntry {
            from: from.into(),
            to: to.into(),
            time: time.into(),
        });
        self
    }

    /// Validate collected data and produce an immutable [Instance].
    ///
    /// All detected problems are reported at once in a single [Error::InvalidInstance].
    pub fn build(self) -> Result<Instance> {
        let mut errors = Vec::new();

        let mut order_ids = HashMap::with_capacity(self.orders.len());
        for (j, order) in self.orders.iter().enumerate() {
            if order_ids.insert(order.id.as_str(), j).is_some() {
                errors.push(format!("duplicate order id '{}'", order.id));
            }
            if !order.processing_time.is_finite() || order.processing_time <= 0. {
                errors.push(format!(
                    "order '{}' has non-positive processing time {}",
                    order.id, order.processing_time
                ));
            }
            if !order.due_date.is_finite() || order.due_date < 0. {
                errors.push(format!(
                    "order '{}' has negative due date {}",
                    order.id, order.due_date
                ));
            }
            if !order.priority.is_finite() || order.priority <= 0. {
                errors.push(format!(
                    "order '{}' has non-positive priority {}",
                    order.id, order.priority
                ));
            }
        }

        let mut machine_ids = HashSet::with_capacity(self.machines.len());
        for machine in self.machines.iter() {
            if !machine_ids.insert(machine.id.as_str()) {
                errors.push(format!("duplicate machine id '{}'", machine.id));
            }
        }

        if !self.orders.is_empty() && self.machines.is_empty() {
            errors.push("orders cannot be scheduled without machines".to_string());
        }

        let n = self.orders.len();
        let mut setup = vec![0.; n * n];
        let mut pairs = HashSet::with_capacity(self.setup.len());

        for entry in self.setup.iter() {
            let from = order_ids.get(entry.from.as_str());
            let to = order_ids.get(entry.to.as_str());

            let (&j, &k) = match (from, to) {
                (Some(j), Some(k)) => (j, k),
                _ => {
                    errors.push(format!(
                        "setup ({}, {}) refers to an unknown order",
                        entry.from, entry.to
                    ));
                    continue;
                }
            };

            if !pairs.insert((j, k)) {
                errors.push(format!(
                    "setup ({}, {}) is given more than once",
                    entry.from, entry.to
                ));
            } else if !entry.time.is_finite() || entry.time < 0. {
                errors.push(format!(
                    "setup ({}, {}) has negative time {}",
                    entry.from, entry.to, entry.time
                ));
            } else if j == k && entry.time != 0. {
                errors.push(format!("self-setup of '{}' must be zero", entry.from));
            } else {
                setup[j * n + k] = entry.time;
            }
        }

        if !errors.is_empty() {
            return Err(Error::InvalidInstance(errors.join("; ")));
        }

        debug!(
            orders = n,
            machines = self.machines.len(),
            "validated scheduling instance"
        );

        Ok(Instance {
            orders: self.orders,
            machines: self.machines,
            setup,
        })
    }
}

/// Validated, read-only scheduling instance.
///
/// Orders and machines are addressed by their position (`j` in `0..num_orders()`, `i` in
/// `0..num_machines()`), ids are kept for lookup and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "InstanceBuilder", into = "InstanceBuilder")]
pub struct Instance {
    orders: Vec<Order>,
    machines: Vec<Machine>,
    /// dense row-major matrix `setup[j * n + k]`
    setup: Vec<f64>,
}

impl Instance {
    #[inline]
    pub fn num_orders(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn num_machines(&self) -> usize {
        self.machines.len()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    #[inline]
    pub fn processing_time(&self, j: usize) -> f64 {
        self.orders[j].processing_time
    }

    #[inline]
    pub fn due_date(&self, j: usize) -> f64 {
        self.orders[j].due_date
    }

    #[inline]
    pub fn priority(&self, j: usize) -> f64 {
        self.orders[j].priority
    }

    /// Setup time incurred when `k` follows `j` on the same machine (zero for `j == k`)
    #[inline]
    pub fn setup(&self, j: usize, k: usize) -> f64 {
        self.setup[j * self.num_orders() + k]
    }

    pub fn order_index(&self, id: &str) -> Option<usize> {
        self.orders.iter().position(|o| o.id == id)
    }

    pub fn machine_index(&self, id: &str) -> Option<usize> {
        self.machines.iter().position(|m| m.id == id)
    }

    /// Largest setup time in the instance (zero if there are no setups)
    pub fn max_setup(&self) -> f64 {
        self.setup.iter().copied().fold(0., f64::max)
    }

    pub fn max_due_date(&self) -> f64 {
        self.orders.iter().map(|o| o.due_date).fold(0., f64::max)
    }

    /// Upper bound on the completion time of any left-justified schedule.
    ///
    /// Running all orders serially on a single machine, each followed by its most expensive setup,
    /// takes `sum_j p[j] + sum_j max_k s[j][k]`. Any schedule with idle gaps can be shifted left
    /// without increasing tardiness, hence optimal schedules fit below this bound.
    pub fn horizon(&self) -> f64 {
        let n = self.num_orders();
        let p_sum: f64 = self.orders.iter().map(|o| o.processing_time).sum();
        let s_sum: f64 = (0..n)
            .map(|j| (0..n).map(|k| self.setup(j, k)).fold(0., f64::max))
            .sum();
        p_sum + s_sum
    }
}

impl TryFrom<InstanceBuilder> for Instance {
    type Error = Error;

    fn try_from(builder: InstanceBuilder) -> Result<Self> {
        builder.build()
    }
}

impl From<Instance> for InstanceBuilder {
    fn from(instance: Instance) -> Self {
        let n = instance.num_orders();

        let setup = (0..n)
            .cartesian_product(0..n)
            .filter(|&(j, k)| instance.setup(j, k) > 0.)
            .map(|(j, k)| SetupEntry {
                from: instance.orders[j].id.clone(),
                to: instance.orders[k].id.clone(),
                time: instance.setup(j, k),
            })
            .collect();

        Self {
            orders: instance.orders,
            machines: instance.machines,
            setup,
        }
    }
}
