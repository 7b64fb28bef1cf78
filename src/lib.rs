//! # Weighted tardiness scheduling with setup times
//! This crate assigns orders to parallel identical machines, sequences them on each machine and
//! chooses start times so that the **total weighted tardiness plus sequence-dependent setup cost**
//! is minimal.
//!
//! ## Assumptions
//!  - Each machine processes at most one order at a time
//!  - Orders are non-preemptive and their processing time does not depend on the machine
//!  - Switching from order `j` to order `k` on a machine takes setup time `s[j][k]` which need not
//!    be symmetric
//!
//! ## Pipeline
//!  1. [Instance]: validated, read-only problem data (see [InstanceBuilder])
//!  1. [Model]: immutable MILP formulation with big-M disjunctive sequencing constraints
//!  1. [Solver]: external optimization engine, [LpSolver] by default
//!  1. [Schedule]: assignment, timing and per-machine sequences read from solver values
//!
//! [Scheduler] runs the whole pipeline and classifies solver outcomes as [Error]s.
//!
//! ## Example
//! ```
//! # extern crate tardiness;
//! use tardiness::{InstanceBuilder, Scheduler, SolverConfig};
//!
//! let instance = InstanceBuilder::new()
//!     .order("O1", 5, 12, 3)
//!     .order("O2", 7, 15, 2)
//!     .order("O3", 4, 10, 4)
//!     .machine("M1")
//!     .machine("M2")
//!     .setup("O1", "O2", 2)
//!     .setup("O2", "O1", 2)
//!     .build()
//!     .expect("valid instance");
//!
//! let (schedule, _) = Scheduler::lp(SolverConfig::default())
//!     .schedule(&instance)
//!     .expect("optimal schedule");
//!
//! assert!(schedule.violations(&instance, 1e-6).is_empty());
//! assert_eq!(schedule.orders.len(), 3);
//! ```
pub mod error;
pub mod instance;
pub mod model;
pub mod schedule;
pub mod scheduler;
pub mod solver;

pub use error::{Error, Result};
pub use instance::{Instance, InstanceBuilder, Machine, Order, SetupEntry};
pub use model::Model;
pub use schedule::{MachineSchedule, Schedule, ScheduledOrder, Violation, ViolationKind};
pub use scheduler::{Scheduler, Stats};
pub use solver::{LpSolver, RawSolution, SolveStatus, Solver, SolverConfig};
