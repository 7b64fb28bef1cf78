mod common;

use approx::assert_abs_diff_eq;
use itertools::Itertools;
use rstest::*;

use tardiness::{Instance, Model, Schedule, Scheduler, SolverConfig};

const EPS: f64 = 1e-6;

fn solve(instance: &Instance) -> Schedule {
    let (schedule, _) = Scheduler::lp(SolverConfig::default())
        .schedule(instance)
        .expect("optimal schedule");
    schedule
}

#[rstest]
#[case(2, 1, 1)]
#[case(3, 1, 2)]
#[case(3, 2, 3)]
#[case(4, 1, 4)]
#[case(4, 2, 5)]
#[case(4, 2, 6)]
#[case(4, 3, 7)]
fn random_instances(#[case] n: usize, #[case] r: usize, #[case] seed: u64) {
    let instance = common::random_instance(n, r, seed);
    let schedule = solve(&instance);

    // each order appears in exactly one machine's sequence, namely the one it is assigned to
    for order in instance.orders() {
        let machines = schedule
            .machines
            .iter()
            .filter(|m| m.sequence.contains(&order.id))
            .map(|m| m.machine.as_str())
            .collect_vec();

        let assigned = schedule.order(&order.id).map(|o| o.machine.as_str());
        assert_eq!(machines.len(), 1);
        assert_eq!(Some(machines[0]), assigned);
    }

    // T[j] == max(0, C[j] - d[j])
    for (j, o) in schedule.orders.iter().enumerate() {
        let expected = (o.completion - instance.due_date(j)).max(0.);
        assert_abs_diff_eq!(o.tardiness, expected, epsilon = EPS);
    }

    // no overlaps (setup included), consistent timing
    assert_eq!(schedule.violations(&instance, EPS), vec![]);

    // the reported timing and precedences account for the whole objective
    let recomputed = schedule.replay_objective(&instance).expect("objective");
    assert_abs_diff_eq!(recomputed, schedule.objective, epsilon = EPS);

    // re-timing with fixed decisions reproduces the objective
    let replayed = schedule.replay(&instance).expect("replay");
    assert_abs_diff_eq!(replayed.objective, schedule.objective, epsilon = EPS);
    assert_eq!(replayed.violations(&instance, EPS), vec![]);

    // and the objective is optimal
    assert_abs_diff_eq!(
        schedule.objective,
        common::brute_force(&instance),
        epsilon = EPS
    );
}

#[rstest]
#[case(3, 2, 11)]
#[case(4, 2, 12)]
fn solver_values_are_feasible(#[case] n: usize, #[case] r: usize, #[case] seed: u64) {
    use tardiness::Solver;

    let instance = common::random_instance(n, r, seed);
    let model = Model::build(&instance, None).expect("model");

    let solution = tardiness::LpSolver
        .solve(&model, &SolverConfig::default())
        .expect("solver");
    let values = solution.values.expect("values");

    assert!(model.max_violation(&values) <= EPS);

    let schedule = Schedule::extract(&model, &instance, &values, 0.5).expect("schedule");
    assert_abs_diff_eq!(
        schedule.objective,
        model.objective_value(&values),
        epsilon = EPS
    );
}
