#![allow(dead_code)]

use itertools::Itertools;
use rand::prelude::*;
use rand_pcg::Pcg64Mcg;

use tardiness::{Instance, InstanceBuilder};

/// Random instance with `n` orders and `r` machines, reproducible from `seed`
pub fn random_instance(n: usize, r: usize, seed: u64) -> Instance {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);

    let mut builder = InstanceBuilder::new();
    for j in 0..n {
        builder = builder.order(
            format!("O{j}"),
            rng.gen_range(1..=6),
            rng.gen_range(0..=12),
            rng.gen_range(1..=3),
        );
    }
    for i in 0..r {
        builder = builder.machine(format!("M{i}"));
    }
    for (j, k) in (0..n).cartesian_product(0..n).filter(|(j, k)| j != k) {
        builder = builder.setup(format!("O{j}"), format!("O{k}"), rng.gen_range(0..=3));
    }

    builder.build().expect("valid instance")
}

/// Objective of a fixed assignment and per-machine sequences with every order started as early as
/// possible. Every order sequenced before `k` on the same machine is a predecessor of `k`.
pub fn sequence_cost(instance: &Instance, sequences: &[Vec<usize>]) -> f64 {
    let mut cost = 0.;

    for sequence in sequences {
        let mut completion = Vec::with_capacity(sequence.len());

        for (pos, &k) in sequence.iter().enumerate() {
            let start = sequence[..pos]
                .iter()
                .zip(completion.iter())
                .map(|(&j, &c): (&usize, &f64)| c + instance.setup(j, k))
                .fold(0., f64::max);

            let c = start + instance.processing_time(k);
            completion.push(c);

            cost += sequence[..pos].iter().map(|&j| instance.setup(j, k)).sum::<f64>();
            cost += instance.priority(k) * (c - instance.due_date(k)).max(0.);
        }
    }

    cost
}

/// Optimal objective found by enumerating all assignments and sequences (tiny instances only)
pub fn brute_force(instance: &Instance) -> f64 {
    let n = instance.num_orders();
    let r = instance.num_machines();

    (0..n)
        .map(|_| 0..r)
        .multi_cartesian_product()
        .map(|z| {
            (0..r)
                .map(|i| {
                    let assigned = (0..n).filter(|&j| z[j] == i).collect_vec();
                    if assigned.is_empty() {
                        return 0.;
                    }
                    let k = assigned.len();
                    assigned
                        .into_iter()
                        .permutations(k)
                        .map(|seq| sequence_cost(instance, &[seq]))
                        .fold(f64::INFINITY, f64::min)
                })
                .sum::<f64>()
        })
        .fold(f64::INFINITY, f64::min)
}
