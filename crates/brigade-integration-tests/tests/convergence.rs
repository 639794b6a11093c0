//! Unperturbed lines converge to the classical partition.

use brigade_convergence::{drift_series, ConvergenceAnalyzer};
use brigade_integration_tests::{completed_trace, expected_partition, two_workers};
use brigade_sim::{Horizon, RunConfig};
use proptest::prelude::*;

#[test]
fn two_workers_converge_within_twenty_cycles() {
    let config = two_workers(20);
    let (output, trace) = completed_trace(&config).unwrap();
    assert_eq!(output.summary.cycles_completed, 20);

    let verdict = ConvergenceAnalyzer::new(1e-3, 5).unwrap().analyze(&trace);
    assert!(verdict.converged);
    assert!(verdict.cycle_of_convergence.unwrap() <= 20);
    assert!((verdict.limiting_partition[0] - 10.0 / 3.0).abs() < 1e-3);
}

#[test]
fn two_workers_reach_tight_tolerance() {
    let config = two_workers(60);
    let (_, trace) = completed_trace(&config).unwrap();

    let verdict = ConvergenceAnalyzer::default().analyze(&trace);
    assert!(verdict.converged);
    assert!(verdict.residual_drift < 1e-6);
    assert_eq!(verdict.limiting_partition.len(), 1);
    assert!((verdict.limiting_partition[0] - 10.0 / 3.0).abs() < 1e-6);
}

#[test]
fn drift_halves_every_cycle() {
    let (_, trace) = completed_trace(&two_workers(20)).unwrap();
    let series = drift_series(&trace);

    assert_eq!(series.len(), 19);
    assert!(series.iter().all(|d| d.aligned));
    for pair in series.windows(2) {
        let ratio = pair[1].drift / pair[0].drift;
        assert!((ratio - 0.5).abs() < 1e-3, "ratio {ratio}");
    }
}

#[test]
fn three_workers_settle_on_cumulative_shares() {
    let config = RunConfig::new(10.0, Horizon::Cycles(120))
        .with_worker(1, 1.0)
        .with_worker(2, 2.0)
        .with_worker(3, 3.0);
    let (_, trace) = completed_trace(&config).unwrap();

    let verdict = ConvergenceAnalyzer::default().analyze(&trace);
    assert!(verdict.converged);
    let expected = expected_partition(&config).unwrap();
    assert!(verdict.partition_error(&expected).unwrap() < 1e-5);
}

/// Velocities growing by a factor of at least two per rank.
fn spread_velocities() -> impl Strategy<Value = Vec<f64>> {
    (0.5f64..2.0, prop::collection::vec(2.0f64..4.0, 1..3)).prop_map(|(first, factors)| {
        let mut velocities = vec![first];
        for factor in factors {
            let last = velocities[velocities.len() - 1];
            velocities.push(last * factor);
        }
        velocities
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn monotone_lines_converge(velocities in spread_velocities(), length in 1.0f64..20.0) {
        let config = velocities
            .iter()
            .enumerate()
            .fold(RunConfig::new(length, Horizon::Cycles(150)), |config, (i, &v)| {
                config.with_worker(i as u32 + 1, v)
            });
        let (_, trace) = completed_trace(&config).unwrap();

        let verdict = ConvergenceAnalyzer::default().analyze(&trace);
        prop_assert!(verdict.converged);

        let expected = expected_partition(&config).unwrap();
        let error = verdict.partition_error(&expected).unwrap();
        prop_assert!(error < 1e-5 * length, "error {} for {:?}", error, velocities);
    }
}
