//! Identical configurations give identical runs.

use brigade_integration_tests::{inverted_order, pebble_on_fast_worker};
use brigade_sim::{run, simulate, RunConfig, PRESETS};
use proptest::prelude::*;

#[test]
fn repeated_runs_are_byte_identical() {
    for config in [pebble_on_fast_worker(), inverted_order()] {
        let first = serde_json::to_vec(&simulate(&config).unwrap()).unwrap();
        let second = serde_json::to_vec(&simulate(&config).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn configuration_round_trips_through_json() {
    for name in PRESETS {
        let config = RunConfig::preset(name).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RunConfig = serde_json::from_str(&json).unwrap();

        let direct = simulate(&config).unwrap();
        let replayed = simulate(&parsed).unwrap();
        assert_eq!(direct.handoffs, replayed.handoffs, "{name}");
    }
}

#[test]
fn concurrent_runs_do_not_interfere() {
    let config = pebble_on_fast_worker();
    let expected = simulate(&config).unwrap().handoffs;

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| simulate(&config).map(|output| output.handoffs)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
    });

    for handoffs in results {
        assert_eq!(handoffs, expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn trace_only_run_matches_full_simulation(
        start in 0.0f64..40.0,
        duration in 0.1f64..20.0,
        multiplier in 0.1f64..1.0,
    ) {
        let config = RunConfig::classic_three().with_pebble(3, start, duration, multiplier);
        let trace = run(
            config.line().unwrap(),
            &config.worker_specs(),
            config.schedule().unwrap(),
            config.horizon,
        )
        .unwrap();
        let output = simulate(&config).unwrap();
        prop_assert_eq!(trace, output.handoffs);
    }
}
