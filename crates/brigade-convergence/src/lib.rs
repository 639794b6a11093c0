//! Bucket Brigade Convergence Analysis
//!
//! Reduces a hand-off trace to a verdict on whether the line's partition
//! among workers has stabilised.
//!
//! # Boundary Vectors
//!
//! Every cycle yields one boundary per receiving worker: the position where
//! it last took over an item. With strictly increasing velocities and no
//! perturbation the boundary vector contracts toward a unique fixed point
//! (see [`fixed_point_partition`]).
//!
//! # Verdicts
//!
//! Convergence is declared at the first cycle after which `stability_window`
//! consecutive cycle transitions each move every boundary by less than
//! `tolerance`. Pebble perturbations show up as a drift spike followed by a
//! new stable window, measured by [`ConvergenceAnalyzer::recovery_after`].

mod boundary;
mod convergence;
mod intervals;

pub use boundary::{boundary_vectors, drift_between, drift_series, drifts, BoundaryVector, Drift};
pub use convergence::{
    analyze, AnalysisConfig, ConvergenceAnalyzer, ConvergenceVerdict, Recovery,
    DEFAULT_STABILITY_WINDOW, DEFAULT_TOLERANCE,
};
pub use intervals::{cycle_at_time, fixed_point_partition, handoff_density, handoff_intervals};

#[cfg(test)]
mod tests {
    use super::*;
    use brigade_line::{HandoffKind, HandoffRecord, Line, WorkerId};
    use proptest::prelude::*;

    #[test]
    fn defaults_match_analyzer_defaults() {
        let config = AnalysisConfig::default();
        let analyzer = ConvergenceAnalyzer::from_config(&config).unwrap();
        assert_eq!(analyzer, ConvergenceAnalyzer::default());
        assert_eq!(analyzer.tolerance(), 1e-6);
        assert_eq!(analyzer.stability_window(), 5);
    }

    proptest! {
        #[test]
        fn limiting_partition_is_sorted_and_on_line(
            cycles in prop::collection::vec(prop::collection::vec(0.0f64..10.0, 3), 1..20),
        ) {
            let trace: Vec<HandoffRecord> = cycles
                .iter()
                .enumerate()
                .flat_map(|(cycle, positions)| {
                    positions.iter().enumerate().map(move |(i, &position)| HandoffRecord {
                        cycle_index: cycle as u64,
                        from: WorkerId(i as u32 + 1),
                        to: WorkerId(i as u32 + 2),
                        position,
                        time: cycle as f64 * 10.0 + i as f64,
                        kind: HandoffKind::Relay,
                    })
                })
                .collect();

            let verdict = ConvergenceAnalyzer::new(0.5, 2).unwrap().analyze(&trace);
            prop_assert!(verdict.limiting_partition.windows(2).all(|p| p[0] <= p[1]));
            prop_assert!(verdict.limiting_partition.iter().all(|p| (0.0..=10.0).contains(p)));
            prop_assert!(verdict.residual_drift >= 0.0);
            prop_assert_eq!(verdict.converged, verdict.cycle_of_convergence.is_some());
            if verdict.converged {
                prop_assert!(verdict.residual_drift < 0.5);
            }
        }

        #[test]
        fn fixed_point_partition_is_increasing(
            velocities in prop::collection::vec(0.01f64..10.0, 2..8),
            length in 0.1f64..100.0,
        ) {
            let line = Line::new(length).unwrap();
            let partition = fixed_point_partition(&line, &velocities).unwrap();
            prop_assert_eq!(partition.len(), velocities.len() - 1);
            prop_assert!(partition.windows(2).all(|p| p[0] < p[1]));
            prop_assert!(partition.iter().all(|&p| p > 0.0 && p < length));
        }
    }
}
