//! Trace statistics for plotting, and the classical fixed point.

use brigade_line::{Error, HandoffRecord, Line, Result, WorkerId};

/// Cycle in progress at time `t`, as far as the trace shows.
///
/// This is the cycle of the latest hand-off at or before `t`; `None` when the
/// trace has no hand-off that early.
pub fn cycle_at_time(trace: &[HandoffRecord], t: f64) -> Option<u64> {
    let seen = trace.partition_point(|r| r.time <= t);
    seen.checked_sub(1).map(|i| trace[i].cycle_index)
}

/// Time between successive hand-offs received by `worker`.
pub fn handoff_intervals(trace: &[HandoffRecord], worker: WorkerId) -> Vec<f64> {
    let times: Vec<f64> = trace
        .iter()
        .filter(|r| r.to == worker)
        .map(|r| r.time)
        .collect();
    times.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Histogram of hand-off positions over `bins` equal slices of the line.
pub fn handoff_density(trace: &[HandoffRecord], line: &Line, bins: usize) -> Result<Vec<usize>> {
    if bins == 0 {
        return Err(Error::invalid_configuration("density needs at least one bin"));
    }
    let mut counts = vec![0; bins];
    let width = line.length() / bins as f64;
    for record in trace {
        let bin = ((line.clamp(record.position) / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }
    Ok(counts)
}

/// Limiting partition of a brigade with the given base velocities, slowest
/// first: boundary `i` sits at `length * (v_1 + ... + v_i) / (v_1 + ... + v_n)`.
///
/// Holds in the limit of instantaneous walk-back.
pub fn fixed_point_partition(line: &Line, velocities: &[f64]) -> Result<Vec<f64>> {
    if let Some(v) = velocities.iter().find(|v| !v.is_finite() || **v <= 0.0) {
        return Err(Error::invalid_configuration(format!(
            "velocity must be finite and positive, got {v}"
        )));
    }
    let total: f64 = velocities.iter().sum();
    let mut cumulative = 0.0;
    Ok(velocities
        .iter()
        .take(velocities.len().saturating_sub(1))
        .map(|v| {
            cumulative += v;
            line.length() * cumulative / total
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use brigade_line::HandoffKind;

    fn record(cycle: u64, to: u32, position: f64, time: f64) -> HandoffRecord {
        HandoffRecord {
            cycle_index: cycle,
            from: WorkerId(to - 1),
            to: WorkerId(to),
            position,
            time,
            kind: HandoffKind::Relay,
        }
    }

    #[test]
    fn cycle_lookup_by_time() {
        let trace = [record(0, 2, 5.0, 5.0), record(1, 2, 2.5, 7.5), record(2, 2, 3.75, 11.25)];
        assert_eq!(cycle_at_time(&trace, 1.0), None);
        assert_eq!(cycle_at_time(&trace, 5.0), Some(0));
        assert_eq!(cycle_at_time(&trace, 10.0), Some(1));
        assert_eq!(cycle_at_time(&trace, 100.0), Some(2));
    }

    #[test]
    fn intervals_per_receiver() {
        let trace = [
            record(0, 2, 5.0, 5.0),
            record(0, 3, 8.0, 6.0),
            record(1, 2, 2.5, 7.5),
            record(2, 2, 3.75, 11.25),
        ];
        assert_eq!(handoff_intervals(&trace, WorkerId(2)), vec![2.5, 3.75]);
        assert!(handoff_intervals(&trace, WorkerId(3)).is_empty());
    }

    #[test]
    fn density_bins_include_line_end() {
        let line = Line::new(10.0).unwrap();
        let trace = [
            record(0, 2, 0.0, 1.0),
            record(0, 2, 4.9, 2.0),
            record(1, 2, 5.0, 3.0),
            record(1, 2, 10.0, 4.0),
        ];
        assert_eq!(handoff_density(&trace, &line, 2).unwrap(), vec![2, 2]);
        assert!(handoff_density(&trace, &line, 0).is_err());
    }

    #[test]
    fn fixed_point_is_cumulative_velocity_share() {
        let line = Line::new(10.0).unwrap();
        let partition = fixed_point_partition(&line, &[1.0, 2.0]).unwrap();
        assert_eq!(partition.len(), 1);
        assert!((partition[0] - 10.0 / 3.0).abs() < 1e-12);

        let three = fixed_point_partition(&line, &[1.0, 2.0, 3.0]).unwrap();
        assert!((three[0] - 10.0 / 6.0).abs() < 1e-12);
        assert!((three[1] - 5.0).abs() < 1e-12);

        assert!(fixed_point_partition(&line, &[1.0]).unwrap().is_empty());
        assert!(fixed_point_partition(&line, &[1.0, 0.0]).is_err());
    }
}
