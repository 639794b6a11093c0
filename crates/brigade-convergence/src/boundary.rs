//! Per-cycle boundary vectors and the drift between them.
//!
//! A cycle's boundary vector records, for every worker that received an item
//! during the cycle, where it last did so. Between consecutive cycles the
//! drift is the largest absolute change of any boundary. A boundary that
//! appears in only one of the two cycles counts as having moved from (or to)
//! the start boundary, and marks the pair as not aligned.

use brigade_line::{HandoffRecord, WorkerId};

/// Hand-off boundaries observed during one cycle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundaryVector {
    pub cycle: u64,
    /// `(receiving worker, position)`, sorted by worker
    pub boundaries: Vec<(WorkerId, f64)>,
}

impl BoundaryVector {
    /// Boundary position for `worker`, if it received an item this cycle.
    pub fn get(&self, worker: WorkerId) -> Option<f64> {
        self.boundaries
            .binary_search_by_key(&worker, |&(id, _)| id)
            .ok()
            .map(|i| self.boundaries[i].1)
    }

    /// Boundary positions in ascending order along the line.
    pub fn positions(&self) -> Vec<f64> {
        let mut positions: Vec<f64> = self.boundaries.iter().map(|&(_, p)| p).collect();
        positions.sort_by(f64::total_cmp);
        positions
    }

    /// Whether both vectors cover the same receiving workers.
    pub fn same_workers(&self, other: &BoundaryVector) -> bool {
        self.boundaries.len() == other.boundaries.len()
            && self
                .boundaries
                .iter()
                .zip(&other.boundaries)
                .all(|(a, b)| a.0 == b.0)
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }
}

/// Boundary change between two consecutive observed cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Drift {
    pub from_cycle: u64,
    pub to_cycle: u64,
    /// Largest absolute boundary change
    pub drift: f64,
    /// Cycles are adjacent and share the same receiving workers
    pub aligned: bool,
}

impl Drift {
    /// Whether this transition counts toward a stable window.
    pub fn is_stable(&self, tolerance: f64) -> bool {
        self.aligned && self.drift < tolerance
    }
}

/// Group a hand-off trace into per-cycle boundary vectors.
///
/// The trace must be in emission order; cycles without hand-offs produce no
/// vector.
pub fn boundary_vectors(trace: &[HandoffRecord]) -> Vec<BoundaryVector> {
    let mut vectors: Vec<BoundaryVector> = Vec::new();

    for record in trace {
        let start_new = vectors.last().map_or(true, |v| v.cycle != record.cycle_index);
        if start_new {
            vectors.push(BoundaryVector {
                cycle: record.cycle_index,
                boundaries: Vec::new(),
            });
        }
        let Some(vector) = vectors.last_mut() else {
            continue;
        };
        match vector
            .boundaries
            .binary_search_by_key(&record.to, |&(id, _)| id)
        {
            Ok(i) => vector.boundaries[i].1 = record.position,
            Err(i) => vector.boundaries.insert(i, (record.to, record.position)),
        }
    }

    vectors
}

/// Drift from `previous` to `next`.
pub fn drift_between(previous: &BoundaryVector, next: &BoundaryVector) -> Drift {
    let mut drift: f64 = 0.0;
    let (mut i, mut j) = (0, 0);
    let (a, b) = (&previous.boundaries, &next.boundaries);

    // Merge walk over both worker-sorted lists.
    while i < a.len() || j < b.len() {
        let change = match (a.get(i), b.get(j)) {
            (Some(&(wa, pa)), Some(&(wb, pb))) if wa == wb => {
                i += 1;
                j += 1;
                (pa - pb).abs()
            }
            (Some(&(wa, pa)), Some(&(wb, _))) if wa < wb => {
                i += 1;
                pa.abs()
            }
            (Some(_), Some(&(_, pb))) => {
                j += 1;
                pb.abs()
            }
            (Some(&(_, pa)), None) => {
                i += 1;
                pa.abs()
            }
            (None, Some(&(_, pb))) => {
                j += 1;
                pb.abs()
            }
            (None, None) => break,
        };
        drift = drift.max(change);
    }

    Drift {
        from_cycle: previous.cycle,
        to_cycle: next.cycle,
        drift,
        aligned: next.cycle == previous.cycle + 1 && previous.same_workers(next),
    }
}

/// Drift for every pair of consecutive boundary vectors.
pub fn drifts(vectors: &[BoundaryVector]) -> Vec<Drift> {
    vectors
        .windows(2)
        .map(|pair| drift_between(&pair[0], &pair[1]))
        .collect()
}

/// Drift series of a hand-off trace, one entry per cycle transition.
pub fn drift_series(trace: &[HandoffRecord]) -> Vec<Drift> {
    drifts(&boundary_vectors(trace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use brigade_line::HandoffKind;

    fn record(cycle: u64, from: u32, to: u32, position: f64) -> HandoffRecord {
        HandoffRecord {
            cycle_index: cycle,
            from: WorkerId(from),
            to: WorkerId(to),
            position,
            time: cycle as f64 + position / 100.0,
            kind: HandoffKind::Relay,
        }
    }

    #[test]
    fn groups_by_cycle_and_receiver() {
        let trace = [
            record(0, 2, 3, 8.0),
            record(0, 1, 2, 4.0),
            record(1, 2, 3, 7.5),
            record(1, 1, 2, 3.5),
        ];
        let vectors = boundary_vectors(&trace);

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].cycle, 0);
        assert_eq!(vectors[0].boundaries, vec![(WorkerId(2), 4.0), (WorkerId(3), 8.0)]);
        assert_eq!(vectors[1].get(WorkerId(3)), Some(7.5));
        assert_eq!(vectors[1].positions(), vec![3.5, 7.5]);
    }

    #[test]
    fn last_receipt_in_a_cycle_wins() {
        let trace = [record(0, 1, 2, 4.0), record(0, 1, 2, 4.5)];
        let vectors = boundary_vectors(&trace);
        assert_eq!(vectors[0].get(WorkerId(2)), Some(4.5));
        assert_eq!(vectors[0].len(), 1);
    }

    #[test]
    fn drift_is_max_boundary_change() {
        let trace = [
            record(0, 1, 2, 4.0),
            record(0, 2, 3, 8.0),
            record(1, 1, 2, 3.5),
            record(1, 2, 3, 7.75),
        ];
        let series = drift_series(&trace);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].drift, 0.5);
        assert!(series[0].aligned);
        assert!(series[0].is_stable(0.6));
        assert!(!series[0].is_stable(0.5));
    }

    #[test]
    fn missing_receiver_breaks_alignment() {
        let trace = [record(0, 1, 2, 4.0), record(0, 2, 3, 8.0), record(1, 1, 2, 4.0)];
        let series = drift_series(&trace);
        assert!(!series[0].aligned);
        assert_eq!(series[0].drift, 8.0);
    }

    #[test]
    fn skipped_cycle_breaks_alignment() {
        let trace = [record(0, 1, 2, 4.0), record(2, 1, 2, 4.0)];
        let series = drift_series(&trace);
        assert_eq!(series[0].drift, 0.0);
        assert!(!series[0].aligned);
    }

    #[test]
    fn empty_trace_has_no_vectors() {
        assert!(boundary_vectors(&[]).is_empty());
        assert!(drift_series(&[]).is_empty());
    }
}
