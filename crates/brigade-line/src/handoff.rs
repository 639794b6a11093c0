//! Hand-off records: the authoritative observable output of a run.

use crate::worker::WorkerId;

/// How an item changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HandoffKind {
    /// A worker walking back met an upstream worker carrying and took over
    Relay,
    /// A carrying worker caught up with the carrying worker ahead
    Blocking,
}

/// One transfer of a carried item between two workers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandoffRecord {
    /// Cycle in progress when the hand-off happened
    pub cycle_index: u64,
    /// Worker giving up the item
    pub from: WorkerId,
    /// Worker continuing forward with the item
    pub to: WorkerId,
    pub position: f64,
    pub time: f64,
    pub kind: HandoffKind,
}

/// Number of leading records whose cycle index is below `cycles`.
///
/// Records are appended in time order, so cycle indices never decrease and
/// the records of completed cycles form a prefix.
pub fn completed_prefix_len(records: &[HandoffRecord], cycles: u64) -> usize {
    records.partition_point(|r| r.cycle_index < cycles)
}
