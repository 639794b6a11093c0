//! Error types for the bucket brigade core.

use thiserror::Error;

/// Result type for bucket brigade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by line construction, scheduling and simulation.
///
/// Every error is raised synchronously by the call that detects it. A failed
/// run never yields a partial trace.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A pebble event has a non-positive duration, a multiplier outside
    /// `(0, 1]`, or targets a worker that does not exist.
    #[error("invalid pebble: {reason}")]
    InvalidPebble { reason: String },

    /// Malformed line or worker parameters, including base velocities that
    /// are not distinct and strictly increasing by rank.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// An event-time computation produced a non-finite or negative result,
    /// or the event loop stopped making progress.
    #[error("simulation diverged: {reason}")]
    SimulationDiverged { reason: String },
}

impl Error {
    pub fn invalid_pebble(reason: impl Into<String>) -> Self {
        Error::InvalidPebble { reason: reason.into() }
    }

    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Error::InvalidConfiguration { reason: reason.into() }
    }

    pub fn diverged(reason: impl Into<String>) -> Self {
        Error::SimulationDiverged { reason: reason.into() }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidPebble { .. } => "invalid_pebble",
            Error::InvalidConfiguration { .. } => "invalid_configuration",
            Error::SimulationDiverged { .. } => "simulation_diverged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = Error::invalid_pebble("duration must be positive");
        assert_eq!(err.to_string(), "invalid pebble: duration must be positive");
        assert_eq!(err.kind(), "invalid_pebble");
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            Error::invalid_pebble("a").kind(),
            Error::invalid_configuration("b").kind(),
            Error::diverged("c").kind(),
        ];
        assert_ne!(kinds[0], kinds[1]);
        assert_ne!(kinds[1], kinds[2]);
        assert_ne!(kinds[0], kinds[2]);
    }
}
