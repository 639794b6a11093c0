//! Static geometry of the production line.
//!
//! Work flows over the closed interval `[0, length]`: raw items enter at the
//! start boundary `0` and finished items leave at the end boundary `length`.

use crate::error::{Error, Result};

/// Relative size of the contact zone around boundaries and between workers.
///
/// Two positions closer than `length * CONTACT_TOLERANCE` are treated as the
/// same point by the event loop.
pub const CONTACT_TOLERANCE: f64 = 1e-12;

/// A one-dimensional production line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    length: f64,
}

impl Line {
    /// Position of the start boundary (raw-item source).
    pub const START: f64 = 0.0;

    /// Create a line of the given length.
    ///
    /// Fails with [`Error::InvalidConfiguration`] unless `length` is finite
    /// and strictly positive.
    pub fn new(length: f64) -> Result<Self> {
        if !length.is_finite() || length <= 0.0 {
            return Err(Error::invalid_configuration(format!(
                "line length must be finite and positive, got {length}"
            )));
        }
        Ok(Self { length })
    }

    /// Length of the line.
    #[inline]
    pub const fn length(&self) -> f64 {
        self.length
    }

    /// Position of the end boundary (finished-item sink).
    #[inline]
    pub const fn end(&self) -> f64 {
        self.length
    }

    /// Whether `position` lies on the line.
    pub fn contains(&self, position: f64) -> bool {
        (Self::START..=self.length).contains(&position)
    }

    /// Clamp `position` onto the line.
    pub fn clamp(&self, position: f64) -> f64 {
        position.clamp(Self::START, self.length)
    }

    /// Distance from `position` to the end boundary.
    pub fn remaining(&self, position: f64) -> f64 {
        (self.length - position).max(0.0)
    }

    /// Absolute contact tolerance for this line.
    pub fn tolerance(&self) -> f64 {
        self.length * CONTACT_TOLERANCE
    }

    /// Whether `position` touches the start boundary.
    pub fn at_start(&self, position: f64) -> bool {
        position <= Self::START + self.tolerance()
    }

    /// Whether `position` touches the end boundary.
    pub fn at_end(&self, position: f64) -> bool {
        position >= self.length - self.tolerance()
    }
}

impl TryFrom<f64> for Line {
    type Error = Error;

    fn try_from(length: f64) -> Result<Self> {
        Self::new(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_lengths() {
        for length in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Line::new(length),
                Err(Error::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn bounds_queries() {
        let line = Line::new(10.0).unwrap();
        assert_eq!(line.end(), 10.0);
        assert!(line.contains(0.0));
        assert!(line.contains(10.0));
        assert!(!line.contains(10.5));
        assert_eq!(line.clamp(-3.0), 0.0);
        assert_eq!(line.clamp(12.0), 10.0);
        assert_eq!(line.remaining(7.5), 2.5);
    }

    #[test]
    fn contact_zone_scales_with_length() {
        let short = Line::new(1.0).unwrap();
        let long = Line::new(1000.0).unwrap();
        assert!(long.tolerance() > short.tolerance());
        assert!(short.at_end(1.0 - 1e-14));
        assert!(!short.at_end(1.0 - 1e-6));
        assert!(short.at_start(1e-14));
    }
}
