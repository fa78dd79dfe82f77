//! Domain error types.
//!
//! These errors represent validation failures and data inconsistencies
//! in the domain layer. They are distinct from loading and query errors.

use super::{ServiceTime, StopIndex};

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// A connection arrives before it departs
    #[error("arrival {arrival} is before departure {departure}")]
    ArrivalBeforeDeparture {
        departure: ServiceTime,
        arrival: ServiceTime,
    },

    /// Route has no legs
    #[error("route must have at least one leg")]
    EmptyRoute,

    /// Consecutive legs don't share a stop
    #[error("legs do not connect: stop {0:?} is followed by stop {1:?}")]
    LegsNotConnected(StopIndex, StopIndex),

    /// A leg departs before the previous leg arrives
    #[error("leg departing {departure} cannot follow an arrival at {arrival}")]
    LegsOverlap {
        arrival: ServiceTime,
        departure: ServiceTime,
    },

    /// Per-leg probabilities don't line up with the legs
    #[error("expected {expected} leg probabilities, got {actual}")]
    ProbabilityCountMismatch { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::ArrivalBeforeDeparture {
            departure: ServiceTime::parse("08:10").unwrap(),
            arrival: ServiceTime::parse("08:00").unwrap(),
        };
        assert_eq!(err.to_string(), "arrival 08:00 is before departure 08:10");

        let err = DomainError::EmptyRoute;
        assert_eq!(err.to_string(), "route must have at least one leg");

        let err = DomainError::LegsNotConnected(StopIndex(1), StopIndex(4));
        assert_eq!(
            err.to_string(),
            "legs do not connect: stop StopIndex(1) is followed by stop StopIndex(4)"
        );

        let err = DomainError::ProbabilityCountMismatch {
            expected: 2,
            actual: 3,
        };
        assert_eq!(err.to_string(), "expected 2 leg probabilities, got 3");
    }
}
