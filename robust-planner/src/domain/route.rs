//! Route types.
//!
//! A `Route` is a complete trip from origin to destination: an ordered list
//! of legs together with the probability of making each one.

use chrono::Duration;

use super::{ConnectionId, DomainError, Leg, ServiceTime, StopIndex};

/// A complete, scored route from origin to destination.
///
/// # Invariants
///
/// - At least one leg
/// - Consecutive legs connect (destination of one = origin of next)
/// - No leg departs before the previous one arrives
/// - One success probability per leg
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    legs: Vec<Leg>,
    leg_probabilities: Vec<f64>,
    confidence: f64,
}

impl Route {
    /// Constructs a route from legs in travel order and their success
    /// probabilities.
    ///
    /// The route's confidence is the product of the leg probabilities
    /// (delays are treated as independent).
    ///
    /// # Errors
    ///
    /// Returns `Err` if the legs are empty, don't connect, overlap in time,
    /// or the probability list has the wrong length.
    pub fn new(legs: Vec<Leg>, leg_probabilities: Vec<f64>) -> Result<Self, DomainError> {
        if legs.is_empty() {
            return Err(DomainError::EmptyRoute);
        }
        if legs.len() != leg_probabilities.len() {
            return Err(DomainError::ProbabilityCountMismatch {
                expected: legs.len(),
                actual: leg_probabilities.len(),
            });
        }

        for window in legs.windows(2) {
            let (prev, next) = (&window[0], &window[1]);
            if prev.to != next.from {
                return Err(DomainError::LegsNotConnected(prev.to, next.from));
            }
            if next.departure < prev.arrival {
                return Err(DomainError::LegsOverlap {
                    arrival: prev.arrival,
                    departure: next.departure,
                });
            }
        }

        let confidence = leg_probabilities.iter().product();

        Ok(Self {
            legs,
            leg_probabilities,
            confidence,
        })
    }

    /// Returns the legs in travel order.
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Returns the success probability of each leg.
    pub fn leg_probabilities(&self) -> &[f64] {
        &self.leg_probabilities
    }

    /// Probability that every leg is made, assuming independent delays.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Returns the origin stop.
    pub fn origin(&self) -> StopIndex {
        self.legs[0].from
    }

    /// Returns the destination stop.
    pub fn destination(&self) -> StopIndex {
        self.legs[self.legs.len() - 1].to
    }

    /// Departure time from the origin.
    pub fn departure_time(&self) -> ServiceTime {
        self.legs[0].departure
    }

    /// Arrival time at the destination.
    pub fn arrival_time(&self) -> ServiceTime {
        self.legs[self.legs.len() - 1].arrival
    }

    /// Total elapsed time from departure to arrival, including waits.
    pub fn total_travel_time(&self) -> Duration {
        self.arrival_time() - self.departure_time()
    }

    /// Number of times the traveller changes vehicle.
    ///
    /// Each boarding of a trip other than the one last ridden counts, except
    /// the first boarding. Walks in between don't count on their own.
    pub fn transfer_count(&self) -> usize {
        let mut boardings: usize = 0;
        let mut last_trip = None;
        for leg in &self.legs {
            if let Some(trip) = leg.trip_id() {
                if last_trip != Some(trip) {
                    boardings += 1;
                }
                last_trip = Some(trip);
            }
        }
        boardings.saturating_sub(1)
    }

    /// Total walking distance in metres.
    pub fn walking_distance_m(&self) -> f64 {
        self.legs.iter().map(Leg::walking_distance_m).sum()
    }

    /// Ids of the connections used, in travel order.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.legs.iter().map(|leg| leg.connection).collect()
    }

    /// The leg least likely to be made, with its probability.
    ///
    /// Ties go to the lowest connection id, so the choice follows the
    /// graph's connection ordering.
    pub fn weakest_leg(&self) -> (&Leg, f64) {
        let mut weakest = 0;
        for (idx, (leg, p)) in self
            .legs
            .iter()
            .zip(&self.leg_probabilities)
            .enumerate()
            .skip(1)
        {
            let current = self.leg_probabilities[weakest];
            if *p < current
                || (*p == current && leg.connection < self.legs[weakest].connection)
            {
                weakest = idx;
            }
        }
        (&self.legs[weakest], self.leg_probabilities[weakest])
    }
}
