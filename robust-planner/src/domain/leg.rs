//! Timed legs.
//!
//! A `Leg` is one connection as used by a concrete route: scheduled hops
//! carry their timetable times, walking links are given the times the
//! planner chose for them.

use chrono::Duration;

use super::{
    Connection, ConnectionId, ConnectionKind, ServiceTime, StopIndex, TransportCategory, TripId,
};

/// How a leg is travelled.
#[derive(Debug, Clone, PartialEq)]
pub enum LegMode {
    /// Riding a scheduled trip.
    Scheduled {
        trip_id: TripId,
        category: TransportCategory,
    },
    /// Walking between nearby stops.
    Walk { distance_m: f64 },
}

/// A connection placed in time as part of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub connection: ConnectionId,
    pub from: StopIndex,
    pub to: StopIndex,
    pub departure: ServiceTime,
    pub arrival: ServiceTime,
    pub mode: LegMode,
}

impl Leg {
    /// Leg for a scheduled connection, using its timetable times.
    ///
    /// Returns `None` for walking links.
    pub fn scheduled(connection: &Connection) -> Option<Self> {
        let trip = connection.as_trip()?;
        Some(Self {
            connection: connection.id,
            from: connection.from,
            to: connection.to,
            departure: trip.departure,
            arrival: trip.arrival,
            mode: LegMode::Scheduled {
                trip_id: trip.trip_id.clone(),
                category: trip.category.clone(),
            },
        })
    }

    /// Leg for a walking link that ends exactly at `arrival`.
    ///
    /// Returns `None` for scheduled connections, or if the walk would have
    /// to start before midnight.
    pub fn walk_arriving_at(connection: &Connection, arrival: ServiceTime) -> Option<Self> {
        let walk = match &connection.kind {
            ConnectionKind::Walk(walk) => walk,
            ConnectionKind::Scheduled(_) => return None,
        };
        let departure = arrival.checked_sub(walk.duration)?;
        Some(Self {
            connection: connection.id,
            from: connection.from,
            to: connection.to,
            departure,
            arrival,
            mode: LegMode::Walk {
                distance_m: walk.distance_m,
            },
        })
    }

    /// Time spent on this leg.
    pub fn duration(&self) -> Duration {
        self.arrival - self.departure
    }

    /// Returns true if this is a walking leg.
    pub fn is_walk(&self) -> bool {
        matches!(self.mode, LegMode::Walk { .. })
    }

    /// Trip id for scheduled legs.
    pub fn trip_id(&self) -> Option<&TripId> {
        match &self.mode {
            LegMode::Scheduled { trip_id, .. } => Some(trip_id),
            LegMode::Walk { .. } => None,
        }
    }

    /// Walking distance in metres (zero for scheduled legs).
    pub fn walking_distance_m(&self) -> f64 {
        match self.mode {
            LegMode::Scheduled { .. } => 0.0,
            LegMode::Walk { distance_m } => distance_m,
        }
    }

    /// Returns true if `next` stays on the same vehicle as this leg.
    ///
    /// Staying aboard needs no transfer buffer and cannot be missed.
    pub fn continues_on(&self, next: &Leg) -> bool {
        match (self.trip_id(), next.trip_id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
