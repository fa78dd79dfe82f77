//! Connections: the edges of the transit graph.
//!
//! A connection is either a scheduled hop of a trip between two consecutive
//! stops, or a walking link between two nearby stops. Walking links have no
//! timetable; the planner times them when it places them in a route.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{DomainError, ServiceTime, StopIndex};

/// Stable id of a connection inside a loaded graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u32);

impl ConnectionId {
    /// Returns the id as a `usize` for slice access.
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a scheduled trip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(pub String);

impl TripId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of the delay-model cluster a scheduled connection belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DelayKey(pub String);

impl DelayKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Transport category of a scheduled trip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransportCategory {
    Bus,
    Tram,
    SBahn,
    RegioExpress,
    InterRegio,
    Intercity,
    /// Any category not listed above, kept verbatim.
    Other(String),
}

impl TransportCategory {
    /// Display name of the category.
    pub fn as_str(&self) -> &str {
        match self {
            TransportCategory::Bus => "Bus",
            TransportCategory::Tram => "Tram",
            TransportCategory::SBahn => "S-Bahn",
            TransportCategory::RegioExpress => "RegioExpress",
            TransportCategory::InterRegio => "InterRegio",
            TransportCategory::Intercity => "Intercity",
            TransportCategory::Other(name) => name,
        }
    }
}

impl From<String> for TransportCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Bus" => TransportCategory::Bus,
            "Tram" => TransportCategory::Tram,
            "S-Bahn" => TransportCategory::SBahn,
            "RegioExpress" => TransportCategory::RegioExpress,
            "InterRegio" => TransportCategory::InterRegio,
            "Intercity" => TransportCategory::Intercity,
            _ => TransportCategory::Other(value),
        }
    }
}

impl From<TransportCategory> for String {
    fn from(value: TransportCategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TransportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a scheduled connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub trip_id: TripId,
    pub category: TransportCategory,
    pub departure: ServiceTime,
    pub arrival: ServiceTime,
    pub delay_key: DelayKey,
}

impl Trip {
    /// Create a scheduled hop.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the arrival is before the departure.
    pub fn new(
        trip_id: TripId,
        category: TransportCategory,
        departure: ServiceTime,
        arrival: ServiceTime,
        delay_key: DelayKey,
    ) -> Result<Self, DomainError> {
        if arrival < departure {
            return Err(DomainError::ArrivalBeforeDeparture {
                departure,
                arrival,
            });
        }
        Ok(Self {
            trip_id,
            category,
            departure,
            arrival,
            delay_key,
        })
    }

    /// Scheduled in-vehicle time.
    pub fn duration(&self) -> Duration {
        self.arrival - self.departure
    }
}

/// Payload of a walking link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Walk {
    /// Straight-line distance in metres.
    pub distance_m: f64,
    /// Walking time, rounded up to whole seconds.
    pub duration: Duration,
}

impl Walk {
    /// Create a walk covering `distance_m` at `speed_m_per_min`.
    pub fn from_distance(distance_m: f64, speed_m_per_min: f64) -> Self {
        let secs = (distance_m / speed_m_per_min * 60.0).ceil().max(0.0);
        Self {
            distance_m,
            duration: Duration::seconds(secs as i64),
        }
    }
}

/// What kind of connection an edge is.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionKind {
    Scheduled(Trip),
    Walk(Walk),
}

/// A directed edge of the transit graph, in travel direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: StopIndex,
    pub to: StopIndex,
    pub kind: ConnectionKind,
}

impl Connection {
    /// Returns true for walking links.
    pub fn is_walk(&self) -> bool {
        matches!(self.kind, ConnectionKind::Walk(_))
    }

    /// Returns the trip payload for scheduled connections.
    pub fn as_trip(&self) -> Option<&Trip> {
        match &self.kind {
            ConnectionKind::Scheduled(trip) => Some(trip),
            ConnectionKind::Walk(_) => None,
        }
    }

    /// Returns the walk payload for walking links.
    pub fn as_walk(&self) -> Option<&Walk> {
        match &self.kind {
            ConnectionKind::Scheduled(_) => None,
            ConnectionKind::Walk(walk) => Some(walk),
        }
    }

    /// Returns the trip id for scheduled connections.
    pub fn trip_id(&self) -> Option<&TripId> {
        self.as_trip().map(|trip| &trip.trip_id)
    }
}
