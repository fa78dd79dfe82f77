//! Stop identifiers and locations.

use std::fmt;

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid stop id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stop id: {reason}")]
pub struct InvalidStopId {
    reason: &'static str,
}

/// An external stop identifier, as it appears in timetable data.
///
/// Stop ids are opaque strings. The only constraint enforced is that they
/// are non-empty and contain no surrounding whitespace.
///
/// # Examples
///
/// ```
/// use robust_planner::domain::StopId;
///
/// let id = StopId::parse("8503000").unwrap();
/// assert_eq!(id.as_str(), "8503000");
///
/// assert!(StopId::parse("").is_err());
/// assert!(StopId::parse(" 8503000").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StopId(String);

impl StopId {
    /// Parse a stop id from a string.
    pub fn parse(s: &str) -> Result<Self, InvalidStopId> {
        if s.is_empty() {
            return Err(InvalidStopId {
                reason: "must not be empty",
            });
        }
        if s.trim() != s {
            return Err(InvalidStopId {
                reason: "must not have surrounding whitespace",
            });
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StopId {
    type Error = InvalidStopId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StopId> for String {
    fn from(value: StopId) -> Self {
        value.0
    }
}

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopId({})", self.0)
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dense index of a stop inside a loaded graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StopIndex(pub u32);

impl StopIndex {
    /// Returns the index as a `usize` for slice access.
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// A stop: identifier, display name and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    /// External identifier.
    pub id: StopId,
    /// Display name.
    pub name: String,
    /// Location (x = longitude, y = latitude).
    pub location: Point<f64>,
}

impl Stop {
    /// Create a stop from latitude/longitude in degrees.
    pub fn new(id: StopId, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id,
            name: name.into(),
            location: Point::new(lon, lat),
        }
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.location.y()
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> f64 {
        self.location.x()
    }

    /// Great-circle distance to another stop, in metres.
    pub fn distance_m(&self, other: &Stop) -> f64 {
        Haversine.distance(self.location, other.location)
    }
}
