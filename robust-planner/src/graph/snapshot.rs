//! JSON graph snapshots.
//!
//! A snapshot is the hand-off format from the timetable pipeline: plain stop
//! and connection records, validated and indexed by `GraphBuilder`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DelayKey, ServiceTime, Stop, StopId, TransportCategory, Trip, TripId};

use super::{BuildConfig, GraphBuilder, GraphError, TransitGraph};

/// A stop as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub id: StopId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// A scheduled connection as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub from: StopId,
    pub to: StopId,
    pub trip_id: String,
    pub category: TransportCategory,
    pub departure: ServiceTime,
    pub arrival: ServiceTime,
    /// Delay model key; defaults to the category name.
    #[serde(default)]
    pub delay_key: Option<String>,
}

/// Serialized form of a transit graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub hub: Option<StopId>,
    pub stops: Vec<StopRecord>,
    pub connections: Vec<ConnectionRecord>,
}

impl GraphSnapshot {
    /// Read a snapshot from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, GraphError> {
        let contents = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Feed every record into a fresh builder.
    ///
    /// Connection records that cannot form a trip, such as ones arriving
    /// before they depart, are dropped.
    pub fn into_builder(self, config: BuildConfig) -> GraphBuilder {
        let mut builder = GraphBuilder::new(config);

        for record in self.stops {
            builder.add_stop(Stop::new(record.id, record.name, record.lat, record.lon));
        }

        for record in self.connections {
            let delay_key = record
                .delay_key
                .unwrap_or_else(|| record.category.as_str().to_string());
            let trip = match Trip::new(
                TripId::new(record.trip_id),
                record.category,
                record.departure,
                record.arrival,
                DelayKey::new(delay_key),
            ) {
                Ok(trip) => trip,
                Err(error) => {
                    debug!(
                        from = %record.from,
                        to = %record.to,
                        %error,
                        "dropping connection record"
                    );
                    continue;
                }
            };
            builder.add_connection(record.from, record.to, trip);
        }

        if let Some(hub) = self.hub {
            builder.with_hub(hub);
        }

        builder
    }
}

/// Load and build a transit graph from a JSON snapshot file.
pub fn load_graph(path: &Path, config: BuildConfig) -> Result<TransitGraph, GraphError> {
    let snapshot = GraphSnapshot::from_path(path)?;
    snapshot.into_builder(config).build()
}
