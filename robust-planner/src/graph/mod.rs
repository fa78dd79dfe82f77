//! Transit graph.
//!
//! The graph is built once, then shared read-only between queries. It is
//! queried backwards in time: for a stop and an instant, which connections
//! arrive there no later than that instant, latest first.

mod builder;
mod error;
mod snapshot;

use std::collections::HashMap;

pub use builder::{BuildConfig, GraphBuilder};
pub use error::GraphError;
pub use snapshot::{ConnectionRecord, GraphSnapshot, StopRecord, load_graph};

use crate::domain::{Connection, ConnectionId, ServiceTime, Stop, StopId, StopIndex};

/// Immutable, time-indexed multigraph of stops and connections.
#[derive(Debug)]
pub struct TransitGraph {
    stops: Vec<Stop>,
    stop_lookup: HashMap<StopId, StopIndex>,

    /// Arena of all connections, indexed by `ConnectionId`.
    connections: Vec<Connection>,

    /// Per stop: scheduled connections arriving there, sorted by arrival
    /// ascending, then id descending.
    incoming: Vec<Vec<ConnectionId>>,

    /// Per stop: walking links ending there, in id order.
    incoming_walks: Vec<Vec<ConnectionId>>,

    hub: Option<StopIndex>,
}

impl TransitGraph {
    /// Assemble a graph from dense stops and connections.
    ///
    /// Connection ids must equal their position in `connections`, and every
    /// endpoint must be a valid stop index; `GraphBuilder` guarantees both.
    fn from_parts(stops: Vec<Stop>, connections: Vec<Connection>, hub: Option<StopIndex>) -> Self {
        let stop_lookup = stops
            .iter()
            .enumerate()
            .map(|(idx, stop)| (stop.id.clone(), StopIndex(idx as u32)))
            .collect();

        let mut incoming: Vec<Vec<ConnectionId>> = vec![Vec::new(); stops.len()];
        let mut incoming_walks: Vec<Vec<ConnectionId>> = vec![Vec::new(); stops.len()];

        for connection in &connections {
            if connection.is_walk() {
                incoming_walks[connection.to.get()].push(connection.id);
            } else {
                incoming[connection.to.get()].push(connection.id);
            }
        }

        for ids in &mut incoming {
            ids.sort_by(|a, b| {
                let arr_a = scheduled_arrival(&connections[a.get()]);
                let arr_b = scheduled_arrival(&connections[b.get()]);
                arr_a.cmp(&arr_b).then_with(|| b.cmp(a))
            });
        }

        Self {
            stops,
            stop_lookup,
            connections,
            incoming,
            incoming_walks,
            hub,
        }
    }

    /// Number of stops.
    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Number of connections (scheduled and walking).
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// All stops, in index order.
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Look up a stop by index.
    pub fn stop(&self, index: StopIndex) -> Option<&Stop> {
        self.stops.get(index.get())
    }

    /// Resolve an external stop id.
    pub fn stop_index(&self, id: &StopId) -> Option<StopIndex> {
        self.stop_lookup.get(id).copied()
    }

    /// All connections, in id order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Look up a connection by id.
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id.get())
    }

    /// The hub every stop is reachable from, if one was configured.
    pub fn hub(&self) -> Option<StopIndex> {
        self.hub
    }

    /// Scheduled connections arriving at `stop` no later than `not_after`,
    /// latest arrival first. Equal arrivals come in connection id order.
    pub fn incoming_connections(
        &self,
        stop: StopIndex,
        not_after: ServiceTime,
    ) -> impl Iterator<Item = &Connection> + '_ {
        let ids = self
            .incoming
            .get(stop.get())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let end =
            ids.partition_point(|id| scheduled_arrival(&self.connections[id.get()]) <= not_after);
        ids[..end]
            .iter()
            .rev()
            .map(move |id| &self.connections[id.get()])
    }

    /// Walking links ending at `stop`.
    pub fn incoming_walks(&self, stop: StopIndex) -> impl Iterator<Item = &Connection> + '_ {
        self.incoming_walks
            .get(stop.get())
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(move |id| &self.connections[id.get()])
    }

    /// Stops whose name contains `query`, ignoring case, in index order.
    pub fn search_stops(&self, query: &str, limit: usize) -> Vec<(StopIndex, &Stop)> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.stops
            .iter()
            .enumerate()
            .filter(|(_, stop)| {
                stop.name.to_lowercase().contains(&needle)
                    || stop.id.as_str().eq_ignore_ascii_case(&needle)
            })
            .map(|(idx, stop)| (StopIndex(idx as u32), stop))
            .take(limit)
            .collect()
    }
}

/// Arrival of a scheduled connection; walking links sort first.
fn scheduled_arrival(connection: &Connection) -> ServiceTime {
    connection
        .as_trip()
        .map(|trip| trip.arrival)
        .unwrap_or(ServiceTime::MIDNIGHT)
}
