//! Bulk loading of stops and scheduled connections into a `TransitGraph`.
//!
//! The builder applies the graph-level constraints the planner relies on:
//! departures inside the operating window, stops inside the service area,
//! walking links between nearby stops, and reachability from the hub.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info};

use crate::domain::{
    Connection, ConnectionId, ConnectionKind, OperatingWindow, Stop, StopId, StopIndex, Trip, Walk,
};

use super::{GraphError, TransitGraph};

/// Parameters for graph construction.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Only connections departing inside this window are kept.
    pub window: OperatingWindow,

    /// Walking speed used to time walking links.
    pub walking_speed_m_per_min: f64,

    /// Stops at most this far apart get a walking link.
    pub max_walk_distance_m: f64,

    /// Stops further than this from the hub are dropped.
    pub service_radius_m: f64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            window: OperatingWindow::default(),
            walking_speed_m_per_min: 50.0,
            max_walk_distance_m: 500.0,
            service_radius_m: 15_000.0,
        }
    }
}

/// A scheduled connection as supplied by the caller, before indexing.
#[derive(Debug, Clone)]
struct PendingConnection {
    from: StopId,
    to: StopId,
    trip: Trip,
}

/// Builder for `TransitGraph`.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    config: BuildConfig,
    stops: Vec<Stop>,
    connections: Vec<PendingConnection>,
    hub: Option<StopId>,
}

impl GraphBuilder {
    /// Create an empty builder.
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Add a stop.
    pub fn add_stop(&mut self, stop: Stop) -> &mut Self {
        self.stops.push(stop);
        self
    }

    /// Add a scheduled connection between two stops.
    pub fn add_connection(&mut self, from: StopId, to: StopId, trip: Trip) -> &mut Self {
        self.connections.push(PendingConnection { from, to, trip });
        self
    }

    /// Restrict the graph to the service area around `hub` and to stops
    /// reachable from it.
    pub fn with_hub(&mut self, hub: StopId) -> &mut Self {
        self.hub = Some(hub);
        self
    }

    /// Validate, filter and index everything added so far.
    ///
    /// Stops and scheduled connections keep the order they were added in;
    /// walking links are numbered after all scheduled connections.
    pub fn build(self) -> Result<TransitGraph, GraphError> {
        let mut positions: HashMap<&StopId, usize> = HashMap::with_capacity(self.stops.len());
        for (pos, stop) in self.stops.iter().enumerate() {
            if positions.insert(&stop.id, pos).is_some() {
                return Err(GraphError::DuplicateStop(stop.id.clone()));
            }
        }

        let hub_pos = match &self.hub {
            Some(hub) => Some(
                *positions
                    .get(hub)
                    .ok_or_else(|| GraphError::UnknownHub(hub.clone()))?,
            ),
            None => None,
        };

        // Service area
        let mut keep: Vec<bool> = match hub_pos {
            Some(hub) => {
                let centre = &self.stops[hub];
                self.stops
                    .iter()
                    .map(|stop| stop.distance_m(centre) <= self.config.service_radius_m)
                    .collect()
            }
            None => vec![true; self.stops.len()],
        };

        // Scheduled connections, as (from, to, trip) in stop positions
        let mut scheduled: Vec<(usize, usize, Trip)> = Vec::with_capacity(self.connections.len());
        for pending in self.connections {
            let from = *positions
                .get(&pending.from)
                .ok_or_else(|| GraphError::UnknownStop(pending.from.clone()))?;
            let to = *positions
                .get(&pending.to)
                .ok_or_else(|| GraphError::UnknownStop(pending.to.clone()))?;

            if from == to {
                debug!(stop = %pending.from, trip = %pending.trip.trip_id, "dropping self-loop");
                continue;
            }
            if !self.config.window.contains(pending.trip.departure) {
                debug!(
                    trip = %pending.trip.trip_id,
                    departure = %pending.trip.departure,
                    "dropping connection outside operating window"
                );
                continue;
            }
            if !keep[from] || !keep[to] {
                continue;
            }
            scheduled.push((from, to, pending.trip));
        }

        let walks = walk_links(&self.stops, &keep, &self.config);

        // Reachability from the hub, following connections in travel direction
        if let Some(hub) = hub_pos {
            let reachable = reachable_from(hub, self.stops.len(), &scheduled, &walks);
            for (pos, flag) in keep.iter_mut().enumerate() {
                if *flag && !reachable[pos] {
                    debug!(stop = %self.stops[pos].id, "dropping stop unreachable from hub");
                    *flag = false;
                }
            }
        }

        // Dense re-indexing
        let mut new_index: Vec<Option<StopIndex>> = vec![None; self.stops.len()];
        let mut stops = Vec::with_capacity(self.stops.len());
        for (pos, stop) in self.stops.into_iter().enumerate() {
            if keep[pos] {
                new_index[pos] = Some(StopIndex(stops.len() as u32));
                stops.push(stop);
            }
        }

        let mut connections = Vec::with_capacity(scheduled.len() + walks.len());
        let kept_edges = scheduled
            .into_iter()
            .map(|(from, to, trip)| (from, to, ConnectionKind::Scheduled(trip)))
            .chain(
                walks
                    .into_iter()
                    .map(|(from, to, walk)| (from, to, ConnectionKind::Walk(walk))),
            );
        for (from, to, kind) in kept_edges {
            if let (Some(from), Some(to)) = (new_index[from], new_index[to]) {
                connections.push(Connection {
                    id: ConnectionId(connections.len() as u32),
                    from,
                    to,
                    kind,
                });
            }
        }

        let hub = hub_pos.and_then(|pos| new_index[pos]);

        info!(
            stops = stops.len(),
            connections = connections.len(),
            walks = connections.iter().filter(|c| c.is_walk()).count(),
            "transit graph built"
        );

        Ok(TransitGraph::from_parts(stops, connections, hub))
    }
}

/// Walking links between every ordered pair of kept stops within walking
/// distance, ordered by (from, to) position.
fn walk_links(stops: &[Stop], keep: &[bool], config: &BuildConfig) -> Vec<(usize, usize, Walk)> {
    let mut walks = Vec::new();
    for (i, a) in stops.iter().enumerate() {
        if !keep[i] {
            continue;
        }
        for (j, b) in stops.iter().enumerate() {
            if i == j || !keep[j] {
                continue;
            }
            let distance = a.distance_m(b);
            if distance <= config.max_walk_distance_m {
                walks.push((
                    i,
                    j,
                    Walk::from_distance(distance, config.walking_speed_m_per_min),
                ));
            }
        }
    }
    walks
}

/// Stops reachable from `start` along scheduled connections and walks.
fn reachable_from(
    start: usize,
    stop_count: usize,
    scheduled: &[(usize, usize, Trip)],
    walks: &[(usize, usize, Walk)],
) -> Vec<bool> {
    let mut adjacency: Vec<HashSet<usize>> = vec![HashSet::new(); stop_count];
    for (from, to, _) in scheduled {
        adjacency[*from].insert(*to);
    }
    for (from, to, _) in walks {
        adjacency[*from].insert(*to);
    }

    let mut seen = vec![false; stop_count];
    let mut queue = VecDeque::from([start]);
    seen[start] = true;
    while let Some(stop) = queue.pop_front() {
        for &next in &adjacency[stop] {
            if !seen[next] {
                seen[next] = true;
                queue.push_back(next);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DelayKey, ServiceTime, TransportCategory, TripId};

    fn t(s: &str) -> ServiceTime {
        ServiceTime::parse(s).unwrap()
    }

    fn id(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn trip(name: &str, dep: &str, arr: &str) -> Trip {
        Trip::new(
            TripId::new(name),
            TransportCategory::Tram,
            t(dep),
            t(arr),
            DelayKey::new("tram"),
        )
        .unwrap()
    }

    // Degrees of latitude per kilometre, near enough.
    const KM_LAT: f64 = 0.009;

    #[test]
    fn drops_connections_outside_window() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.0, 8.0))
            .add_stop(Stop::new(id("B"), "B", 47.0 + 2.0 * KM_LAT, 8.0))
            .add_connection(id("A"), id("B"), trip("early", "05:50", "06:10"))
            .add_connection(id("A"), id("B"), trip("first", "06:00", "06:10"))
            .add_connection(id("A"), id("B"), trip("last", "21:59", "22:10"))
            .add_connection(id("A"), id("B"), trip("late", "22:00", "22:10"));

        let graph = builder.build().unwrap();
        let trips: Vec<_> = graph
            .connections()
            .iter()
            .filter_map(|c| c.trip_id().map(|t| t.as_str().to_string()))
            .collect();
        assert_eq!(trips, vec!["first", "last"]);
    }

    #[test]
    fn generates_walks_between_nearby_stops() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.0, 8.0))
            // About 400 m north of A
            .add_stop(Stop::new(id("B"), "B", 47.0 + 0.0036, 8.0))
            // About 2 km north of A
            .add_stop(Stop::new(id("C"), "C", 47.0 + 0.018, 8.0));

        let graph = builder.build().unwrap();
        assert_eq!(graph.connection_count(), 2);

        let a = graph.stop_index(&id("A")).unwrap();
        let b = graph.stop_index(&id("B")).unwrap();

        let into_b: Vec<_> = graph.incoming_walks(b).collect();
        assert_eq!(into_b.len(), 1);
        assert_eq!(into_b[0].from, a);

        let walk = into_b[0].as_walk().unwrap();
        assert!((390.0..410.0).contains(&walk.distance_m));
        // 400 m at 50 m/min is about eight minutes
        assert!((7..=9).contains(&walk.duration.num_minutes()));
    }

    #[test]
    fn walks_are_numbered_after_scheduled_connections() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.0, 8.0))
            .add_stop(Stop::new(id("B"), "B", 47.0 + 0.002, 8.0))
            .add_connection(id("A"), id("B"), trip("T1", "08:00", "08:03"));

        let graph = builder.build().unwrap();
        assert!(!graph.connection(ConnectionId(0)).unwrap().is_walk());
        assert!(graph.connection(ConnectionId(1)).unwrap().is_walk());
        assert!(graph.connection(ConnectionId(2)).unwrap().is_walk());
    }

    #[test]
    fn service_radius_and_reachability_from_hub() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("HUB"), "Hub", 47.0, 8.0))
            .add_stop(Stop::new(id("NEAR"), "Near", 47.0 + 5.0 * KM_LAT, 8.0))
            .add_stop(Stop::new(id("ISLAND"), "Island", 47.0 + 8.0 * KM_LAT, 8.0))
            .add_stop(Stop::new(id("FAR"), "Far", 47.0 + 20.0 * KM_LAT, 8.0))
            .add_connection(id("HUB"), id("NEAR"), trip("T1", "08:00", "08:10"))
            .add_connection(id("NEAR"), id("FAR"), trip("T2", "08:15", "08:40"))
            .add_connection(id("ISLAND"), id("NEAR"), trip("T3", "08:00", "08:05"))
            .with_hub(id("HUB"));

        let graph = builder.build().unwrap();

        let ids: Vec<_> = graph.stops().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["HUB", "NEAR"]);
        assert_eq!(graph.connection_count(), 1);
        assert_eq!(graph.hub(), graph.stop_index(&id("HUB")));
    }

    #[test]
    fn duplicate_stop_rejected() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.0, 8.0))
            .add_stop(Stop::new(id("A"), "A again", 47.1, 8.0));

        assert!(matches!(builder.build(), Err(GraphError::DuplicateStop(_))));
    }

    #[test]
    fn unknown_endpoint_rejected() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.0, 8.0))
            .add_connection(id("A"), id("Z"), trip("T1", "08:00", "08:10"));

        assert!(matches!(builder.build(), Err(GraphError::UnknownStop(s)) if s == id("Z")));
    }

    #[test]
    fn unknown_hub_rejected() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.0, 8.0))
            .with_hub(id("Z"));

        assert!(matches!(builder.build(), Err(GraphError::UnknownHub(_))));
    }
}
