//! Deadline-constrained search.
//!
//! Works backwards from the destination over timed events: arriving at the
//! destination, boarding a scheduled connection, or setting off on a walk.
//! Events are processed latest first. Each scheduled connection is labelled
//! with the first event it can feed, which is the latest one, so the first
//! event reached at the origin is the latest feasible departure.
//!
//! Labels live on connections rather than stops. A stop can be left on
//! several onward legs with different needs (a walk, a change with a buffer,
//! staying aboard), and a connection that cannot make the latest of them may
//! still make an earlier one.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::Duration;
use tracing::{debug, trace};

use crate::domain::{Connection, ConnectionId, Leg, ServiceTime, StopIndex};
use crate::graph::TransitGraph;
use crate::oracle::DelayOracle;

use super::config::SearchConfig;
use super::pruned::PrunedView;
use super::scoring::probability;

/// One search pass: where to, by when, and what not to use.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub origin: StopIndex,
    pub destination: StopIndex,
    pub deadline: ServiceTime,
    pub pruned: &'a PrunedView,

    /// Skip connections whose own success probability is below this.
    pub min_probability: Option<f64>,
}

/// What a walk leads into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Onward {
    Arrive,
    Ride(ConnectionId),
}

/// What the traveller does at an event's stop and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Event {
    /// Be at the destination by the deadline.
    Arrive,
    /// Board this scheduled connection.
    Ride(ConnectionId),
    /// Set off on this walk, then carry on.
    Walk(ConnectionId, Onward),
}

impl Event {
    /// What a walk ending here would lead into. `None` after a walk.
    fn onward(self) -> Option<Onward> {
        match self {
            Event::Arrive => Some(Onward::Arrive),
            Event::Ride(id) => Some(Onward::Ride(id)),
            Event::Walk(..) => None,
        }
    }
}

impl From<Onward> for Event {
    fn from(onward: Onward) -> Self {
        match onward {
            Onward::Arrive => Event::Arrive,
            Onward::Ride(id) => Event::Ride(id),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq)]
struct State {
    time: ServiceTime,
    stop: StopIndex,
    event: Event,
}

// Latest time first; ties go to rides before walks, then lower ids.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| other.event.cmp(&self.event))
            .then_with(|| other.stop.cmp(&self.stop))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-connection labels for one pass: the event each scheduled connection
/// feeds into.
struct Labels {
    next: Vec<Option<Event>>,
}

impl Labels {
    fn new(connection_count: usize) -> Self {
        Self {
            next: vec![None; connection_count],
        }
    }

    fn is_set(&self, id: ConnectionId) -> bool {
        self.next.get(id.get()).is_none_or(Option::is_some)
    }

    fn set(&mut self, id: ConnectionId, event: Event) {
        if let Some(slot) = self.next.get_mut(id.get()) {
            *slot = Some(event);
        }
    }

    fn get(&self, id: ConnectionId) -> Option<Event> {
        self.next.get(id.get()).copied().flatten()
    }
}

/// Find the route leaving `origin` as late as possible that reaches
/// `destination` by the deadline, using only connections not pruned.
///
/// Returns the legs in travel order, or `None` if no such route exists
/// inside the operating window.
pub fn find_route(
    graph: &TransitGraph,
    oracle: &dyn DelayOracle,
    config: &SearchConfig,
    request: &SearchRequest<'_>,
) -> Option<Vec<Leg>> {
    let stop_count = graph.stop_count();
    if request.origin.get() >= stop_count || request.destination.get() >= stop_count {
        return None;
    }

    let mut labels = Labels::new(graph.connection_count());
    let mut heap = BinaryHeap::new();
    heap.push(State {
        time: request.deadline,
        stop: request.destination,
        event: Event::Arrive,
    });

    let mut popped = 0usize;
    while let Some(State { time, stop, event }) = heap.pop() {
        if time < config.window.start {
            debug!(%time, "frontier left the operating window");
            break;
        }
        popped += 1;

        if stop == request.origin {
            trace!(popped, departure = %time, "origin reached");
            return reconstruct(graph, &labels, event, request.deadline);
        }
        // Routes end at the destination, they never pass through it
        if stop == request.destination && event != Event::Arrive {
            continue;
        }

        relax_scheduled(
            graph,
            oracle,
            config,
            request,
            stop,
            time,
            event,
            &mut labels,
            &mut heap,
        );

        // No two walks in a row
        if let Some(onward) = event.onward() {
            relax_walks(graph, config, request, stop, time, onward, &mut heap);
        }
    }

    trace!(popped, "no route");
    None
}

/// Label scheduled connections arriving in time for `event` at `stop`.
#[allow(clippy::too_many_arguments)]
fn relax_scheduled(
    graph: &TransitGraph,
    oracle: &dyn DelayOracle,
    config: &SearchConfig,
    request: &SearchRequest<'_>,
    stop: StopIndex,
    time: ServiceTime,
    event: Event,
    labels: &mut Labels,
    heap: &mut BinaryHeap<State>,
) {
    let max_wait = config.max_wait();
    let onward_trip = match event {
        Event::Ride(id) => graph.connection(id).and_then(Connection::trip_id),
        _ => None,
    };

    for connection in graph.incoming_connections(stop, time) {
        let Some(leg) = Leg::scheduled(connection) else {
            continue;
        };
        let wait = time - leg.arrival;
        if wait > max_wait {
            // Arrivals only get earlier from here on
            break;
        }
        if labels.is_set(connection.id)
            || request.pruned.is_pruned(connection.id)
            || leg.departure < config.window.start
        {
            continue;
        }

        let staying = onward_trip.is_some() && leg.trip_id() == onward_trip;
        let gap = if staying || event == Event::Arrive {
            Duration::zero()
        } else {
            config.transfer_buffer_after(&leg)
        };
        if wait < gap {
            continue;
        }

        if let Some(threshold) = request.min_probability {
            if !staying && probability(oracle, connection, wait - gap) < threshold {
                trace!(connection = %connection.id, "below threshold");
                continue;
            }
        }

        labels.set(connection.id, event);
        heap.push(State {
            time: leg.departure,
            stop: leg.from,
            event: Event::Ride(connection.id),
        });
    }
}

/// Queue walks into `stop` that arrive exactly at `time`, when the traveller
/// carries on with `onward`.
fn relax_walks(
    graph: &TransitGraph,
    config: &SearchConfig,
    request: &SearchRequest<'_>,
    stop: StopIndex,
    time: ServiceTime,
    onward: Onward,
    heap: &mut BinaryHeap<State>,
) {
    for connection in graph.incoming_walks(stop) {
        if request.pruned.is_pruned(connection.id) {
            continue;
        }
        let Some(leg) = Leg::walk_arriving_at(connection, time) else {
            continue;
        };
        if leg.departure < config.window.start {
            continue;
        }
        heap.push(State {
            time: leg.departure,
            stop: leg.from,
            event: Event::Walk(connection.id, onward),
        });
    }
}

/// Follow event labels from the origin's event to the destination.
fn reconstruct(
    graph: &TransitGraph,
    labels: &Labels,
    first: Event,
    deadline: ServiceTime,
) -> Option<Vec<Leg>> {
    let mut legs = Vec::new();
    let mut event = first;
    loop {
        let leg = match event {
            Event::Arrive => return Some(legs),
            Event::Ride(id) => {
                event = labels.get(id)?;
                Leg::scheduled(graph.connection(id)?)?
            }
            Event::Walk(id, onward) => {
                let arrival = match onward {
                    Onward::Arrive => deadline,
                    Onward::Ride(next) => graph.connection(next)?.as_trip()?.departure,
                };
                event = onward.into();
                Leg::walk_arriving_at(graph.connection(id)?, arrival)?
            }
        };
        legs.push(leg);
        if legs.len() > 2 * labels.next.len() + 1 {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ConnectionId, DelayKey, Stop, StopId, TransportCategory, Trip, TripId,
    };
    use crate::graph::{BuildConfig, GraphBuilder};

    fn t(s: &str) -> ServiceTime {
        ServiceTime::parse(s).unwrap()
    }

    fn id(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn trip(name: &str, dep: &str, arr: &str) -> Trip {
        Trip::new(
            TripId::new(name),
            TransportCategory::Bus,
            t(dep),
            t(arr),
            DelayKey::new(name),
        )
        .unwrap()
    }

    fn certain(_: &Connection, _: Duration) -> Option<f64> {
        Some(1.0)
    }

    fn request<'a>(
        graph: &TransitGraph,
        from: &str,
        to: &str,
        deadline: &str,
        pruned: &'a PrunedView,
    ) -> SearchRequest<'a> {
        SearchRequest {
            origin: graph.stop_index(&id(from)).unwrap(),
            destination: graph.stop_index(&id(to)).unwrap(),
            deadline: t(deadline),
            pruned,
            min_probability: None,
        }
    }

    fn trips(legs: &[Leg]) -> Vec<String> {
        legs.iter()
            .map(|leg| match leg.trip_id() {
                Some(trip) => trip.as_str().to_string(),
                None => "walk".to_string(),
            })
            .collect()
    }

    /// A, B, C about 2 km apart; A->C direct or via B.
    fn triangle() -> TransitGraph {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.00, 8.00))
            .add_stop(Stop::new(id("B"), "B", 47.02, 8.00))
            .add_stop(Stop::new(id("C"), "C", 47.04, 8.00))
            .add_connection(id("A"), id("C"), trip("AC", "08:00", "08:20"))
            .add_connection(id("A"), id("B"), trip("AB", "08:05", "08:25"))
            .add_connection(id("B"), id("C"), trip("BC", "08:30", "08:50"));
        builder.build().unwrap()
    }

    #[test]
    fn prefers_latest_departure() {
        let graph = triangle();
        let pruned = PrunedView::new();
        let legs = find_route(
            &graph,
            &certain,
            &SearchConfig::default(),
            &request(&graph, "A", "C", "09:00", &pruned),
        )
        .unwrap();

        assert_eq!(trips(&legs), vec!["AB", "BC"]);
        assert_eq!(legs[0].departure, t("08:05"));
        assert_eq!(legs[1].arrival, t("08:50"));
    }

    #[test]
    fn pruned_connections_are_avoided() {
        let graph = triangle();
        let mut pruned = PrunedView::new();
        pruned.prune(ConnectionId(1));

        let legs = find_route(
            &graph,
            &certain,
            &SearchConfig::default(),
            &request(&graph, "A", "C", "09:00", &pruned),
        )
        .unwrap();
        assert_eq!(trips(&legs), vec!["AC"]);

        pruned.prune(ConnectionId(0));
        assert!(
            find_route(
                &graph,
                &certain,
                &SearchConfig::default(),
                &request(&graph, "A", "C", "09:00", &pruned),
            )
            .is_none()
        );
    }

    #[test]
    fn deadline_is_respected() {
        let graph = triangle();
        let pruned = PrunedView::new();
        let legs = find_route(
            &graph,
            &certain,
            &SearchConfig::default(),
            &request(&graph, "A", "C", "08:45", &pruned),
        )
        .unwrap();
        assert_eq!(trips(&legs), vec!["AC"]);

        assert!(
            find_route(
                &graph,
                &certain,
                &SearchConfig::default(),
                &request(&graph, "A", "C", "08:15", &pruned),
            )
            .is_none()
        );
    }

    #[test]
    fn max_wait_applies_before_deadline() {
        let graph = triangle();
        let pruned = PrunedView::new();
        // 09:40 is 50 minutes after the last arrival at C
        assert!(
            find_route(
                &graph,
                &certain,
                &SearchConfig::default(),
                &request(&graph, "A", "C", "09:40", &pruned),
            )
            .is_none()
        );
    }

    #[test]
    fn transfer_needs_buffer() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.00, 8.00))
            .add_stop(Stop::new(id("B"), "B", 47.02, 8.00))
            .add_stop(Stop::new(id("C"), "C", 47.04, 8.00))
            .add_connection(id("A"), id("B"), trip("X", "08:00", "08:29"))
            .add_connection(id("A"), id("B"), trip("Y", "07:50", "08:10"))
            .add_connection(id("B"), id("C"), trip("Z", "08:30", "08:50"));
        let graph = builder.build().unwrap();
        let pruned = PrunedView::new();

        // X leaves only one minute to change
        let legs = find_route(
            &graph,
            &certain,
            &SearchConfig::default(),
            &request(&graph, "A", "C", "09:00", &pruned),
        )
        .unwrap();
        assert_eq!(trips(&legs), vec!["Y", "Z"]);

        let relaxed = SearchConfig::default().with_category_buffer(TransportCategory::Bus, 60);
        let legs = find_route(
            &graph,
            &certain,
            &relaxed,
            &request(&graph, "A", "C", "09:00", &pruned),
        )
        .unwrap();
        assert_eq!(trips(&legs), vec!["X", "Z"]);
    }

    #[test]
    fn staying_aboard_needs_no_buffer() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.00, 8.00))
            .add_stop(Stop::new(id("B"), "B", 47.02, 8.00))
            .add_stop(Stop::new(id("C"), "C", 47.04, 8.00))
            .add_connection(id("A"), id("B"), trip("S1", "08:00", "08:10"))
            .add_connection(id("B"), id("C"), trip("S1", "08:10", "08:20"));
        let graph = builder.build().unwrap();
        let pruned = PrunedView::new();

        let legs = find_route(
            &graph,
            &certain,
            &SearchConfig::default(),
            &request(&graph, "A", "C", "08:30", &pruned),
        )
        .unwrap();
        assert_eq!(trips(&legs), vec!["S1", "S1"]);
    }

    #[test]
    fn walk_is_timed_to_the_next_leg() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.00, 8.00))
            // About 300 m from A
            .add_stop(Stop::new(id("W"), "W", 47.0027, 8.00))
            .add_stop(Stop::new(id("C"), "C", 47.04, 8.00))
            .add_connection(id("W"), id("C"), trip("WC", "08:30", "08:50"));
        let graph = builder.build().unwrap();
        let pruned = PrunedView::new();

        let legs = find_route(
            &graph,
            &certain,
            &SearchConfig::default(),
            &request(&graph, "A", "C", "09:00", &pruned),
        )
        .unwrap();

        assert_eq!(trips(&legs), vec!["walk", "WC"]);
        assert_eq!(legs[0].arrival, t("08:30"));
        assert_eq!(legs[1].departure, t("08:30"));
        assert!(legs[0].departure < legs[0].arrival);
    }

    #[test]
    fn walks_to_a_ride_when_walking_on_leaves_later() {
        // A, B, C in a line about 445 m apart: A-B and B-C are walkable,
        // A-C is not
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.000, 8.00))
            .add_stop(Stop::new(id("B"), "B", 47.004, 8.00))
            .add_stop(Stop::new(id("C"), "C", 47.008, 8.00))
            .add_connection(id("B"), id("C"), trip("BC", "08:30", "08:40"));
        let graph = builder.build().unwrap();
        let pruned = PrunedView::new();

        // Walking B->C to arrive at 08:45 leaves B after the bus does, but
        // that walk cannot follow another walk from A
        let legs = find_route(
            &graph,
            &certain,
            &SearchConfig::default(),
            &request(&graph, "A", "C", "08:45", &pruned),
        )
        .unwrap();

        assert_eq!(trips(&legs), vec!["walk", "BC"]);
        assert_eq!(legs[0].arrival, t("08:30"));
        assert_eq!(legs[1].arrival, t("08:40"));
    }

    #[test]
    fn stays_aboard_when_the_later_change_is_too_tight() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.00, 8.00))
            .add_stop(Stop::new(id("B"), "B", 47.02, 8.00))
            .add_stop(Stop::new(id("C"), "C", 47.04, 8.00))
            .add_connection(id("A"), id("B"), trip("S1", "08:00", "08:20"))
            .add_connection(id("B"), id("C"), trip("S1", "08:20", "08:40"))
            .add_connection(id("B"), id("C"), trip("T", "08:21", "08:35"));
        let graph = builder.build().unwrap();
        let pruned = PrunedView::new();

        // T leaves B later but only a minute after S1 gets in
        let legs = find_route(
            &graph,
            &certain,
            &SearchConfig::default(),
            &request(&graph, "A", "C", "09:00", &pruned),
        )
        .unwrap();

        assert_eq!(trips(&legs), vec!["S1", "S1"]);
        assert_eq!(legs[1].departure, t("08:20"));
    }

    #[test]
    fn change_via_walk_pays_one_buffer() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.00, 8.00))
            .add_stop(Stop::new(id("B"), "B", 47.02, 8.00))
            // About 300 m from B
            .add_stop(Stop::new(id("W"), "W", 47.0227, 8.00))
            .add_stop(Stop::new(id("C"), "C", 47.06, 8.00))
            .add_connection(id("A"), id("B"), trip("X", "08:00", "08:20"))
            .add_connection(id("W"), id("C"), trip("Y", "08:29", "08:50"));
        let graph = builder.build().unwrap();
        let pruned = PrunedView::new();

        // 90 s buffer plus a six minute walk fits before 08:29; a second
        // buffer after the walk would not
        let legs = find_route(
            &graph,
            &certain,
            &SearchConfig::default(),
            &request(&graph, "A", "C", "09:00", &pruned),
        )
        .unwrap();

        assert_eq!(trips(&legs), vec!["X", "walk", "Y"]);
        assert_eq!(legs[1].arrival, t("08:29"));
        assert!(legs[1].departure >= t("08:21:30"));
    }

    #[test]
    fn never_passes_through_the_destination() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.00, 8.00))
            .add_stop(Stop::new(id("B"), "B", 47.02, 8.00))
            .add_stop(Stop::new(id("C"), "C", 47.04, 8.00))
            .add_connection(id("A"), id("C"), trip("AC", "08:00", "08:10"))
            .add_connection(id("C"), id("B"), trip("CB", "08:15", "08:25"))
            .add_connection(id("B"), id("C"), trip("BC", "08:30", "08:40"));
        let graph = builder.build().unwrap();
        let pruned = PrunedView::new();

        // AC arrives 50 minutes early, more than the maximum wait
        assert!(
            find_route(
                &graph,
                &certain,
                &SearchConfig::default(),
                &request(&graph, "A", "C", "09:00", &pruned),
            )
            .is_none()
        );
    }

    #[test]
    fn never_walks_twice_in_a_row() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.00, 8.00))
            .add_stop(Stop::new(id("M"), "M", 47.0036, 8.00))
            .add_stop(Stop::new(id("B"), "B", 47.0072, 8.00));
        let graph = builder.build().unwrap();
        let pruned = PrunedView::new();

        // A and B are too far apart to walk directly, only via M
        assert!(
            find_route(
                &graph,
                &certain,
                &SearchConfig::default(),
                &request(&graph, "A", "B", "09:00", &pruned),
            )
            .is_none()
        );
    }

    #[test]
    fn window_floor_is_enforced() {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.00, 8.00))
            .add_stop(Stop::new(id("B"), "B", 47.02, 8.00))
            .add_connection(id("A"), id("B"), trip("AB", "06:00", "06:20"));
        let graph = builder.build().unwrap();
        let pruned = PrunedView::new();

        assert!(
            find_route(
                &graph,
                &certain,
                &SearchConfig::default(),
                &request(&graph, "A", "B", "06:30", &pruned),
            )
            .is_some()
        );

        let late_start = SearchConfig {
            window: crate::domain::OperatingWindow::new(t("06:10"), t("22:00")),
            ..SearchConfig::default()
        };
        assert!(
            find_route(
                &graph,
                &certain,
                &late_start,
                &request(&graph, "A", "B", "06:30", &pruned),
            )
            .is_none()
        );
    }

    #[test]
    fn threshold_skips_weak_connections() {
        let graph = triangle();
        let pruned = PrunedView::new();
        let weak_ab = |connection: &Connection, _: Duration| {
            Some(if connection.id == ConnectionId(1) { 0.5 } else { 0.99 })
        };

        let mut req = request(&graph, "A", "C", "09:00", &pruned);
        req.min_probability = Some(0.8);

        let legs = find_route(&graph, &weak_ab, &SearchConfig::default(), &req).unwrap();
        assert_eq!(trips(&legs), vec!["AC"]);
    }
}
