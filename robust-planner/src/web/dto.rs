//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{ConnectionId, Leg, LegMode, Route, ServiceTime, StopId, StopIndex};
use crate::graph::TransitGraph;
use crate::planner::{PlanOutcome, PlanStatus, Query};

/// Request to search stops by name.
#[derive(Debug, Deserialize)]
pub struct StopSearchRequest {
    /// Search query (name substring or exact id)
    pub q: String,

    /// Maximum number of results (default 10, capped at 50)
    pub limit: Option<usize>,
}

/// A stop in search results.
#[derive(Debug, Serialize)]
pub struct StopResult {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Response for stop search.
#[derive(Debug, Serialize)]
pub struct StopSearchResponse {
    pub stops: Vec<StopResult>,
}

/// Request to plan a journey.
///
/// Stop ids and the deadline arrive as strings and are parsed by the
/// handler so that malformed values can be reported as bad requests.
#[derive(Debug, Deserialize)]
pub struct PlanJourneyRequest {
    /// Origin stop id
    pub origin: String,

    /// Destination stop id
    pub destination: String,

    /// Latest acceptable arrival, `HH:MM` or `HH:MM:SS`
    pub deadline: String,

    /// Minimum probability of arriving on time, in [0, 1]
    pub threshold: f64,

    pub max_routes: Option<usize>,
    pub max_iterations: Option<usize>,
}

/// Why a [`PlanJourneyRequest`] could not be turned into a query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("invalid origin stop id: {0}")]
    Origin(String),

    #[error("invalid destination stop id: {0}")]
    Destination(String),

    #[error("invalid deadline: {0}")]
    Deadline(String),
}

impl PlanJourneyRequest {
    /// Parse the request into a planner query.
    pub fn to_query(&self) -> Result<Query, RequestError> {
        let origin =
            StopId::parse(&self.origin).map_err(|_| RequestError::Origin(self.origin.clone()))?;
        let destination = StopId::parse(&self.destination)
            .map_err(|_| RequestError::Destination(self.destination.clone()))?;
        let deadline = ServiceTime::parse(&self.deadline)
            .map_err(|_| RequestError::Deadline(self.deadline.clone()))?;

        let mut query = Query::new(origin, destination, deadline, self.threshold);
        query.max_routes = self.max_routes;
        query.max_iterations = self.max_iterations;
        Ok(query)
    }
}

/// A stop as shown in a route.
#[derive(Debug, Serialize)]
pub struct StopInfo {
    pub id: String,
    pub name: String,
}

/// How a leg is travelled.
#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ModeResult {
    Scheduled { trip_id: String, category: String },
    Walk { distance_m: f64 },
}

/// One leg of a route.
#[derive(Debug, Serialize)]
pub struct LegResult {
    pub from_stop: StopInfo,
    pub to_stop: StopInfo,
    pub departure: ServiceTime,
    pub arrival: ServiceTime,

    #[serde(flatten)]
    pub mode: ModeResult,

    /// Probability of making this leg
    pub probability: f64,
}

/// A route option.
#[derive(Debug, Serialize)]
pub struct RouteResult {
    pub legs: Vec<LegResult>,
    pub departure_time: ServiceTime,
    pub arrival_time: ServiceTime,

    /// Door-to-door time in seconds
    pub total_travel_time_secs: i64,
    pub transfer_count: usize,
    pub walking_distance_meters: f64,

    /// Probability of arriving by the deadline
    pub confidence: f64,
}

/// Response for journey planning.
#[derive(Debug, Serialize)]
pub struct PlanJourneyResponse {
    pub status: PlanStatus,

    /// Accepted routes, best first
    pub routes: Vec<RouteResult>,

    /// Number of search passes run
    pub iterations: usize,

    /// Connections pruned during refinement, in order
    pub pruned: Vec<ConnectionId>,

    /// Best candidate when nothing met the threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_robust: Option<RouteResult>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

// Conversion implementations

impl StopInfo {
    fn from_index(graph: &TransitGraph, index: StopIndex) -> Self {
        match graph.stop(index) {
            Some(stop) => Self {
                id: stop.id.to_string(),
                name: stop.name.clone(),
            },
            None => Self {
                id: index.get().to_string(),
                name: String::new(),
            },
        }
    }
}

impl LegResult {
    /// Create from a domain Leg.
    pub fn from_leg(graph: &TransitGraph, leg: &Leg, probability: f64) -> Self {
        let mode = match &leg.mode {
            LegMode::Scheduled { trip_id, category } => ModeResult::Scheduled {
                trip_id: trip_id.to_string(),
                category: category.to_string(),
            },
            LegMode::Walk { distance_m } => ModeResult::Walk {
                distance_m: *distance_m,
            },
        };

        Self {
            from_stop: StopInfo::from_index(graph, leg.from),
            to_stop: StopInfo::from_index(graph, leg.to),
            departure: leg.departure,
            arrival: leg.arrival,
            mode,
            probability,
        }
    }
}

impl RouteResult {
    /// Create from a domain Route.
    pub fn from_route(graph: &TransitGraph, route: &Route) -> Self {
        let legs = route
            .legs()
            .iter()
            .zip(route.leg_probabilities())
            .map(|(leg, &p)| LegResult::from_leg(graph, leg, p))
            .collect();

        Self {
            legs,
            departure_time: route.departure_time(),
            arrival_time: route.arrival_time(),
            total_travel_time_secs: route.total_travel_time().num_seconds(),
            transfer_count: route.transfer_count(),
            walking_distance_meters: route.walking_distance_m(),
            confidence: route.confidence(),
        }
    }
}

impl PlanJourneyResponse {
    /// Create from a plan outcome.
    pub fn from_outcome(graph: &TransitGraph, outcome: &PlanOutcome) -> Self {
        Self {
            status: outcome.status,
            routes: outcome
                .routes
                .iter()
                .map(|r| RouteResult::from_route(graph, r))
                .collect(),
            iterations: outcome.iterations,
            pruned: outcome.pruned.clone(),
            most_robust: outcome
                .most_robust
                .as_ref()
                .map(|r| RouteResult::from_route(graph, r)),
        }
    }
}
