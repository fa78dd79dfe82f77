//! Route confidence.
//!
//! Each leg is scored by the probability of making whatever comes after it:
//! the next leg, or the deadline for the last one. The route's confidence is
//! the product over its legs.

use chrono::Duration;

use crate::domain::{Connection, DomainError, Leg, Route, ServiceTime};
use crate::graph::TransitGraph;
use crate::oracle::DelayOracle;

use super::config::SearchConfig;

/// Oracle probability clamped to [0, 1]. Missing data and NaN count as 0.
pub fn probability(oracle: &dyn DelayOracle, connection: &Connection, slack: Duration) -> f64 {
    match oracle.success_probability(connection, slack) {
        Some(p) if !p.is_nan() => p.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Time to spare after `leg` arrives.
///
/// Measured against the departure of `next` net of the transfer buffer, or
/// against the deadline when there is no next leg.
pub fn slack_after(
    config: &SearchConfig,
    leg: &Leg,
    next: Option<&Leg>,
    deadline: ServiceTime,
) -> Duration {
    match next {
        Some(next) => next.departure - leg.arrival - config.required_gap(leg, next),
        None => deadline - leg.arrival,
    }
}

/// Probability of making `leg` given what follows it.
pub fn leg_probability(
    graph: &TransitGraph,
    oracle: &dyn DelayOracle,
    config: &SearchConfig,
    leg: &Leg,
    next: Option<&Leg>,
    deadline: ServiceTime,
) -> f64 {
    if leg.is_walk() || next.is_some_and(|next| leg.continues_on(next)) {
        return 1.0;
    }
    let Some(connection) = graph.connection(leg.connection) else {
        return 0.0;
    };
    probability(oracle, connection, slack_after(config, leg, next, deadline))
}

/// Score legs in travel order and assemble the route.
pub fn score_route(
    graph: &TransitGraph,
    oracle: &dyn DelayOracle,
    config: &SearchConfig,
    legs: Vec<Leg>,
    deadline: ServiceTime,
) -> Result<Route, DomainError> {
    let probabilities = legs
        .iter()
        .enumerate()
        .map(|(idx, leg)| leg_probability(graph, oracle, config, leg, legs.get(idx + 1), deadline))
        .collect();
    Route::new(legs, probabilities)
}
