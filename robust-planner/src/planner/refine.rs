//! Robust refinement loop.
//!
//! Each pass searches for the latest-departing route over the current
//! pruned view, scores it, keeps it if it is reliable enough, then prunes
//! its weakest connection so the next pass has to find something else.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{ConnectionId, Route};
use crate::graph::TransitGraph;
use crate::oracle::DelayOracle;

use super::config::SearchConfig;
use super::pruned::PrunedView;
use super::query::{PlanError, Query, ResolvedQuery};
use super::rank::{deduplicate, rank_routes};
use super::scoring::score_route;
use super::search::{SearchRequest, find_route};

/// Set from another thread to stop a plan between search passes.
pub type CancellationFlag = AtomicBool;

/// How a plan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// As many routes as requested were accepted.
    Satisfied,
    /// The budget or the graph ran out first.
    PartiallySatisfied,
    /// No route reaches the destination by the deadline at all.
    NoRouteExists,
    /// The caller cancelled the plan.
    Cancelled,
}

/// Result of a plan.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub status: PlanStatus,

    /// Accepted routes, best first.
    pub routes: Vec<Route>,

    /// Search passes run.
    pub iterations: usize,

    /// Connections pruned, in order.
    pub pruned: Vec<ConnectionId>,

    /// Highest-confidence candidate, when none met the threshold.
    pub most_robust: Option<Route>,
}

/// Robust route planner over a shared graph and delay oracle.
pub struct Planner<'a> {
    graph: &'a TransitGraph,
    oracle: &'a dyn DelayOracle,
    config: &'a SearchConfig,
}

impl<'a> Planner<'a> {
    /// Create a new planner.
    pub fn new(
        graph: &'a TransitGraph,
        oracle: &'a dyn DelayOracle,
        config: &'a SearchConfig,
    ) -> Self {
        Self {
            graph,
            oracle,
            config,
        }
    }

    /// Plan routes for `query`.
    ///
    /// Invalid queries are rejected before any search runs. Otherwise the
    /// outcome status says whether enough routes were found.
    pub fn plan(
        &self,
        query: &Query,
        cancel: Option<&CancellationFlag>,
    ) -> Result<PlanOutcome, PlanError> {
        let query = ResolvedQuery::resolve(query, self.graph, self.config)?;

        let mut pruned = PrunedView::new();
        let mut accepted: Vec<Route> = Vec::new();
        let mut most_robust: Option<Route> = None;
        let mut candidates = 0usize;
        let mut iterations = 0usize;

        let status = loop {
            if accepted.len() >= query.max_routes {
                break PlanStatus::Satisfied;
            }
            if iterations >= query.max_iterations {
                break PlanStatus::PartiallySatisfied;
            }
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                debug!(iterations, "plan cancelled");
                break PlanStatus::Cancelled;
            }

            iterations += 1;
            let request = SearchRequest {
                origin: query.origin,
                destination: query.destination,
                deadline: query.deadline,
                pruned: &pruned,
                min_probability: self.config.threshold_pruning.then_some(query.threshold),
            };

            let Some(legs) = find_route(self.graph, self.oracle, self.config, &request) else {
                if candidates > 0 {
                    break PlanStatus::PartiallySatisfied;
                }
                // The threshold bound can hide routes that exist but are all
                // too shaky to accept
                let unbounded = SearchRequest {
                    min_probability: None,
                    ..request
                };
                let fallback = match request.min_probability {
                    Some(_) => find_route(self.graph, self.oracle, self.config, &unbounded),
                    None => None,
                };
                let Some(legs) = fallback else {
                    break PlanStatus::NoRouteExists;
                };
                let route =
                    score_route(self.graph, self.oracle, self.config, legs, query.deadline)?;
                debug!(
                    confidence = route.confidence(),
                    "only routes below threshold exist"
                );
                most_robust = Some(route);
                break PlanStatus::PartiallySatisfied;
            };
            let route = score_route(self.graph, self.oracle, self.config, legs, query.deadline)?;
            candidates += 1;

            let confidence = route.confidence();
            let (weakest, weakest_p) = route.weakest_leg();
            let weakest = weakest.connection;

            if confidence >= query.threshold {
                let ids = route.connection_ids();
                if !accepted.iter().any(|r| r.connection_ids() == ids) {
                    debug!(
                        iteration = iterations,
                        confidence,
                        departure = %route.departure_time(),
                        "route accepted"
                    );
                    accepted.push(route);
                }
            } else {
                debug!(iteration = iterations, confidence, "route below threshold");
                if most_robust
                    .as_ref()
                    .is_none_or(|best| confidence > best.confidence())
                {
                    most_robust = Some(route);
                }
            }

            debug!(connection = %weakest, probability = weakest_p, "pruning weakest connection");
            pruned.prune(weakest);
        };

        let routes = rank_routes(deduplicate(accepted));
        if !routes.is_empty() {
            most_robust = None;
        }

        info!(
            ?status,
            routes = routes.len(),
            iterations,
            pruned = pruned.len(),
            "plan finished"
        );

        Ok(PlanOutcome {
            status,
            routes,
            iterations,
            pruned: pruned.pruned().to_vec(),
            most_robust,
        })
    }
}
