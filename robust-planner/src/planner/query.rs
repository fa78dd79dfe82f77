//! Plan queries and their validation.

use serde::{Deserialize, Serialize};

use crate::domain::{ServiceTime, StopId, StopIndex};
use crate::graph::TransitGraph;

use super::config::SearchConfig;

/// Error from planning.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    /// The query was rejected before any search work
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A search produced legs that do not form a route
    #[error("inconsistent route: {0}")]
    InconsistentRoute(#[from] crate::domain::DomainError),

    /// The planning task panicked or was aborted
    #[error("planning task failed: {0}")]
    Aborted(String),
}

/// A request to plan: reach `destination` by `deadline` with at least
/// `threshold` probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub origin: StopId,
    pub destination: StopId,
    pub deadline: ServiceTime,
    pub threshold: f64,

    /// Number of routes wanted; the configured default when absent.
    #[serde(default)]
    pub max_routes: Option<usize>,

    /// Search passes allowed; the configured default when absent.
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

impl Query {
    pub fn new(origin: StopId, destination: StopId, deadline: ServiceTime, threshold: f64) -> Self {
        Self {
            origin,
            destination,
            deadline,
            threshold,
            max_routes: None,
            max_iterations: None,
        }
    }

    pub fn with_max_routes(mut self, max_routes: usize) -> Self {
        self.max_routes = Some(max_routes);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }
}

/// A query checked against a graph and configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedQuery {
    pub origin: StopIndex,
    pub destination: StopIndex,
    pub deadline: ServiceTime,
    pub threshold: f64,
    pub max_routes: usize,
    pub max_iterations: usize,
}

impl ResolvedQuery {
    /// Validate `query` and resolve its stops.
    pub fn resolve(
        query: &Query,
        graph: &TransitGraph,
        config: &SearchConfig,
    ) -> Result<Self, PlanError> {
        let origin = graph
            .stop_index(&query.origin)
            .ok_or_else(|| PlanError::InvalidQuery(format!("unknown stop {}", query.origin)))?;
        let destination = graph.stop_index(&query.destination).ok_or_else(|| {
            PlanError::InvalidQuery(format!("unknown stop {}", query.destination))
        })?;

        if origin == destination {
            return Err(PlanError::InvalidQuery(
                "origin and destination are the same stop".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&query.threshold) {
            return Err(PlanError::InvalidQuery(format!(
                "confidence threshold {} is outside [0, 1]",
                query.threshold
            )));
        }

        if !config.window.contains(query.deadline) {
            return Err(PlanError::InvalidQuery(format!(
                "deadline {} is outside the operating window {}-{}",
                query.deadline, config.window.start, config.window.end
            )));
        }

        let max_routes = query.max_routes.unwrap_or(config.default_max_routes);
        if max_routes == 0 {
            return Err(PlanError::InvalidQuery(
                "max_routes must be at least 1".to_string(),
            ));
        }

        let max_iterations = query.max_iterations.unwrap_or(config.default_max_iterations);
        if max_iterations == 0 {
            return Err(PlanError::InvalidQuery(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            origin,
            destination,
            deadline: query.deadline,
            threshold: query.threshold,
            max_routes,
            max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stop;
    use crate::graph::{BuildConfig, GraphBuilder};

    fn t(s: &str) -> ServiceTime {
        ServiceTime::parse(s).unwrap()
    }

    fn id(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn graph() -> TransitGraph {
        let mut builder = GraphBuilder::new(BuildConfig::default());
        builder
            .add_stop(Stop::new(id("A"), "A", 47.00, 8.00))
            .add_stop(Stop::new(id("B"), "B", 47.02, 8.00));
        builder.build().unwrap()
    }

    fn resolve(query: &Query) -> Result<ResolvedQuery, PlanError> {
        ResolvedQuery::resolve(query, &graph(), &SearchConfig::default())
    }

    #[test]
    fn defaults_fill_in() {
        let resolved = resolve(&Query::new(id("A"), id("B"), t("09:00"), 0.8)).unwrap();
        assert_eq!(resolved.max_routes, 3);
        assert_eq!(resolved.max_iterations, 20);

        let resolved = resolve(
            &Query::new(id("A"), id("B"), t("09:00"), 0.8)
                .with_max_routes(2)
                .with_max_iterations(5),
        )
        .unwrap();
        assert_eq!(resolved.max_routes, 2);
        assert_eq!(resolved.max_iterations, 5);
    }

    #[test]
    fn rejects_invalid_queries() {
        let invalid = [
            Query::new(id("A"), id("Z"), t("09:00"), 0.8),
            Query::new(id("Z"), id("B"), t("09:00"), 0.8),
            Query::new(id("A"), id("A"), t("09:00"), 0.8),
            Query::new(id("A"), id("B"), t("09:00"), 1.2),
            Query::new(id("A"), id("B"), t("09:00"), -0.1),
            Query::new(id("A"), id("B"), t("09:00"), f64::NAN),
            Query::new(id("A"), id("B"), t("05:30"), 0.8),
            Query::new(id("A"), id("B"), t("22:00"), 0.8),
            Query::new(id("A"), id("B"), t("09:00"), 0.8).with_max_routes(0),
            Query::new(id("A"), id("B"), t("09:00"), 0.8).with_max_iterations(0),
        ];

        for query in &invalid {
            assert!(
                matches!(resolve(query), Err(PlanError::InvalidQuery(_))),
                "{query:?} should be rejected"
            );
        }
    }

    #[test]
    fn threshold_bounds_are_inclusive() {
        assert!(resolve(&Query::new(id("A"), id("B"), t("09:00"), 0.0)).is_ok());
        assert!(resolve(&Query::new(id("A"), id("B"), t("09:00"), 1.0)).is_ok());
    }

    #[test]
    fn error_display() {
        let err = PlanError::InvalidQuery("unknown stop Z".to_string());
        assert_eq!(err.to_string(), "invalid query: unknown stop Z");
    }
}
