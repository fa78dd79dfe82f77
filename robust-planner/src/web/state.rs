//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::CachedPlanner;
use crate::graph::TransitGraph;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Transit graph the planner runs on
    pub graph: Arc<TransitGraph>,

    /// Planner with cached outcomes
    pub planner: Arc<CachedPlanner>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(planner: CachedPlanner) -> Self {
        Self {
            graph: Arc::clone(planner.graph()),
            planner: Arc::new(planner),
        }
    }
}
