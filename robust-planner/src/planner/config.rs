//! Search configuration for the robust planner.

use std::collections::HashMap;

use chrono::Duration;

use crate::domain::{Leg, LegMode, OperatingWindow, TransportCategory};

/// Configuration parameters for route search and refinement.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Minimum time needed to change vehicle (seconds).
    /// Applied to every transfer unless the category has an override.
    pub transfer_buffer_secs: i64,

    /// Per-category transfer buffers (seconds), keyed by the category of the
    /// vehicle being left.
    pub category_buffer_secs: HashMap<TransportCategory, i64>,

    /// Maximum wait between consecutive legs (minutes).
    pub max_wait_mins: i64,

    /// Departures outside this window are never used.
    pub window: OperatingWindow,

    /// Skip connections whose success probability at the slack they would
    /// get is already below the threshold.
    pub threshold_pruning: bool,

    /// Number of routes requested when the query doesn't say.
    pub default_max_routes: usize,

    /// Refinement iterations allowed when the query doesn't say.
    pub default_max_iterations: usize,
}

impl SearchConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(
        transfer_buffer_secs: i64,
        max_wait_mins: i64,
        window: OperatingWindow,
        threshold_pruning: bool,
    ) -> Self {
        Self {
            transfer_buffer_secs,
            max_wait_mins,
            window,
            threshold_pruning,
            ..Self::default()
        }
    }

    /// Use the given transfer buffer when leaving a vehicle of `category`.
    pub fn with_category_buffer(mut self, category: TransportCategory, secs: i64) -> Self {
        self.category_buffer_secs.insert(category, secs);
        self
    }

    /// Returns the default transfer buffer as a Duration.
    pub fn transfer_buffer(&self) -> Duration {
        Duration::seconds(self.transfer_buffer_secs)
    }

    /// Returns the maximum wait as a Duration.
    pub fn max_wait(&self) -> Duration {
        Duration::minutes(self.max_wait_mins)
    }

    /// Minimum gap required between `leg` and a following leg that is not
    /// on the same trip.
    ///
    /// A walk needs none: the buffer for a change is charged once, against
    /// the vehicle left before the walk.
    pub fn transfer_buffer_after(&self, leg: &Leg) -> Duration {
        match &leg.mode {
            LegMode::Scheduled { category, .. } => self
                .category_buffer_secs
                .get(category)
                .map(|secs| Duration::seconds(*secs))
                .unwrap_or_else(|| self.transfer_buffer()),
            LegMode::Walk { .. } => Duration::zero(),
        }
    }

    /// Minimum gap between `leg` and `next`: zero when staying aboard.
    pub fn required_gap(&self, leg: &Leg, next: &Leg) -> Duration {
        if leg.continues_on(next) {
            Duration::zero()
        } else {
            self.transfer_buffer_after(leg)
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            transfer_buffer_secs: 90,
            category_buffer_secs: HashMap::new(),
            max_wait_mins: 45,
            window: OperatingWindow::default(),
            threshold_pruning: true,
            default_max_routes: 3,
            default_max_iterations: 20,
        }
    }
}
