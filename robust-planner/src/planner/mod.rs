//! Robust journey planner.
//!
//! This module answers: "I must be at this stop by this time with at least
//! this probability. When is the latest I can leave, and how?"
//!
//! A single search pass works backwards in time from the deadline to find
//! the latest-departing route. The refinement loop repeats that search,
//! scoring each candidate against the delay oracle and pruning its weakest
//! connection, until enough reliable routes have been collected.

mod config;
mod pruned;
mod query;
mod rank;
mod refine;
mod scoring;
mod search;


pub use config::SearchConfig;
pub use pruned::PrunedView;
pub use query::{PlanError, Query};
pub use rank::{deduplicate, rank_routes};
pub use refine::{CancellationFlag, PlanOutcome, PlanStatus, Planner};
pub use scoring::{leg_probability, probability, score_route, slack_after};
pub use search::{SearchRequest, find_route};
