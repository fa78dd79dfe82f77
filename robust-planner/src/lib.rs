//! Robust transit journey planner.
//!
//! Answers: "I must be at this stop by this time with at least this
//! probability. When is the latest I can leave, and how?"
//!
//! The graph and the delay model are loaded once and shared read-only
//! between queries; each query keeps its own pruning state.

pub mod cache;
pub mod domain;
pub mod graph;
pub mod oracle;
pub mod planner;
pub mod web;
