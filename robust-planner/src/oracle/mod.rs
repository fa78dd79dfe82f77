//! Delay probability oracle.
//!
//! The planner asks one question of the delay data: given a connection and
//! the slack available before the traveller must be somewhere else, how
//! likely is the connection to arrive in time?

mod error;
mod gamma;

use chrono::Duration;

pub use error::OracleError;
pub use gamma::{GammaDelayModel, GammaParams};

use crate::domain::Connection;

/// Source of per-connection success probabilities.
///
/// Implementations are shared read-only between concurrent queries.
pub trait DelayOracle: Send + Sync {
    /// Probability that `connection` arrives no more than `slack` late.
    ///
    /// Returns `None` when there is no delay data for the connection; the
    /// planner then treats the connection as certain to be missed.
    fn success_probability(&self, connection: &Connection, slack: Duration) -> Option<f64>;
}

impl<F> DelayOracle for F
where
    F: Fn(&Connection, Duration) -> Option<f64> + Send + Sync,
{
    fn success_probability(&self, connection: &Connection, slack: Duration) -> Option<f64> {
        self(connection, slack)
    }
}
