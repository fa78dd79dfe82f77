//! Route ranking for plan results.
//!
//! Ranks accepted routes so the most useful option comes first.

use std::cmp::Ordering;

use crate::domain::Route;

/// Rank routes by preference.
///
/// Routes are ranked by:
/// 1. Departure time from the origin (later is better)
/// 2. Number of transfers (fewer is better)
/// 3. Walking distance (shorter is better)
///
/// The sort is stable, so routes equal on all three keep their order.
pub fn rank_routes(mut routes: Vec<Route>) -> Vec<Route> {
    routes.sort_by(|a, b| {
        // Primary: latest departure
        let dep_cmp = b.departure_time().cmp(&a.departure_time());
        if dep_cmp != Ordering::Equal {
            return dep_cmp;
        }

        // Secondary: fewer transfers
        let transfers_cmp = a.transfer_count().cmp(&b.transfer_count());
        if transfers_cmp != Ordering::Equal {
            return transfers_cmp;
        }

        // Tertiary: less walking
        a.walking_distance_m().total_cmp(&b.walking_distance_m())
    });

    routes
}

/// Drop routes that use exactly the same connections as an earlier one.
///
/// Keeps the first occurrence and preserves order otherwise.
pub fn deduplicate(routes: Vec<Route>) -> Vec<Route> {
    let mut result: Vec<Route> = Vec::with_capacity(routes.len());

    for route in routes {
        let ids = route.connection_ids();
        if !result.iter().any(|kept| kept.connection_ids() == ids) {
            result.push(route);
        }
    }

    result
}
