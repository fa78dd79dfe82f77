//! Per-query exclusion overlay.

use std::collections::HashSet;

use crate::domain::ConnectionId;

/// Connections excluded from search for the rest of one query.
///
/// The shared graph is never modified; each query owns its own view.
#[derive(Debug, Clone, Default)]
pub struct PrunedView {
    excluded: HashSet<ConnectionId>,
    order: Vec<ConnectionId>,
}

impl PrunedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude a connection. Returns false if it was already excluded.
    pub fn prune(&mut self, id: ConnectionId) -> bool {
        if self.excluded.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    pub fn is_pruned(&self, id: ConnectionId) -> bool {
        self.excluded.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Excluded connections in the order they were pruned.
    pub fn pruned(&self) -> &[ConnectionId] {
        &self.order
    }
}
