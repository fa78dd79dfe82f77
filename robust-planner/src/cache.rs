//! Caching layer for plan results.
//!
//! Planning is deterministic for a given graph, oracle and query, so a
//! finished outcome can be handed out again until the entry expires.
//! Planning itself runs on the blocking thread pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::{debug, warn};

use crate::domain::{ServiceTime, StopId};
use crate::graph::TransitGraph;
use crate::oracle::DelayOracle;
use crate::planner::{PlanError, PlanOutcome, PlanStatus, Planner, Query, SearchConfig};

/// Cache key: every query field that can change the outcome.
///
/// The threshold is stored as its bit pattern so the key can be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    origin: StopId,
    destination: StopId,
    deadline: ServiceTime,
    threshold_bits: u64,
    max_routes: Option<usize>,
    max_iterations: Option<usize>,
}

impl From<&Query> for PlanKey {
    fn from(query: &Query) -> Self {
        Self {
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            deadline: query.deadline,
            threshold_bits: query.threshold.to_bits(),
            max_routes: query.max_routes,
            max_iterations: query.max_iterations,
        }
    }
}

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            max_capacity: 1000,
        }
    }
}

/// Cache of finished plan outcomes.
pub struct PlanCache {
    outcomes: MokaCache<PlanKey, Arc<PlanOutcome>>,
}

impl PlanCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let outcomes = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { outcomes }
    }

    pub async fn get(&self, key: &PlanKey) -> Option<Arc<PlanOutcome>> {
        self.outcomes.get(key).await
    }

    pub async fn insert(&self, key: PlanKey, outcome: Arc<PlanOutcome>) {
        self.outcomes.insert(key, outcome).await;
    }
}

/// Planner over a shared graph and oracle, with cached results.
pub struct CachedPlanner {
    graph: Arc<TransitGraph>,
    oracle: Arc<dyn DelayOracle>,
    config: Arc<SearchConfig>,
    cache: PlanCache,

    /// Wall-clock limit per plan; the plan is cancelled when it runs out.
    timeout: Option<Duration>,
}

impl CachedPlanner {
    /// Create a new cached planner.
    pub fn new(
        graph: Arc<TransitGraph>,
        oracle: Arc<dyn DelayOracle>,
        config: SearchConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        Self {
            graph,
            oracle,
            config: Arc::new(config),
            cache: PlanCache::new(cache_config),
            timeout: None,
        }
    }

    /// Cancel plans that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The graph plans run against.
    pub fn graph(&self) -> &Arc<TransitGraph> {
        &self.graph
    }

    /// Plan `query`, using the cache if available.
    ///
    /// Cancelled outcomes are returned but not cached.
    pub async fn plan(&self, query: Query) -> Result<Arc<PlanOutcome>, PlanError> {
        let key = PlanKey::from(&query);

        // Try cache first
        if let Some(cached) = self.cache.get(&key).await {
            debug!(origin = %key.origin, destination = %key.destination, "plan cache hit");
            return Ok(cached);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let mut handle = {
            let graph = Arc::clone(&self.graph);
            let oracle = Arc::clone(&self.oracle);
            let config = Arc::clone(&self.config);
            let cancel = Arc::clone(&cancel);
            tokio::task::spawn_blocking(move || {
                Planner::new(&graph, oracle.as_ref(), &config).plan(&query, Some(&cancel))
            })
        };

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(?limit, "plan timed out, cancelling");
                    cancel.store(true, Ordering::Relaxed);
                    handle.await
                }
            },
            None => handle.await,
        };

        let outcome = Arc::new(joined.map_err(|e| PlanError::Aborted(e.to_string()))??);

        if outcome.status != PlanStatus::Cancelled {
            self.cache.insert(key, Arc::clone(&outcome)).await;
        }

        Ok(outcome)
    }
}
