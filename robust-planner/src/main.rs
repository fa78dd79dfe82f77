use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use robust_planner::cache::{CacheConfig, CachedPlanner};
use robust_planner::graph::{BuildConfig, load_graph};
use robust_planner::oracle::{GammaDelayModel, GammaParams};
use robust_planner::planner::SearchConfig;
use robust_planner::web::{AppState, create_router};

/// Wall-clock limit for a single plan unless overridden.
const DEFAULT_PLAN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Graph snapshot is required
    let graph_path = std::env::var("PLANNER_GRAPH")
        .map(PathBuf::from)
        .expect("PLANNER_GRAPH must point to a graph snapshot");
    let graph = load_graph(&graph_path, BuildConfig::default()).expect("Failed to load graph");
    info!(
        stops = graph.stop_count(),
        connections = graph.connection_count(),
        "graph loaded"
    );

    // Delay model is optional; without it every trip uses one coarse estimate
    let delay_model = match std::env::var("PLANNER_DELAY_MODEL") {
        Ok(path) => {
            let model = GammaDelayModel::from_path(&PathBuf::from(path))
                .expect("Failed to load delay model");
            info!(clusters = model.cluster_count(), "delay model loaded");
            model
        }
        Err(_) => {
            warn!("PLANNER_DELAY_MODEL not set, using a single fallback delay distribution");
            let fallback = GammaParams::new(1.5, 0.0, 60.0).expect("valid fallback parameters");
            GammaDelayModel::new().with_fallback(fallback)
        }
    };

    let timeout = std::env::var("PLANNER_PLAN_TIMEOUT_MS")
        .ok()
        .and_then(|ms| ms.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_PLAN_TIMEOUT);

    let planner = CachedPlanner::new(
        Arc::new(graph),
        Arc::new(delay_model),
        SearchConfig::default(),
        &CacheConfig::default(),
    )
    .with_timeout(timeout);

    // Build app state and router
    let app = create_router(AppState::new(planner));

    let addr: SocketAddr = std::env::var("PLANNER_ADDR")
        .ok()
        .and_then(|addr| addr.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));
    info!(%addr, "robust planner listening");
    info!("  GET  /health            - Health check");
    info!("  GET  /api/stops/search  - Search stops by name");
    info!("  POST /journey/plan      - Plan robust routes");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
