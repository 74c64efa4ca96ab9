//! Checks HTTP server.
//!
//! Exposes one read-only endpoint per pipeline stage plus a rolled-up
//! summary, for the dashboard UI and for `stuckmon report`/`dashboard`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/checks/stuck-in-source-channel-analysis` | Stuck report for the stage |
//! | `GET`  | `/checks/stuck-in-website-scraping` | Stuck report, excluded links skipped |
//! | `GET`  | `/checks/stuck-in-general-file-parser` | Stuck report for the stage |
//! | `GET`  | `/checks/stuck-in-article-classifier` | Stuck report, no country projected |
//! | `GET`  | `/checks/summary` | Totals and health tiers for all stages |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Response Contract
//!
//! Stage endpoints return `{ "total": <int>, "results": [...] }` where
//! `results` holds at most `[report].sample_limit` records. Any store
//! failure returns:
//!
//! ```json
//! { "error": "Internal Server Error" }
//! ```
//!
//! with status 500; the cause is only logged.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser dashboard
//! served from another origin can call the API.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::dashboard::{aggregate, SummaryResponse};
use crate::models::StuckReport;
use crate::report::{ReportSource, StoreReportSource};
use crate::stage::Stage;
use crate::store::{LinkStore, MongoLinkStore};

pub const SUMMARY_PATH: &str = "/checks/summary";
pub const HEALTH_PATH: &str = "/health";

/// Shared state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    source: StoreReportSource,
}

impl AppState {
    pub fn new(store: Arc<dyn LinkStore>, config: &Config) -> Self {
        Self {
            source: StoreReportSource::new(
                store,
                config.db.collection.clone(),
                config.report.sample_limit,
            ),
        }
    }

    /// State over an explicit collection and sample limit.
    pub fn with_limit(store: Arc<dyn LinkStore>, collection: &str, sample_limit: i64) -> Self {
        Self {
            source: StoreReportSource::new(store, collection, sample_limit),
        }
    }
}

/// Build the router with every check route registered.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new();
    for stage in Stage::ALL {
        router = router.route(
            &stage.route(),
            get(move |State(state): State<AppState>| handle_stuck(state, stage)),
        );
    }

    router
        .route(SUMMARY_PATH, get(handle_summary))
        .route(HEALTH_PATH, get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the checks server against the configured MongoDB deployment.
///
/// Binds to `[server].bind` and serves until the process is terminated. The
/// database connection is opened on the first request and reused after.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store: Arc<dyn LinkStore> = Arc::new(MongoLinkStore::new(config.db.clone()));
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        database = %config.db.database,
        collection = %config.db.collection,
        "checks server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Every failure surfaces to the caller as the same opaque 500.
struct AppError;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: "Internal Server Error",
            }),
        )
            .into_response()
    }
}

// ============ GET /checks/stuck-in-{stage} ============

async fn handle_stuck(state: AppState, stage: Stage) -> Result<Json<StuckReport>, AppError> {
    match state.source.fetch(stage).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            error!(stage = %stage, error = ?e, "stuck query failed");
            Err(AppError)
        }
    }
}

// ============ GET /checks/summary ============

async fn handle_summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    let snapshot = aggregate(&state.source).await;
    Json(SummaryResponse::from(&snapshot))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
