use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use packing_core::{
    validate_layout, ContainerSpec, PackError, Packer, PackingRequest, PackingResult,
    PlacementRecord, ValidationReport,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Server settings taken from the environment
#[derive(Debug, Clone, PartialEq)]
struct ApiConfig {
    addr: String,
    max_restarts: usize,
    max_iterations: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            max_restarts: 8,
            max_iterations: 20_000,
        }
    }
}

impl ApiConfig {
    fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(addr) = lookup("PACKING_API_ADDR") {
            config.addr = addr;
        }
        if let Some(value) = lookup("PACKING_API_MAX_RESTARTS") {
            config.max_restarts = value
                .parse()
                .with_context(|| format!("PACKING_API_MAX_RESTARTS is not a number: {}", value))?;
        }
        if let Some(value) = lookup("PACKING_API_MAX_ITERATIONS") {
            config.max_iterations = value
                .parse()
                .with_context(|| format!("PACKING_API_MAX_ITERATIONS is not a number: {}", value))?;
        }
        Ok(config)
    }

    /// Clamps the expensive knobs of a request to the server limits.
    fn cap(&self, request: &mut PackingRequest) {
        let config = &mut request.config;
        if config.restarts > self.max_restarts {
            warn!(
                "Capping restarts from {} to {}",
                config.restarts, self.max_restarts
            );
            config.restarts = self.max_restarts;
        }
        if config.annealing.max_iterations > self.max_iterations {
            warn!(
                "Capping iterations from {} to {}",
                config.annealing.max_iterations, self.max_iterations
            );
            config.annealing.max_iterations = self.max_iterations;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Container Packing API");

    let config = Arc::new(ApiConfig::from_env()?);

    let app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/pack", post(pack))
        .route("/api/validate", post(validate))
        .layer(CorsLayer::permissive())
        .with_state(config.clone());

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.addr))?;

    info!("API server listening on http://{}", config.addr);
    info!(
        "Limits: {} restarts, {} iterations per request",
        config.max_restarts, config.max_iterations
    );

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "container-packing-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn pack(
    State(config): State<Arc<ApiConfig>>,
    Json(mut request): Json<PackingRequest>,
) -> Result<Json<PackingResult>, AppError> {
    info!(
        "Received packing request with {} boxes ({})",
        request.boxes.len(),
        request.config.strategy
    );
    config.cap(&mut request);

    // The search is CPU bound; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || Packer::new(request)?.pack())
        .await
        .context("Packing task panicked")??;

    info!(
        "Packing complete: {}/{} boxes placed, {:.2}% used, cost {:.4}",
        result.summary.placed_boxes,
        result.summary.total_boxes,
        result.summary.utilization_percentage,
        result.cost
    );

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    container: ContainerSpec,
    placements: Vec<PlacementRecord>,
}

async fn validate(Json(request): Json<ValidateRequest>) -> Result<Json<ValidationReport>, AppError> {
    let container = request.container.build()?;
    let report = validate_layout(&container, &request.placements);

    if !report.is_valid() {
        warn!(
            "Layout invalid: {} duplicates, {} out of bounds, {} overlaps",
            report.duplicate_ids.len(),
            report.boundary_violations.len(),
            report.overlapping_pairs.len()
        );
    }

    Ok(Json(report))
}

/// Application error type
struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl From<PackError> for AppError {
    fn from(err: PackError) -> Self {
        AppError {
            status: StatusCode::BAD_REQUEST,
            error: err.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request error: {:#}", self.error);

        (
            self.status,
            Json(json!({
                "error": self.error.to_string(),
            })),
        )
            .into_response()
    }
}
