#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod search;
pub mod services;
pub mod tracing;

use axum::{http::StatusCode, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Builds the services over an already connected pool.
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .nest("/health", handlers::health::health_routes())
        // Proximity and filtered search
        .nest("/search", handlers::search::search_routes())
        // Listings and lookups
        .nest("/gyms", handlers::gyms::gym_routes())
        .nest("/pts", handlers::pts::pt_routes())
        .nest("/offers", handlers::offers::offer_routes())
        // Rating maintenance (bearer token)
        .nest("/ratings", handlers::ratings::rating_routes())
}

/// Full application router with metrics, docs and the shared middleware stack.
pub fn app_router(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/", get(|| async { "fitmarket-api up" }))
        .route(
            "/metrics",
            get(|| async move { (StatusCode::OK, metrics::metrics_handler().await) }),
        )
        .route("/metrics/json", get(metrics::metrics_json_handler))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    Json(json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "fitmarket-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
