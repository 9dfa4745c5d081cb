//! PrimeFire API Library
//!
//! HR/IT operations backend: employee directory (with Microsoft 365 sync),
//! role-based module permissions, licenses, jobs and applicants, hardware
//! inventory, and ticketing.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod graph;
pub mod handlers;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{AuthRouterExt, TokenVerifier};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: db::DbPool,
    pub config: config::AppConfig,
    pub graph: Arc<graph::GraphClient>,
    pub sync: Arc<services::sync::SyncScheduler>,
}

/// All /api/v1 routes
///
/// Everything except `/status` and `/health` sits behind bearer auth.
pub fn api_v1_routes() -> Router<AppState> {
    let protected = Router::new()
        .nest(
            "/employees",
            handlers::employees::routes().merge(handlers::sync::routes()),
        )
        .nest("/roles", handlers::roles::routes())
        .nest("/permissions", handlers::permissions::routes())
        .nest("/modules", handlers::modules::routes())
        .nest("/countries", handlers::countries::routes())
        .nest("/licenses", handlers::licenses::routes())
        .nest("/jobs", handlers::jobs::routes())
        .nest("/curriculums", handlers::curriculums::routes())
        .nest("/hardware", handlers::hardware::routes())
        .nest("/tickets", handlers::tickets::routes())
        .merge(handlers::ticket_messages::routes())
        .merge(handlers::ticket_attachments::routes())
        .with_auth();

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(protected)
}

/// Build the full application router for the given state
///
/// Injects the token verifier derived from the configuration so the auth
/// middleware can reach it; shared by the binary and the test harness.
pub fn build_router(state: AppState) -> Router {
    let verifier = Arc::new(TokenVerifier::from_config(&state.config));

    Router::new()
        .route("/", get(|| async { "primefire-api up" }))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            verifier,
            |State(verifier): State<Arc<TokenVerifier>>,
             mut req: axum::http::Request<axum::body::Body>,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(verifier);
                next.run(req).await
            },
        ))
        .with_state(state)
}

async fn api_status() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    Json(json!({
        "status": "ok",
        "service": "primefire-api",
        "version": version,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
