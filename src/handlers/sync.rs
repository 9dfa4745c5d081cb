use axum::{extract::State, routing::get, routing::post, Json, Router};
use serde_json::{json, Value};

use crate::errors::ServiceError;
use crate::services::sync::{SyncOutcome, SyncStatus};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(trigger_sync))
        .route("/sync/status", get(sync_status))
}

/// Trigger a full directory sync
///
/// While a run is already in flight the trigger is a no-op and reports
/// `started: false`.
pub async fn trigger_sync(State(state): State<AppState>) -> Result<Json<Value>, ServiceError> {
    match state.sync.trigger().await? {
        SyncOutcome::Completed(stats) => Ok(Json(json!({
            "started": true,
            "stats": stats,
        }))),
        SyncOutcome::AlreadyRunning => Ok(Json(json!({
            "started": false,
            "message": "A sync run is already in progress",
        }))),
    }
}

pub async fn sync_status(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.sync.status().await)
}
