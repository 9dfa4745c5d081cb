use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created_response, no_content_response, validate_input};
use crate::entities::{employee, license};
use crate::errors::ServiceError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_licenses).post(create_license))
        .route(
            "/{id}",
            get(get_license).put(update_license).delete(delete_license),
        )
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLicenseRequest {
    #[validate(length(min = 1, max = 100))]
    pub software: String,
    #[validate(length(min = 1, max = 50))]
    pub version: String,
    #[validate(length(min = 1))]
    pub key: String,
    #[validate(length(min = 1, max = 100))]
    pub account: String,
    pub password: String,
    pub expires_at: DateTime<Utc>,
    pub employee_id: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLicenseRequest {
    pub software: Option<String>,
    pub version: Option<String>,
    pub key: Option<String>,
    pub account: Option<String>,
    pub password: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub employee_id: Option<i32>,
}

async fn find_license(state: &AppState, id: i32) -> Result<license::Model, ServiceError> {
    license::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("License", id))
}

pub async fn list_licenses(
    State(state): State<AppState>,
) -> Result<Json<Vec<license::Model>>, ServiceError> {
    Ok(Json(license::Entity::find().all(&state.db).await?))
}

pub async fn get_license(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<license::Model>, ServiceError> {
    Ok(Json(find_license(&state, id).await?))
}

pub async fn create_license(
    State(state): State<AppState>,
    Json(payload): Json<CreateLicenseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    employee::Entity::find_by_id(payload.employee_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Employee", payload.employee_id))?;

    let created = license::ActiveModel {
        software: Set(payload.software),
        version: Set(payload.version),
        key: Set(payload.key),
        account: Set(payload.account),
        password: Set(payload.password),
        expires_at: Set(payload.expires_at),
        employee_id: Set(payload.employee_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created_response(created))
}

pub async fn update_license(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateLicenseRequest>,
) -> Result<Json<license::Model>, ServiceError> {
    validate_input(&payload)?;
    let existing = find_license(&state, id).await?;

    if let Some(employee_id) = payload.employee_id {
        employee::Entity::find_by_id(employee_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Employee", employee_id))?;
    }

    let mut active: license::ActiveModel = existing.into();
    if let Some(software) = payload.software {
        active.software = Set(software);
    }
    if let Some(version) = payload.version {
        active.version = Set(version);
    }
    if let Some(key) = payload.key {
        active.key = Set(key);
    }
    if let Some(account) = payload.account {
        active.account = Set(account);
    }
    if let Some(password) = payload.password {
        active.password = Set(password);
    }
    if let Some(expires_at) = payload.expires_at {
        active.expires_at = Set(expires_at);
    }
    if let Some(employee_id) = payload.employee_id {
        active.employee_id = Set(employee_id);
    }

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_license(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = find_license(&state, id).await?;
    existing.delete(&state.db).await?;
    Ok(no_content_response())
}
