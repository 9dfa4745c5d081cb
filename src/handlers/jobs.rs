use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created_response, no_content_response, validate_input};
use crate::entities::job;
use crate::errors::ServiceError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs).post(create_job))
        .route("/status/{status}", get(jobs_by_status))
        .route("/{id}", get(get_job).put(update_job).delete(delete_job))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateJobRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    #[serde(default = "default_status")]
    pub status: String,
    pub employee_id: Option<i32>,
}

fn default_status() -> String {
    "active".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateJobRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub status: Option<String>,
    pub employee_id: Option<i32>,
}

async fn find_job(state: &AppState, id: i32) -> Result<job::Model, ServiceError> {
    job::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Job", id))
}

pub async fn list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<job::Model>>, ServiceError> {
    Ok(Json(job::Entity::find().all(&state.db).await?))
}

pub async fn jobs_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<Vec<job::Model>>, ServiceError> {
    let jobs = job::Entity::find()
        .filter(job::Column::Status.eq(status))
        .all(&state.db)
        .await?;
    Ok(Json(jobs))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<job::Model>, ServiceError> {
    Ok(Json(find_job(&state, id).await?))
}

pub async fn create_job(
    State(state): State<AppState>,
    Json(payload): Json<CreateJobRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let created = job::ActiveModel {
        title: Set(payload.title),
        description: Set(payload.description),
        requirements: Set(payload.requirements),
        location: Set(payload.location),
        salary_min: Set(payload.salary_min),
        salary_max: Set(payload.salary_max),
        status: Set(payload.status),
        posted_at: Set(Utc::now()),
        employee_id: Set(payload.employee_id),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created_response(created))
}

pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateJobRequest>,
) -> Result<Json<job::Model>, ServiceError> {
    validate_input(&payload)?;
    let existing = find_job(&state, id).await?;

    let mut active: job::ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if payload.description.is_some() {
        active.description = Set(payload.description);
    }
    if payload.requirements.is_some() {
        active.requirements = Set(payload.requirements);
    }
    if payload.location.is_some() {
        active.location = Set(payload.location);
    }
    if payload.salary_min.is_some() {
        active.salary_min = Set(payload.salary_min);
    }
    if payload.salary_max.is_some() {
        active.salary_max = Set(payload.salary_max);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if payload.employee_id.is_some() {
        active.employee_id = Set(payload.employee_id);
    }

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = find_job(&state, id).await?;
    existing.delete(&state.db).await?;
    Ok(no_content_response())
}
