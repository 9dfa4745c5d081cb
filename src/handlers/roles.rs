use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created_response, no_content_response, validate_input};
use crate::entities::role;
use crate::errors::ServiceError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route(
            "/{id}",
            get(get_role).put(update_role).delete(delete_role),
        )
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RoleRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    pub description: Option<String>,
}

async fn find_role(state: &AppState, id: i32) -> Result<role::Model, ServiceError> {
    role::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Role", id))
}

pub async fn list_roles(
    State(state): State<AppState>,
) -> Result<Json<Vec<role::Model>>, ServiceError> {
    Ok(Json(role::Entity::find().all(&state.db).await?))
}

pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<role::Model>, ServiceError> {
    Ok(Json(find_role(&state, id).await?))
}

pub async fn create_role(
    State(state): State<AppState>,
    Json(payload): Json<RoleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let created = role::ActiveModel {
        name: Set(payload.name),
        description: Set(payload.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created_response(created))
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<RoleRequest>,
) -> Result<Json<role::Model>, ServiceError> {
    validate_input(&payload)?;
    let existing = find_role(&state, id).await?;

    let mut active: role::ActiveModel = existing.into();
    active.name = Set(payload.name);
    active.description = Set(payload.description);

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = find_role(&state, id).await?;
    existing.delete(&state.db).await?;
    Ok(no_content_response())
}
