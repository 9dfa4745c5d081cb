use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created_response, no_content_response, validate_input};
use crate::entities::module;
use crate::errors::ServiceError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_modules).post(create_module))
        .route("/root/all", get(root_modules))
        .route("/by-key/{key}", get(get_module_by_key))
        .route(
            "/{id}",
            get(get_module).put(update_module).delete(delete_module),
        )
        .route("/{id}/children", get(child_modules))
        .route("/{id}/toggle-active", patch(toggle_active))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ModuleCreate {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub key: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub route_url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub parent_module_id: Option<i32>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ModuleUpdate {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub key: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub route_url: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
    pub parent_module_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ListModulesQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

async fn find_module(state: &AppState, id: i32) -> Result<module::Model, ServiceError> {
    module::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Module", id))
}

async fn ensure_unique_key(state: &AppState, key: &str) -> Result<(), ServiceError> {
    let existing = module::Entity::find()
        .filter(module::Column::Key.eq(key))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ServiceError::InvalidInput(format!(
            "Module with key '{}' already exists",
            key
        )));
    }
    Ok(())
}

/// Reject a parent assignment that would close a cycle
///
/// Walks the ancestor chain of the proposed parent; reaching the module
/// being edited means the link would loop.
async fn ensure_no_cycle(
    state: &AppState,
    module_id: i32,
    parent_id: i32,
) -> Result<(), ServiceError> {
    let mut cursor = Some(parent_id);
    while let Some(current) = cursor {
        if current == module_id {
            return Err(ServiceError::InvalidInput(
                "Module parent assignment would create a cycle".to_string(),
            ));
        }
        cursor = module::Entity::find_by_id(current)
            .one(&state.db)
            .await?
            .and_then(|ancestor| ancestor.parent_module_id);
    }
    Ok(())
}

pub async fn create_module(
    State(state): State<AppState>,
    Json(payload): Json<ModuleCreate>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    ensure_unique_key(&state, &payload.key).await?;

    if let Some(parent_id) = payload.parent_module_id {
        find_module(&state, parent_id)
            .await
            .map_err(|_| ServiceError::not_found("Parent module", parent_id))?;
    }

    let created = module::ActiveModel {
        name: Set(payload.name),
        key: Set(payload.key),
        description: Set(payload.description),
        icon: Set(payload.icon),
        route_url: Set(payload.route_url),
        display_order: Set(payload.display_order),
        is_active: Set(payload.is_active),
        parent_module_id: Set(payload.parent_module_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created_response(created))
}

/// All modules; inactive ones only with `include_inactive=true`
pub async fn list_modules(
    State(state): State<AppState>,
    Query(query): Query<ListModulesQuery>,
) -> Result<Json<Vec<module::Model>>, ServiceError> {
    let mut finder = module::Entity::find();
    if !query.include_inactive {
        finder = finder.filter(module::Column::IsActive.eq(true));
    }
    let modules = finder
        .order_by_asc(module::Column::DisplayOrder)
        .order_by_asc(module::Column::Name)
        .all(&state.db)
        .await?;
    Ok(Json(modules))
}

pub async fn get_module(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<module::Model>, ServiceError> {
    Ok(Json(find_module(&state, id).await?))
}

pub async fn get_module_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<module::Model>, ServiceError> {
    let found = module::Entity::find()
        .filter(module::Column::Key.eq(key.as_str()))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Module with key '{}' not found", key))
        })?;
    Ok(Json(found))
}

pub async fn child_modules(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<module::Model>>, ServiceError> {
    let children = module::Entity::find()
        .filter(module::Column::ParentModuleId.eq(id))
        .filter(module::Column::IsActive.eq(true))
        .order_by_asc(module::Column::DisplayOrder)
        .order_by_asc(module::Column::Name)
        .all(&state.db)
        .await?;
    Ok(Json(children))
}

pub async fn root_modules(
    State(state): State<AppState>,
) -> Result<Json<Vec<module::Model>>, ServiceError> {
    let roots = module::Entity::find()
        .filter(module::Column::ParentModuleId.is_null())
        .filter(module::Column::IsActive.eq(true))
        .order_by_asc(module::Column::DisplayOrder)
        .order_by_asc(module::Column::Name)
        .all(&state.db)
        .await?;
    Ok(Json(roots))
}

pub async fn update_module(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ModuleUpdate>,
) -> Result<Json<module::Model>, ServiceError> {
    validate_input(&payload)?;
    let existing = find_module(&state, id).await?;

    if let Some(key) = &payload.key {
        if key != &existing.key {
            ensure_unique_key(&state, key).await?;
        }
    }

    if let Some(parent_id) = payload.parent_module_id {
        if parent_id == id {
            return Err(ServiceError::InvalidInput(
                "A module cannot be its own parent".to_string(),
            ));
        }
        find_module(&state, parent_id)
            .await
            .map_err(|_| ServiceError::not_found("Parent module", parent_id))?;
        ensure_no_cycle(&state, id, parent_id).await?;
    }

    let mut active: module::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(key) = payload.key {
        active.key = Set(key);
    }
    if payload.description.is_some() {
        active.description = Set(payload.description);
    }
    if payload.icon.is_some() {
        active.icon = Set(payload.icon);
    }
    if payload.route_url.is_some() {
        active.route_url = Set(payload.route_url);
    }
    if let Some(order) = payload.display_order {
        active.display_order = Set(order);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if payload.parent_module_id.is_some() {
        active.parent_module_id = Set(payload.parent_module_id);
    }

    Ok(Json(active.update(&state.db).await?))
}

/// Delete a module and, implicitly, its permission rows
///
/// Refused while child modules still point at it.
pub async fn delete_module(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = find_module(&state, id).await?;

    let child = module::Entity::find()
        .filter(module::Column::ParentModuleId.eq(id))
        .one(&state.db)
        .await?;
    if child.is_some() {
        return Err(ServiceError::InvalidInput(
            "Cannot delete module with child modules. Delete or reassign children first."
                .to_string(),
        ));
    }

    existing.delete(&state.db).await?;
    Ok(no_content_response())
}

pub async fn toggle_active(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<module::Model>, ServiceError> {
    let existing = find_module(&state, id).await?;
    let toggled = !existing.is_active;

    let mut active: module::ActiveModel = existing.into();
    active.is_active = Set(toggled);

    Ok(Json(active.update(&state.db).await?))
}
