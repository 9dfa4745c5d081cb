use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{created_response, no_content_response};
use crate::auth::{current_employee, AuthUser};
use crate::entities::{module, module_permission, role};
use crate::errors::ServiceError;
use crate::services::permissions::{load_for_employee, EmployeePermissions};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_permissions).post(create_permission))
        .route("/me", get(my_permissions))
        .route("/role/{role_id}", get(role_permissions))
        .route("/module/{module_id}", get(module_permissions))
        .route("/bulk-update", post(bulk_update))
        .route(
            "/{role_id}/{module_id}",
            get(get_permission)
                .put(update_permission)
                .delete(delete_permission),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionCreate {
    pub role_id: i32,
    pub module_id: i32,
    #[serde(default = "default_true")]
    pub can_view: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default)]
    pub can_export: bool,
    #[serde(default)]
    pub admin_actions: bool,
    #[serde(default)]
    pub other_actions: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionUpdate {
    pub can_view: Option<bool>,
    pub can_create: Option<bool>,
    pub can_edit: Option<bool>,
    pub can_delete: Option<bool>,
    pub can_export: Option<bool>,
    pub admin_actions: Option<bool>,
    pub other_actions: Option<bool>,
}

/// Permission row enriched with role and module names
#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionWithDetails {
    pub role_id: i32,
    pub module_id: i32,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_export: bool,
    pub admin_actions: bool,
    pub other_actions: bool,
    pub assigned_at: DateTime<Utc>,
    pub role_name: Option<String>,
    pub module_name: Option<String>,
    pub module_key: Option<String>,
}

impl PermissionWithDetails {
    fn new(
        permission: &module_permission::Model,
        role: Option<&role::Model>,
        module: Option<&module::Model>,
    ) -> Self {
        Self {
            role_id: permission.role_id,
            module_id: permission.module_id,
            can_view: permission.can_view,
            can_create: permission.can_create,
            can_edit: permission.can_edit,
            can_delete: permission.can_delete,
            can_export: permission.can_export,
            admin_actions: permission.admin_actions,
            other_actions: permission.other_actions,
            assigned_at: permission.assigned_at,
            role_name: role.map(|r| r.name.clone()),
            module_name: module.map(|m| m.name.clone()),
            module_key: module.map(|m| m.key.clone()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RolePermissionsResponse {
    pub role_id: i32,
    pub role_name: String,
    pub permissions: Vec<PermissionWithDetails>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkPermissionUpdate {
    pub role_id: i32,
    pub permissions: Vec<PermissionCreate>,
}

async fn find_role(state: &AppState, role_id: i32) -> Result<role::Model, ServiceError> {
    role::Entity::find_by_id(role_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Role", role_id))
}

async fn find_module(state: &AppState, module_id: i32) -> Result<module::Model, ServiceError> {
    module::Entity::find_by_id(module_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Module", module_id))
}

async fn find_pair(
    state: &AppState,
    role_id: i32,
    module_id: i32,
) -> Result<module_permission::Model, ServiceError> {
    module_permission::Entity::find_by_id((role_id, module_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "Permission not found for role ID {} and module ID {}",
                role_id, module_id
            ))
        })
}

/// Assign a module to a role with specific capability flags
pub async fn create_permission(
    State(state): State<AppState>,
    Json(payload): Json<PermissionCreate>,
) -> Result<impl IntoResponse, ServiceError> {
    let role = find_role(&state, payload.role_id).await?;
    let module = find_module(&state, payload.module_id).await?;

    let existing = module_permission::Entity::find_by_id((payload.role_id, payload.module_id))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ServiceError::InvalidInput(format!(
            "Permission already exists for role '{}' and module '{}'",
            role.name, module.name
        )));
    }

    let created = module_permission::ActiveModel {
        role_id: Set(payload.role_id),
        module_id: Set(payload.module_id),
        can_view: Set(payload.can_view),
        can_create: Set(payload.can_create),
        can_edit: Set(payload.can_edit),
        can_delete: Set(payload.can_delete),
        can_export: Set(payload.can_export),
        admin_actions: Set(payload.admin_actions),
        other_actions: Set(payload.other_actions),
        assigned_at: Set(Utc::now()),
    }
    .insert(&state.db)
    .await?;

    Ok(created_response(created))
}

/// All permissions with role and module details
pub async fn list_permissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<PermissionWithDetails>>, ServiceError> {
    let permissions = module_permission::Entity::find().all(&state.db).await?;
    let roles = role::Entity::find().all(&state.db).await?;
    let modules = module::Entity::find().all(&state.db).await?;

    let mut details: Vec<PermissionWithDetails> = permissions
        .iter()
        .map(|permission| {
            PermissionWithDetails::new(
                permission,
                roles.iter().find(|r| r.id == permission.role_id),
                modules.iter().find(|m| m.id == permission.module_id),
            )
        })
        .collect();

    details.sort_by(|a, b| {
        (a.role_name.as_deref(), &a.module_name)
            .cmp(&(b.role_name.as_deref(), &b.module_name))
    });

    Ok(Json(details))
}

/// All permissions for one role
pub async fn role_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<i32>,
) -> Result<Json<RolePermissionsResponse>, ServiceError> {
    let role = find_role(&state, role_id).await?;
    Ok(Json(role_permissions_response(&state, &role).await?))
}

async fn role_permissions_response(
    state: &AppState,
    role: &role::Model,
) -> Result<RolePermissionsResponse, ServiceError> {
    let permissions = module_permission::Entity::find()
        .filter(module_permission::Column::RoleId.eq(role.id))
        .all(&state.db)
        .await?;

    let module_ids: Vec<i32> = permissions.iter().map(|p| p.module_id).collect();
    let mut modules = module::Entity::find()
        .filter(module::Column::Id.is_in(module_ids))
        .all(&state.db)
        .await?;
    modules.sort_by(|a, b| (a.display_order, &a.name).cmp(&(b.display_order, &b.name)));

    let details = modules
        .iter()
        .filter_map(|module| {
            permissions
                .iter()
                .find(|p| p.module_id == module.id)
                .map(|permission| PermissionWithDetails::new(permission, Some(role), Some(module)))
        })
        .collect();

    Ok(RolePermissionsResponse {
        role_id: role.id,
        role_name: role.name.clone(),
        permissions: details,
    })
}

/// Which roles have access to one module
pub async fn module_permissions(
    State(state): State<AppState>,
    Path(module_id): Path<i32>,
) -> Result<Json<Vec<PermissionWithDetails>>, ServiceError> {
    let module = find_module(&state, module_id).await?;

    let permissions = module_permission::Entity::find()
        .filter(module_permission::Column::ModuleId.eq(module_id))
        .all(&state.db)
        .await?;

    let role_ids: Vec<i32> = permissions.iter().map(|p| p.role_id).collect();
    let mut roles = role::Entity::find()
        .filter(role::Column::Id.is_in(role_ids))
        .all(&state.db)
        .await?;
    roles.sort_by(|a, b| a.name.cmp(&b.name));

    let details = roles
        .iter()
        .filter_map(|role| {
            permissions
                .iter()
                .find(|p| p.role_id == role.id)
                .map(|permission| PermissionWithDetails::new(permission, Some(role), Some(&module)))
        })
        .collect();

    Ok(Json(details))
}

pub async fn get_permission(
    State(state): State<AppState>,
    Path((role_id, module_id)): Path<(i32, i32)>,
) -> Result<Json<module_permission::Model>, ServiceError> {
    Ok(Json(find_pair(&state, role_id, module_id).await?))
}

pub async fn update_permission(
    State(state): State<AppState>,
    Path((role_id, module_id)): Path<(i32, i32)>,
    Json(payload): Json<PermissionUpdate>,
) -> Result<Json<module_permission::Model>, ServiceError> {
    let existing = find_pair(&state, role_id, module_id).await?;

    let mut active: module_permission::ActiveModel = existing.into();
    if let Some(v) = payload.can_view {
        active.can_view = Set(v);
    }
    if let Some(v) = payload.can_create {
        active.can_create = Set(v);
    }
    if let Some(v) = payload.can_edit {
        active.can_edit = Set(v);
    }
    if let Some(v) = payload.can_delete {
        active.can_delete = Set(v);
    }
    if let Some(v) = payload.can_export {
        active.can_export = Set(v);
    }
    if let Some(v) = payload.admin_actions {
        active.admin_actions = Set(v);
    }
    if let Some(v) = payload.other_actions {
        active.other_actions = Set(v);
    }

    Ok(Json(active.update(&state.db).await?))
}

/// Revoke module access from a role
pub async fn delete_permission(
    State(state): State<AppState>,
    Path((role_id, module_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = find_pair(&state, role_id, module_id).await?;
    existing.delete(&state.db).await?;
    Ok(no_content_response())
}

/// Replace all permissions of a role with the supplied set
pub async fn bulk_update(
    State(state): State<AppState>,
    Json(payload): Json<BulkPermissionUpdate>,
) -> Result<Json<RolePermissionsResponse>, ServiceError> {
    let role = find_role(&state, payload.role_id).await?;

    // Every referenced module must exist before anything is replaced
    for entry in &payload.permissions {
        find_module(&state, entry.module_id).await?;
    }

    let txn = state.db.begin().await?;

    module_permission::Entity::delete_many()
        .filter(module_permission::Column::RoleId.eq(payload.role_id))
        .exec(&txn)
        .await?;

    for entry in &payload.permissions {
        module_permission::ActiveModel {
            role_id: Set(payload.role_id),
            module_id: Set(entry.module_id),
            can_view: Set(entry.can_view),
            can_create: Set(entry.can_create),
            can_edit: Set(entry.can_edit),
            can_delete: Set(entry.can_delete),
            can_export: Set(entry.can_export),
            admin_actions: Set(entry.admin_actions),
            other_actions: Set(entry.other_actions),
            assigned_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    Ok(Json(role_permissions_response(&state, &role).await?))
}

/// Aggregated permission set of the calling user
///
/// Resolves the employee by token oid, collects all assigned roles and
/// OR-combines their module permissions.
pub async fn my_permissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<EmployeePermissions>, ServiceError> {
    let employee = current_employee(&state.db, &auth).await?;
    let permissions = load_for_employee(&state.db, employee).await?;
    Ok(Json(permissions))
}
