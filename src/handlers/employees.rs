use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created_response, no_content_response, validate_input};
use crate::entities::{employee, employee_role, role};
use crate::errors::ServiceError;
use crate::graph::graph_patch_from_employee;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route(
            "/{id}",
            get(get_employee)
                .put(update_employee)
                .delete(delete_employee),
        )
        .route("/{id}/roles", get(get_employee_roles))
        .route(
            "/{id}/roles/{role_id}",
            post(assign_role).delete(unassign_role),
        )
        .route("/{id}/sync-from-directory", post(sync_from_directory))
        .route("/{id}/push-to-directory", post(push_to_directory))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEmployeeRequest {
    pub azure_oid: Option<String>,
    pub azure_upn: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub office: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub mobile_phone: Option<String>,
    pub office_phone: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEmployeeRequest {
    pub azure_upn: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub office: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub mobile_phone: Option<String>,
    pub office_phone: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country_id: Option<i32>,
}

async fn find_employee(state: &AppState, id: i32) -> Result<employee::Model, ServiceError> {
    employee::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Employee", id))
}

pub async fn list_employees(
    State(state): State<AppState>,
) -> Result<Json<Vec<employee::Model>>, ServiceError> {
    let employees = employee::Entity::find().all(&state.db).await?;
    Ok(Json(employees))
}

pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<employee::Model>, ServiceError> {
    Ok(Json(find_employee(&state, id).await?))
}

pub async fn create_employee(
    State(state): State<AppState>,
    Json(payload): Json<CreateEmployeeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let created = employee::ActiveModel {
        azure_oid: Set(payload.azure_oid),
        azure_upn: Set(payload.azure_upn),
        first_name: Set(payload.first_name),
        last_name: Set(payload.last_name),
        display_name: Set(payload.display_name),
        title: Set(payload.title),
        department: Set(payload.department),
        office: Set(payload.office),
        email: Set(payload.email),
        mobile_phone: Set(payload.mobile_phone),
        office_phone: Set(payload.office_phone),
        street_address: Set(payload.street_address),
        city: Set(payload.city),
        state: Set(payload.state),
        postal_code: Set(payload.postal_code),
        country_id: Set(payload.country_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(employee_id = created.id, "Employee created");
    Ok(created_response(created))
}

pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> Result<Json<employee::Model>, ServiceError> {
    validate_input(&payload)?;
    let existing = find_employee(&state, id).await?;

    let mut active: employee::ActiveModel = existing.into();
    if payload.azure_upn.is_some() {
        active.azure_upn = Set(payload.azure_upn);
    }
    if payload.first_name.is_some() {
        active.first_name = Set(payload.first_name);
    }
    if payload.last_name.is_some() {
        active.last_name = Set(payload.last_name);
    }
    if payload.display_name.is_some() {
        active.display_name = Set(payload.display_name);
    }
    if payload.title.is_some() {
        active.title = Set(payload.title);
    }
    if payload.department.is_some() {
        active.department = Set(payload.department);
    }
    if payload.office.is_some() {
        active.office = Set(payload.office);
    }
    if payload.email.is_some() {
        active.email = Set(payload.email);
    }
    if payload.mobile_phone.is_some() {
        active.mobile_phone = Set(payload.mobile_phone);
    }
    if payload.office_phone.is_some() {
        active.office_phone = Set(payload.office_phone);
    }
    if payload.street_address.is_some() {
        active.street_address = Set(payload.street_address);
    }
    if payload.city.is_some() {
        active.city = Set(payload.city);
    }
    if payload.state.is_some() {
        active.state = Set(payload.state);
    }
    if payload.postal_code.is_some() {
        active.postal_code = Set(payload.postal_code);
    }
    if payload.country_id.is_some() {
        active.country_id = Set(payload.country_id);
    }

    let updated = active.update(&state.db).await?;
    Ok(Json(updated))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = find_employee(&state, id).await?;
    existing.delete(&state.db).await?;
    Ok(no_content_response())
}

pub async fn get_employee_roles(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<role::Model>>, ServiceError> {
    find_employee(&state, id).await?;

    let role_ids: Vec<i32> = employee_role::Entity::find()
        .filter(employee_role::Column::EmployeeId.eq(id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|assignment| assignment.role_id)
        .collect();

    let roles = role::Entity::find()
        .filter(role::Column::Id.is_in(role_ids))
        .all(&state.db)
        .await?;
    Ok(Json(roles))
}

pub async fn assign_role(
    State(state): State<AppState>,
    Path((id, role_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ServiceError> {
    find_employee(&state, id).await?;
    role::Entity::find_by_id(role_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Role", role_id))?;

    let existing = employee_role::Entity::find_by_id((id, role_id))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ServiceError::InvalidInput(
            "Role is already assigned to this employee".to_string(),
        ));
    }

    let assignment = employee_role::ActiveModel {
        employee_id: Set(id),
        role_id: Set(role_id),
    }
    .insert(&state.db)
    .await?;

    Ok(created_response(assignment))
}

pub async fn unassign_role(
    State(state): State<AppState>,
    Path((id, role_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ServiceError> {
    let assignment = employee_role::Entity::find_by_id((id, role_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound("Role assignment not found".to_string())
        })?;

    assignment.delete(&state.db).await?;
    Ok(no_content_response())
}

/// Pull this employee's record from the directory
///
/// Upstream failures surface as 500 here; there is no per-record isolation
/// on single-record operations.
pub async fn sync_from_directory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<employee::Model>, ServiceError> {
    let existing = find_employee(&state, id).await?;
    let updated = state.sync.service().pull_employee(existing).await?;
    Ok(Json(updated))
}

/// Push this employee's non-null profile fields to the directory
///
/// Last writer wins; no conflict detection.
pub async fn push_to_directory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let existing = find_employee(&state, id).await?;
    let oid = existing.azure_oid.clone().ok_or_else(|| {
        ServiceError::InvalidInput("Employee has no directory identity to push to".to_string())
    })?;

    let patch = graph_patch_from_employee(&existing);
    let updated = state.graph.update_user(&oid, &patch).await?;

    info!(employee_id = id, "Pushed employee profile to directory");
    Ok(Json(serde_json::json!({
        "employee_id": id,
        "directory_user": updated,
    })))
}
