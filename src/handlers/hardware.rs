use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created_response, no_content_response, validate_input};
use crate::entities::{employee, hardware_item};
use crate::errors::ServiceError;
use crate::AppState;

const DEVICE_TYPES: [&str; 4] = ["Laptop", "Desktop", "Workstation", "Server"];
const STORAGE_TYPES: [&str; 4] = ["HDD", "SSD", "NVMe", "Hybrid"];
const STATUSES: [&str; 4] = ["Active", "In Repair", "Retired", "Spare"];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_hardware).post(create_hardware))
        .route(
            "/{id}",
            get(get_hardware)
                .put(update_hardware)
                .delete(delete_hardware),
        )
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateHardwareRequest {
    #[validate(length(min = 1, max = 50))]
    pub serial_number: String,
    #[validate(length(min = 1, max = 50))]
    pub brand: String,
    pub model: Option<String>,
    pub device_type: Option<String>,
    pub processor: Option<String>,
    pub ram_gb: Option<i32>,
    pub storage_type: Option<String>,
    pub storage_gb: Option<i32>,
    pub gpu: Option<String>,
    pub operating_system: Option<String>,
    pub warranty_start: Option<NaiveDate>,
    pub warranty_end: Option<NaiveDate>,
    pub purchase_date: Option<NaiveDate>,
    pub employee_id: Option<i32>,
    pub location: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    pub notes: Option<String>,
}

fn default_status() -> String {
    "Active".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateHardwareRequest {
    pub serial_number: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub device_type: Option<String>,
    pub processor: Option<String>,
    pub ram_gb: Option<i32>,
    pub storage_type: Option<String>,
    pub storage_gb: Option<i32>,
    pub gpu: Option<String>,
    pub operating_system: Option<String>,
    pub warranty_start: Option<NaiveDate>,
    pub warranty_end: Option<NaiveDate>,
    pub purchase_date: Option<NaiveDate>,
    pub employee_id: Option<i32>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

fn check_one_of(
    value: Option<&str>,
    allowed: &[&str],
    field: &str,
) -> Result<(), ServiceError> {
    if let Some(v) = value {
        if !allowed.contains(&v) {
            return Err(ServiceError::ValidationError(format!(
                "{} must be one of {:?}",
                field, allowed
            )));
        }
    }
    Ok(())
}

async fn find_hardware(state: &AppState, id: i32) -> Result<hardware_item::Model, ServiceError> {
    hardware_item::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Hardware item", id))
}

async fn ensure_unique_serial(state: &AppState, serial: &str) -> Result<(), ServiceError> {
    let existing = hardware_item::Entity::find()
        .filter(hardware_item::Column::SerialNumber.eq(serial))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ServiceError::InvalidInput(format!(
            "Hardware with serial number '{}' already exists",
            serial
        )));
    }
    Ok(())
}

pub async fn list_hardware(
    State(state): State<AppState>,
) -> Result<Json<Vec<hardware_item::Model>>, ServiceError> {
    Ok(Json(hardware_item::Entity::find().all(&state.db).await?))
}

pub async fn get_hardware(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<hardware_item::Model>, ServiceError> {
    Ok(Json(find_hardware(&state, id).await?))
}

pub async fn create_hardware(
    State(state): State<AppState>,
    Json(payload): Json<CreateHardwareRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    check_one_of(payload.device_type.as_deref(), &DEVICE_TYPES, "device_type")?;
    check_one_of(
        payload.storage_type.as_deref(),
        &STORAGE_TYPES,
        "storage_type",
    )?;
    check_one_of(Some(payload.status.as_str()), &STATUSES, "status")?;
    ensure_unique_serial(&state, &payload.serial_number).await?;

    if let Some(employee_id) = payload.employee_id {
        employee::Entity::find_by_id(employee_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Employee", employee_id))?;
    }

    let created = hardware_item::ActiveModel {
        serial_number: Set(payload.serial_number),
        brand: Set(payload.brand),
        model: Set(payload.model),
        device_type: Set(payload.device_type),
        processor: Set(payload.processor),
        ram_gb: Set(payload.ram_gb),
        storage_type: Set(payload.storage_type),
        storage_gb: Set(payload.storage_gb),
        gpu: Set(payload.gpu),
        operating_system: Set(payload.operating_system),
        warranty_start: Set(payload.warranty_start),
        warranty_end: Set(payload.warranty_end),
        purchase_date: Set(payload.purchase_date),
        employee_id: Set(payload.employee_id),
        location: Set(payload.location),
        status: Set(payload.status),
        notes: Set(payload.notes),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created_response(created))
}

pub async fn update_hardware(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateHardwareRequest>,
) -> Result<Json<hardware_item::Model>, ServiceError> {
    validate_input(&payload)?;
    check_one_of(payload.device_type.as_deref(), &DEVICE_TYPES, "device_type")?;
    check_one_of(
        payload.storage_type.as_deref(),
        &STORAGE_TYPES,
        "storage_type",
    )?;
    check_one_of(payload.status.as_deref(), &STATUSES, "status")?;

    let existing = find_hardware(&state, id).await?;

    if let Some(serial) = &payload.serial_number {
        if serial != &existing.serial_number {
            ensure_unique_serial(&state, serial).await?;
        }
    }
    if let Some(employee_id) = payload.employee_id {
        employee::Entity::find_by_id(employee_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Employee", employee_id))?;
    }

    let mut active: hardware_item::ActiveModel = existing.into();
    if let Some(serial) = payload.serial_number {
        active.serial_number = Set(serial);
    }
    if let Some(brand) = payload.brand {
        active.brand = Set(brand);
    }
    if payload.model.is_some() {
        active.model = Set(payload.model);
    }
    if payload.device_type.is_some() {
        active.device_type = Set(payload.device_type);
    }
    if payload.processor.is_some() {
        active.processor = Set(payload.processor);
    }
    if payload.ram_gb.is_some() {
        active.ram_gb = Set(payload.ram_gb);
    }
    if payload.storage_type.is_some() {
        active.storage_type = Set(payload.storage_type);
    }
    if payload.storage_gb.is_some() {
        active.storage_gb = Set(payload.storage_gb);
    }
    if payload.gpu.is_some() {
        active.gpu = Set(payload.gpu);
    }
    if payload.operating_system.is_some() {
        active.operating_system = Set(payload.operating_system);
    }
    if payload.warranty_start.is_some() {
        active.warranty_start = Set(payload.warranty_start);
    }
    if payload.warranty_end.is_some() {
        active.warranty_end = Set(payload.warranty_end);
    }
    if payload.purchase_date.is_some() {
        active.purchase_date = Set(payload.purchase_date);
    }
    if payload.employee_id.is_some() {
        active.employee_id = Set(payload.employee_id);
    }
    if payload.location.is_some() {
        active.location = Set(payload.location);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if payload.notes.is_some() {
        active.notes = Set(payload.notes);
    }
    active.updated_at = Set(Some(Utc::now()));

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_hardware(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = find_hardware(&state, id).await?;
    existing.delete(&state.db).await?;
    Ok(no_content_response())
}
