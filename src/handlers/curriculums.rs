use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};
use serde::Deserialize;
use std::path::{Path as FilePath, PathBuf};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::{created_response, no_content_response, validate_input};
use crate::entities::{curriculum, job};
use crate::errors::ServiceError;
use crate::AppState;

/// Resume formats accepted on upload
const ALLOWED_EXTENSIONS: [&str; 4] = [".pdf", ".doc", ".docx", ".txt"];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_curriculums).post(create_curriculum))
        .route("/upload", post(create_curriculum_with_file))
        .route("/job/{job_id}", get(curriculums_by_job))
        .route("/status/{status}", get(curriculums_by_status))
        .route(
            "/{id}",
            get(get_curriculum)
                .put(update_curriculum)
                .delete(delete_curriculum),
        )
        .route("/{id}/download", get(download_curriculum_file))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CurriculumCreate {
    pub job_id: i32,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub cover_letter: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    pub employee_id: Option<i32>,
}

fn default_status() -> String {
    "pending".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CurriculumUpdate {
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cover_letter: Option<String>,
    pub status: Option<String>,
    pub employee_id: Option<i32>,
}

async fn find_curriculum(state: &AppState, id: i32) -> Result<curriculum::Model, ServiceError> {
    curriculum::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Curriculum", id))
}

async fn ensure_job_exists(state: &AppState, job_id: i32) -> Result<(), ServiceError> {
    job::Entity::find_by_id(job_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Job", job_id))?;
    Ok(())
}

fn file_extension(file_name: &str) -> String {
    FilePath::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Store an uploaded resume and return its path relative to the upload root
async fn save_resume(
    state: &AppState,
    file_name: &str,
    bytes: &[u8],
) -> Result<String, ServiceError> {
    let extension = file_extension(file_name);
    let stored_name = format!("{}{}", Uuid::new_v4(), extension);

    let relative = format!("curriculums/{}", stored_name);
    let mut absolute = PathBuf::from(&state.config.upload_dir);
    absolute.push("curriculums");

    tokio::fs::create_dir_all(&absolute)
        .await
        .map_err(|e| ServiceError::InternalError(format!("Failed to create upload dir: {}", e)))?;

    absolute.push(&stored_name);
    tokio::fs::write(&absolute, bytes)
        .await
        .map_err(|e| ServiceError::InternalError(format!("Failed to store upload: {}", e)))?;

    Ok(relative)
}

/// Submit an application with a resume file (multipart form)
pub async fn create_curriculum_with_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    let mut job_id: Option<i32> = None;
    let mut name: Option<String> = None;
    let mut email: Option<String> = None;
    let mut phone: Option<String> = None;
    let mut cover_letter: Option<String> = None;
    let mut status = default_status();
    let mut employee_id: Option<i32> = None;
    let mut resume: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "job_id" => {
                let text = field.text().await.map_err(bad_field)?;
                job_id = Some(text.parse().map_err(|_| {
                    ServiceError::ValidationError("job_id must be an integer".to_string())
                })?);
            }
            "name" => name = Some(field.text().await.map_err(bad_field)?),
            "email" => email = Some(field.text().await.map_err(bad_field)?),
            "phone" => phone = Some(field.text().await.map_err(bad_field)?),
            "cover_letter" => cover_letter = Some(field.text().await.map_err(bad_field)?),
            "status" => status = field.text().await.map_err(bad_field)?,
            "employee_id" => {
                let text = field.text().await.map_err(bad_field)?;
                if !text.is_empty() {
                    employee_id = Some(text.parse().map_err(|_| {
                        ServiceError::ValidationError("employee_id must be an integer".to_string())
                    })?);
                }
            }
            "resume_file" => {
                let file_name = field.file_name().unwrap_or("resume").to_string();
                let bytes = field.bytes().await.map_err(bad_field)?;
                resume = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let job_id =
        job_id.ok_or_else(|| ServiceError::ValidationError("job_id is required".to_string()))?;
    let name =
        name.ok_or_else(|| ServiceError::ValidationError("name is required".to_string()))?;
    let email =
        email.ok_or_else(|| ServiceError::ValidationError("email is required".to_string()))?;
    let (file_name, bytes) = resume
        .ok_or_else(|| ServiceError::ValidationError("resume_file is required".to_string()))?;

    ensure_job_exists(&state, job_id).await?;

    let extension = file_extension(&file_name);
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ServiceError::InvalidInput(
            "Invalid file type. Only PDF, DOC, DOCX, and TXT files are allowed.".to_string(),
        ));
    }

    let stored_path = save_resume(&state, &file_name, &bytes).await?;

    let created = curriculum::ActiveModel {
        job_id: Set(job_id),
        name: Set(name),
        email: Set(email),
        phone: Set(phone),
        file_path: Set(Some(stored_path)),
        cover_letter: Set(cover_letter),
        status: Set(status),
        submitted_at: Set(Utc::now()),
        employee_id: Set(employee_id),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(curriculum_id = created.id, "Curriculum uploaded");
    Ok(created_response(created))
}

fn bad_field(err: axum::extract::multipart::MultipartError) -> ServiceError {
    ServiceError::InvalidInput(format!("Invalid multipart field: {}", err))
}

/// Submit an application without a file
pub async fn create_curriculum(
    State(state): State<AppState>,
    Json(payload): Json<CurriculumCreate>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    ensure_job_exists(&state, payload.job_id).await?;

    let created = curriculum::ActiveModel {
        job_id: Set(payload.job_id),
        name: Set(payload.name),
        email: Set(payload.email),
        phone: Set(payload.phone),
        cover_letter: Set(payload.cover_letter),
        status: Set(payload.status),
        submitted_at: Set(Utc::now()),
        employee_id: Set(payload.employee_id),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created_response(created))
}

pub async fn list_curriculums(
    State(state): State<AppState>,
) -> Result<Json<Vec<curriculum::Model>>, ServiceError> {
    Ok(Json(curriculum::Entity::find().all(&state.db).await?))
}

pub async fn get_curriculum(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<curriculum::Model>, ServiceError> {
    Ok(Json(find_curriculum(&state, id).await?))
}

pub async fn curriculums_by_job(
    State(state): State<AppState>,
    Path(job_id): Path<i32>,
) -> Result<Json<Vec<curriculum::Model>>, ServiceError> {
    let curriculums = curriculum::Entity::find()
        .filter(curriculum::Column::JobId.eq(job_id))
        .all(&state.db)
        .await?;
    Ok(Json(curriculums))
}

pub async fn curriculums_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<Vec<curriculum::Model>>, ServiceError> {
    let curriculums = curriculum::Entity::find()
        .filter(curriculum::Column::Status.eq(status))
        .all(&state.db)
        .await?;
    Ok(Json(curriculums))
}

pub async fn update_curriculum(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CurriculumUpdate>,
) -> Result<Json<curriculum::Model>, ServiceError> {
    validate_input(&payload)?;
    let existing = find_curriculum(&state, id).await?;

    let mut active: curriculum::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(email) = payload.email {
        active.email = Set(email);
    }
    if payload.phone.is_some() {
        active.phone = Set(payload.phone);
    }
    if payload.cover_letter.is_some() {
        active.cover_letter = Set(payload.cover_letter);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if payload.employee_id.is_some() {
        active.employee_id = Set(payload.employee_id);
    }

    Ok(Json(active.update(&state.db).await?))
}

/// Stream the stored resume of an application
pub async fn download_curriculum_file(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let existing = find_curriculum(&state, id).await?;
    let relative = existing.file_path.ok_or_else(|| {
        ServiceError::NotFound("Curriculum has no stored file".to_string())
    })?;

    let mut absolute = PathBuf::from(&state.config.upload_dir);
    absolute.push(&relative);

    let bytes = tokio::fs::read(&absolute)
        .await
        .map_err(|_| ServiceError::NotFound("Stored file is missing".to_string()))?;

    let download_name = absolute
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "resume".to_string());

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub async fn delete_curriculum(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = find_curriculum(&state, id).await?;
    existing.delete(&state.db).await?;
    Ok(no_content_response())
}
