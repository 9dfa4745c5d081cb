use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::{json, Value};
use std::path::{Path as FilePath, PathBuf};
use uuid::Uuid;

use super::common::created_response;
use super::tickets::TICKETS_MODULE_KEY;
use crate::auth::{current_employee, AuthUser};
use crate::entities::{ticket, ticket_attachment};
use crate::errors::ServiceError;
use crate::services::permissions::load_for_employee;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tickets/{id}/attachments",
            get(list_attachments).post(create_attachment),
        )
        .route(
            "/attachments/{id}",
            get(get_attachment).delete(delete_attachment),
        )
}

async fn find_attachment(
    state: &AppState,
    id: i32,
) -> Result<ticket_attachment::Model, ServiceError> {
    ticket_attachment::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Attachment not found".to_string()))
}

async fn ensure_ticket_exists(state: &AppState, ticket_id: i32) -> Result<(), ServiceError> {
    ticket::Entity::find_by_id(ticket_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Ticket not found".to_string()))?;
    Ok(())
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Path(ticket_id): Path<i32>,
) -> Result<Json<Vec<ticket_attachment::Model>>, ServiceError> {
    ensure_ticket_exists(&state, ticket_id).await?;

    let attachments = ticket_attachment::Entity::find()
        .filter(ticket_attachment::Column::TicketId.eq(ticket_id))
        .order_by_asc(ticket_attachment::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(attachments))
}

/// Fetch an attachment; streams the stored file when present, metadata
/// otherwise
pub async fn get_attachment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let attachment = find_attachment(&state, id).await?;

    if let Some(relative) = &attachment.file_path {
        let mut absolute = PathBuf::from(&state.config.upload_dir);
        absolute.push(relative);

        if let Ok(bytes) = tokio::fs::read(&absolute).await {
            let file_name = attachment
                .file_name
                .clone()
                .or_else(|| {
                    absolute
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                })
                .unwrap_or_else(|| "attachment".to_string());
            let content_type = attachment
                .file_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string());

            return Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", file_name),
                    ),
                ],
                bytes,
            )
                .into_response());
        }
        // File missing on disk: fall through to metadata
    }

    Ok(Json(attachment).into_response())
}

/// Attach a file to a ticket (multipart form)
///
/// Accepts either an uploaded `file` or metadata-only fields (`file_name`,
/// `file_type`, `file_path`) from clients that store files elsewhere.
pub async fn create_attachment(
    State(state): State<AppState>,
    Path(ticket_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_ticket_exists(&state, ticket_id).await?;

    let mut ticket_message_id: Option<i32> = None;
    let mut file_name: Option<String> = None;
    let mut file_type: Option<String> = None;
    let mut file_path: Option<String> = None;
    let mut upload: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "ticket_message_id" => {
                let text = field.text().await.map_err(bad_field)?;
                if !text.is_empty() {
                    ticket_message_id = Some(text.parse().map_err(|_| {
                        ServiceError::ValidationError(
                            "ticket_message_id must be an integer".to_string(),
                        )
                    })?);
                }
            }
            "file" => {
                let original = field.file_name().unwrap_or("attachment").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field.bytes().await.map_err(bad_field)?;
                upload = Some((original, content_type, bytes.to_vec()));
            }
            "file_name" => file_name = Some(field.text().await.map_err(bad_field)?),
            "file_type" => file_type = Some(field.text().await.map_err(bad_field)?),
            "file_path" => file_path = Some(field.text().await.map_err(bad_field)?),
            _ => {}
        }
    }

    let mut stored_path = None;
    if let Some((original, content_type, bytes)) = upload {
        let extension = FilePath::new(&original)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let stored_name = format!("{}{}", Uuid::new_v4().simple(), extension);
        let relative = format!("tickets/{}/{}", ticket_id, stored_name);

        let mut absolute = PathBuf::from(&state.config.upload_dir);
        absolute.push("tickets");
        absolute.push(ticket_id.to_string());
        tokio::fs::create_dir_all(&absolute).await.map_err(|e| {
            ServiceError::InternalError(format!("Failed to create upload dir: {}", e))
        })?;
        absolute.push(&stored_name);
        tokio::fs::write(&absolute, &bytes)
            .await
            .map_err(|e| ServiceError::InternalError(format!("Failed to store upload: {}", e)))?;

        stored_path = Some(relative);
        file_name = Some(original);
        file_type = content_type;
    }

    // Metadata-only clients may hand over a path they manage themselves
    let final_path = stored_path.or(file_path);

    let created = ticket_attachment::ActiveModel {
        ticket_id: Set(ticket_id),
        ticket_message_id: Set(ticket_message_id),
        file_name: Set(file_name),
        file_type: Set(file_type),
        file_path: Set(final_path),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created_response(created))
}

fn bad_field(err: axum::extract::multipart::MultipartError) -> ServiceError {
    ServiceError::InvalidInput(format!("Invalid multipart field: {}", err))
}

/// Delete an attachment; requires admin_actions on the tickets module
pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ServiceError> {
    let caller = current_employee(&state.db, &auth).await?;
    let attachment = find_attachment(&state, id).await?;

    let has_admin = load_for_employee(&state.db, caller)
        .await?
        .has_admin_actions(TICKETS_MODULE_KEY);
    if !has_admin {
        return Err(ServiceError::Forbidden(
            "Not allowed to delete attachment".to_string(),
        ));
    }

    attachment.delete(&state.db).await?;
    Ok(Json(json!({ "detail": "Attachment deleted" })))
}
