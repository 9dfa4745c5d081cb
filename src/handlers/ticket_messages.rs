use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created_response, validate_input};
use super::tickets::TICKETS_MODULE_KEY;
use crate::auth::{current_employee, AuthUser};
use crate::entities::{employee, ticket, ticket_message};
use crate::errors::ServiceError;
use crate::services::permissions::load_for_employee;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tickets/{id}/messages",
            get(list_messages).post(create_message),
        )
        .route(
            "/messages/{id}",
            get(get_message).patch(update_message).delete(delete_message),
        )
}

/// Message enriched with its author's display name
#[derive(Debug, Serialize, ToSchema)]
pub struct TicketMessageResponse {
    pub id: i32,
    pub ticket_id: i32,
    pub author_id: i32,
    pub author_name: Option<String>,
    pub body: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: Option<chrono::DateTime<Utc>>,
    pub edited_at: Option<chrono::DateTime<Utc>>,
}

impl TicketMessageResponse {
    fn new(message: ticket_message::Model, author: Option<&employee::Model>) -> Self {
        Self {
            id: message.id,
            ticket_id: message.ticket_id,
            author_id: message.author_id,
            author_name: author.and_then(|a| a.display_name.clone()),
            body: message.body,
            created_at: message.created_at,
            updated_at: message.updated_at,
            edited_at: message.edited_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TicketMessageCreate {
    #[validate(length(min = 1))]
    pub body: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TicketMessageUpdate {
    #[validate(length(min = 1))]
    pub body: Option<String>,
}

async fn find_message(
    state: &AppState,
    id: i32,
) -> Result<ticket_message::Model, ServiceError> {
    ticket_message::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Message not found".to_string()))
}

async fn ensure_ticket_exists(state: &AppState, ticket_id: i32) -> Result<(), ServiceError> {
    ticket::Entity::find_by_id(ticket_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Ticket not found".to_string()))?;
    Ok(())
}

/// Author-or-admin check shared by edit and delete
async fn ensure_author_or_admin(
    state: &AppState,
    message: &ticket_message::Model,
    caller: employee::Model,
    action: &str,
) -> Result<(), ServiceError> {
    if message.author_id == caller.id {
        return Ok(());
    }
    let has_admin = load_for_employee(&state.db, caller)
        .await?
        .has_admin_actions(TICKETS_MODULE_KEY);
    if !has_admin {
        return Err(ServiceError::Forbidden(format!(
            "Not allowed to {} message",
            action
        )));
    }
    Ok(())
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(ticket_id): Path<i32>,
) -> Result<Json<Vec<TicketMessageResponse>>, ServiceError> {
    ensure_ticket_exists(&state, ticket_id).await?;

    let messages = ticket_message::Entity::find()
        .filter(ticket_message::Column::TicketId.eq(ticket_id))
        .order_by_asc(ticket_message::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let author_ids: Vec<i32> = messages.iter().map(|m| m.author_id).collect();
    let authors = employee::Entity::find()
        .filter(employee::Column::Id.is_in(author_ids))
        .all(&state.db)
        .await?;

    let responses = messages
        .into_iter()
        .map(|message| {
            let author = authors.iter().find(|a| a.id == message.author_id);
            TicketMessageResponse::new(message, author)
        })
        .collect();

    Ok(Json(responses))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TicketMessageResponse>, ServiceError> {
    let message = find_message(&state, id).await?;
    let author = employee::Entity::find_by_id(message.author_id)
        .one(&state.db)
        .await?;
    Ok(Json(TicketMessageResponse::new(message, author.as_ref())))
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(ticket_id): Path<i32>,
    Json(payload): Json<TicketMessageCreate>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let caller = current_employee(&state.db, &auth).await?;
    ensure_ticket_exists(&state, ticket_id).await?;

    let created = ticket_message::ActiveModel {
        ticket_id: Set(ticket_id),
        author_id: Set(caller.id),
        body: Set(Some(payload.body)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let author = employee::Entity::find_by_id(created.author_id)
        .one(&state.db)
        .await?;
    Ok(created_response(TicketMessageResponse::new(
        created,
        author.as_ref(),
    )))
}

/// Edit a message; only its author or a tickets admin may do so
pub async fn update_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<TicketMessageUpdate>,
) -> Result<Json<TicketMessageResponse>, ServiceError> {
    validate_input(&payload)?;
    let caller = current_employee(&state.db, &auth).await?;
    let message = find_message(&state, id).await?;
    ensure_author_or_admin(&state, &message, caller, "edit").await?;

    let mut active: ticket_message::ActiveModel = message.into();
    if payload.body.is_some() {
        active.body = Set(payload.body);
    }
    let now = Utc::now();
    active.updated_at = Set(Some(now));
    active.edited_at = Set(Some(now));

    let updated = active.update(&state.db).await?;
    let author = employee::Entity::find_by_id(updated.author_id)
        .one(&state.db)
        .await?;
    Ok(Json(TicketMessageResponse::new(updated, author.as_ref())))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ServiceError> {
    let caller = current_employee(&state.db, &auth).await?;
    let message = find_message(&state, id).await?;
    ensure_author_or_admin(&state, &message, caller, "delete").await?;

    message.delete(&state.db).await?;
    Ok(Json(json!({ "detail": "Message deleted" })))
}
