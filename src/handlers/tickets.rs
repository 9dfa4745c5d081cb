use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created_response, validate_input};
use crate::auth::{current_employee, AuthUser};
use crate::entities::ticket::{TicketPriority, TicketSla, TicketStatus};
use crate::entities::{employee, ticket};
use crate::errors::ServiceError;
use crate::services::permissions::load_for_employee;
use crate::AppState;

/// Module key ticket admin rights are read from
pub const TICKETS_MODULE_KEY: &str = "tickets";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route(
            "/{id}",
            get(get_ticket).patch(update_ticket).delete(delete_ticket),
        )
}

/// Employee summary embedded in ticket responses
#[derive(Debug, Serialize, ToSchema)]
pub struct TicketEmployee {
    pub id: i32,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
}

impl TicketEmployee {
    fn from_model(model: &employee::Model) -> Self {
        Self {
            id: model.id,
            display_name: model.display_name.clone(),
            email: model.email.clone(),
            title: model.title.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketResponse {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub sla: Option<TicketSla>,
    pub created_by: i32,
    pub assigned_to: Option<i32>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub creator: Option<TicketEmployee>,
    pub assignee: Option<TicketEmployee>,
}

impl TicketResponse {
    fn new(
        ticket: ticket::Model,
        creator: Option<&employee::Model>,
        assignee: Option<&employee::Model>,
    ) -> Self {
        Self {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            status: ticket.status,
            priority: ticket.priority,
            sla: ticket.sla,
            created_by: ticket.created_by,
            assigned_to: ticket.assigned_to,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
            creator: creator.map(TicketEmployee::from_model),
            assignee: assignee.map(TicketEmployee::from_model),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TicketCreate {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default = "default_ticket_status")]
    pub status: TicketStatus,
    #[serde(default = "default_ticket_priority")]
    pub priority: TicketPriority,
    pub sla: Option<TicketSla>,
    pub assigned_to: Option<i32>,
}

fn default_ticket_status() -> TicketStatus {
    TicketStatus::Todo
}

fn default_ticket_priority() -> TicketPriority {
    TicketPriority::Normal
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TicketUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub sla: Option<TicketSla>,
    pub assigned_to: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct TicketFilters {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub sla: Option<TicketSla>,
    pub assigned_to: Option<i32>,
    pub created_by: Option<i32>,
    /// Matches against title and description
    pub search: Option<String>,
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    50
}

async fn find_ticket(state: &AppState, id: i32) -> Result<ticket::Model, ServiceError> {
    ticket::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Ticket not found".to_string()))
}

async fn to_response(
    state: &AppState,
    ticket: ticket::Model,
) -> Result<TicketResponse, ServiceError> {
    let mut ids = vec![ticket.created_by];
    if let Some(assignee) = ticket.assigned_to {
        ids.push(assignee);
    }
    let employees = employee::Entity::find()
        .filter(employee::Column::Id.is_in(ids))
        .all(&state.db)
        .await?;

    let creator = employees.iter().find(|e| e.id == ticket.created_by);
    let assignee = ticket
        .assigned_to
        .and_then(|id| employees.iter().find(|e| e.id == id));

    Ok(TicketResponse::new(ticket, creator, assignee))
}

/// Tickets with optional filters and offset/limit pagination, newest first
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(filters): Query<TicketFilters>,
) -> Result<Json<Vec<TicketResponse>>, ServiceError> {
    let mut finder = ticket::Entity::find();

    if let Some(status) = filters.status {
        finder = finder.filter(ticket::Column::Status.eq(status));
    }
    if let Some(priority) = filters.priority {
        finder = finder.filter(ticket::Column::Priority.eq(priority));
    }
    if let Some(sla) = filters.sla {
        finder = finder.filter(ticket::Column::Sla.eq(sla));
    }
    if let Some(assigned_to) = filters.assigned_to {
        finder = finder.filter(ticket::Column::AssignedTo.eq(assigned_to));
    }
    if let Some(created_by) = filters.created_by {
        finder = finder.filter(ticket::Column::CreatedBy.eq(created_by));
    }
    if let Some(search) = filters.search.as_deref().filter(|s| !s.is_empty()) {
        finder = finder.filter(
            Condition::any()
                .add(ticket::Column::Title.contains(search))
                .add(ticket::Column::Description.contains(search)),
        );
    }

    let limit = filters.limit.clamp(1, 100);
    let tickets = finder
        .order_by_desc(ticket::Column::CreatedAt)
        .offset(filters.skip)
        .limit(limit)
        .all(&state.db)
        .await?;

    // Resolve creators and assignees in one query
    let mut employee_ids: Vec<i32> = tickets.iter().map(|t| t.created_by).collect();
    employee_ids.extend(tickets.iter().filter_map(|t| t.assigned_to));
    let employees = employee::Entity::find()
        .filter(employee::Column::Id.is_in(employee_ids))
        .all(&state.db)
        .await?;

    let responses = tickets
        .into_iter()
        .map(|ticket| {
            let creator = employees.iter().find(|e| e.id == ticket.created_by);
            let assignee = ticket
                .assigned_to
                .and_then(|id| employees.iter().find(|e| e.id == id));
            TicketResponse::new(ticket, creator, assignee)
        })
        .collect();

    Ok(Json(responses))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TicketResponse>, ServiceError> {
    let ticket = find_ticket(&state, id).await?;
    Ok(Json(to_response(&state, ticket).await?))
}

/// Create a ticket; the creator is always the authenticated user
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<TicketCreate>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let caller = current_employee(&state.db, &auth).await?;

    if let Some(assigned_to) = payload.assigned_to {
        employee::Entity::find_by_id(assigned_to)
            .one(&state.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Assigned employee not found".to_string()))?;
    }

    let now = Utc::now();
    let created = ticket::ActiveModel {
        title: Set(payload.title),
        description: Set(payload.description),
        status: Set(payload.status),
        priority: Set(payload.priority),
        sla: Set(payload.sla),
        created_by: Set(caller.id),
        assigned_to: Set(payload.assigned_to),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(created_response(to_response(&state, created).await?))
}

/// Update a ticket
///
/// Allowed for the creator, the assignee, or anyone holding admin_actions on
/// the tickets module.
pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<TicketUpdate>,
) -> Result<Json<TicketResponse>, ServiceError> {
    validate_input(&payload)?;
    let caller = current_employee(&state.db, &auth).await?;
    let existing = find_ticket(&state, id).await?;

    let is_creator = existing.created_by == caller.id;
    let is_assignee = existing.assigned_to == Some(caller.id);
    let has_admin = if is_creator || is_assignee {
        false
    } else {
        load_for_employee(&state.db, caller)
            .await?
            .has_admin_actions(TICKETS_MODULE_KEY)
    };

    if !(is_creator || is_assignee || has_admin) {
        return Err(ServiceError::Forbidden(
            "You can only update tickets you created, are assigned to, or have admin permissions"
                .to_string(),
        ));
    }

    if let Some(assigned_to) = payload.assigned_to {
        employee::Entity::find_by_id(assigned_to)
            .one(&state.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Assigned employee not found".to_string()))?;
    }

    let mut active: ticket::ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if payload.description.is_some() {
        active.description = Set(payload.description);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(priority) = payload.priority {
        active.priority = Set(priority);
    }
    if payload.sla.is_some() {
        active.sla = Set(payload.sla);
    }
    if payload.assigned_to.is_some() {
        active.assigned_to = Set(payload.assigned_to);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    Ok(Json(to_response(&state, updated).await?))
}

/// Soft delete: the ticket is marked closed, never removed
///
/// Allowed for the creator or anyone holding admin_actions on the tickets
/// module.
pub async fn delete_ticket(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ServiceError> {
    let caller = current_employee(&state.db, &auth).await?;
    let existing = find_ticket(&state, id).await?;

    let is_creator = existing.created_by == caller.id;
    let has_admin = if is_creator {
        false
    } else {
        load_for_employee(&state.db, caller)
            .await?
            .has_admin_actions(TICKETS_MODULE_KEY)
    };

    if !(is_creator || has_admin) {
        return Err(ServiceError::Forbidden(
            "Only the ticket creator or users with admin permissions can delete it".to_string(),
        ));
    }

    let mut active: ticket::ActiveModel = existing.into();
    active.status = Set(TicketStatus::Closed);
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    Ok(Json(json!({ "detail": "Ticket closed" })))
}
