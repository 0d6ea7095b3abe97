//! Ticket API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ticketd_core::{
    non_blank, parse_date, parse_status, parse_title, Comment, Ticket, TicketError, TicketFilter,
    TicketUpdate,
};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a ticket. All fields are required; they are
/// modelled as options so a missing field maps to a 400 rather than a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    pub title: Option<String>,
    pub text: Option<String>,
    pub status: Option<String>,
    pub creator: Option<String>,
    pub assignee: Option<String>,
}

/// Request body for updating a ticket. Any subset of fields may be supplied.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateTicketBody {
    pub assignee: Option<String>,
    pub status: Option<String>,
    pub commenter: Option<String>,
    pub comment: Option<String>,
}

/// Wire form of a ticket. Field names are the published contract.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub title: String,
    pub status: String,
    pub text: String,
    pub create_time: String,
    pub close_time: Option<String>,
    pub delete_time: Option<String>,
    pub creator: String,
    pub assignee: String,
    pub comments: Vec<Comment>,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            title: ticket.title,
            status: ticket.status.as_str().to_string(),
            text: ticket.text,
            create_time: ticket.create_time.to_rfc3339(),
            close_time: ticket.close_time.map(|t| t.to_rfc3339()),
            delete_time: ticket.delete_time.map(|t| t.to_rfc3339()),
            creator: ticket.creator,
            assignee: ticket.assignee,
            comments: ticket.comments,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TicketErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<TicketErrorResponse>);

fn error_response(err: TicketError) -> ApiError {
    let status = match err {
        TicketError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        TicketError::NotFound(_) => StatusCode::NOT_FOUND,
        TicketError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(TicketErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn required(field: Option<String>, name: &str) -> Result<String, TicketError> {
    field.ok_or_else(|| TicketError::InvalidArgument(format!("Missing required field: {}", name)))
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new ticket
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTicketBody>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let title = required(body.title, "title")
        .and_then(|raw| parse_title(&raw))
        .map_err(error_response)?;
    let status = required(body.status, "status")
        .and_then(|raw| parse_status(&raw))
        .map_err(error_response)?;
    let text = required(body.text, "text").map_err(error_response)?;
    let creator = required(body.creator, "creator").map_err(error_response)?;
    let assignee = required(body.assignee, "assignee").map_err(error_response)?;

    let ticket = state
        .tickets()
        .create(title, text, status, creator, assignee)
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

/// Get a ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    let ticket = state.tickets().get(&id).map_err(error_response)?;
    Ok(Json(TicketResponse::from(ticket)))
}

/// List tickets with optional filters.
///
/// `status` may repeat (membership filter); `create_lb`, `create_ub`,
/// `close_lb`, `close_ub` are inclusive date bounds. Unparseable dates are
/// treated as absent; an invalid status value is a 400. Unknown query keys
/// are ignored.
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<TicketResponse>>, ApiError> {
    let mut filter = TicketFilter::new();

    for (key, value) in &params {
        match key.as_str() {
            "status" => filter
                .statuses
                .push(parse_status(value).map_err(error_response)?),
            "create_lb" => filter.create_lb = parse_date(value),
            "create_ub" => filter.create_ub = parse_date(value),
            "close_lb" => filter.close_lb = parse_date(value),
            "close_ub" => filter.close_ub = parse_date(value),
            _ => {}
        }
    }

    let tickets = state.tickets().list(&filter).map_err(error_response)?;

    Ok(Json(
        tickets.into_iter().map(TicketResponse::from).collect(),
    ))
}

/// Update a ticket: assignee, status, and/or one commenter+comment pair.
///
/// Responds 201 on success; the original service used 201 for updates and
/// clients depend on it.
pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<UpdateTicketBody>>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let status = body
        .status
        .as_deref()
        .map(parse_status)
        .transpose()
        .map_err(error_response)?;

    let update = TicketUpdate {
        assignee: non_blank(body.assignee.as_deref()),
        status,
        commenter: non_blank(body.commenter.as_deref()),
        comment: non_blank(body.comment.as_deref()),
    };

    let ticket = state.tickets().update(&id, update).map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}
