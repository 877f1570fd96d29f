//! Handlers for ticket submission, history and the technician workflow.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use andon_core::error::CoreError;
use andon_core::ticket::NewTicket;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Case-insensitive match on station, model, defect code or technician type.
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    #[serde(default)]
    pub technician_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[serde(default)]
    pub action_taken: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceResponse {
    pub ticket_id: String,
    pub announcing: bool,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /api/v1/tickets
///
/// Ticket history, newest first, optionally filtered by `q`.
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> AppResult<impl IntoResponse> {
    let tickets = state.tickets.history(params.q.as_deref());
    Ok(Json(DataResponse { data: tickets }))
}

/// GET /api/v1/tickets/{id}
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let ticket = state.tickets.get(&id).ok_or(CoreError::NotFound {
        entity: "ticket",
        id,
    })?;
    Ok(Json(DataResponse { data: ticket }))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// POST /api/v1/tickets
///
/// Raise a new ticket. All four classification fields are required.
pub async fn create_ticket(
    State(state): State<AppState>,
    Json(input): Json<NewTicket>,
) -> AppResult<impl IntoResponse> {
    let ticket = state.controller.create(&input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: ticket })))
}

/// POST /api/v1/tickets/{id}/acknowledge
pub async fn acknowledge_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<AcknowledgeRequest>,
) -> AppResult<impl IntoResponse> {
    let ticket = state
        .controller
        .acknowledge(&id, &input.technician_name)
        .await?;
    Ok(Json(DataResponse { data: ticket }))
}

/// POST /api/v1/tickets/{id}/resolve
pub async fn resolve_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ResolveRequest>,
) -> AppResult<impl IntoResponse> {
    let ticket = state.controller.resolve(&id, &input.action_taken).await?;
    Ok(Json(DataResponse { data: ticket }))
}

/// POST /api/v1/tickets/{id}/announce
///
/// Repeat the announcement of a pending ticket. Refused, not queued, while
/// audio is locked or another announcement is playing.
pub async fn announce_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let ticket = state.tickets.get(&id).ok_or_else(|| CoreError::NotFound {
        entity: "ticket",
        id: id.clone(),
    })?;

    state.coordinator.repeat(&ticket)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: AnnounceResponse {
                ticket_id: id,
                announcing: true,
            },
        }),
    ))
}
