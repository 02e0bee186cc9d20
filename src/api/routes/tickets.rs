//! Ticket listing endpoint

use axum::{
    Json,
    extract::{Query, State},
};

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{TicketsQuery, TicketsResponse},
};

const MAX_TICKET_LIMIT: usize = 500;

/// GET /api/v1/tickets?limit=50
pub async fn list_tickets(
    State(state): State<ApiState>,
    Query(query): Query<TicketsQuery>,
) -> ApiResult<Json<TicketsResponse>> {
    let limit = query.limit.min(MAX_TICKET_LIMIT);
    let tickets = state.storage.list_tickets(limit).await?;
    let count = tickets.len();

    Ok(Json(TicketsResponse { tickets, count }))
}
