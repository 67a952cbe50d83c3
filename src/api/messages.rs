//! Contact-message inbox endpoints.
//!
//! Ticket-like lifecycle with no ownership concept: unresolved ->
//! in-progress -> resolved, moved only by explicit status updates.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::status::MessageStatus;
use crate::error::{ApiError, ApiResult};
use crate::models::Message;

use super::AppState;

#[derive(Debug, Deserialize, Validate)]
pub(super) struct MessagePayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "full_name is required"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "email_address is required"))]
    pub email_address: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "phone_number is required"))]
    pub phone_number: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "subject is required"))]
    pub subject: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListParams {
    /// Exact-match filter; an unknown value simply matches nothing.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

pub(super) async fn create_message(
    State(state): State<AppState>,
    Json(payload): Json<MessagePayload>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    payload.validate()?;
    let message = sqlx::query_as::<_, Message>(
        "INSERT INTO messages (id, full_name, email_address, phone_number, subject, message) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&payload.full_name)
    .bind(&payload.email_address)
    .bind(&payload.phone_number)
    .bind(&payload.subject)
    .bind(&payload.message)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub(super) async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE ($1::TEXT IS NULL OR status = $1) \
         ORDER BY created_at DESC",
    )
    .bind(&params.status)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(messages))
}

/// The status value is validated before the write, so an invalid value
/// never mutates the message.
pub(super) async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Message>> {
    let status = MessageStatus::parse(&req.status).ok_or_else(|| {
        ApiError::validation("status must be one of 'unresolved', 'in-progress' or 'resolved'")
    })?;
    let message = sqlx::query_as::<_, Message>(
        "UPDATE messages SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("message"))?;
    Ok(Json(message))
}

pub(super) async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    let message = sqlx::query_as::<_, Message>("DELETE FROM messages WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("message"))?;
    Ok(Json(message))
}
