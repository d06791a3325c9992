//! Publishing endpoint
//!
//! - POST /send

use axum::{Json, Router, extract::State, routing::post};

use super::dto::{SendRequest, SendResponse};
use crate::AppState;
use crate::data::PostKind;
use crate::error::AppError;

/// Create publish router
pub fn publish_router() -> Router<AppState> {
    Router::new().route("/send", post(send))
}

/// POST /send
///
/// Stores the message as a post of `senderHandle` and enqueues it for
/// delivery to that actor's followers.
async fn send(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, AppError> {
    let kind = match request.kind.as_deref() {
        None => PostKind::Note,
        Some(value) => PostKind::parse(value).ok_or_else(|| {
            AppError::Validation(format!("unsupported object type {value:?}"))
        })?,
    };

    if let Some(recipient) = request.recipient.as_deref() {
        tracing::debug!(recipient = %recipient, "Ignoring explicit recipient, addressing followers");
    }

    let receipt = state
        .publisher
        .publish(request.sender_handle.trim(), &request.message, kind)
        .await?;

    Ok(Json(SendResponse {
        status: "success",
        activity_id: receipt.activity_id,
    }))
}
