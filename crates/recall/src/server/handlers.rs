use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::RecallError;
use crate::memory::types::{ChangeEntry, Snapshot};
use crate::server::AppState;

/// Request body for recording a message
#[derive(Debug, Deserialize)]
pub struct RecordMessageRequest {
    pub message: String,
}

/// Response for a recorded message: the change log plus the freshly
/// rendered context block
#[derive(Debug, Serialize)]
pub struct RecordMessageResponse {
    pub changes: Vec<ChangeEntry>,
    pub context: String,
}

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub context: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

pub async fn record_message_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(request): Json<RecordMessageRequest>,
) -> Response {
    let changes = match state.service.record_message(&user_id, &request.message).await {
        Ok(changes) => changes,
        Err(e) => return error_response(e),
    };

    match state.service.context(&user_id).await {
        Ok(context) => Json(RecordMessageResponse { changes, context }).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn memories_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Response {
    match state.service.snapshot(&user_id).await {
        Ok(snapshot) => Json::<Snapshot>(snapshot).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn context_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Response {
    match state.service.context(&user_id).await {
        Ok(context) => Json(ContextResponse { context }).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_all_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Response {
    match state.service.delete_all(&user_id).await {
        Ok(deleted) => Json(DeleteResponse { deleted }).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_field_handler(
    State(state): State<Arc<AppState>>,
    Path((user_id, field)): Path<(String, String)>,
) -> Response {
    match state.service.delete_field(&user_id, &field).await {
        Ok(true) => Json(DeleteResponse { deleted: true }).into_response(),
        Ok(false) => create_error_response(
            StatusCode::NOT_FOUND,
            "field_not_found",
            &format!("No memory field '{field}' for this user"),
        ),
        Err(e) => error_response(e),
    }
}

/// Map service errors to HTTP responses.
///
/// "Storage unavailable" is the one transient condition clients can
/// meaningfully retry, so it gets its own status.
fn error_response(error: RecallError) -> Response {
    tracing::error!("Request failed: {error}");
    match error {
        RecallError::StorageUnavailable(msg) => {
            create_error_response(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", &msg)
        }
        other => create_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            &other.to_string(),
        ),
    }
}

/// Create a JSON error response
fn create_error_response(status: StatusCode, error_type: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "type": error_type,
            "message": message,
        }
    });

    (status, Json(body)).into_response()
}
