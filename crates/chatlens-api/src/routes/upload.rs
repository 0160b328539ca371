use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use chatlens::RoomTarget;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub room_id: String,
    pub room_name: String,
    pub new_messages: usize,
    pub parsed_messages: usize,
    pub skipped_lines: usize,
    pub duplicate: bool,
    pub message: String,
}

/// Upload a chat export
///
/// Multipart fields: `file` (required), `roomId` to append to an existing
/// room, `roomName` to reuse or name a room.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = Object, content_type = "multipart/form-data", description = "Chat export (.txt or .csv) with optional roomId / roomName"),
    responses(
        (status = 200, description = "Export ingested", body = UploadResponse),
        (status = 400, description = "Invalid upload"),
        (status = 404, description = "Target room not found"),
        (status = 413, description = "Upload too large"),
        (status = 422, description = "Unrecognized export format")
    ),
    tag = "upload"
)]
pub async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> ApiResult<Json<UploadResponse>> {
    let mut file = None;
    let mut room_id = None;
    let mut room_name = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await?;
                file = Some((file_name, data));
            }
            "roomId" => room_id = Some(field.text().await?),
            "roomName" => room_name = Some(field.text().await?),
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    let (file_name, data) = file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field in multipart form".to_string()))?;

    let report = state
        .chatlens
        .ingestion()
        .ingest(&file_name, &data, RoomTarget::new(room_id, room_name))
        .await?;
    let outcome = report.outcome;

    let message = if outcome.duplicate {
        format!("'{}' was already uploaded; nothing changed", file_name)
    } else {
        format!("Added {} messages to '{}'", outcome.new_messages, outcome.room.name)
    };

    Ok(Json(UploadResponse {
        success: true,
        file_id: outcome.file.id,
        room_id: outcome.room.id,
        room_name: outcome.room.name,
        new_messages: outcome.new_messages,
        parsed_messages: report.parsed_messages,
        skipped_lines: report.skipped_lines,
        duplicate: outcome.duplicate,
        message,
    }))
}
