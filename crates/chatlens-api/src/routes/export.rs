use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub success: bool,
    pub export_id: String,
    pub download_url: String,
    pub room_count: usize,
}

/// Export every room
#[utoipa::path(
    get,
    path = "/api/export",
    responses(
        (status = 200, description = "Export prepared", body = ExportResponse)
    ),
    tag = "export"
)]
pub async fn export_all(State(state): State<Arc<AppState>>) -> ApiResult<Json<ExportResponse>> {
    let summaries = state.chatlens.store().list().await?;
    let mut rooms = Vec::with_capacity(summaries.len());
    for summary in summaries {
        match room_document(&state, &summary.id).await {
            Ok(doc) => rooms.push(doc),
            // Deleted between list and read
            Err(ApiError::NotFound(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Json(publish(&state, rooms).await))
}

/// Export one room
#[utoipa::path(
    post,
    path = "/api/export/{room_id}",
    params(("room_id" = String, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Export prepared", body = ExportResponse),
        (status = 404, description = "Room not found")
    ),
    tag = "export"
)]
pub async fn export_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<ExportResponse>> {
    let doc = room_document(&state, &room_id).await?;
    Ok(Json(publish(&state, vec![doc]).await))
}

/// Download a prepared export
#[utoipa::path(
    get,
    path = "/api/exports/{export_id}",
    params(("export_id" = String, Path, description = "Export ID")),
    responses(
        (status = 200, description = "Export document"),
        (status = 404, description = "Export not found or expired")
    ),
    tag = "export"
)]
pub async fn download_export(
    State(state): State<Arc<AppState>>,
    Path(export_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let exports = state.exports.read().await;
    let document = exports
        .get(&export_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Export not found: {}", export_id)))?;

    let disposition = format!("attachment; filename=\"chatlens-export-{}.json\"", export_id);
    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(document)))
}

async fn room_document(state: &AppState, room_id: &str) -> ApiResult<Value> {
    let store = state.chatlens.store();
    let room = store.get(room_id).await?;
    let files = store.files(room_id).await?;
    let snapshot = state.chatlens.snapshot(room_id).await?;

    Ok(json!({
        "room": room.summary(),
        "messages": room.messages,
        "files": files,
        "statistics": &*snapshot,
    }))
}

async fn publish(state: &AppState, rooms: Vec<Value>) -> ExportResponse {
    let room_count = rooms.len();
    let document = json!({
        "exportedAt": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": rooms,
    });

    let export_id = state.exports.write().await.insert(document);
    tracing::info!(export_id = %export_id, room_count, "Export prepared");

    ExportResponse {
        success: true,
        download_url: format!("/api/exports/{}", export_id),
        export_id,
        room_count,
    }
}
