use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use chatlens::StatisticsSnapshot;

use crate::{error::ApiResult, state::AppState};

const PEAK_HOURS: usize = 3;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeakHour {
    pub hour: u32,
    pub count: u64,
}

/// Statistics snapshot plus chart-ready extras
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationResponse {
    #[serde(flatten)]
    pub snapshot: StatisticsSnapshot,
    pub peak_hours: Vec<PeakHour>,
}

/// Activity statistics of a room
///
/// Served from the snapshot cache while the room is unchanged; the
/// `watermark` field tells which room state the numbers describe.
#[utoipa::path(
    get,
    path = "/api/visualization/{room_id}",
    params(("room_id" = String, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Statistics snapshot with peakHours"),
        (status = 404, description = "Room not found")
    ),
    tag = "statistics"
)]
pub async fn visualization(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<VisualizationResponse>> {
    let snapshot = state.chatlens.snapshot(&room_id).await?;
    let peak_hours = snapshot
        .peak_hours(PEAK_HOURS)
        .into_iter()
        .map(|(hour, count)| PeakHour { hour, count })
        .collect();

    Ok(Json(VisualizationResponse {
        snapshot: snapshot.as_ref().clone(),
        peak_hours,
    }))
}
