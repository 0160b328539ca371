use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use chatlens::{AnalysisRequest, IngestedFile, Message, MessageQuery, RoomSummary};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

const MAX_MESSAGE_LIMIT: usize = 1000;

#[derive(Debug, Serialize, ToSchema)]
pub struct ListRoomsResponse {
    #[schema(value_type = Vec<Object>)]
    pub rooms: Vec<RoomSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoomResponse {
    #[schema(value_type = Object)]
    pub room: RoomSummary,
    #[schema(value_type = Vec<Object>)]
    pub files: Vec<IngestedFile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteRoomResponse {
    pub success: bool,
    /// `false` when the room did not exist
    pub removed: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchMessagesQuery {
    /// Comma-separated keywords; a message matches when it contains any
    pub q: Option<String>,
    /// Comma-separated author names
    pub user: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    200
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchMessagesResponse {
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<Message>,
    pub has_more: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalysisHistoryResponse {
    #[schema(value_type = Vec<Object>)]
    pub analyses: Vec<AnalysisRequest>,
}

/// List rooms, most recently active first
#[utoipa::path(
    get,
    path = "/api/rooms",
    responses(
        (status = 200, description = "Room summaries", body = ListRoomsResponse)
    ),
    tag = "rooms"
)]
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> ApiResult<Json<ListRoomsResponse>> {
    let rooms = state.chatlens.store().list().await?;
    Ok(Json(ListRoomsResponse { rooms }))
}

/// Get a room with its uploaded files
#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}",
    params(("room_id" = String, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room found", body = RoomResponse),
        (status = 404, description = "Room not found")
    ),
    tag = "rooms"
)]
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<RoomResponse>> {
    let store = state.chatlens.store();
    let room = store.get(&room_id).await?;
    let files = store.files(&room_id).await?;
    Ok(Json(RoomResponse {
        room: room.summary(),
        files,
    }))
}

/// Delete a room with its messages and files
///
/// Deleting an absent room succeeds with `removed: false`.
#[utoipa::path(
    delete,
    path = "/api/rooms/{room_id}",
    params(("room_id" = String, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room deleted or already absent", body = DeleteRoomResponse)
    ),
    tag = "rooms"
)]
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<DeleteRoomResponse>> {
    let removed = match state.chatlens.delete_room(&room_id).await {
        Ok(()) => true,
        Err(e) if e.is_not_found() => false,
        Err(e) => return Err(e.into()),
    };

    tracing::info!(room_id = %room_id, removed, "Room delete requested");
    Ok(Json(DeleteRoomResponse { success: true, removed }))
}

/// Search the messages of a room
///
/// Dates are `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM[:SS]`; a date-only `to`
/// includes that whole day.
#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/messages",
    params(
        ("room_id" = String, Path, description = "Room ID"),
        ("q" = Option<String>, Query, description = "Comma-separated keywords, any may match"),
        ("user" = Option<String>, Query, description = "Comma-separated author names"),
        ("from" = Option<String>, Query, description = "Earliest timestamp, inclusive"),
        ("to" = Option<String>, Query, description = "Latest timestamp, inclusive"),
        ("limit" = Option<usize>, Query, description = "Maximum number of messages (default: 200)")
    ),
    responses(
        (status = 200, description = "Matching messages in room order", body = SearchMessagesResponse),
        (status = 400, description = "Malformed date or empty range"),
        (status = 404, description = "Room not found")
    ),
    tag = "rooms"
)]
pub async fn search_messages(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(params): Query<SearchMessagesQuery>,
) -> ApiResult<Json<SearchMessagesResponse>> {
    let limit = params.limit.clamp(1, MAX_MESSAGE_LIMIT);
    let from = params.from.as_deref().map(|v| parse_bound(v, NaiveTime::default())).transpose()?;
    let to = params
        .to
        .as_deref()
        .map(|v| parse_bound(v, NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::default())))
        .transpose()?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ApiError::BadRequest("'from' is after 'to'".to_string()));
        }
    }

    let query = MessageQuery {
        keywords: split_list(params.q.as_deref()),
        authors: split_list(params.user.as_deref()),
        from,
        to,
        limit: Some(limit + 1),
    };
    let mut messages = state.chatlens.store().messages(&room_id, &query).await?;
    let has_more = messages.len() > limit;
    messages.truncate(limit);

    tracing::debug!(room_id = %room_id, found = messages.len(), has_more, "Searched messages");
    Ok(Json(SearchMessagesResponse { messages, has_more }))
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A timestamp, or a date completed with `day_time`.
fn parse_bound(value: &str, day_time: NaiveTime) -> ApiResult<NaiveDateTime> {
    let value = value.trim();
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(at);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|day| day.and_time(day_time))
        .map_err(|_| ApiError::BadRequest(format!("invalid date '{}'", value)))
}

/// Analysis history of a room, newest first
#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/analyses",
    params(("room_id" = String, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Analysis requests", body = AnalysisHistoryResponse)
    ),
    tag = "rooms"
)]
pub async fn list_analyses(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<AnalysisHistoryResponse>> {
    let analyses = state.chatlens.coordinator().history(&room_id).await;
    Ok(Json(AnalysisHistoryResponse { analyses }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_bounds() {
        let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(parse_bound("2024-03-04", end).unwrap(), day.and_time(end));
        assert_eq!(
            parse_bound("2024-03-04T08:30", NaiveTime::default()).unwrap(),
            day.and_hms_opt(8, 30, 0).unwrap()
        );
        assert!(parse_bound("04/03/2024", NaiveTime::default()).is_err());
    }

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list(Some(" 배포, ,deploy ")), vec!["배포", "deploy"]);
        assert!(split_list(None).is_empty());
    }
}
