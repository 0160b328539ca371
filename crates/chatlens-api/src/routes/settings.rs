use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub settings: Map<String, Value>,
}

/// Current client settings
#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Stored settings", body = SettingsResponse)
    ),
    tag = "settings"
)]
pub async fn get_settings(State(state): State<Arc<AppState>>) -> ApiResult<Json<SettingsResponse>> {
    let settings = state.settings.read().await.clone();
    Ok(Json(SettingsResponse { success: true, settings }))
}

/// Merge a JSON object into the client settings
///
/// Top-level keys overwrite; a `null` value removes the key.
#[utoipa::path(
    post,
    path = "/api/settings",
    request_body(content = Object, content_type = "application/json", description = "Settings object to merge"),
    responses(
        (status = 200, description = "Settings saved", body = SettingsResponse),
        (status = 400, description = "Body is not a JSON object")
    ),
    tag = "settings"
)]
pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<SettingsResponse>> {
    let Value::Object(update) = body else {
        return Err(ApiError::BadRequest("settings must be a JSON object".to_string()));
    };

    let mut settings = state.settings.write().await;
    for (key, value) in update {
        if value.is_null() {
            settings.remove(&key);
        } else {
            settings.insert(key, value);
        }
    }
    tracing::debug!(keys = settings.len(), "Settings updated");

    Ok(Json(SettingsResponse {
        success: true,
        settings: settings.clone(),
    }))
}
