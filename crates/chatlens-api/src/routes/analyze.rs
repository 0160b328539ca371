use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

use chatlens::{AnalysisRequest, AnalysisStatus, AnalysisType, FailureReason};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Extra time the handler waits past the provider timeout
const WAIT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub room_id: String,
    /// comprehensive, sentiment, keywords or topics
    #[serde(default = "default_analysis_type")]
    pub analysis_type: String,
}

fn default_analysis_type() -> String {
    AnalysisType::Comprehensive.to_string()
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub request_id: String,
    #[schema(value_type = String)]
    pub status: AnalysisStatus,
    pub result: Option<String>,
    pub message: String,
}

/// Run an analysis and wait for its result
///
/// Responds `202` with the request id when the analysis is still running
/// after the wait; poll `GET /api/analyze/{request_id}` for the outcome.
#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis completed", body = AnalyzeResponse),
        (status = 202, description = "Analysis still running", body = AnalyzeResponse),
        (status = 400, description = "Unknown analysis type"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Same analysis already running for this room"),
        (status = 502, description = "Provider failure"),
        (status = 504, description = "Provider timeout")
    ),
    tag = "analysis"
)]
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<(StatusCode, Json<AnalyzeResponse>)> {
    let analysis_type: AnalysisType = req
        .analysis_type
        .parse()
        .map_err(|e: chatlens::types::ParseAnalysisTypeError| ApiError::BadRequest(e.to_string()))?;

    let coordinator = state.chatlens.coordinator();
    let submitted = coordinator.submit(&req.room_id, analysis_type).await?;
    let limit = coordinator.config().timeout + WAIT_GRACE;
    let request = coordinator.wait_timeout(&submitted.id, limit).await?;

    match request.status {
        AnalysisStatus::Succeeded => Ok((
            StatusCode::OK,
            Json(AnalyzeResponse {
                success: true,
                request_id: request.id,
                status: request.status,
                result: request.result_text,
                message: format!("{} analysis completed", analysis_type),
            }),
        )),
        AnalysisStatus::Failed => Err(ApiError::provider(
            request.error_reason.unwrap_or(FailureReason::ProviderRejected),
            request.error_detail.unwrap_or_default(),
        )),
        AnalysisStatus::Pending | AnalysisStatus::Running => Ok((
            StatusCode::ACCEPTED,
            Json(AnalyzeResponse {
                success: true,
                message: format!("{} analysis is still running; poll /api/analyze/{}", analysis_type, request.id),
                request_id: request.id,
                status: request.status,
                result: None,
            }),
        )),
    }
}

/// Get an analysis request
#[utoipa::path(
    get,
    path = "/api/analyze/{request_id}",
    params(("request_id" = String, Path, description = "Analysis request ID")),
    responses(
        (status = 200, description = "Analysis request"),
        (status = 404, description = "Request not found")
    ),
    tag = "analysis"
)]
pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<AnalysisRequest>> {
    let request = state.chatlens.coordinator().get(&request_id).await?;
    Ok(Json(request))
}

/// Cancel a running analysis
///
/// Cancelling a finished request returns it unchanged.
#[utoipa::path(
    delete,
    path = "/api/analyze/{request_id}",
    params(("request_id" = String, Path, description = "Analysis request ID")),
    responses(
        (status = 200, description = "Request after cancellation"),
        (status = 404, description = "Request not found")
    ),
    tag = "analysis"
)]
pub async fn cancel_analysis(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<AnalysisRequest>> {
    let request = state.chatlens.coordinator().cancel(&request_id).await?;
    Ok(Json(request))
}
