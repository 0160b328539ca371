use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use chatlens::llm::{ClientFactory, OpenAIConfig, ProviderConfig};
use chatlens::LlmError;

use crate::{error::ApiResult, state::AppState};

const KEY_PREFIX: &str = "sk-";
const VALIDATE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateKeyResponse {
    pub valid: bool,
}

/// Check an OpenAI API key
///
/// Keys without the `sk-` prefix are rejected without a provider call.
/// Network failures surface as errors rather than `valid: false`.
#[utoipa::path(
    post,
    path = "/api/validate-key",
    request_body = ValidateKeyRequest,
    responses(
        (status = 200, description = "Validation result", body = ValidateKeyResponse),
        (status = 502, description = "Provider unreachable")
    ),
    tag = "settings"
)]
pub async fn validate_key(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateKeyRequest>,
) -> ApiResult<Json<ValidateKeyResponse>> {
    let key = req.api_key.trim();
    if !key.starts_with(KEY_PREFIX) {
        return Ok(Json(ValidateKeyResponse { valid: false }));
    }

    let mut openai = OpenAIConfig::new(key).with_timeout_secs(VALIDATE_TIMEOUT_SECS);
    if let Some(base_url) = &state.config.llm.base_url {
        openai = openai.with_base_url(base_url.clone());
    }
    let client = ClientFactory::create_chat_client(ProviderConfig::OpenAI(openai))?;

    let valid = match client.validate_key().await {
        Ok(()) => true,
        Err(LlmError::Auth(_)) => false,
        Err(e) => return Err(e.into()),
    };

    tracing::info!(valid, "API key validated");
    Ok(Json(ValidateKeyResponse { valid }))
}
