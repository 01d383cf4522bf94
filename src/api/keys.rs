//! Key issuance and validation endpoints

use axum::{Json, body::Bytes, extract::State};
use tracing::debug;

use crate::api::middleware::AdminCredential;
use crate::api::state::AppState;
use crate::api::types::{
    ApiError, GenKeyRequest, GenKeyResponse, ValidateRequest, ValidateResponse,
    parse_optional_json,
};
use crate::domain::DomainError;

/// POST /genkey - Mint a new key (admin only)
///
/// The credential is checked before the body is parsed, so unauthenticated
/// callers only ever see 403.
pub async fn generate_key(
    State(state): State<AppState>,
    AdminCredential(credential): AdminCredential,
    body: Bytes,
) -> Result<Json<GenKeyResponse>, ApiError> {
    state.key_service.authorize(credential.as_deref())?;

    let request: GenKeyRequest = parse_optional_json(&body)?.unwrap_or_default();

    let issued = state
        .key_service
        .issue_key(credential.as_deref(), request.expires_in_hours)
        .await
        .map_err(|e| match e {
            DomainError::Validation { .. } => ApiError::from(e).with_param("expires_in_hours"),
            other => ApiError::from(other),
        })?;

    Ok(Json(GenKeyResponse {
        key: issued.key,
        expires: issued.expires_at.timestamp_millis(),
    }))
}

/// POST /validate (and /verify) - Validate a key for a client identity
///
/// The verdict is carried in the body; only store failures produce an error
/// status.
pub async fn validate_key(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ValidateResponse>, ApiError> {
    let request = ValidateRequest::from_slice(&body);
    let identity = request.identity();

    let outcome = state
        .key_service
        .validate_key(request.key.as_deref(), identity.as_ref())
        .await?;

    debug!(valid = outcome.valid, reason = ?outcome.reason, "Validation verdict");

    Ok(Json(ValidateResponse::from_outcome(
        outcome,
        state.script_url.as_deref(),
    )))
}
