/// Usage tracking endpoints
///
/// - `POST /usage` - Append a usage event
/// - `GET /usage` - Per-action totals for the caller

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use basecamp_shared::{
    auth::middleware::AuthContext,
    models::usage::{CreateUsageRecord, UsageRecord, UsageTotal},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest accepted action tag
pub const MAX_ACTION_LENGTH: usize = 64;

#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    pub action: String,

    /// Defaults to 1
    pub count: Option<i64>,

    /// Any JSON value; stored as its serialization
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct RecordUsageResponse {
    pub usage: UsageRecord,
}

#[derive(Debug, Serialize)]
pub struct UsageSummaryResponse {
    pub usage: Vec<UsageTotal>,
}

/// Records a usage event for the caller
///
/// # Errors
///
/// - 400 when the trimmed action is empty or over 64 characters
/// - 400 when `count` is below 1 or too large
pub async fn record_usage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<RecordUsageRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RecordUsageResponse>)> {
    let Json(req) = payload?;

    let action = req.action.trim();
    if action.is_empty() || action.chars().count() > MAX_ACTION_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Action must be 1-{MAX_ACTION_LENGTH} characters"
        )));
    }

    let count = match req.count {
        None => 1,
        Some(n) => i32::try_from(n)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ApiError::BadRequest("Count must be a positive integer".to_string()))?,
    };

    let metadata = match req.metadata {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.to_string()),
    };

    let usage = state
        .store
        .record_usage(CreateUsageRecord {
            user_id: auth.user_id(),
            action: action.to_string(),
            count,
            metadata,
        })
        .await?;

    tracing::debug!(user_id = %usage.user_id, action = %usage.action, count, "Usage recorded");

    Ok((StatusCode::CREATED, Json(RecordUsageResponse { usage })))
}

/// Totals per action, sorted by action
pub async fn usage_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UsageSummaryResponse>> {
    let usage = state.store.usage_totals(auth.user_id()).await?;

    Ok(Json(UsageSummaryResponse { usage }))
}
