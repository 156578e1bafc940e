/// API key management endpoints
///
/// All endpoints require authentication.
///
/// # Endpoints
///
/// - `POST /api-keys` - Create API key
/// - `GET /api-keys` - List API keys
/// - `DELETE /api-keys/:id` - Delete API key

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use basecamp_shared::{
    auth::{api_key as api_key_util, middleware::AuthContext},
    models::api_key::{ApiKey, CreateApiKey},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create API key request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    /// Human-readable label (trimmed before validation)
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Optional expiration date (RFC 3339)
    pub expires_at: Option<DateTime<Utc>>,
}

/// Key metadata returned on creation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApiKey {
    pub id: Uuid,
    pub name: String,
    pub prefix: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Create API key response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyResponse {
    pub api_key: CreatedApiKey,

    /// The plaintext API key
    ///
    /// Only returned here. The server keeps nothing but its hash.
    pub key: String,
}

/// List API keys response; hashes are never serialized
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApiKeysResponse {
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Serialize)]
pub struct DeleteApiKeyResponse {
    pub success: bool,
}

/// Create API key
///
/// # Endpoint
///
/// ```text
/// POST /api-keys
/// Authorization: Bearer <id_token>
/// Content-Type: application/json
///
/// { "name": "CI", "expiresAt": "2026-01-01T00:00:00Z" }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "apiKey": { "id": "uuid", "name": "CI", "prefix": "bc_a1B2c",
///               "expiresAt": "2026-01-01T00:00:00Z", "createdAt": "..." },
///   "key": "bc_a1B2c3..."
/// }
/// ```
///
/// # Errors
///
/// - 422 when the trimmed name is empty or longer than 100 characters
/// - 400 when `expiresAt` is in the past
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateApiKeyRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateApiKeyResponse>)> {
    let Json(mut req) = payload?;
    req.name = req.name.trim().to_string();
    req.validate()?;

    if let Some(expires_at) = req.expires_at {
        if expires_at <= Utc::now() {
            return Err(ApiError::BadRequest(
                "Expiration date must be in the future".to_string(),
            ));
        }
    }

    let generated = api_key_util::generate_api_key()?;

    let api_key = state
        .store
        .create_api_key(CreateApiKey {
            user_id: auth.user_id(),
            name: req.name,
            key_hash: generated.hash,
            key_prefix: generated.prefix,
            expires_at: req.expires_at,
        })
        .await?;

    tracing::info!(
        user_id = %api_key.user_id,
        api_key_id = %api_key.id,
        "API key created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            api_key: CreatedApiKey {
                id: api_key.id,
                name: api_key.name,
                prefix: api_key.key_prefix,
                expires_at: api_key.expires_at,
                created_at: api_key.created_at,
            },
            key: generated.key,
        }),
    ))
}

/// Lists the caller's API keys, newest first
pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ListApiKeysResponse>> {
    let api_keys = state.store.list_api_keys(auth.user_id()).await?;

    Ok(Json(ListApiKeysResponse { api_keys }))
}

/// Deletes one of the caller's API keys
///
/// Keys owned by someone else are reported exactly like missing ones.
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteApiKeyResponse>> {
    let not_found = || ApiError::NotFound("API key not found".to_string());

    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;

    if !state.store.delete_api_key(id, auth.user_id()).await? {
        return Err(not_found());
    }

    tracing::info!(user_id = %auth.user_id(), api_key_id = %id, "API key deleted");

    Ok(Json(DeleteApiKeyResponse { success: true }))
}
