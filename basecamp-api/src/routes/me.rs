/// Profile endpoints for the authenticated user
///
/// All endpoints require authentication.
///
/// # Endpoints
///
/// - `GET /me` - Profile plus project count
/// - `PATCH /me` - Partial profile update
/// - `DELETE /me` - Delete the account and everything it owns

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use basecamp_shared::{
    auth::middleware::AuthContext,
    models::user::{UpdateUser, User, UserTier},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Public-facing user fields
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub tier: UserTier,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            tier: user.tier,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub project_count: i64,
}

/// `GET /me` response
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
    pub stats: ProfileStats,
}

/// `PATCH /me` response; carries the full updated record
#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct DeleteProfileResponse {
    pub success: bool,
}

/// Returns the caller's profile with a count of the projects they own
///
/// # Response
///
/// ```json
/// {
///   "user": { "id": "uuid", "email": "ada@example.com", "name": "Ada",
///             "avatarUrl": null, "tier": "free", "createdAt": "2025-01-03T12:00:00Z" },
///   "stats": { "projectCount": 3 }
/// }
/// ```
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileResponse>> {
    let project_count = state.store.count_projects_by_user(auth.user_id()).await?;

    Ok(Json(ProfileResponse {
        user: UserProfile::from(&auth.user),
        stats: ProfileStats { project_count },
    }))
}

/// Applies `name` and/or `avatarUrl` from the body
///
/// Omitted fields keep their stored value. `updatedAt` advances even when
/// the body names no field.
///
/// # Errors
///
/// - 400 when `name` is present but not a string
/// - 400 when `avatarUrl` is present but neither a string nor null
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<UpdateProfileResponse>> {
    let Json(body) = payload?;
    let update = parse_profile_update(&body)?;

    let user = state
        .store
        .update_user(auth.user_id(), update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::debug!(user_id = %user.id, "Profile updated");

    Ok(Json(UpdateProfileResponse { user }))
}

/// Deletes the caller; projects, API keys and usage go with it
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DeleteProfileResponse>> {
    let user_id = auth.user_id();

    if state.store.delete_user(user_id).await? {
        tracing::info!(user_id = %user_id, "User deleted");
    } else {
        tracing::warn!(user_id = %user_id, "User vanished before deletion");
    }

    Ok(Json(DeleteProfileResponse { success: true }))
}

fn parse_profile_update(body: &Value) -> ApiResult<UpdateUser> {
    let name = match body.get("name") {
        None => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(_) => return Err(ApiError::BadRequest("Invalid name".to_string())),
    };

    let avatar_url = match body.get("avatarUrl") {
        None => None,
        Some(Value::Null) => Some(None),
        Some(Value::String(url)) => Some(Some(url.clone())),
        Some(_) => return Err(ApiError::BadRequest("Invalid avatarUrl".to_string())),
    };

    Ok(UpdateUser { name, avatar_url })
}
