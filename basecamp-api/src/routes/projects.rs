/// Project endpoints
///
/// # Endpoints
///
/// - `GET /projects` - Visible projects, newest first (auth optional)
/// - `POST /projects` - Create a project (auth required)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Extension, Json,
};
use basecamp_shared::{
    auth::middleware::{AuthContext, OptionalAuth},
    models::project::{CreateProject, Project},
    store::Pagination,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw paging parameters; parsed leniently
#[derive(Debug, Default, Deserialize)]
pub struct ListProjectsQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListProjectsResponse {
    pub projects: Vec<Project>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub project: Project,
}

/// Lists public projects, plus the caller's private ones when authenticated
///
/// `limit` defaults to 20 and is capped at 100; `offset` defaults to 0.
/// Values that don't parse fall back to the defaults.
///
/// # Endpoint
///
/// ```text
/// GET /projects?limit=20&offset=0
/// Authorization: Bearer <id_token>   (optional)
/// ```
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<OptionalAuth>,
    Query(query): Query<ListProjectsQuery>,
) -> ApiResult<Json<ListProjectsResponse>> {
    let page = Pagination::from_params(query.limit.as_deref(), query.offset.as_deref());

    let projects = state
        .store
        .list_visible_projects(auth.user_id(), page)
        .await?;

    Ok(Json(ListProjectsResponse { projects }))
}

/// Creates a project owned by the caller
///
/// # Endpoint
///
/// ```text
/// POST /projects
/// Authorization: Bearer <id_token>
/// Content-Type: application/json
///
/// { "name": "Demo", "description": "optional", "isPublic": false }
/// ```
///
/// # Errors
///
/// - 400 when `name` is missing, not a string, or blank
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProjectResponse>)> {
    let Json(body) = payload?;
    let data = parse_new_project(&auth, &body)?;

    let project = state.store.create_project(data).await?;

    tracing::info!(
        user_id = %project.user_id,
        project_id = %project.id,
        "Project created"
    );

    Ok((StatusCode::CREATED, Json(ProjectResponse { project })))
}

fn parse_new_project(auth: &AuthContext, body: &Value) -> ApiResult<CreateProject> {
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Name is required".to_string()))?;

    let description = match body.get("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(d)) => Some(d.trim()).filter(|d| !d.is_empty()).map(str::to_string),
        Some(_) => return Err(ApiError::BadRequest("Invalid description".to_string())),
    };

    let is_public = match body.get("isPublic") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(ApiError::BadRequest("Invalid isPublic".to_string())),
    };

    Ok(CreateProject {
        user_id: auth.user_id(),
        name: name.to_string(),
        description,
        is_public,
    })
}
