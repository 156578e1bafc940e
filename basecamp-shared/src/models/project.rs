/// Project model and database operations
///
/// A project is a named resource owned by exactly one user. Public projects
/// are visible to everyone, private ones only to their owner.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     description TEXT,
///     is_public BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::Pagination;

const PROJECT_COLUMNS: &str = "id, user_id, name, description, is_public, created_at, updated_at";

/// Project model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Project name (trimmed, non-empty)
    pub name: String,

    /// Optional description (trimmed; never an empty string)
    pub description: Option<String>,

    /// Whether the project is listed for everyone
    pub is_public: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProject {
    /// Owning user
    pub user_id: Uuid,

    /// Project name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Public visibility flag
    pub is_public: bool,
}

impl Project {
    /// Returns true if `viewer` may see this project
    ///
    /// Public projects are visible to everyone, private ones only to the owner.
    pub fn is_visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.is_public || viewer == Some(self.user_id)
    }

    /// Creates a new project
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO projects (user_id, name, description, is_public)
            VALUES ($1, $2, $3, $4)
            RETURNING {PROJECT_COLUMNS}
            "#
        );

        let project = sqlx::query_as::<_, Project>(&query)
            .bind(data.user_id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.is_public)
            .fetch_one(pool)
            .await?;

        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");

        let project = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(project)
    }

    /// Counts the projects owned by a user
    pub async fn count_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Lists the projects visible to `viewer`, newest first
    ///
    /// With a viewer this is the viewer's own projects plus every public
    /// project; without one only public projects are returned. Binding a NULL
    /// viewer makes the ownership comparison NULL, which leaves only the
    /// `is_public` branch.
    pub async fn list_visible(
        pool: &PgPool,
        viewer: Option<Uuid>,
        page: Pagination,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE is_public = TRUE OR user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let projects = sqlx::query_as::<_, Project>(&query)
            .bind(viewer)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(pool)
            .await?;

        Ok(projects)
    }
}
