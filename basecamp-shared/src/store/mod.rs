//! Relational store seam
//!
//! Handlers, the identity resolver and the auth gate talk to persistence only
//! through the [`Store`] trait. Two backends implement it:
//!
//! - [`PgStore`]: PostgreSQL through the sqlx queries in [`crate::models`]
//! - [`MemoryStore`]: process-local tables with the same semantics, used by
//!   tests and local development
//!
//! Both backends enforce uniqueness of `users.external_id`, cascade deletion
//! from a user to everything it owns, and order listings by creation time
//! descending with the id as tie-break.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::api_key::{ApiKey, CreateApiKey};
use crate::models::project::{CreateProject, Project};
use crate::models::usage::{CreateUsageRecord, UsageRecord, UsageTotal};
use crate::models::user::{CreateUser, UpdateUser, User};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("unique constraint violated: {}", constraint.as_deref().unwrap_or("unknown"))]
    UniqueViolation { constraint: Option<String> },

    /// The store's state contradicts itself (e.g. an insert lost a race
    /// but the winning row cannot be read back)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().map(str::to_owned),
                };
            }
        }
        StoreError::Database(err)
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Limit/offset window for list queries
///
/// `limit` always lies in `0..=MAX_LIMIT` and `offset` is never negative.
/// A zero limit is an empty page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// Builds a window, clamping out-of-range values
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(0, Self::MAX_LIMIT),
            offset: offset.max(0),
        }
    }

    /// Builds a window from raw query-string values
    ///
    /// Missing or non-numeric values fall back to the defaults instead of
    /// failing the request.
    pub fn from_params(limit: Option<&str>, offset: Option<&str>) -> Self {
        let limit = limit
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(Self::DEFAULT_LIMIT);
        let offset = offset
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(0);
        Self::new(limit, offset)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

/// Persistence operations needed by the request pipeline
#[async_trait]
pub trait Store: Send + Sync {
    // Users

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>>;

    /// Inserts a user unless one with the same external id exists
    ///
    /// Returns `None` when the external id is already taken.
    async fn insert_user_if_absent(&self, data: CreateUser) -> StoreResult<Option<User>>;

    /// Applies a partial profile update; `None` when the user doesn't exist
    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    /// Deletes a user and everything it owns; false when nothing was deleted
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    // Projects

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project>;

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>>;

    async fn count_projects_by_user(&self, user_id: Uuid) -> StoreResult<i64>;

    /// Public projects plus, when `viewer` is set, the viewer's private ones
    async fn list_visible_projects(
        &self,
        viewer: Option<Uuid>,
        page: Pagination,
    ) -> StoreResult<Vec<Project>>;

    // API keys

    async fn create_api_key(&self, data: CreateApiKey) -> StoreResult<ApiKey>;

    async fn list_api_keys(&self, user_id: Uuid) -> StoreResult<Vec<ApiKey>>;

    async fn find_api_key(&self, id: Uuid) -> StoreResult<Option<ApiKey>>;

    /// Deletes a key only if `user_id` owns it
    async fn delete_api_key(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    // Usage

    async fn record_usage(&self, data: CreateUsageRecord) -> StoreResult<UsageRecord>;

    async fn usage_totals(&self, user_id: Uuid) -> StoreResult<Vec<UsageTotal>>;

    /// Cheap connectivity probe for health checks
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(Pagination::default(), Pagination { limit: 20, offset: 0 });
        assert_eq!(Pagination::from_params(None, None), Pagination::default());
    }

    #[test]
    fn test_pagination_caps_limit() {
        assert_eq!(Pagination::from_params(Some("500"), None).limit, 100);
        assert_eq!(Pagination::from_params(Some("100"), None).limit, 100);
        assert_eq!(Pagination::from_params(Some("0"), None).limit, 0);
        assert_eq!(Pagination::from_params(Some("-3"), None).limit, 0);
    }

    #[test]
    fn test_pagination_defaults_non_numeric() {
        let page = Pagination::from_params(Some("lots"), Some("abc"));
        assert_eq!(page, Pagination::default());

        let page = Pagination::from_params(Some("2.5"), Some("-10"));
        assert_eq!(page, Pagination { limit: 20, offset: 0 });
    }

    #[test]
    fn test_pagination_accepts_valid_values() {
        let page = Pagination::from_params(Some(" 5 "), Some("40"));
        assert_eq!(page, Pagination { limit: 5, offset: 40 });
    }

    #[test]
    fn test_unique_violation_display() {
        let err = StoreError::UniqueViolation {
            constraint: Some("users_external_id_key".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "unique constraint violated: users_external_id_key"
        );
    }
}
