//! PostgreSQL-backed store

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Pagination, Store, StoreResult};
use crate::db::pool::health_check;
use crate::models::api_key::{ApiKey, CreateApiKey};
use crate::models::project::{CreateProject, Project};
use crate::models::usage::{CreateUsageRecord, UsageRecord, UsageTotal};
use crate::models::user::{CreateUser, UpdateUser, User};

/// [`Store`] over a PostgreSQL connection pool
///
/// Every operation is a single statement; cascade deletion and external-id
/// uniqueness come from the schema in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_external_id(&self.pool, external_id).await?)
    }

    async fn insert_user_if_absent(&self, data: CreateUser) -> StoreResult<Option<User>> {
        Ok(User::create_if_absent(&self.pool, data).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project> {
        Ok(Project::create(&self.pool, data).await?)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn count_projects_by_user(&self, user_id: Uuid) -> StoreResult<i64> {
        Ok(Project::count_by_user(&self.pool, user_id).await?)
    }

    async fn list_visible_projects(
        &self,
        viewer: Option<Uuid>,
        page: Pagination,
    ) -> StoreResult<Vec<Project>> {
        Ok(Project::list_visible(&self.pool, viewer, page).await?)
    }

    async fn create_api_key(&self, data: CreateApiKey) -> StoreResult<ApiKey> {
        Ok(ApiKey::create(&self.pool, data).await?)
    }

    async fn list_api_keys(&self, user_id: Uuid) -> StoreResult<Vec<ApiKey>> {
        Ok(ApiKey::list_by_user(&self.pool, user_id).await?)
    }

    async fn find_api_key(&self, id: Uuid) -> StoreResult<Option<ApiKey>> {
        Ok(ApiKey::find_by_id(&self.pool, id).await?)
    }

    async fn delete_api_key(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(ApiKey::delete_for_user(&self.pool, id, user_id).await?)
    }

    async fn record_usage(&self, data: CreateUsageRecord) -> StoreResult<UsageRecord> {
        Ok(UsageRecord::record(&self.pool, data).await?)
    }

    async fn usage_totals(&self, user_id: Uuid) -> StoreResult<Vec<UsageTotal>> {
        Ok(UsageRecord::totals_by_user(&self.pool, user_id).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
