//! In-memory store for tests and local development

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{Pagination, Store, StoreError, StoreResult};
use crate::models::api_key::{ApiKey, CreateApiKey};
use crate::models::project::{CreateProject, Project};
use crate::models::usage::{CreateUsageRecord, UsageRecord, UsageTotal};
use crate::models::user::{CreateUser, UpdateUser, User, UserTier};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    api_keys: HashMap<Uuid, ApiKey>,
    usage: Vec<UsageRecord>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Tables {
    /// Wall-clock time, nudged forward so no two writes share a timestamp
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }
}

/// [`Store`] kept entirely in process memory
///
/// Provides the same semantics as the PostgreSQL store: `external_id` is
/// unique, deleting a user removes its projects, keys and usage, and
/// listings are ordered newest first with the id as tie-break. All tables
/// sit behind one lock so multi-table operations are atomic.
///
/// # Example
///
/// ```
/// use basecamp_shared::store::MemoryStore;
///
/// let store = MemoryStore::new();
/// assert_eq!(store.user_count(), 0);
/// ```
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users currently stored
    pub fn user_count(&self) -> usize {
        self.tables.read().users.len()
    }

    /// Number of users holding the given external id
    pub fn users_with_external_id(&self, external_id: &str) -> usize {
        self.tables
            .read()
            .users
            .values()
            .filter(|u| u.external_id == external_id)
            .count()
    }
}

/// Creation time descending, then id descending
fn newest_first(a: (DateTime<Utc>, Uuid), b: (DateTime<Utc>, Uuid)) -> std::cmp::Ordering {
    b.cmp(&a)
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    async fn insert_user_if_absent(&self, data: CreateUser) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write();

        if tables.users.values().any(|u| u.external_id == data.external_id) {
            return Ok(None);
        }

        let now = tables.now();
        let user = User {
            id: Uuid::new_v4(),
            external_id: data.external_id,
            email: data.email,
            name: data.name,
            avatar_url: data.avatar_url,
            tier: UserTier::Free,
            billing_customer_id: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(Some(user))
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write();
        let now = tables.now();

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            user.name = Some(name);
        }
        if let Some(avatar_url) = data.avatar_url {
            user.avatar_url = avatar_url;
        }
        user.updated_at = now;

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write();

        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }

        tables.projects.retain(|_, p| p.user_id != id);
        tables.api_keys.retain(|_, k| k.user_id != id);
        tables.usage.retain(|r| r.user_id != id);

        Ok(true)
    }

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project> {
        let mut tables = self.tables.write();

        if !tables.users.contains_key(&data.user_id) {
            return Err(StoreError::Conflict(format!(
                "project owner {} does not exist",
                data.user_id
            )));
        }

        let now = tables.now();
        let project = Project {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            name: data.name,
            description: data.description,
            is_public: data.is_public,
            created_at: now,
            updated_at: now,
        };
        tables.projects.insert(project.id, project.clone());

        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self.tables.read().projects.get(&id).cloned())
    }

    async fn count_projects_by_user(&self, user_id: Uuid) -> StoreResult<i64> {
        let count = self
            .tables
            .read()
            .projects
            .values()
            .filter(|p| p.user_id == user_id)
            .count();
        Ok(count as i64)
    }

    async fn list_visible_projects(
        &self,
        viewer: Option<Uuid>,
        page: Pagination,
    ) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read();

        let mut visible: Vec<Project> = tables
            .projects
            .values()
            .filter(|p| p.is_visible_to(viewer))
            .cloned()
            .collect();
        visible.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));

        Ok(visible
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn create_api_key(&self, data: CreateApiKey) -> StoreResult<ApiKey> {
        let mut tables = self.tables.write();

        if !tables.users.contains_key(&data.user_id) {
            return Err(StoreError::Conflict(format!(
                "api key owner {} does not exist",
                data.user_id
            )));
        }

        let now = tables.now();
        let api_key = ApiKey {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            name: data.name,
            key_hash: data.key_hash,
            key_prefix: data.key_prefix,
            last_used_at: None,
            expires_at: data.expires_at,
            created_at: now,
        };
        tables.api_keys.insert(api_key.id, api_key.clone());

        Ok(api_key)
    }

    async fn list_api_keys(&self, user_id: Uuid) -> StoreResult<Vec<ApiKey>> {
        let tables = self.tables.read();

        let mut keys: Vec<ApiKey> = tables
            .api_keys
            .values()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect();
        keys.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));

        Ok(keys)
    }

    async fn find_api_key(&self, id: Uuid) -> StoreResult<Option<ApiKey>> {
        Ok(self.tables.read().api_keys.get(&id).cloned())
    }

    async fn delete_api_key(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write();

        match tables.api_keys.get(&id) {
            Some(key) if key.user_id == user_id => {
                tables.api_keys.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_usage(&self, data: CreateUsageRecord) -> StoreResult<UsageRecord> {
        let mut tables = self.tables.write();

        if !tables.users.contains_key(&data.user_id) {
            return Err(StoreError::Conflict(format!(
                "usage owner {} does not exist",
                data.user_id
            )));
        }

        let now = tables.now();
        let record = UsageRecord {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            action: data.action,
            count: data.count,
            metadata: data.metadata,
            created_at: now,
        };
        tables.usage.push(record.clone());

        Ok(record)
    }

    async fn usage_totals(&self, user_id: Uuid) -> StoreResult<Vec<UsageTotal>> {
        let tables = self.tables.read();

        let mut totals: HashMap<&str, i64> = HashMap::new();
        for record in tables.usage.iter().filter(|r| r.user_id == user_id) {
            *totals.entry(record.action.as_str()).or_default() += i64::from(record.count);
        }

        let mut totals: Vec<UsageTotal> = totals
            .into_iter()
            .map(|(action, total)| UsageTotal {
                action: action.to_string(),
                total,
            })
            .collect();
        totals.sort_by(|a, b| a.action.cmp(&b.action));

        Ok(totals)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
