//! Maps a verified external identity onto its local user record

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::identity::VerifiedIdentity;
use crate::models::user::{CreateUser, User};
use crate::store::{Store, StoreError, StoreResult};

/// Finds or lazily creates the [`User`] for a verified identity
///
/// This is the only place users are created. The insert is conditional on
/// the unique `external_id`, so concurrent first requests for the same
/// identity converge on a single row: the loser of the race re-reads the
/// winner's record.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn Store>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Returns the existing user unchanged, or creates one on the free tier
    pub async fn resolve(&self, identity: &VerifiedIdentity) -> StoreResult<User> {
        if let Some(user) = self.store.find_user_by_external_id(&identity.uid).await? {
            return Ok(user);
        }

        let new_user = CreateUser {
            external_id: identity.uid.clone(),
            email: identity.email.clone().unwrap_or_default(),
            name: identity.name.clone(),
            avatar_url: identity.picture.clone(),
        };

        match self.store.insert_user_if_absent(new_user).await {
            Ok(Some(user)) => {
                info!(user_id = %user.id, external_id = %identity.uid, "Created user on first sign-in");
                return Ok(user);
            }
            Ok(None) => {
                debug!(external_id = %identity.uid, "User created concurrently, re-reading");
            }
            Err(StoreError::UniqueViolation { constraint }) => {
                debug!(external_id = %identity.uid, ?constraint, "Insert lost a race, re-reading");
            }
            Err(e) => return Err(e),
        }

        match self.store.find_user_by_external_id(&identity.uid).await? {
            Some(user) => Ok(user),
            None => {
                warn!(external_id = %identity.uid, "User vanished between insert and re-read");
                Err(StoreError::Conflict(format!(
                    "user for external id {} could not be created or found",
                    identity.uid
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api_key::{ApiKey, CreateApiKey};
    use crate::models::project::{CreateProject, Project};
    use crate::models::usage::{CreateUsageRecord, UsageRecord, UsageTotal};
    use crate::models::user::{UpdateUser, UserTier};
    use crate::store::{MemoryStore, Pagination};
    use async_trait::async_trait;
    use uuid::Uuid;

    /// How [`RacingStore`] answers the resolver's insert
    #[derive(Clone, Copy)]
    enum InsertOutcome {
        /// Another request inserted first; the insert reports nothing written
        LostRace,
        /// Another request inserted first; the insert hits the unique index
        UniqueViolation,
        /// The insert is refused but no winning row ever becomes visible
        Vanished,
    }

    /// Store whose user insert always loses to a simulated concurrent request
    struct RacingStore {
        inner: MemoryStore,
        outcome: InsertOutcome,
    }

    impl RacingStore {
        fn new(outcome: InsertOutcome) -> Self {
            Self {
                inner: MemoryStore::new(),
                outcome,
            }
        }
    }

    #[async_trait]
    impl Store for RacingStore {
        async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
            self.inner.find_user(id).await
        }

        async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_external_id(external_id).await
        }

        async fn insert_user_if_absent(&self, data: CreateUser) -> StoreResult<Option<User>> {
            match self.outcome {
                InsertOutcome::LostRace => {
                    let winner = CreateUser {
                        name: Some("Winner".to_string()),
                        ..data
                    };
                    self.inner.insert_user_if_absent(winner).await?;
                    Ok(None)
                }
                InsertOutcome::UniqueViolation => {
                    let winner = CreateUser {
                        name: Some("Winner".to_string()),
                        ..data
                    };
                    self.inner.insert_user_if_absent(winner).await?;
                    Err(StoreError::UniqueViolation {
                        constraint: Some("users_external_id_key".to_string()),
                    })
                }
                InsertOutcome::Vanished => Ok(None),
            }
        }

        async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
            self.inner.update_user(id, data).await
        }

        async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
            self.inner.delete_user(id).await
        }

        async fn create_project(&self, data: CreateProject) -> StoreResult<Project> {
            self.inner.create_project(data).await
        }

        async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
            self.inner.find_project(id).await
        }

        async fn count_projects_by_user(&self, user_id: Uuid) -> StoreResult<i64> {
            self.inner.count_projects_by_user(user_id).await
        }

        async fn list_visible_projects(
            &self,
            viewer: Option<Uuid>,
            page: Pagination,
        ) -> StoreResult<Vec<Project>> {
            self.inner.list_visible_projects(viewer, page).await
        }

        async fn create_api_key(&self, data: CreateApiKey) -> StoreResult<ApiKey> {
            self.inner.create_api_key(data).await
        }

        async fn list_api_keys(&self, user_id: Uuid) -> StoreResult<Vec<ApiKey>> {
            self.inner.list_api_keys(user_id).await
        }

        async fn find_api_key(&self, id: Uuid) -> StoreResult<Option<ApiKey>> {
            self.inner.find_api_key(id).await
        }

        async fn delete_api_key(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
            self.inner.delete_api_key(id, user_id).await
        }

        async fn record_usage(&self, data: CreateUsageRecord) -> StoreResult<UsageRecord> {
            self.inner.record_usage(data).await
        }

        async fn usage_totals(&self, user_id: Uuid) -> StoreResult<Vec<UsageTotal>> {
            self.inner.usage_totals(user_id).await
        }

        async fn ping(&self) -> StoreResult<()> {
            self.inner.ping().await
        }
    }

    fn identity(uid: &str) -> VerifiedIdentity {
        VerifiedIdentity {
            email: Some(format!("{uid}@example.com")),
            name: Some("Ada".to_string()),
            picture: Some("https://img.example.com/ada.png".to_string()),
            ..VerifiedIdentity::new(uid)
        }
    }

    #[tokio::test]
    async fn test_first_resolution_creates_user() {
        let store = Arc::new(MemoryStore::new());
        let resolver = IdentityResolver::new(store.clone());

        let user = resolver.resolve(&identity("uid-1")).await.unwrap();

        assert_eq!(user.external_id, "uid-1");
        assert_eq!(user.email, "uid-1@example.com");
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert_eq!(user.avatar_url.as_deref(), Some("https://img.example.com/ada.png"));
        assert_eq!(user.tier, UserTier::Free);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_email_becomes_empty_string() {
        let store = Arc::new(MemoryStore::new());
        let resolver = IdentityResolver::new(store);

        let user = resolver.resolve(&VerifiedIdentity::new("uid-2")).await.unwrap();

        assert_eq!(user.email, "");
        assert!(user.name.is_none());
        assert!(user.avatar_url.is_none());
    }

    #[tokio::test]
    async fn test_sequential_resolution_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let resolver = IdentityResolver::new(store.clone());

        let first = resolver.resolve(&identity("uid-1")).await.unwrap();
        let second = resolver.resolve(&identity("uid-1")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.users_with_external_id("uid-1"), 1);
    }

    #[tokio::test]
    async fn test_existing_user_returned_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let resolver = IdentityResolver::new(store.clone());
        let created = resolver.resolve(&identity("uid-1")).await.unwrap();

        let renamed = VerifiedIdentity {
            name: Some("Someone Else".to_string()),
            email: Some("new@example.com".to_string()),
            ..VerifiedIdentity::new("uid-1")
        };
        let resolved = resolver.resolve(&renamed).await.unwrap();

        assert_eq!(resolved, created);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_resolution_yields_one_user() {
        let store = Arc::new(MemoryStore::new());
        let resolver = IdentityResolver::new(store.clone());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move { resolver.resolve(&identity("uid-race")).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.users_with_external_id("uid-race"), 1);
    }

    #[tokio::test]
    async fn test_lost_insert_race_returns_winner() {
        let store = Arc::new(RacingStore::new(InsertOutcome::LostRace));
        let resolver = IdentityResolver::new(store.clone());

        let user = resolver.resolve(&identity("uid-race")).await.unwrap();

        assert_eq!(user.external_id, "uid-race");
        assert_eq!(user.name.as_deref(), Some("Winner"));
        assert_eq!(store.inner.users_with_external_id("uid-race"), 1);
    }

    #[tokio::test]
    async fn test_unique_violation_on_insert_returns_winner() {
        let store = Arc::new(RacingStore::new(InsertOutcome::UniqueViolation));
        let resolver = IdentityResolver::new(store.clone());

        let user = resolver.resolve(&identity("uid-race")).await.unwrap();

        assert_eq!(user.name.as_deref(), Some("Winner"));
        assert_eq!(store.inner.users_with_external_id("uid-race"), 1);
    }

    #[tokio::test]
    async fn test_missing_winner_is_a_conflict() {
        let store = Arc::new(RacingStore::new(InsertOutcome::Vanished));
        let resolver = IdentityResolver::new(store.clone());

        let err = resolver.resolve(&identity("uid-gone")).await.unwrap_err();

        assert!(matches!(err, StoreError::Conflict(ref msg) if msg.contains("uid-gone")));
        assert_eq!(store.inner.user_count(), 0);
    }
}
