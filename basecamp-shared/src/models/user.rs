/// User model and database operations
///
/// A `User` is the local record correlated 1:1 with an external identity
/// (the identity provider's stable `uid`). Users are never registered
/// explicitly: the identity resolver creates them lazily on the first
/// successful authentication.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     external_id TEXT NOT NULL,
///     email TEXT NOT NULL,
///     name TEXT,
///     avatar_url TEXT,
///     tier TEXT NOT NULL DEFAULT 'free',
///     billing_customer_id TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT users_external_id_key UNIQUE (external_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use basecamp_shared::models::user::{User, CreateUser};
/// use basecamp_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let created = User::create_if_absent(&pool, CreateUser {
///     external_id: "uid-123".to_string(),
///     email: "user@example.com".to_string(),
///     name: None,
///     avatar_url: None,
/// }).await?;
///
/// let found = User::find_by_external_id(&pool, "uid-123").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, external_id, email, name, avatar_url, tier, \
                            billing_customer_id, created_at, updated_at";

/// Subscription tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserTier {
    /// Default tier for every new user
    #[default]
    Free,

    /// Paid individual tier
    Pro,

    /// Organization tier
    Enterprise,
}

/// Returned when the `tier` column holds a value outside the known set
#[derive(Debug, thiserror::Error)]
#[error("unknown user tier: {0}")]
pub struct UnknownTier(pub String);

impl UserTier {
    /// Converts tier to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UserTier::Free => "free",
            UserTier::Pro => "pro",
            UserTier::Enterprise => "enterprise",
        }
    }

    /// Parses tier from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(UserTier::Free),
            "pro" => Some(UserTier::Pro),
            "enterprise" => Some(UserTier::Enterprise),
            _ => None,
        }
    }
}

impl TryFrom<String> for UserTier {
    type Error = UnknownTier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserTier::parse(&value).ok_or(UnknownTier(value))
    }
}

impl std::fmt::Display for UserTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Stable identifier issued by the identity provider (unique)
    pub external_id: String,

    /// Email copied from the identity token on creation (empty if absent)
    pub email: String,

    /// Optional display name
    pub name: Option<String>,

    /// Optional avatar/profile picture URL
    pub avatar_url: Option<String>,

    /// Subscription tier
    #[sqlx(try_from = "String")]
    pub tier: UserTier,

    /// Customer reference in the billing system, if any
    pub billing_customer_id: Option<String>,

    /// When the user record was created
    pub created_at: DateTime<Utc>,

    /// When the user record was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user from a verified identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUser {
    /// External identity reference
    pub external_id: String,

    /// Email address (empty string when the identity carries none)
    pub email: String,

    /// Optional display name
    pub name: Option<String>,

    /// Optional avatar URL
    pub avatar_url: Option<String>,
}

/// Input for updating an existing user
///
/// All fields are optional. Only `Some` fields are written; `updated_at`
/// always advances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New display name
    pub name: Option<String>,

    /// New avatar URL (use Some(None) to clear)
    pub avatar_url: Option<Option<String>>,
}

impl UpdateUser {
    /// Returns true when no profile field would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar_url.is_none()
    }
}

impl User {
    /// Inserts a user unless one already exists for the external identity
    ///
    /// The insert is a single atomic statement keyed on the unique
    /// `external_id` constraint. Returns `None` when another request created
    /// the row first; callers then re-read it with
    /// [`User::find_by_external_id`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn create_if_absent(
        pool: &PgPool,
        data: CreateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (external_id, email, name, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.external_id)
            .bind(data.email)
            .bind(data.name)
            .bind(data.avatar_url)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by external identity reference
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(external_id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Updates profile fields of an existing user
    ///
    /// Only `Some` fields in `data` are written. `updated_at` is moved to the
    /// current time, and strictly past its previous value even when the clock
    /// has not ticked.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if the user doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from(
            "UPDATE users SET updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')",
        );
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.avatar_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", avatar_url = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(avatar_opt) = data.avatar_url {
            q = q.bind(avatar_opt);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Deletes a user by ID
    ///
    /// Projects, API keys and usage records owned by the user are removed by
    /// the `ON DELETE CASCADE` foreign keys.
    ///
    /// # Returns
    ///
    /// True if user was deleted, false if user didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_round_trip_through_strings() {
        for tier in [UserTier::Free, UserTier::Pro, UserTier::Enterprise] {
            assert_eq!(UserTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(UserTier::parse("platinum"), None);
    }

    #[test]
    fn test_tier_try_from_rejects_unknown() {
        let err = UserTier::try_from("gold".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "unknown user tier: gold");
    }

    #[test]
    fn test_tier_defaults_to_free() {
        assert_eq!(UserTier::default(), UserTier::Free);
        assert_eq!(serde_json::to_value(UserTier::Enterprise).unwrap(), "enterprise");
    }

    #[test]
    fn test_update_user_default_is_empty() {
        let update = UpdateUser::default();
        assert!(update.is_empty());
        assert!(update.name.is_none());
        assert!(update.avatar_url.is_none());

        let clear_avatar = UpdateUser {
            avatar_url: Some(None),
            ..Default::default()
        };
        assert!(!clear_avatar.is_empty());
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            external_id: "uid-1".to_string(),
            email: "a@example.com".to_string(),
            name: None,
            avatar_url: Some("https://img.example.com/a.png".to_string()),
            tier: UserTier::Pro,
            billing_customer_id: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["externalId"], "uid-1");
        assert_eq!(json["avatarUrl"], "https://img.example.com/a.png");
        assert_eq!(json["tier"], "pro");
        assert!(json["name"].is_null());
    }
}
