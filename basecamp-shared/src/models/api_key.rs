/// API Key model and database operations
///
/// API keys are user-owned credentials for programmatic access.
///
/// # Security
///
/// - Keys are stored as salted Argon2id hashes (never plaintext)
/// - Only the first 8 characters are kept in clear for identification
/// - The full key is only returned on creation (never again)
/// - Keys can be set to expire
///
/// Key generation and hashing live in [`crate::auth::api_key`]; this module
/// only persists the result.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE api_keys (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     key_hash TEXT NOT NULL,
///     key_prefix TEXT NOT NULL,
///     last_used_at TIMESTAMPTZ,
///     expires_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const API_KEY_COLUMNS: &str =
    "id, user_id, name, key_hash, key_prefix, last_used_at, expires_at, created_at";

/// API Key model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    /// Unique API key ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Human-readable name for the key
    pub name: String,

    /// Argon2id PHC string of the full key
    #[serde(skip_serializing)]
    pub key_hash: String,

    /// First 8 characters of the key (for display: "bc_a1B2c...")
    pub key_prefix: String,

    /// When the key was last used
    pub last_used_at: Option<DateTime<Utc>>,

    /// Optional expiration date
    pub expires_at: Option<DateTime<Utc>>,

    /// When the key was created
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a freshly generated API key
#[derive(Debug, Clone, PartialEq)]
pub struct CreateApiKey {
    /// Owning user
    pub user_id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Argon2id hash of the plaintext key
    pub key_hash: String,

    /// Display prefix of the plaintext key
    pub key_prefix: String,

    /// Optional expiration date
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Checks if the API key is expired
    ///
    /// Returns true if expires_at is set and is in the past
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < Utc::now())
    }

    /// Stores a new API key
    pub async fn create(pool: &PgPool, data: CreateApiKey) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO api_keys (user_id, name, key_hash, key_prefix, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {API_KEY_COLUMNS}
            "#
        );

        let api_key = sqlx::query_as::<_, ApiKey>(&query)
            .bind(data.user_id)
            .bind(data.name)
            .bind(data.key_hash)
            .bind(data.key_prefix)
            .bind(data.expires_at)
            .fetch_one(pool)
            .await?;

        Ok(api_key)
    }

    /// Finds an API key by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE id = $1");

        let api_key = sqlx::query_as::<_, ApiKey>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(api_key)
    }

    /// Lists all API keys owned by a user, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {API_KEY_COLUMNS}
            FROM api_keys
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        );

        let keys = sqlx::query_as::<_, ApiKey>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Ok(keys)
    }

    /// Deletes an API key with owner isolation
    ///
    /// Returns false when the key doesn't exist or belongs to another user.
    pub async fn delete_for_user(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key(expires_at: Option<DateTime<Utc>>) -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "CI".to_string(),
            key_hash: "$argon2id$v=19$...".to_string(),
            key_prefix: "bc_abcde".to_string(),
            last_used_at: None,
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_expired() {
        assert!(!key(None).is_expired());
        assert!(!key(Some(Utc::now() + Duration::days(1))).is_expired());
        assert!(key(Some(Utc::now() - Duration::seconds(1))).is_expired());
    }

    #[test]
    fn test_hash_is_never_serialized() {
        let json = serde_json::to_value(key(None)).unwrap();
        assert!(json.get("keyHash").is_none());
        assert_eq!(json["keyPrefix"], "bc_abcde");
    }
}
