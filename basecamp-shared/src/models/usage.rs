/// Usage record model and database operations
///
/// Usage records are an append-only event log: one row per reported action,
/// never updated after insertion. Totals are computed on read.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE usage_records (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     action TEXT NOT NULL,
///     count INTEGER NOT NULL DEFAULT 1,
///     metadata TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A single usage event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Free-text category (e.g. "api_call", "export")
    pub action: String,

    /// Number of units consumed (>= 1)
    pub count: i32,

    /// Opaque JSON-encoded context
    pub metadata: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Input for appending a usage event
#[derive(Debug, Clone, PartialEq)]
pub struct CreateUsageRecord {
    pub user_id: Uuid,
    pub action: String,
    pub count: i32,
    pub metadata: Option<String>,
}

/// Sum of `count` over all events of one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UsageTotal {
    pub action: String,
    pub total: i64,
}

impl UsageRecord {
    /// Appends a usage event
    pub async fn record(pool: &PgPool, data: CreateUsageRecord) -> Result<Self, sqlx::Error> {
        let record = sqlx::query_as::<_, UsageRecord>(
            r#"
            INSERT INTO usage_records (user_id, action, count, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, action, count, metadata, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.action)
        .bind(data.count)
        .bind(data.metadata)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Totals usage per action for a user, sorted by action
    pub async fn totals_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<UsageTotal>, sqlx::Error> {
        let totals = sqlx::query_as::<_, UsageTotal>(
            r#"
            SELECT action, SUM(count)::BIGINT AS total
            FROM usage_records
            WHERE user_id = $1
            GROUP BY action
            ORDER BY action
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(totals)
    }
}
