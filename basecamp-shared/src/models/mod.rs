/// Database models for Basecamp
///
/// This module contains all database models and their CRUD operations.
/// Every model other than `User` is owned by exactly one user and is removed
/// by `ON DELETE CASCADE` when its owner is deleted.
///
/// # Models
///
/// - `user`: Local user records correlated 1:1 with an external identity
/// - `project`: Named resources owned by a user, optionally public
/// - `api_key`: Hashed credentials owned by a user
/// - `usage`: Append-only usage events
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
/// let new_user = CreateUser {
///     external_id: "firebase-uid-123".to_string(),
///     email: "user@example.com".to_string(),
///     name: Some("Jane Doe".to_string()),
///     avatar_url: None,
/// };
///
/// let user = User::create_if_absent(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod api_key;
pub mod project;
pub mod usage;
pub mod user;
