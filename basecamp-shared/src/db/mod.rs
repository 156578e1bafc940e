/// Database layer for Basecamp
///
/// Connection pooling and the embedded migration runner. Queries live with
/// the models; request handling reaches them through [`crate::store`].
///
/// # Example
///
/// ```no_run
/// use basecamp_shared::db::pool::{create_pool, DatabaseConfig};
/// use basecamp_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
