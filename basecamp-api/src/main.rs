//! # Basecamp API Server
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/basecamp \
//! FIREBASE_PROJECT_ID=my-project \
//! cargo run -p basecamp-api
//! ```
//!
//! Set `LOG_FORMAT=json` for structured logs and `RUST_LOG` to override the
//! default filter.

use std::sync::Arc;

use basecamp_api::{
    app::{build_router, AppState},
    config::{Config, IdentityConfig},
};
use basecamp_shared::auth::firebase::FirebaseVerifier;
use basecamp_shared::auth::identity::IdentityVerifier;
use basecamp_shared::auth::jwt::HmacVerifier;
use basecamp_shared::db::{migrations, pool};
use basecamp_shared::store::PgStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "Basecamp API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        ..Default::default()
    })
    .await?;

    if config.database.run_migrations {
        migrations::run_migrations(&pool).await?;
    }

    let verifier: Arc<dyn IdentityVerifier> = match &config.identity {
        IdentityConfig::Firebase { project_id } => {
            tracing::info!(project_id = %project_id, "Verifying Firebase ID tokens");
            Arc::new(FirebaseVerifier::new(project_id.clone()))
        }
        IdentityConfig::Development { secret } => {
            tracing::warn!("Using the HS256 development verifier; do not expose this server");
            Arc::new(HmacVerifier::new(secret))
        }
    };

    let address = config.bind_address();
    let state = AppState::new(Arc::new(PgStore::new(pool.clone())), verifier, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "basecamp_api=debug,basecamp_shared=debug,tower_http=debug".into()
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
