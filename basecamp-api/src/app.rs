/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use basecamp_api::{app::AppState, config::Config};
/// use basecamp_shared::auth::jwt::HmacVerifier;
/// use basecamp_shared::store::MemoryStore;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let verifier = HmacVerifier::new("a-development-secret-of-32-chars!");
/// let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(verifier), config);
/// let app = basecamp_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use basecamp_shared::auth::identity::IdentityVerifier;
use basecamp_shared::auth::middleware::{optional_auth, require_auth, AuthGate};
use basecamp_shared::store::Store;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor; every field is
/// reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Relational store (Postgres in production, in-memory in tests)
    pub store: Arc<dyn Store>,

    /// Token verification and user resolution
    pub gate: AuthGate,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    ///
    /// The verifier is shared by every request for the life of the process.
    pub fn new(store: Arc<dyn Store>, verifier: Arc<dyn IdentityVerifier>, config: Config) -> Self {
        Self {
            gate: AuthGate::new(verifier, store.clone()),
            store,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /health            # public
/// ├── /me                       # auth required
/// │   ├── GET
/// │   ├── PATCH
/// │   └── DELETE
/// ├── /projects
/// │   ├── GET                   # auth optional
/// │   └── POST                  # auth required
/// ├── /api-keys                 # auth required
/// │   ├── POST
/// │   ├── GET
/// │   └── DELETE /:id
/// └── /usage                    # auth required
///     ├── POST
///     └── GET
/// ```
///
/// # Middleware Stack
///
/// Applied in order (inner to outer):
/// 1. Authentication (per route)
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
/// 4. Security headers
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let me_routes = Router::new()
        .route(
            "/me",
            get(routes::me::get_profile)
                .patch(routes::me::update_profile)
                .delete(routes::me::delete_profile),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_layer));

    // Listing is open to anonymous callers, creating is not
    let project_routes = Router::new().route(
        "/projects",
        get(routes::projects::list_projects)
            .layer(from_fn_with_state(state.clone(), optional_auth_layer))
            .merge(
                post(routes::projects::create_project)
                    .layer(from_fn_with_state(state.clone(), auth_layer)),
            ),
    );

    let api_key_routes = Router::new()
        .route(
            "/api-keys",
            post(routes::api_keys::create_api_key).get(routes::api_keys::list_api_keys),
        )
        .route("/api-keys/:id", delete(routes::api_keys::revoke_api_key))
        .route_layer(from_fn_with_state(state.clone(), auth_layer));

    let usage_routes = Router::new()
        .route(
            "/usage",
            post(routes::usage::record_usage).get(routes::usage::usage_summary),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_layer));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .merge(me_routes)
        .merge(project_routes)
        .merge(api_key_routes)
        .merge(usage_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}

/// Mandatory authentication layer
///
/// Runs the auth gate and renders its failures as [`ApiError`] responses.
async fn auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    Ok(require_auth(State(state.gate), req, next).await?)
}

/// Optional authentication layer; only store failures reject the request
async fn optional_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    Ok(optional_auth(State(state.gate), req, next).await?)
}
