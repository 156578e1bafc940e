/// Auth gate for Axum
///
/// Extracts the bearer token from the `Authorization` header, verifies it
/// with the configured [`IdentityVerifier`], resolves the local [`User`] and
/// attaches both to the request before the handler runs.
///
/// # Variants
///
/// - [`require_auth`]: rejects with 401 when the token is missing or invalid
/// - [`optional_auth`]: always runs the handler, with an [`OptionalAuth`]
///   that is populated only for a present and valid token
///
/// Both variants share [`AuthGate::authenticate`]; every request is verified
/// independently.
///
/// # Request Extensions
///
/// - `require_auth` inserts an [`AuthContext`]
/// - `optional_auth` inserts an [`OptionalAuth`]
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Extension, Router};
/// use basecamp_shared::auth::jwt::HmacVerifier;
/// use basecamp_shared::auth::middleware::{require_auth, AuthContext, AuthGate};
/// use basecamp_shared::store::MemoryStore;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.user.email)
/// }
///
/// let gate = AuthGate::new(
///     Arc::new(HmacVerifier::new("an-example-secret-that-is-32-chars!")),
///     Arc::new(MemoryStore::new()),
/// );
///
/// let app: Router = Router::new()
///     .route("/me", get(handler))
///     .layer(middleware::from_fn_with_state(gate, require_auth));
/// ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::identity::{IdentityVerifier, VerifiedIdentity, VerifyError};
use super::resolver::IdentityResolver;
use crate::models::user::User;
use crate::store::{Store, StoreError};

/// Authentication context added to request extensions
///
/// Handlers extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Identity as proven by the token
    pub identity: VerifiedIdentity,

    /// Local user record for that identity
    pub user: User,
}

impl AuthContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}

/// Context inserted by [`optional_auth`]; `None` for anonymous requests
#[derive(Debug, Clone, Default)]
pub struct OptionalAuth(pub Option<AuthContext>);

impl OptionalAuth {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(AuthContext::user_id)
    }
}

/// Outcome of inspecting a request's credentials
#[derive(Debug)]
pub enum Authentication {
    /// Valid token; user resolved
    Authenticated(AuthContext),

    /// No usable bearer token
    Missing,

    /// Token present but rejected by the verifier
    Rejected(VerifyError),
}

/// Error type for the auth gate
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingCredentials,

    #[error("Invalid or expired token")]
    InvalidToken(VerifyError),

    /// The identity provider could not be consulted
    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Resolving the local user failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code in the error body
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => "unauthorized",
            AuthError::ProviderUnavailable(_) => "service_unavailable",
            AuthError::Store(_) => "internal_error",
        }
    }

    /// Message shown to the client; internal detail stays in the logs
    pub fn public_message(&self) -> String {
        match self {
            AuthError::ProviderUnavailable(_) => "Identity provider unavailable".to_string(),
            AuthError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::Store(e) => error!(error = %e, "Failed to resolve user"),
            AuthError::ProviderUnavailable(e) => warn!(error = %e, "Identity provider unavailable"),
            AuthError::InvalidToken(e) => debug!(reason = %e, "Rejected bearer token"),
            AuthError::MissingCredentials => {}
        }

        let body = Json(json!({
            "error": self.public_message(),
            "code": self.code(),
        }));

        (self.status_code(), body).into_response()
    }
}

/// Returns the bearer token from the `Authorization` header
///
/// The header must start with `Bearer ` (case-sensitive); an empty token
/// counts as absent.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Shared state of both middleware variants
#[derive(Clone)]
pub struct AuthGate {
    verifier: Arc<dyn IdentityVerifier>,
    resolver: IdentityResolver,
}

impl AuthGate {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, store: Arc<dyn Store>) -> Self {
        Self {
            verifier,
            resolver: IdentityResolver::new(store),
        }
    }

    /// Verifies the request's bearer token and resolves its user
    ///
    /// Missing and rejected tokens are ordinary outcomes. Only an unreachable
    /// identity provider or a failing store is an error.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Authentication, AuthError> {
        let Some(token) = extract_bearer(headers) else {
            return Ok(Authentication::Missing);
        };

        let identity = match self.verifier.verify(token).await {
            Ok(identity) => identity,
            Err(e) if e.is_rejection() => return Ok(Authentication::Rejected(e)),
            Err(e) => return Err(AuthError::ProviderUnavailable(e.to_string())),
        };

        let user = self.resolver.resolve(&identity).await?;

        Ok(Authentication::Authenticated(AuthContext { identity, user }))
    }
}

/// Mandatory authentication middleware
///
/// # Errors
///
/// - 401 when the token is missing or rejected
/// - 503 when the identity provider is unreachable
/// - 500 when the user cannot be resolved
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = match gate.authenticate(req.headers()).await? {
        Authentication::Authenticated(context) => context,
        Authentication::Missing => return Err(AuthError::MissingCredentials),
        Authentication::Rejected(reason) => return Err(AuthError::InvalidToken(reason)),
    };

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

/// Optional authentication middleware
///
/// Missing or rejected tokens, and an unreachable identity provider, fall
/// back to an anonymous request. Store failures still fail the request.
pub async fn optional_auth(
    State(gate): State<AuthGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = match gate.authenticate(req.headers()).await {
        Ok(Authentication::Authenticated(context)) => Some(context),
        Ok(Authentication::Missing) => None,
        Ok(Authentication::Rejected(reason)) => {
            debug!(reason = %reason, "Ignoring rejected token on optional route");
            None
        }
        Err(AuthError::ProviderUnavailable(e)) => {
            warn!(error = %e, "Identity provider unavailable, continuing anonymously");
            None
        }
        Err(e) => return Err(e),
    };

    req.extensions_mut().insert(OptionalAuth(context));
    Ok(next.run(req).await)
}
