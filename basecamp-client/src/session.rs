//! Client-side auth session
//!
//! Mirrors the signed-in user for a UI. Observers call
//! [`AuthSession::subscribe`] and get every [`AuthState`] change through a
//! `tokio::sync::watch` channel; outbound requests get a fresh ID token from
//! [`AuthSession::id_token`] or ready-made headers from
//! [`AuthSession::auth_headers`].
//!
//! # Example
//!
//! ```no_run
//! use basecamp_client::{AuthSession, IdentityToolkit};
//!
//! # async fn example() -> Result<(), basecamp_client::SessionError> {
//! let session = AuthSession::new(IdentityToolkit::new("web-api-key"));
//! let mut changes = session.subscribe();
//!
//! session.sign_in_email("ada@example.com", "correct horse").await?;
//! assert!(changes.borrow_and_update().user.is_some());
//!
//! let token = session.id_token().await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::identity_toolkit::{IdentityToolkit, TokenGrant, ToolkitError};

/// ID tokens closer than this to expiry are refreshed before use
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Provider(#[from] ToolkitError),

    #[error("ID token is not a valid header value")]
    InvalidToken,
}

/// The signed-in account as seen by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Observable session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Signed-in user, if any
    pub user: Option<AuthUser>,

    /// An operation is in flight
    pub loading: bool,

    /// Message of the last failed operation; cleared when the next one starts
    pub error: Option<String>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

struct Credentials {
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Credentials {
    fn from_grant(grant: &TokenGrant) -> Self {
        Self {
            id_token: grant.id_token.clone(),
            refresh_token: grant.refresh_token.clone(),
            expires_at: Utc::now() + Duration::seconds(grant.expires_in),
        }
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// Signed-in state of one end user
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct AuthSession {
    toolkit: IdentityToolkit,
    credentials: Mutex<Option<Credentials>>,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    pub fn new(toolkit: IdentityToolkit) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            toolkit,
            credentials: Mutex::new(None),
            state,
        }
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub async fn sign_in_email(&self, email: &str, password: &str) -> Result<AuthUser, SessionError> {
        self.begin();
        let result = self.toolkit.sign_in_with_password(email, password).await;
        self.establish(result).await
    }

    pub async fn sign_up_email(&self, email: &str, password: &str) -> Result<AuthUser, SessionError> {
        self.begin();
        let result = self.toolkit.sign_up(email, password).await;
        self.establish(result).await
    }

    /// Asks the provider to email a password reset link
    ///
    /// The session's user is left untouched.
    pub async fn send_reset_email(&self, email: &str) -> Result<(), SessionError> {
        self.begin();
        match self.toolkit.send_password_reset(email).await {
            Ok(()) => {
                self.state.send_modify(|s| s.loading = false);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Forgets the user and their tokens
    pub async fn sign_out(&self) {
        *self.credentials.lock().await = None;
        self.state.send_replace(AuthState::default());
        info!("Signed out");
    }

    /// Current ID token, refreshed first when it is about to expire
    ///
    /// Returns `None` when nobody is signed in.
    pub async fn id_token(&self) -> Result<Option<String>, SessionError> {
        let mut credentials = self.credentials.lock().await;
        let Some(current) = credentials.as_mut() else {
            return Ok(None);
        };

        if !current.needs_refresh(Utc::now()) {
            return Ok(Some(current.id_token.clone()));
        }

        debug!("ID token near expiry, refreshing");
        match self.toolkit.refresh(&current.refresh_token).await {
            Ok(grant) => {
                *current = Credentials::from_grant(&grant);
                Ok(Some(current.id_token.clone()))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// `Authorization: Bearer <token>` when signed in, otherwise empty
    pub async fn auth_headers(&self) -> Result<HeaderMap, SessionError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.id_token().await? {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| SessionError::InvalidToken)?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn fail(&self, err: ToolkitError) -> SessionError {
        let message = err.to_string();
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(message);
        });
        err.into()
    }

    async fn establish(
        &self,
        result: Result<TokenGrant, ToolkitError>,
    ) -> Result<AuthUser, SessionError> {
        let grant = result.map_err(|e| self.fail(e))?;

        let user = AuthUser {
            uid: grant.uid.clone(),
            email: grant.email.clone(),
            display_name: grant.display_name.clone(),
        };
        *self.credentials.lock().await = Some(Credentials::from_grant(&grant));

        self.state.send_replace(AuthState {
            user: Some(user.clone()),
            loading: false,
            error: None,
        });
        info!(uid = %user.uid, "Signed in");

        Ok(user)
    }
}
