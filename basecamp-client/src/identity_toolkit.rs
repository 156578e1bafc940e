//! REST client for the identity provider's end-user operations
//!
//! Wraps the Identity Toolkit endpoints a browser SDK would call on behalf
//! of a user:
//!
//! | Operation            | Endpoint                                   |
//! |----------------------|--------------------------------------------|
//! | sign in              | `accounts:signInWithPassword`              |
//! | sign up              | `accounts:signUp`                          |
//! | password reset email | `accounts:sendOobCode` (`PASSWORD_RESET`)  |
//! | token refresh        | `securetoken` `token` (refresh grant)      |
//!
//! Every request carries the project's public web API key as `?key=`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Default base URL of the account endpoints
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Default base URL of the token endpoint
pub const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Error type for identity provider calls
#[derive(Debug, thiserror::Error)]
pub enum ToolkitError {
    /// The provider answered with an error code such as `EMAIL_NOT_FOUND`
    #[error("{message}")]
    Provider { status: u16, message: String },

    #[error("Identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected identity provider response: {0}")]
    InvalidResponse(String),
}

/// Tokens and account data returned by sign-in, sign-up and refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    /// Seconds until `id_token` expires
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Serialize)]
struct RefreshForm<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn parse_expires_in(raw: &str) -> Result<i64, ToolkitError> {
    raw.trim()
        .parse()
        .map_err(|_| ToolkitError::InvalidResponse(format!("expiresIn is not a number: {raw}")))
}

/// Identity Toolkit client
#[derive(Debug, Clone)]
pub struct IdentityToolkit {
    http: reqwest::Client,
    api_key: String,
    accounts_url: String,
    token_url: String,
}

impl IdentityToolkit {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_urls(api_key, IDENTITY_TOOLKIT_URL, SECURE_TOKEN_URL)
    }

    /// Points the client at other hosts, e.g. the local auth emulator
    pub fn with_base_urls(
        api_key: impl Into<String>,
        accounts_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            accounts_url: accounts_url.into().trim_end_matches('/').to_string(),
            token_url: token_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenGrant, ToolkitError> {
        self.account_call(
            "accounts:signInWithPassword",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<TokenGrant, ToolkitError> {
        self.account_call(
            "accounts:signUp",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), ToolkitError> {
        let url = format!("{}/accounts:sendOobCode", self.accounts_url);
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "requestType": "PASSWORD_RESET", "email": email }))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        check_status(response).await?;
        debug!("Password reset email requested");
        Ok(())
    }

    /// Exchanges a refresh token for a fresh ID token
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ToolkitError> {
        let url = format!("{}/token", self.token_url);
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .form(&RefreshForm {
                grant_type: "refresh_token",
                refresh_token,
            })
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let body: RefreshResponse = check_status(response).await?.json().await?;

        Ok(TokenGrant {
            uid: body.user_id,
            email: None,
            display_name: None,
            expires_in: parse_expires_in(&body.expires_in)?,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
        })
    }

    async fn account_call(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<TokenGrant, ToolkitError> {
        let url = format!("{}/{}", self.accounts_url, endpoint);
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let body: AccountResponse = check_status(response).await?.json().await?;

        Ok(TokenGrant {
            expires_in: parse_expires_in(&body.expires_in)?,
            uid: body.local_id,
            email: body.email,
            display_name: body.display_name,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
        })
    }
}

/// Turns a non-2xx response into [`ToolkitError::Provider`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ToolkitError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => envelope.error.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Identity provider error")
            .to_string(),
    };

    Err(ToolkitError::Provider {
        status: status.as_u16(),
        message,
    })
}
