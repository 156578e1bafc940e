//! Authenticated fetch wrapper for the Basecamp API
//!
//! Every request is sent as JSON. When a session is attached and the call
//! asks for auth (the default), the session's bearer header is added.
//! Non-2xx responses become [`ClientError::Api`] carrying the body's
//! `error` message and the status code.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::session::{AuthSession, SessionError};

/// Error type for API calls
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The API answered with a non-2xx status
    #[error("{message}")]
    Api { message: String, status: u16 },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ClientError {
    /// HTTP status for [`ClientError::Api`]
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Per-request options
#[derive(Debug, Clone, Copy)]
pub struct RequestOptions {
    /// Attach the session's bearer token
    pub auth: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { auth: true }
    }
}

/// Basecamp API client
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Option<Arc<AuthSession>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: None,
        }
    }

    /// Sends bearer tokens from `session` on authenticated calls
    pub fn with_session(mut self, session: Arc<AuthSession>) -> Self {
        self.session = Some(session);
        self
    }

    /// Sends a request and decodes the JSON response
    ///
    /// # Errors
    ///
    /// [`ClientError::Api`] for non-2xx responses. Its message is the body's
    /// `error` field, `"Request failed"` when the JSON body has none, or
    /// `"Unknown error"` when the body is not JSON.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");

        if options.auth {
            if let Some(session) = &self.session {
                request = request.headers(session.auth_headers().await?);
            }
        }

        if let Some(body) = body {
            request = request.body(serde_json::to_vec(&body)?);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(%method, %url, status = status.as_u16(), "API response");

        if !status.is_success() {
            let message = match response.json::<Value>().await {
                Ok(body) => body
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("Request failed")
                    .to_string(),
                Err(_) => "Unknown error".to_string(),
            };
            return Err(ClientError::Api {
                message,
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.fetch(Method::GET, endpoint, None, RequestOptions::default())
            .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body)?;
        self.fetch(Method::POST, endpoint, Some(body), RequestOptions::default())
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body)?;
        self.fetch(Method::PUT, endpoint, Some(body), RequestOptions::default())
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body)?;
        self.fetch(Method::PATCH, endpoint, Some(body), RequestOptions::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.fetch(Method::DELETE, endpoint, None, RequestOptions::default())
            .await
    }
}
