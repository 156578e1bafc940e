//! Common test utilities for integration tests
//!
//! Builds the full router against the in-memory store and the HS256
//! development verifier, so the HTTP surface can be driven without a
//! database or an identity provider.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use basecamp_api::app::{build_router, AppState};
use basecamp_api::config::{ApiConfig, Config, DatabaseConfig, IdentityConfig};
use async_trait::async_trait;
use basecamp_shared::auth::identity::{IdentityVerifier, VerifiedIdentity, VerifyError};
use basecamp_shared::auth::jwt::{HmacVerifier, IdentityClaims, DEV_AUDIENCE, DEV_ISSUER};
use basecamp_shared::store::MemoryStore;
use serde_json::Value;
use tower::Service as _;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Verifier standing in for an identity provider that cannot be reached
pub struct UnreachableVerifier;

#[async_trait]
impl IdentityVerifier for UnreachableVerifier {
    async fn verify(&self, _token: &str) -> Result<VerifiedIdentity, VerifyError> {
        Err(VerifyError::Unavailable("connection refused".to_string()))
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub verifier: HmacVerifier,
    pub app: axum::Router,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_verifier(Arc::new(HmacVerifier::new(TEST_SECRET)))
    }

    /// Router verifying tokens with `router_verifier`; tokens are still
    /// minted with the HS256 test secret
    pub fn with_verifier(router_verifier: Arc<dyn IdentityVerifier>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let verifier = HmacVerifier::new(TEST_SECRET);

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                min_connections: 0,
                run_migrations: false,
            },
            identity: IdentityConfig::Development {
                secret: TEST_SECRET.to_string(),
            },
        };

        let state = AppState::new(store.clone(), router_verifier, config);

        Self {
            store,
            verifier,
            app: build_router(state),
        }
    }

    /// Valid token for an identity carrying only `uid`
    pub fn token_for(&self, uid: &str) -> String {
        self.token_with(&VerifiedIdentity::new(uid))
    }

    /// Valid token for an arbitrary identity
    pub fn token_with(&self, identity: &VerifiedIdentity) -> String {
        self.verifier
            .issue_for(identity, chrono::Duration::hours(1))
            .unwrap()
    }

    /// Token that expired well outside the clock-skew leeway
    pub fn expired_token_for(&self, uid: &str) -> String {
        let mut claims = IdentityClaims::for_identity(
            &VerifiedIdentity::new(uid),
            DEV_ISSUER,
            DEV_AUDIENCE,
            chrono::Duration::hours(1),
        );
        claims.iat -= 7200;
        claims.exp -= 7200;
        claims.auth_time = Some(claims.iat);
        self.verifier.issue(&claims).unwrap()
    }

    /// Sends a request and returns the status with the parsed JSON body
    ///
    /// An empty body comes back as `Value::Null`.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body ({status}): {}", String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("DELETE", uri, token, None).await
    }

    /// Creates a project through the API and returns its JSON
    pub async fn create_project(&self, token: &str, name: &str, is_public: bool) -> Value {
        let (status, body) = self
            .post(
                "/projects",
                Some(token),
                serde_json::json!({ "name": name, "isPublic": is_public }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["project"].clone()
    }
}
