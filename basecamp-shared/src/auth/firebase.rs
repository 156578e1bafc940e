//! Firebase ID token verification
//!
//! Firebase signs ID tokens with RS256 using rotating keys published as a
//! JWK set. A token is accepted when:
//!
//! - the header names `RS256` and a `kid` present in the published set
//! - the signature verifies against that key
//! - `aud` is the project id and `iss` is `https://securetoken.google.com/<project id>`
//! - `exp` and `iat` hold within the clock-skew leeway
//! - `sub` is non-empty and at most 128 characters
//! - `auth_time` is not in the future
//!
//! Signing keys are cached for as long as the key endpoint's
//! `Cache-Control: max-age` allows. Verification results are never cached.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey};
use parking_lot::RwLock;
use reqwest::header::CACHE_CONTROL;
use tracing::{debug, info, warn};

use super::identity::{IdentityVerifier, VerifiedIdentity, VerifyError};
use super::jwt::{map_jwt_error, validation, IdentityClaims};

/// Where Google publishes the keys that sign Firebase ID tokens
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Issuer prefix; the project id is appended
pub const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Key lifetime when the endpoint sends no usable `max-age`
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

/// Unknown `kid`s trigger at most one refetch per interval
const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Cached JWK set fetched over HTTP
pub struct JwksCache {
    url: String,
    http: reqwest::Client,
    min_refresh_interval: Duration,
    cached: RwLock<Option<CachedKeys>>,
}

impl JwksCache {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            cached: RwLock::new(None),
        }
    }

    /// Overrides how often an unknown `kid` may force a refetch
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Decoding key for `kid`, fetching or refreshing the set when needed
    pub async fn key_for(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        let now = Instant::now();

        let needs_refresh = {
            let cached = self.cached.read();
            match cached.as_ref() {
                None => true,
                Some(c) if now >= c.expires_at => true,
                Some(c) => match c.keys.find(kid) {
                    Some(jwk) => return decoding_key(jwk),
                    None => now.duration_since(c.fetched_at) >= self.min_refresh_interval,
                },
            }
        };

        if needs_refresh {
            self.refresh().await?;
        }

        let cached = self.cached.read();
        let jwk = cached
            .as_ref()
            .and_then(|c| c.keys.find(kid))
            .ok_or_else(|| VerifyError::UnknownKey(kid.to_string()))?;
        decoding_key(jwk)
    }

    async fn refresh(&self) -> Result<(), VerifyError> {
        debug!(url = %self.url, "Fetching identity provider signing keys");

        let response = self
            .http
            .get(&self.url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch signing keys");
                VerifyError::Unavailable(e.to_string())
            })?;

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEY_TTL);

        let keys: JwkSet = response.json().await.map_err(|e| {
            warn!(error = %e, "Signing key response is not a JWK set");
            VerifyError::Unavailable(e.to_string())
        })?;

        info!(keys = keys.keys.len(), ttl_secs = ttl.as_secs(), "Signing keys refreshed");

        let now = Instant::now();
        *self.cached.write() = Some(CachedKeys {
            keys,
            fetched_at: now,
            expires_at: now + ttl,
        });

        Ok(())
    }
}

fn decoding_key(jwk: &jsonwebtoken::jwk::Jwk) -> Result<DecodingKey, VerifyError> {
    DecodingKey::from_jwk(jwk).map_err(|e| VerifyError::Malformed(format!("unusable signing key: {e}")))
}

/// Extracts `max-age` from a `Cache-Control` header value
pub fn parse_max_age(header: &str) -> Option<Duration> {
    header.split(',').find_map(|directive| {
        let (name, value) = directive.trim().split_once('=')?;
        if name.trim().eq_ignore_ascii_case("max-age") {
            value.trim().parse::<u64>().ok().map(Duration::from_secs)
        } else {
            None
        }
    })
}

/// Verifies Firebase ID tokens for one project
pub struct FirebaseVerifier {
    project_id: String,
    issuer: String,
    keys: JwksCache,
}

impl FirebaseVerifier {
    /// Verifier backed by Google's public key endpoint
    pub fn new(project_id: impl Into<String>) -> Self {
        Self::with_keys(project_id, JwksCache::new(FIREBASE_JWKS_URL))
    }

    /// Verifier backed by a custom key source
    pub fn with_keys(project_id: impl Into<String>, keys: JwksCache) -> Self {
        let project_id = project_id.into();
        Self {
            issuer: format!("{FIREBASE_ISSUER_PREFIX}{project_id}"),
            project_id,
            keys,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        let header = decode_header(token).map_err(map_jwt_error)?;

        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::InvalidClaims(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| VerifyError::Malformed("missing kid header".to_string()))?;

        let key = self.keys.key_for(&kid).await?;
        let validation = validation(Algorithm::RS256, &self.issuer, &self.project_id);

        let claims = decode::<IdentityClaims>(token, &key, &validation)
            .map_err(map_jwt_error)?
            .claims;

        claims.check(Utc::now().timestamp())?;
        Ok(claims.into_identity())
    }
}
