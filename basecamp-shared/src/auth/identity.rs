//! Identity oracle seam
//!
//! The identity provider issues signed ID tokens; this crate only consumes
//! its verification contract. An [`IdentityVerifier`] turns an opaque bearer
//! string into a [`VerifiedIdentity`] or a [`VerifyError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity proven by a successfully verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    /// Stable identifier of the external account
    pub uid: String,

    pub email: Option<String>,

    pub email_verified: bool,

    /// Display name
    pub name: Option<String>,

    /// Avatar URL
    pub picture: Option<String>,

    /// How the user signed in (e.g. "password", "google.com")
    pub sign_in_provider: Option<String>,
}

impl VerifiedIdentity {
    /// Identity with only a uid, as minted by tests
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            email_verified: false,
            name: None,
            picture: None,
            sign_in_provider: None,
        }
    }
}

/// Error type for token verification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("token has expired")]
    Expired,

    /// Not a decodable JWT
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The `kid` header names no published signing key
    #[error("unknown signing key: {0}")]
    UnknownKey(String),

    #[error("invalid token signature")]
    InvalidSignature,

    /// Audience, issuer, subject or timestamps don't match
    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    /// The identity provider could not be reached to fetch signing keys
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl VerifyError {
    /// True when the token itself was rejected
    ///
    /// `Unavailable` is the only variant that says nothing about the token.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, VerifyError::Unavailable(_))
    }
}

/// Verifies bearer tokens issued by an identity provider
///
/// Implementations must not cache verification results: every call checks
/// the token it is given.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError>;
}
