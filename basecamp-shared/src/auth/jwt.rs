/// ID token claims and the HS256 development verifier
///
/// Both verifiers decode the same claim set, the one carried by Firebase ID
/// tokens. [`FirebaseVerifier`](super::firebase::FirebaseVerifier) checks
/// RS256 signatures against Google's published keys; [`HmacVerifier`] checks
/// HS256 signatures against a shared secret and can also mint tokens, which
/// makes it the verifier of choice for local development and tests.
///
/// # Example
///
/// ```
/// use basecamp_shared::auth::identity::{IdentityVerifier, VerifiedIdentity};
/// use basecamp_shared::auth::jwt::HmacVerifier;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let verifier = HmacVerifier::new("an-example-secret-that-is-32-chars!");
/// let token = verifier.issue_for(&VerifiedIdentity::new("uid-123"), chrono::Duration::hours(1))?;
///
/// let identity = verifier.verify(&token).await?;
/// assert_eq!(identity.uid, "uid-123");
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::identity::{IdentityVerifier, VerifiedIdentity, VerifyError};

/// Clock skew tolerated on `exp`, `iat` and `auth_time` (seconds)
pub const CLOCK_SKEW_LEEWAY_SECS: u64 = 60;

/// Longest `sub` an identity provider may issue
pub const MAX_SUBJECT_LENGTH: usize = 128;

/// Shortest secret accepted for [`HmacVerifier`]
pub const MIN_DEV_SECRET_LENGTH: usize = 32;

/// Issuer written into development tokens
pub const DEV_ISSUER: &str = "basecamp-dev";

/// Audience written into development tokens
pub const DEV_AUDIENCE: &str = "basecamp";

/// Provider-specific block of an ID token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in_provider: Option<String>,
}

/// Claims carried by an ID token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject: the account's stable uid
    pub sub: String,

    pub aud: String,

    pub iss: String,

    /// Issued at (unix seconds)
    pub iat: i64,

    /// Expiration (unix seconds)
    pub exp: i64,

    /// When the user last authenticated (unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(default)]
    pub firebase: FirebaseClaims,
}

impl IdentityClaims {
    /// Claims for `identity`, valid from now for `ttl`
    pub fn for_identity(
        identity: &VerifiedIdentity,
        issuer: &str,
        audience: &str,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: identity.uid.clone(),
            aud: audience.to_string(),
            iss: issuer.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
            auth_time: Some(now),
            email: identity.email.clone(),
            email_verified: identity.email_verified,
            name: identity.name.clone(),
            picture: identity.picture.clone(),
            firebase: FirebaseClaims {
                sign_in_provider: identity.sign_in_provider.clone(),
            },
        }
    }

    /// Checks the claims `jsonwebtoken` does not validate itself
    pub fn check(&self, now: i64) -> Result<(), VerifyError> {
        let leeway = CLOCK_SKEW_LEEWAY_SECS as i64;

        if self.sub.is_empty() {
            return Err(VerifyError::InvalidClaims("empty subject".to_string()));
        }
        if self.sub.len() > MAX_SUBJECT_LENGTH {
            return Err(VerifyError::InvalidClaims("subject too long".to_string()));
        }
        if self.iat > now + leeway {
            return Err(VerifyError::InvalidClaims("issued in the future".to_string()));
        }
        if self.auth_time.is_some_and(|t| t > now + leeway) {
            return Err(VerifyError::InvalidClaims(
                "authenticated in the future".to_string(),
            ));
        }

        Ok(())
    }

    pub fn into_identity(self) -> VerifiedIdentity {
        VerifiedIdentity {
            uid: self.sub,
            email: self.email,
            email_verified: self.email_verified,
            name: self.name,
            picture: self.picture,
            sign_in_provider: self.firebase.sign_in_provider,
        }
    }
}

/// Validation settings shared by both verifiers
pub(crate) fn validation(algorithm: Algorithm, issuer: &str, audience: &str) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    validation.set_required_spec_claims(&["exp", "iat", "sub", "aud", "iss"]);
    validation.leeway = CLOCK_SKEW_LEEWAY_SECS;
    validation.validate_exp = true;
    validation
}

/// Maps a `jsonwebtoken` failure onto the verifier taxonomy
pub(crate) fn map_jwt_error(err: jsonwebtoken::errors::Error) -> VerifyError {
    match err.kind() {
        ErrorKind::ExpiredSignature => VerifyError::Expired,
        ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
        ErrorKind::InvalidIssuer => VerifyError::InvalidClaims("issuer mismatch".to_string()),
        ErrorKind::InvalidAudience => VerifyError::InvalidClaims("audience mismatch".to_string()),
        ErrorKind::ImmatureSignature => VerifyError::InvalidClaims("token not yet valid".to_string()),
        ErrorKind::MissingRequiredClaim(claim) => {
            VerifyError::InvalidClaims(format!("missing claim: {claim}"))
        }
        ErrorKind::InvalidAlgorithm => VerifyError::InvalidClaims("unexpected algorithm".to_string()),
        _ => VerifyError::Malformed(err.to_string()),
    }
}

/// HS256 verifier over a shared secret
///
/// Accepts tokens whose issuer is [`DEV_ISSUER`] and audience is
/// [`DEV_AUDIENCE`]. Never use it against real user traffic.
#[derive(Clone)]
pub struct HmacVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl HmacVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs arbitrary claims
    pub fn issue(&self, claims: &IdentityClaims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }

    /// Mints a token for `identity` that stays valid for `ttl`
    pub fn issue_for(
        &self,
        identity: &VerifiedIdentity,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(&IdentityClaims::for_identity(
            identity,
            DEV_ISSUER,
            DEV_AUDIENCE,
            ttl,
        ))
    }
}

#[async_trait]
impl IdentityVerifier for HmacVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        let validation = validation(Algorithm::HS256, DEV_ISSUER, DEV_AUDIENCE);

        let claims = decode::<IdentityClaims>(token, &self.decoding_key, &validation)
            .map_err(map_jwt_error)?
            .claims;

        claims.check(Utc::now().timestamp())?;
        Ok(claims.into_identity())
    }
}
