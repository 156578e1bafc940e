/// Authentication for Basecamp
///
/// Turns a bearer token into an authenticated local user:
///
/// ```text
/// Authorization header ─▶ IdentityVerifier ─▶ IdentityResolver ─▶ AuthContext
/// ```
///
/// # Modules
///
/// - [`identity`]: the verifier seam (`IdentityVerifier`, `VerifiedIdentity`, `VerifyError`)
/// - [`jwt`]: ID token claims and the HS256 development verifier
/// - [`firebase`]: RS256 verification of Firebase ID tokens against Google's keys
/// - [`resolver`]: find-or-create of the local user for a verified identity
/// - [`middleware`]: the Axum auth gate (mandatory and optional variants)
/// - [`api_key`]: API key generation and Argon2id hashing
///
/// # Example
///
/// ```
/// use basecamp_shared::auth::api_key::{generate_api_key, verify_api_key};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let generated = generate_api_key()?;
/// assert!(verify_api_key(&generated.key, &generated.hash)?);
/// # Ok(())
/// # }
/// ```

pub mod api_key;
pub mod firebase;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod resolver;
