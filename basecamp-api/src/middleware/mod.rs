/// Middleware for the API server
///
/// Authentication lives in `basecamp_shared::auth::middleware`; this module
/// holds the HTTP-only layers.

pub mod security;
