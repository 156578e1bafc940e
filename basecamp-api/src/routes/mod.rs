/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `me`: Profile of the authenticated user
/// - `projects`: Project listing and creation
/// - `api_keys`: API key management endpoints
/// - `usage`: Usage recording and summaries

pub mod api_keys;
pub mod health;
pub mod me;
pub mod projects;
pub mod usage;
