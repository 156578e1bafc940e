/// Client configuration
///
/// # Environment Variables
///
/// - `BASECAMP_API_URL`: Base URL of the Basecamp API (default: empty, i.e. paths are used as given)
/// - `FIREBASE_API_KEY`: Public web API key of the Firebase project (required)
/// - `FIREBASE_AUTH_DOMAIN`: Auth domain, e.g. `my-project.firebaseapp.com`
/// - `FIREBASE_PROJECT_ID`: Firebase project id

use std::env;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
}

/// Public client configuration
///
/// None of these values are secrets; the web API key only identifies the
/// project to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub firebase_api_key: String,
    pub firebase_auth_domain: Option<String>,
    pub firebase_project_id: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from environment variables (and `.env`)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            api_url: var("BASECAMP_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            firebase_api_key: var("FIREBASE_API_KEY")
                .ok_or(ConfigError::Missing("FIREBASE_API_KEY"))?,
            firebase_auth_domain: var("FIREBASE_AUTH_DOMAIN"),
            firebase_project_id: var("FIREBASE_PROJECT_ID"),
        })
    }
}
