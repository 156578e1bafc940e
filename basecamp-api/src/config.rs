/// Configuration management for the API server
///
/// Loads configuration from environment variables (and a `.env` file when
/// present) into a typed struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `APP_ENV`: `production` enables HSTS (default: development)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `DATABASE_MIN_CONNECTIONS`: Warm connections (default: 2)
/// - `RUN_MIGRATIONS`: Apply migrations on startup (default: true)
/// - `FIREBASE_PROJECT_ID` (or `FIREBASE_ADMIN_PROJECT_ID`): verify Firebase ID tokens
/// - `IDENTITY_DEV_SECRET`: verify HS256 development tokens instead
///
/// Exactly one of the identity settings must be present.
///
/// # Example
///
/// ```no_run
/// use basecamp_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;

use basecamp_shared::auth::jwt::MIN_DEV_SECRET_LENGTH;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Running in production (enables HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    pub max_connections: u32,

    pub min_connections: u32,

    /// Apply pending migrations before serving
    pub run_migrations: bool,
}

/// Which identity provider verifies bearer tokens
#[derive(Clone)]
pub enum IdentityConfig {
    /// Firebase ID tokens for the given project
    Firebase { project_id: String },

    /// HS256 tokens signed with a shared secret
    Development { secret: String },
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityConfig::Firebase { project_id } => f
                .debug_struct("Firebase")
                .field("project_id", project_id)
                .finish(),
            IdentityConfig::Development { .. } => f
                .debug_struct("Development")
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value does not
    /// parse, or the identity settings are absent or ambiguous.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT must be a port number: {e}"))?;

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = var("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;
        let min_connections = var("DATABASE_MIN_CONNECTIONS")
            .unwrap_or_else(|| "2".to_string())
            .parse::<u32>()?;

        let run_migrations = match var("RUN_MIGRATIONS") {
            None => true,
            Some(v) => parse_bool(&v)
                .ok_or_else(|| anyhow::anyhow!("RUN_MIGRATIONS must be true or false, got {v}"))?,
        };

        let project_id = var("FIREBASE_PROJECT_ID").or_else(|| var("FIREBASE_ADMIN_PROJECT_ID"));
        let identity = match (project_id, var("IDENTITY_DEV_SECRET")) {
            (Some(project_id), None) => IdentityConfig::Firebase { project_id },
            (None, Some(secret)) => {
                if secret.len() < MIN_DEV_SECRET_LENGTH {
                    anyhow::bail!(
                        "IDENTITY_DEV_SECRET must be at least {MIN_DEV_SECRET_LENGTH} characters long"
                    );
                }
                IdentityConfig::Development { secret }
            }
            (Some(_), Some(_)) => anyhow::bail!(
                "Set either FIREBASE_PROJECT_ID or IDENTITY_DEV_SECRET, not both"
            ),
            (None, None) => anyhow::bail!(
                "FIREBASE_PROJECT_ID (or IDENTITY_DEV_SECRET for development) is required"
            ),
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections,
                run_migrations,
            },
            identity,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const DB: (&str, &str) = ("DATABASE_URL", "postgresql://localhost/basecamp");
    const SECRET: (&str, &str) = ("IDENTITY_DEV_SECRET", "dev-secret-that-is-at-least-32-chars");

    #[test]
    fn test_defaults() {
        let config = load(&[DB, ("FIREBASE_PROJECT_ID", "demo-project")]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*"]);
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.min_connections, 2);
        assert!(config.database.run_migrations);
        assert!(matches!(
            config.identity,
            IdentityConfig::Firebase { ref project_id } if project_id == "demo-project"
        ));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            DB,
            SECRET,
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3000"),
            ("CORS_ORIGINS", "https://app.example.com, https://admin.example.com"),
            ("APP_ENV", "production"),
            ("RUN_MIGRATIONS", "false"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(
            config.api.cors_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        assert!(config.api.production);
        assert!(!config.database.run_migrations);
        assert!(matches!(config.identity, IdentityConfig::Development { .. }));
    }

    #[test]
    fn test_admin_project_id_fallback() {
        let config = load(&[DB, ("FIREBASE_ADMIN_PROJECT_ID", "admin-project")]).unwrap();
        assert!(matches!(
            config.identity,
            IdentityConfig::Firebase { ref project_id } if project_id == "admin-project"
        ));
    }

    #[test]
    fn test_database_url_required() {
        let err = load(&[SECRET]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_identity_must_be_unambiguous() {
        assert!(load(&[DB]).is_err());
        assert!(load(&[DB, SECRET, ("FIREBASE_PROJECT_ID", "p")]).is_err());
    }

    #[test]
    fn test_short_dev_secret_rejected() {
        let err = load(&[DB, ("IDENTITY_DEV_SECRET", "short")]).unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(load(&[DB, SECRET, ("API_PORT", "eighty")]).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = load(&[DB, SECRET]).unwrap();
        let debug = format!("{:?}", config.identity);
        assert!(!debug.contains("dev-secret"));
    }
}
