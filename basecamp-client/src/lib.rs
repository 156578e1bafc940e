//! # Basecamp Client Library
//!
//! Client-side counterpart of the Basecamp API:
//!
//! - `config`: Public client configuration from the environment
//! - `identity_toolkit`: The identity provider's end-user REST operations
//! - `session`: Observable sign-in state and ID token access
//! - `api`: Authenticated JSON calls to the Basecamp API
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use basecamp_client::{ApiClient, AuthSession, ClientConfig, IdentityToolkit};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let session = Arc::new(AuthSession::new(IdentityToolkit::new(&config.firebase_api_key)));
//! session.sign_in_email("ada@example.com", "correct horse").await?;
//!
//! let api = ApiClient::new(&config.api_url).with_session(session);
//! let me: serde_json::Value = api.get("/me").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod identity_toolkit;
pub mod session;

pub use api::{ApiClient, ClientError, RequestOptions};
pub use config::{ClientConfig, ConfigError};
pub use identity_toolkit::{IdentityToolkit, TokenGrant, ToolkitError};
pub use session::{AuthSession, AuthState, AuthUser, SessionError};
