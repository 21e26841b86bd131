//! Runtime configuration: API base URL and token.
//!
//! The token is read from the environment exactly once at startup and carried
//! as an explicit value, so components never touch ambient state and tests can
//! inject a fake token without environment mutation.

use thiserror::Error;

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.courtlistener.com/api/rest/v4";

/// Environment variable holding the API token.
pub const TOKEN_ENV_VAR: &str = "COURTLISTENER_TOKEN";

/// Configuration errors, all fatal before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No usable API token was found in the environment.
    #[error("missing API token: set the {TOKEN_ENV_VAR} environment variable")]
    MissingToken,
}

/// API connection settings passed into [`ApiClient`](crate::api::ApiClient).
#[derive(Debug, Clone)]
pub struct Config {
    base_url: String,
    token: String,
}

impl Config {
    /// Creates a configuration with an explicit base URL and token.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Reads the token from [`TOKEN_ENV_VAR`] against the production base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] when the variable is unset or
    /// blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_token(std::env::var(TOKEN_ENV_VAR).ok())
    }

    /// Builds a production configuration from an optional token value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] when the token is `None` or
    /// blank.
    pub fn from_token(token: Option<String>) -> Result<Self, ConfigError> {
        match token.map(|t| t.trim().to_string()) {
            Some(token) if !token.is_empty() => Ok(Self::new(DEFAULT_BASE_URL, token)),
            _ => Err(ConfigError::MissingToken),
        }
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the API token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}
