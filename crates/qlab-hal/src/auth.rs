//! Credentials for remote backends.
//!
//! Remote adapters receive their bearer token through a [`TokenProvider`].
//! Tokens obtained from an exchange (such as IBM Cloud IAM) are kept as a
//! [`CachedToken`] so the adapter can refresh them before they expire.
//!
//! # Example
//!
//! ```ignore
//! use qlab_hal::auth::{EnvTokenProvider, TokenProvider};
//!
//! let provider = EnvTokenProvider::ibm();
//! if provider.has_valid_token() {
//!     let token = provider.get_token().await?;
//! }
//! ```

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{HalError, HalResult};

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Access token with its expiry.
#[derive(Clone, Serialize, Deserialize)]
pub struct CachedToken {
    /// Access token.
    pub access_token: String,

    /// Refresh token (if available).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer").
    pub token_type: String,

    /// Expiration time (Unix timestamp).
    pub expires_at: u64,
}

impl CachedToken {
    /// Token that expires `expires_in` seconds from now.
    pub fn from_expires_in(access_token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_at: unix_now().saturating_add(expires_in),
        }
    }

    /// Token without a known expiry.
    pub fn non_expiring(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_at: u64::MAX,
        }
    }

    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        unix_now() >= self.expires_at
    }

    /// Check if the token will expire soon (within buffer).
    pub fn expires_soon(&self, buffer_secs: u64) -> bool {
        unix_now().saturating_add(buffer_secs) >= self.expires_at
    }

    /// Value for an `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Token provider trait for dependency injection.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a valid access token.
    async fn get_token(&self) -> HalResult<String>;

    /// Check if authentication is available.
    fn has_valid_token(&self) -> bool;
}

/// Environment variable token provider.
///
/// Simple provider that reads token from an environment variable.
pub struct EnvTokenProvider {
    env_var: String,
}

impl EnvTokenProvider {
    /// Create a new environment variable token provider.
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }

    /// Create provider for IBM_QUANTUM_TOKEN (a ready bearer token).
    pub fn ibm() -> Self {
        Self::new("IBM_QUANTUM_TOKEN")
    }

    /// Create provider for IBM_API_KEY (exchanged for a bearer token via IAM).
    pub fn ibm_api_key() -> Self {
        Self::new("IBM_API_KEY")
    }

    /// Name of the variable this provider reads.
    pub fn env_var(&self) -> &str {
        &self.env_var
    }
}

#[async_trait::async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn get_token(&self) -> HalResult<String> {
        match std::env::var(&self.env_var) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(HalError::AuthenticationFailed(format!(
                "Environment variable {} not set",
                self.env_var
            ))),
        }
    }

    fn has_valid_token(&self) -> bool {
        std::env::var(&self.env_var).is_ok_and(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_token_expiry() {
        let now = unix_now();

        let expired_token = CachedToken {
            access_token: "token".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_at: now - 100,
        };
        assert!(expired_token.is_expired());

        let valid_token = CachedToken::from_expires_in("token", 3600);
        assert!(!valid_token.is_expired());
        assert!(!valid_token.expires_soon(300));

        let expiring_soon = CachedToken::from_expires_in("token", 60);
        assert!(!expiring_soon.is_expired());
        assert!(expiring_soon.expires_soon(300));

        assert!(!CachedToken::non_expiring("t").expires_soon(u64::MAX / 2));
    }

    #[test]
    fn test_cached_token_debug_redacts() {
        let token = CachedToken::from_expires_in("very-secret", 10);
        assert!(!format!("{token:?}").contains("very-secret"));
        assert_eq!(token.authorization(), "Bearer very-secret");
    }

    #[test]
    fn test_env_token_provider() {
        // SAFETY: This test runs in isolation and only modifies a test-specific variable
        unsafe {
            std::env::set_var("QLAB_TEST_TOKEN_VAR_12345", "test-token-value");
        }
        let provider = EnvTokenProvider::new("QLAB_TEST_TOKEN_VAR_12345");
        assert!(provider.has_valid_token());

        let missing_provider = EnvTokenProvider::new("NONEXISTENT_VAR_12345");
        assert!(!missing_provider.has_valid_token());

        // SAFETY: Cleaning up test variable
        unsafe {
            std::env::remove_var("QLAB_TEST_TOKEN_VAR_12345");
        }
    }
}
