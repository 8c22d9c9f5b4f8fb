//! Account credentials and the account summary shown to users.

use std::fmt;

use serde::Serialize;

use qlab_hal::{EnvTokenProvider, TokenProvider};

use crate::api::{DEFAULT_ENDPOINT, IAM_TOKEN_URL};

/// Channel name reported for the IBM Cloud hosted platform.
pub const DEFAULT_CHANNEL: &str = "ibm_quantum_platform";

/// Environment variable holding the instance CRN.
pub const SERVICE_CRN_ENV: &str = "IBM_SERVICE_CRN";
/// Environment variable overriding the API endpoint.
pub const URL_ENV: &str = "IBM_QUANTUM_URL";
/// Environment variable overriding the channel name.
pub const CHANNEL_ENV: &str = "IBM_QUANTUM_CHANNEL";

/// Credentials and connection settings for the IBM Quantum Platform.
///
/// Either `api_key` (exchanged for an IAM token, requires `instance`) or a
/// ready-made bearer `token` must be present.
#[derive(Clone)]
pub struct IbmCredentials {
    /// Channel name, informational.
    pub channel: String,
    /// REST API base URL.
    pub url: String,
    /// IAM token endpoint.
    pub iam_url: String,
    /// Instance CRN, sent as the `Service-CRN` header.
    pub instance: Option<String>,
    /// IBM Cloud API key.
    pub api_key: Option<String>,
    /// Pre-issued bearer token.
    pub token: Option<String>,
    /// Verify TLS certificates.
    pub verify: bool,
    /// Route through a private endpoint.
    pub private_endpoint: bool,
}

impl Default for IbmCredentials {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.into(),
            url: DEFAULT_ENDPOINT.into(),
            iam_url: IAM_TOKEN_URL.into(),
            instance: None,
            api_key: None,
            token: None,
            verify: true,
            private_endpoint: false,
        }
    }
}

impl IbmCredentials {
    /// Read credentials from `IBM_API_KEY`, `IBM_QUANTUM_TOKEN`,
    /// `IBM_SERVICE_CRN`, `IBM_QUANTUM_URL` and `IBM_QUANTUM_CHANNEL`.
    ///
    /// Missing variables are left unset; [`crate::IbmClient::connect`]
    /// reports what is missing.
    pub async fn from_env() -> Self {
        let api_key = EnvTokenProvider::ibm_api_key().get_token().await.ok();
        let token = EnvTokenProvider::ibm().get_token().await.ok();
        let non_blank = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut credentials = Self {
            instance: non_blank(SERVICE_CRN_ENV),
            api_key,
            token,
            ..Self::default()
        };
        if let Some(url) = non_blank(URL_ENV) {
            credentials.url = url;
        }
        if let Some(channel) = non_blank(CHANNEL_ENV) {
            credentials.channel = channel;
        }
        credentials
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the instance CRN.
    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Set the API base URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Whether any secret is configured.
    pub fn has_secret(&self) -> bool {
        self.api_key.is_some() || self.token.is_some()
    }

    /// Account summary without secrets.
    pub fn account(&self) -> AccountInfo {
        AccountInfo {
            channel: self.channel.clone(),
            url: self.url.clone(),
            instance: self.instance.clone(),
            verify: self.verify,
            private_endpoint: self.private_endpoint,
        }
    }
}

impl fmt::Debug for IbmCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &Option<String>| s.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("IbmCredentials")
            .field("channel", &self.channel)
            .field("url", &self.url)
            .field("instance", &self.instance)
            .field("api_key", &redact(&self.api_key))
            .field("token", &redact(&self.token))
            .field("verify", &self.verify)
            .field("private_endpoint", &self.private_endpoint)
            .finish()
    }
}

/// Saved-account view printed before a remote run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    /// Channel name.
    pub channel: String,
    /// API base URL.
    pub url: String,
    /// Instance CRN.
    pub instance: Option<String>,
    /// TLS verification flag.
    pub verify: bool,
    /// Private endpoint flag.
    pub private_endpoint: bool,
}

impl fmt::Display for AccountInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Channel: {}", self.channel)?;
        writeln!(f, "  URL: {}", self.url)?;
        writeln!(f, "  Instance: {}", self.instance.as_deref().unwrap_or("(none)"))?;
        writeln!(f, "  Verify: {}", self.verify)?;
        write!(f, "  Private endpoint: {}", self.private_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_cloud_platform() {
        let creds = IbmCredentials::default();
        assert_eq!(creds.channel, DEFAULT_CHANNEL);
        assert!(creds.url.contains("quantum.cloud.ibm.com"));
        assert!(creds.verify);
        assert!(!creds.has_secret());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = IbmCredentials::default()
            .with_api_key("very-secret-key")
            .with_token("bearer-xyz")
            .with_instance("crn:v1:test");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("very-secret-key"));
        assert!(!debug.contains("bearer-xyz"));
        assert!(debug.contains("crn:v1:test"));
    }

    #[test]
    fn test_account_info_has_no_secrets() {
        let creds = IbmCredentials::default()
            .with_api_key("k")
            .with_instance("crn:v1:abc")
            .with_url("https://example.test/api");
        let account = creds.account();
        assert_eq!(account.instance.as_deref(), Some("crn:v1:abc"));
        let shown = account.to_string();
        assert!(shown.contains("  URL: https://example.test/api"));
        assert!(shown.contains("  Private endpoint: false"));
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("api_key"));
    }
}
