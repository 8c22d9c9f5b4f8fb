//! Demo configuration.
//!
//! Sources, highest precedence first:
//! 1. `QLAB_*` environment variables
//! 2. YAML file passed with `--config`
//! 3. Default values
//!
//! IBM secrets are never written back out: they are skipped on serialization
//! and redacted in `Debug`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use qlab_adapter_ibm::{DEFAULT_ENDPOINT, DEFAULT_OPTIMIZATION_LEVEL, IbmCredentials};
use qlab_adapter_sim::ThermalParams;

use crate::error::{DemoError, DemoResult};

/// Settings shared by the demo programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Shots for the random number generator.
    #[serde(default = "default_qrng_shots")]
    pub qrng_shots: u32,

    /// Shots for the teleportation check.
    #[serde(default = "default_teleport_shots")]
    pub teleport_shots: u32,

    /// Upper bound on the remote session lifetime, in minutes.
    #[serde(default = "default_session_max_minutes")]
    pub session_max_minutes: u64,

    /// Directory for written artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Fixed seed for simulator sampling and outcome selection.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Remote service settings.
    #[serde(default)]
    pub ibm: IbmSettings,

    /// Distribution of the simulated device's T1/T2 times.
    #[serde(default)]
    pub noise: ThermalParams,
}

/// IBM Quantum Platform settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct IbmSettings {
    /// Channel name.
    #[serde(default)]
    pub channel: Option<String>,

    /// API base URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Instance CRN.
    #[serde(default)]
    pub instance: Option<String>,

    /// IBM Cloud API key.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Transpiler optimization level.
    #[serde(default = "default_optimization_level")]
    pub optimization_level: u8,
}

impl fmt::Debug for IbmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmSettings")
            .field("channel", &self.channel)
            .field("url", &self.url)
            .field("instance", &self.instance)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("optimization_level", &self.optimization_level)
            .finish()
    }
}

impl Default for IbmSettings {
    fn default() -> Self {
        Self {
            channel: None,
            url: None,
            instance: None,
            api_key: None,
            optimization_level: default_optimization_level(),
        }
    }
}

fn default_qrng_shots() -> u32 {
    4096
}

fn default_teleport_shots() -> u32 {
    100_000
}

fn default_session_max_minutes() -> u64 {
    25
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_optimization_level() -> u8 {
    DEFAULT_OPTIMIZATION_LEVEL
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            qrng_shots: default_qrng_shots(),
            teleport_shots: default_teleport_shots(),
            session_max_minutes: default_session_max_minutes(),
            output_dir: default_output_dir(),
            seed: None,
            ibm: IbmSettings::default(),
            noise: ThermalParams::default(),
        }
    }
}

impl DemoConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> DemoResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DemoError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_yaml_ng::from_str(&contents)
            .map_err(|e| DemoError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// File (or defaults), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> DemoResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.merge_env();
        config.validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Apply `QLAB_*` variables from the process environment.
    pub fn merge_env(self) -> Self {
        self.merge_env_from(|name| std::env::var(name).ok())
    }

    /// Apply `QLAB_*` variables from `lookup`.
    ///
    /// Only variables that are present override; unparsable numbers are
    /// ignored.
    pub fn merge_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
            value.and_then(|v| v.trim().parse().ok())
        }

        if let Some(v) = parsed(lookup("QLAB_QRNG_SHOTS")) {
            self.qrng_shots = v;
        }
        if let Some(v) = parsed(lookup("QLAB_TELEPORT_SHOTS")) {
            self.teleport_shots = v;
        }
        if let Some(v) = parsed(lookup("QLAB_SESSION_MAX_MINUTES")) {
            self.session_max_minutes = v;
        }
        if let Some(v) = lookup("QLAB_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = parsed(lookup("QLAB_SEED")) {
            self.seed = Some(v);
        }

        // IBM
        if let Some(v) = lookup("QLAB_IBM_CHANNEL") {
            self.ibm.channel = Some(v);
        }
        if let Some(v) = lookup("QLAB_IBM_URL") {
            self.ibm.url = Some(v);
        }
        if let Some(v) = lookup("QLAB_IBM_INSTANCE") {
            self.ibm.instance = Some(v);
        }
        if let Some(v) = parsed(lookup("QLAB_IBM_OPTIMIZATION_LEVEL")) {
            self.ibm.optimization_level = v;
        }

        // Noise
        if let Some(v) = parsed(lookup("QLAB_NOISE_T1_MEAN")) {
            self.noise.t1_mean = v;
        }
        if let Some(v) = parsed(lookup("QLAB_NOISE_T1_STD")) {
            self.noise.t1_std = v;
        }
        if let Some(v) = parsed(lookup("QLAB_NOISE_T2_MEAN")) {
            self.noise.t2_mean = v;
        }
        if let Some(v) = parsed(lookup("QLAB_NOISE_T2_STD")) {
            self.noise.t2_std = v;
        }

        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> DemoResult<()> {
        if self.qrng_shots == 0 || self.teleport_shots == 0 {
            return Err(DemoError::Config("shot counts must be greater than 0".into()));
        }
        if self.session_max_minutes == 0 {
            return Err(DemoError::Config(
                "session_max_minutes must be greater than 0".into(),
            ));
        }
        if self.ibm.optimization_level > 3 {
            return Err(DemoError::Config(format!(
                "optimization_level must be 0..=3, got {}",
                self.ibm.optimization_level
            )));
        }
        let noise = &self.noise;
        let times = [noise.t1_mean, noise.t1_std, noise.t2_mean, noise.t2_std];
        if times.iter().any(|t| !t.is_finite() || *t < 0.0) || noise.t1_mean == 0.0 {
            return Err(DemoError::Config(
                "noise times must be finite and non-negative, with t1_mean > 0".into(),
            ));
        }
        if let Some(key) = &self.ibm.api_key {
            if key.trim().is_empty() {
                return Err(DemoError::Config(
                    "ibm.api_key must not be empty; omit the field instead".into(),
                ));
            }
        }
        Ok(())
    }

    /// Remote session lifetime.
    pub fn session_max_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_max_minutes * 60)
    }

    /// IBM credentials: the environment first, this configuration for
    /// anything the environment leaves unset.
    pub async fn credentials(&self) -> IbmCredentials {
        self.fill_credentials(IbmCredentials::from_env().await)
    }

    /// Fill the gaps in `credentials` from this configuration.
    pub fn fill_credentials(&self, mut credentials: IbmCredentials) -> IbmCredentials {
        let defaults = IbmCredentials::default();
        if credentials.instance.is_none() {
            credentials.instance.clone_from(&self.ibm.instance);
        }
        if credentials.api_key.is_none() {
            credentials.api_key.clone_from(&self.ibm.api_key);
        }
        if credentials.url == DEFAULT_ENDPOINT {
            if let Some(url) = &self.ibm.url {
                credentials.url.clone_from(url);
            }
        }
        if credentials.channel == defaults.channel {
            if let Some(channel) = &self.ibm.channel {
                credentials.channel.clone_from(channel);
            }
        }
        credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = DemoConfig::default();
        assert_eq!(config.qrng_shots, 4096);
        assert_eq!(config.teleport_shots, 100_000);
        assert_eq!(config.session_max_ttl().as_secs(), 25 * 60);
        assert_eq!(config.ibm.optimization_level, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_file_uses_defaults() {
        let config: DemoConfig = serde_yaml_ng::from_str(
            "qrng_shots: 1024\nibm:\n  instance: crn:v1:test\nnoise:\n  t1_mean: 80000.0\n",
        )
        .unwrap();
        assert_eq!(config.qrng_shots, 1024);
        assert_eq!(config.teleport_shots, 100_000);
        assert_eq!(config.ibm.instance.as_deref(), Some("crn:v1:test"));
        assert_eq!(config.ibm.optimization_level, 1);
        assert_eq!(config.noise.t1_mean, 80000.0);
        assert_eq!(config.noise.t2_mean, 70e3);
    }

    #[test]
    fn test_merge_env_only_overrides_present_vars() {
        let env: HashMap<&str, &str> = [
            ("QLAB_QRNG_SHOTS", "2048"),
            ("QLAB_SEED", "7"),
            ("QLAB_IBM_INSTANCE", "crn:v1:env"),
            ("QLAB_TELEPORT_SHOTS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = DemoConfig::default().merge_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.qrng_shots, 2048);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.ibm.instance.as_deref(), Some("crn:v1:env"));
        assert_eq!(config.teleport_shots, 100_000);
        assert_eq!(config.session_max_minutes, 25);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DemoConfig::default();
        config.qrng_shots = 0;
        assert!(config.validate().is_err());

        let mut config = DemoConfig::default();
        config.ibm.optimization_level = 4;
        assert!(config.validate().is_err());

        let mut config = DemoConfig::default();
        config.noise.t1_mean = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = DemoConfig::default();
        config.ibm.api_key = Some("  ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_never_serialized_or_printed() {
        let mut config = DemoConfig::default();
        config.ibm.api_key = Some("super-secret".into());

        let yaml = serde_yaml_ng::to_string(&config).unwrap();
        assert!(!yaml.contains("super-secret"));
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn test_fill_credentials_prefers_environment() {
        let mut config = DemoConfig::default();
        config.ibm.instance = Some("crn:config".into());
        config.ibm.api_key = Some("config-key".into());
        config.ibm.url = Some("https://config.example".into());

        let from_env = IbmCredentials::default().with_instance("crn:env");
        let merged = config.fill_credentials(from_env);
        assert_eq!(merged.instance.as_deref(), Some("crn:env"));
        assert_eq!(merged.api_key.as_deref(), Some("config-key"));
        assert_eq!(merged.url, "https://config.example");

        let env_url = IbmCredentials::default().with_url("https://env.example");
        assert_eq!(config.fill_credentials(env_url).url, "https://env.example");
    }
}
