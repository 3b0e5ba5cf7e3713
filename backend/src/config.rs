//! Application configuration (`coach.toml` plus environment overrides).
//!
//! ```toml
//! [repository]
//! type = "local"            # or "postgres"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [sharing]
//! base_url = "https://coach.example.com"
//! default_expiry_days = 30
//!
//! [analysis]
//! endpoint = "https://analysis.internal/v1/score"
//! timeout_secs = 30
//!
//! [normalizer]
//! seed = 42
//!
//! [auth]
//! mode = "tokens"
//! [[auth.tokens]]
//! token = "dev-token"
//! user_id = "dev"
//! email = "dev@example.com"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::algorithms::timestamps::{
    DEFAULT_CHARS_PER_SECOND, DEFAULT_SAME_SPEAKER_PAUSE_SECS, DEFAULT_SEED,
    DEFAULT_TURN_PAUSE_MAX_SECS, DEFAULT_TURN_PAUSE_MIN_SECS,
};
use crate::algorithms::{NormalizerConfig, PauseJitter};
use crate::auth::{Authenticator, StaticTokenAuthenticator, TokenEntry, TrustedHeaderAuthenticator};
use crate::db::repo_config::find_config_file;
use crate::db::RepositoryConfig;
use crate::error::CoachResult;
use crate::services::analysis_client::{
    AnalysisProvider, HttpAnalysisProvider, HttpProfileLookup, NoAnalysisProvider,
    NoProfileLookup, ProfileLookup, DEFAULT_UPSTREAM_TIMEOUT_SECS,
};
use crate::services::sharing::ShareSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Analysis capability URL. Unset means every sub-score is derived.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Customer profile lookup URL. Unset disables enrichment.
    pub enrichment_endpoint: Option<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            enrichment_endpoint: None,
        }
    }
}

impl AnalysisSettings {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn build_provider(&self) -> CoachResult<Arc<dyn AnalysisProvider>> {
        Ok(match &self.endpoint {
            Some(url) => Arc::new(HttpAnalysisProvider::new(
                url.clone(),
                self.api_key.clone(),
                self.timeout(),
            )?),
            None => Arc::new(NoAnalysisProvider),
        })
    }

    pub fn build_profile_lookup(&self) -> CoachResult<Arc<dyn ProfileLookup>> {
        Ok(match &self.enrichment_endpoint {
            Some(url) => Arc::new(HttpProfileLookup::new(url.clone(), self.timeout())?),
            None => Arc::new(NoProfileLookup),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerSettings {
    pub chars_per_second: f64,
    pub same_speaker_pause_secs: f64,
    pub turn_pause_min_secs: f64,
    pub turn_pause_max_secs: f64,
    pub seed: u64,
    /// Draw pause jitter from OS entropy; reruns then differ.
    pub nondeterministic: bool,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            chars_per_second: DEFAULT_CHARS_PER_SECOND,
            same_speaker_pause_secs: DEFAULT_SAME_SPEAKER_PAUSE_SECS,
            turn_pause_min_secs: DEFAULT_TURN_PAUSE_MIN_SECS,
            turn_pause_max_secs: DEFAULT_TURN_PAUSE_MAX_SECS,
            seed: DEFAULT_SEED,
            nondeterministic: false,
        }
    }
}

impl NormalizerSettings {
    pub fn to_normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig {
            chars_per_second: self.chars_per_second,
            same_speaker_pause_secs: self.same_speaker_pause_secs,
            turn_pause_min_secs: self.turn_pause_min_secs,
            turn_pause_max_secs: self.turn_pause_max_secs,
            jitter: if self.nondeterministic {
                PauseJitter::Entropy
            } else {
                PauseJitter::Seeded(self.seed)
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Identity headers from a trusted gateway.
    #[default]
    Headers,
    /// Bearer tokens listed under `[[auth.tokens]]`.
    Tokens,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub mode: AuthMode,
    pub tokens: Vec<TokenEntry>,
}

impl AuthSettings {
    pub fn build_authenticator(&self) -> Result<Arc<dyn Authenticator>, ConfigError> {
        match self.mode {
            AuthMode::Headers => Ok(Arc::new(TrustedHeaderAuthenticator)),
            AuthMode::Tokens if self.tokens.is_empty() => Err(ConfigError::Invalid(
                "auth.mode = \"tokens\" requires at least one [[auth.tokens]] entry".to_string(),
            )),
            AuthMode::Tokens => Ok(Arc::new(StaticTokenAuthenticator::new(
                self.tokens.iter().cloned(),
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub sharing: ShareSettings,
    pub analysis: AnalysisSettings,
    pub normalizer: NormalizerSettings,
    pub auth: AuthSettings,
    /// `[repository]` and `[postgres]` sections.
    #[serde(skip)]
    pub storage: RepositoryConfig,
}

fn env_parsed<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{} has an invalid value: {}", key, value))),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: AppConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.storage =
            RepositoryConfig::from_toml_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    /// First `coach.toml` found in the standard locations (defaults when
    /// none exists), then environment overrides, then validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match find_config_file() {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                log::info!("No coach.toml found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parsed("PORT")? {
            self.server.port = port;
        }
        if let Ok(url) = std::env::var("SHARE_BASE_URL") {
            self.sharing.base_url = url;
        }
        if let Ok(url) = std::env::var("ANALYSIS_ENDPOINT") {
            self.analysis.endpoint = Some(url);
        }
        if let Ok(key) = std::env::var("ANALYSIS_API_KEY") {
            self.analysis.api_key = Some(key);
        }
        if let Some(secs) = env_parsed("ANALYSIS_TIMEOUT_SECS")? {
            self.analysis.timeout_secs = secs;
        }
        self.storage.apply_env_overrides();
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "analysis.timeout_secs must be positive".to_string(),
            ));
        }
        if self.sharing.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("sharing.base_url must not be empty".to_string()));
        }
        if self.sharing.default_expiry_days == Some(0) {
            return Err(ConfigError::Invalid(
                "sharing.default_expiry_days must be at least 1".to_string(),
            ));
        }
        let n = &self.normalizer;
        if n.chars_per_second.is_nan() || n.chars_per_second <= 0.0 || n.turn_pause_min_secs > n.turn_pause_max_secs {
            return Err(ConfigError::Invalid(
                "normalizer needs chars_per_second > 0 and turn_pause_min_secs <= turn_pause_max_secs"
                    .to_string(),
            ));
        }
        self.storage
            .repository_type()
            .map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RepositoryType;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.sharing.base_url, "http://localhost:5173");
        assert_eq!(config.analysis.timeout_secs, 30);
        assert_eq!(config.auth.mode, AuthMode::Headers);
        assert_eq!(
            config.normalizer.to_normalizer_config(),
            NormalizerConfig::default()
        );
        assert_eq!(config.storage.repository_type().unwrap(), RepositoryType::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_document() {
        let toml = r#"
[repository]
type = "local"

[server]
host = "127.0.0.1"
port = 9001

[sharing]
base_url = "https://coach.example.com"
default_expiry_days = 14

[analysis]
endpoint = "http://analysis.local/score"
timeout_secs = 5

[normalizer]
seed = 7
nondeterministic = true

[auth]
mode = "tokens"

[[auth.tokens]]
token = "t-1"
user_id = "u-1"
email = "u1@example.com"
"#;
        let config = AppConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.server.bind_addr(), "127.0.0.1:9001");
        assert_eq!(config.sharing.default_expiry_days, Some(14));
        assert_eq!(config.analysis.endpoint.as_deref(), Some("http://analysis.local/score"));
        assert_eq!(
            config.normalizer.to_normalizer_config().jitter,
            PauseJitter::Entropy
        );
        assert_eq!(config.auth.tokens.len(), 1);
        assert!(config.auth.build_authenticator().is_ok());
        assert!(config.analysis.build_provider().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = AppConfig::from_toml_str("[auth]\nmode = \"tokens\"\n").unwrap();
        assert!(matches!(
            config.auth.build_authenticator(),
            Err(ConfigError::Invalid(_))
        ));

        let config = AppConfig::from_toml_str("[analysis]\ntimeout_secs = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = AppConfig::from_toml_str("[repository]\ntype = \"mongo\"\n").unwrap();
        assert!(config.validate().is_err());

        assert!(matches!(
            AppConfig::from_toml_str("[server]\nport = \"eighty\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
