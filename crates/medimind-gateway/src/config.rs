//! Gateway configuration and credential bundle loading.
//!
//! The credential bundle is a JSON file supplied out-of-band. Construction
//! fails fast when the bundle is missing, malformed, names no project, or
//! carries no usable credential.

use std::path::{Path, PathBuf};
use std::time::Duration;

use medimind_core::config::{
    DEFAULT_LOCATION, DEFAULT_MAX_REQUESTS_PER_MINUTE, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TEMPERATURE,
};
use medimind_core::{AssistantConfig, Error, Result};
use serde::Deserialize;
use tracing::info;

use crate::rate_limiter::RateLimitConfig;

pub const ACCESS_TOKEN_ENV: &str = "MEDIMIND_ACCESS_TOKEN";
pub const API_KEY_ENV: &str = "MEDIMIND_API_KEY";

/// Fields read from the credential bundle. Unknown fields (private keys,
/// client ids) are ignored.
#[derive(Debug, Default, Deserialize)]
struct CredentialBundle {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
}

/// How outbound calls authenticate.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// OAuth access token, sent as `Authorization: Bearer`.
    BearerToken(String),
    /// API key, sent as `x-goog-api-key`.
    ApiKey(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BearerToken(_) => f.write_str("BearerToken(***)"),
            Self::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}

/// Everything needed to construct a `BackendGateway`.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub credentials_path: PathBuf,
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub credential: Credential,
    pub temperature: f64,
    pub max_tokens: usize,
    pub rate_limit: RateLimitConfig,
    pub request_timeout: Duration,
}

impl GatewayConfig {
    /// Load from a credential bundle with default model settings.
    pub fn load(credentials_path: &Path, project_id: Option<&str>) -> Result<Self> {
        Self::load_with(credentials_path, project_id, |key| std::env::var(key).ok())
    }

    /// Load using the paths and limits of an `AssistantConfig`.
    pub fn from_assistant_config(config: &AssistantConfig) -> Result<Self> {
        let mut gateway = Self::load(&config.credentials_path, config.project_id.as_deref())?;
        gateway.location = config.location.clone();
        gateway.model = config.model.clone();
        gateway.temperature = config.temperature;
        gateway.max_tokens = config.max_tokens;
        gateway.rate_limit = RateLimitConfig::per_minute(config.max_requests_per_minute);
        gateway.request_timeout = config.request_timeout();
        Ok(gateway)
    }

    fn load_with(
        credentials_path: &Path,
        project_id: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let raw = std::fs::read_to_string(credentials_path).map_err(|e| {
            Error::Config(format!(
                "credentials file not found at {}: {}",
                credentials_path.display(),
                e
            ))
        })?;
        let bundle: CredentialBundle = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!(
                "malformed credentials file {}: {}",
                credentials_path.display(),
                e
            ))
        })?;

        let project_id = project_id
            .map(str::to_string)
            .or(bundle.project_id)
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                Error::Config("project id not given and not found in credentials file".into())
            })?;

        let credential = non_empty(bundle.access_token)
            .map(Credential::BearerToken)
            .or_else(|| non_empty(bundle.api_key).map(Credential::ApiKey))
            .or_else(|| non_empty(env(ACCESS_TOKEN_ENV)).map(Credential::BearerToken))
            .or_else(|| non_empty(env(API_KEY_ENV)).map(Credential::ApiKey))
            .ok_or_else(|| {
                Error::Config(format!(
                    "no access_token or api_key in {} and neither {} nor {} is set",
                    credentials_path.display(),
                    ACCESS_TOKEN_ENV,
                    API_KEY_ENV
                ))
            })?;

        info!("Configured backend credentials for project: {}", project_id);

        Ok(Self {
            credentials_path: credentials_path.to_path_buf(),
            project_id,
            location: DEFAULT_LOCATION.into(),
            model: DEFAULT_MODEL.into(),
            credential,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            rate_limit: RateLimitConfig::per_minute(DEFAULT_MAX_REQUESTS_PER_MINUTE),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
