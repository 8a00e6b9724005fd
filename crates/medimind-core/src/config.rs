//! Configuration and data directory management.

use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 3004;
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";
pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_CREDENTIALS_FILE: &str = "cred.json";
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: u32 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: usize = 4096;

/// Paths to all MediMind data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Persisted session snapshots (`data/sessions/`).
    pub sessions: PathBuf,
    /// Tabular exports (`data/exports/`).
    pub exports: PathBuf,
    /// Attachments uploaded over HTTP (`data/uploads/`).
    pub uploads: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            sessions: root.join("sessions"),
            exports: root.join("exports"),
            uploads: root.join("uploads"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.sessions)?;
        std::fs::create_dir_all(&self.exports)?;
        std::fs::create_dir_all(&self.uploads)?;
        Ok(())
    }

    pub fn session_file(&self, name: &str) -> Result<PathBuf> {
        confine(&self.sessions, name)
    }

    pub fn export_file(&self, name: &str) -> Result<PathBuf> {
        confine(&self.exports, name)
    }

    pub fn upload_file(&self, name: &str) -> Result<PathBuf> {
        confine(&self.uploads, name)
    }

    /// `sessions/health_session_<unix>.json`
    pub fn default_snapshot_path(&self, unix_secs: i64) -> PathBuf {
        self.sessions
            .join(format!("health_session_{}.json", unix_secs))
    }

    /// `exports/health_session_<unix>.csv`
    pub fn default_export_path(&self, unix_secs: i64) -> PathBuf {
        self.exports.join(format!("health_session_{}.csv", unix_secs))
    }
}

/// Resolve a client-supplied file name inside `dir`.
///
/// Only a single plain name is accepted: no separators, no `..`, no hidden
/// names. If the target already exists (possibly as a symlink) it must
/// still resolve inside `dir`.
pub fn confine(dir: &Path, name: &str) -> Result<PathBuf> {
    let invalid = || Error::InvalidPath(format!("{} is not a plain file name", name));

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => {}
        _ => return Err(invalid()),
    }
    if name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(invalid());
    }

    let path = dir.join(name);
    if path.symlink_metadata().is_ok() {
        let canonical = path.canonicalize().map_err(|_| invalid())?;
        let root = dir.canonicalize()?;
        if !canonical.starts_with(&root) {
            return Err(Error::InvalidPath(format!(
                "{} resolves outside {}",
                name,
                dir.display()
            )));
        }
    }
    Ok(path)
}

/// What to do when every sub-call of a multi-modality query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisPolicy {
    /// Still issue the synthesis call, with failure notes as context.
    #[default]
    Always,
    /// Fail with `SynthesisFailure` without issuing the synthesis call.
    RequireOnePartial,
}

impl SynthesisPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::RequireOnePartial => "require_one_partial",
        }
    }
}

impl std::fmt::Display for SynthesisPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SynthesisPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always" => Ok(Self::Always),
            "require_one_partial" => Ok(Self::RequireOnePartial),
            other => Err(Error::Config(format!(
                "unknown synthesis policy: {}. Expected always or require_one_partial",
                other
            ))),
        }
    }
}

/// Top-level MediMind configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Credential bundle for the generative backend.
    pub credentials_path: PathBuf,
    /// Project/tenant identifier. Falls back to the bundle's `project_id`.
    pub project_id: Option<String>,
    pub location: String,
    pub model: String,
    pub max_requests_per_minute: u32,
    pub request_timeout_secs: u64,
    pub temperature: f64,
    pub max_tokens: usize,
    /// Multi-modality behavior when every sub-call failed
    /// (`MEDIMIND_SYNTHESIS_POLICY`).
    #[serde(default)]
    pub synthesis_policy: SynthesisPolicy,
}

impl AssistantConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = env_parse("PORT").unwrap_or(DEFAULT_PORT);
        let data_paths = DataPaths::new(data_dir)?;

        let credentials_path = std::env::var("MEDIMIND_CREDENTIALS")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CREDENTIALS_FILE));

        Ok(Self {
            port,
            data_paths,
            credentials_path,
            project_id: std::env::var("MEDIMIND_PROJECT_ID").ok(),
            location: std::env::var("MEDIMIND_LOCATION")
                .unwrap_or_else(|_| DEFAULT_LOCATION.into()),
            model: std::env::var("MEDIMIND_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            max_requests_per_minute: env_parse("MEDIMIND_MAX_REQUESTS_PER_MINUTE")
                .unwrap_or(DEFAULT_MAX_REQUESTS_PER_MINUTE),
            request_timeout_secs: env_parse("MEDIMIND_REQUEST_TIMEOUT_SECS")
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            synthesis_policy: env_parse("MEDIMIND_SYNTHESIS_POLICY").unwrap_or_default(),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
