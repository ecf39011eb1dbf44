//! Named environment configuration
//!
//! Each environment is one file under the configuration directory
//! (`local.json`, `staging.yaml`, ...) holding the target's base URL and the
//! admin credentials scenarios log in with.

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ConfigError, E2eResult};

/// Environment used when none is requested or the requested one is unknown.
pub const DEFAULT_ENVIRONMENT: &str = "local";

/// Probed in order for every environment name.
const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Resolved target environment
#[derive(Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// Absolute base URL, always ending in `/`
    base_url: String,
    username: String,
    password: String,
}

impl EnvironmentConfig {
    /// Build a config, validating and normalizing the base URL.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(&base_url.into())?,
            username: username.into(),
            password: password.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Join a path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl fmt::Debug for EnvironmentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// On-disk shape of an environment file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawEnvironment {
    base_url: String,
    username: String,
    password: String,
}

fn normalize_base_url(value: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    let mut normalized = url.to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Ok(normalized)
}

/// Resolves environment names to [`EnvironmentConfig`]s from a directory.
#[derive(Debug, Clone)]
pub struct EnvironmentResolver {
    dir: PathBuf,
}

impl EnvironmentResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }

    /// Resolve `name` (absent, empty or unknown names fall back to the default).
    pub fn resolve(&self, name: Option<&str>) -> E2eResult<EnvironmentConfig> {
        let requested = name.map(str::trim).filter(|n| !n.is_empty());

        if let Some(requested) = requested {
            if let Some(path) = self.source_for(requested) {
                debug!("Loading environment '{}' from {}", requested, path.display());
                return Ok(load_file(&path)?);
            }
            warn!(
                "Environment '{}' not found in {} (available: {}), falling back to '{}'",
                requested,
                self.dir.display(),
                self.available().join(", "),
                DEFAULT_ENVIRONMENT
            );
        }

        let path = self
            .source_for(DEFAULT_ENVIRONMENT)
            .ok_or_else(|| ConfigError::MissingDefault {
                name: DEFAULT_ENVIRONMENT.to_string(),
                dir: self.dir.clone(),
            })?;
        debug!("Loading default environment from {}", path.display());
        Ok(load_file(&path)?)
    }

    /// Names of all environments with a configuration file.
    pub fn available(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| EXTENSIONS.contains(&e))
                    .unwrap_or(false)
            })
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .filter(|n| is_valid_name(n))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn source_for(&self, name: &str) -> Option<PathBuf> {
        if !is_valid_name(name) {
            return None;
        }
        EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", name, ext)))
            .find(|p| p.is_file())
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn load_file(path: &Path) -> Result<EnvironmentConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let malformed = |reason: String| ConfigError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let raw: RawEnvironment = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?,
        _ => serde_yaml::from_str(&content).map_err(|e| malformed(e.to_string()))?,
    };

    EnvironmentConfig::new(raw.base_url, raw.username, raw.password)
}
