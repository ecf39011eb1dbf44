//! Run settings, read once from the process environment at start-up

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{EnvironmentResolver, DEFAULT_ENVIRONMENT};
use crate::error::ConfigError;

/// Browser engine to drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }

    /// Lighthouse only runs against Chromium.
    pub fn supports_audits(&self) -> bool {
        matches!(self, BrowserKind::Chromium)
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" => Ok(BrowserKind::Webkit),
            _ => Err(unrecognized("E2E_BROWSER", s, "chromium, firefox, webkit")),
        }
    }
}

/// Format of written audit reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    #[default]
    Html,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            _ => Err(unrecognized("REPORT_FORMAT", s, "json, html")),
        }
    }
}

/// What an audit step does when Lighthouse itself fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuditFailurePolicy {
    /// Record [`crate::audit::FALLBACK_SCORE`] and keep the scenario green
    #[default]
    Fallback,
    /// Fail the step
    Fail,
}

impl FromStr for AuditFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fallback" => Ok(AuditFailurePolicy::Fallback),
            "fail" => Ok(AuditFailurePolicy::Fail),
            _ => Err(unrecognized("E2E_AUDIT_FAILURE", s, "fallback, fail")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(unrecognized("E2E_LOG_FORMAT", s, "pretty, json")),
        }
    }
}

fn unrecognized(key: &'static str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::UnrecognizedValue {
        key,
        value: value.to_string(),
        expected,
    }
}

/// Default wait budgets; every step also accepts an explicit override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub navigation: Duration,
    pub element: Duration,
    pub url_change: Duration,
    pub audit: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            element: Duration::from_secs(10),
            url_change: Duration::from_secs(15),
            audit: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Everything a run needs to know about its surroundings
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Requested environment name (None = default)
    pub environment: Option<String>,
    pub config_dir: PathBuf,
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport: Viewport,
    pub reports_dir: PathBuf,
    pub report_format: ReportFormat,
    /// Write Lighthouse reports to `reports_dir`
    pub write_reports: bool,
    pub audit_failure: AuditFailurePolicy,
    /// node_modules directory containing playwright and lighthouse
    pub node_path: Option<PathBuf>,
    pub preflight: bool,
    pub log_format: LogFormat,
    pub timeouts: Timeouts,
    /// Feature files to run (None = the crate's `features/`)
    pub features_dir: Option<PathBuf>,
    /// Also write a cucumber JSON report here
    pub cucumber_json: Option<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            environment: None,
            config_dir: PathBuf::from("config/environments"),
            browser: BrowserKind::default(),
            headless: true,
            viewport: Viewport::default(),
            reports_dir: PathBuf::from("reports"),
            report_format: ReportFormat::default(),
            write_reports: true,
            audit_failure: AuditFailurePolicy::default(),
            node_path: None,
            preflight: true,
            log_format: LogFormat::default(),
            timeouts: Timeouts::default(),
            features_dir: None,
            cucumber_json: None,
        }
    }
}

impl RunSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Self::default();

        settings.environment = get("E2E_ENV").or_else(|| get("TEST_ENV"));
        if let Some(dir) = get("E2E_CONFIG_DIR") {
            settings.config_dir = PathBuf::from(dir);
        }
        if let Some(browser) = get("E2E_BROWSER") {
            settings.browser = browser.parse()?;
        }
        if let Some(headless) = get("E2E_HEADLESS") {
            settings.headless = parse_flag("E2E_HEADLESS", &headless)?;
        }
        if let Some(dir) = get("E2E_REPORTS_DIR") {
            settings.reports_dir = PathBuf::from(dir);
        }
        if let Some(format) = get("REPORT_FORMAT") {
            settings.report_format = format.parse()?;
        }
        if let Some(write) = get("E2E_WRITE_REPORTS") {
            settings.write_reports = parse_flag("E2E_WRITE_REPORTS", &write)?;
        }
        if let Some(policy) = get("E2E_AUDIT_FAILURE") {
            settings.audit_failure = policy.parse()?;
        }
        settings.node_path = get("E2E_NODE_PATH").map(PathBuf::from);
        if let Some(preflight) = get("E2E_PREFLIGHT") {
            settings.preflight = parse_flag("E2E_PREFLIGHT", &preflight)?;
        }
        if let Some(format) = get("E2E_LOG_FORMAT") {
            settings.log_format = format.parse()?;
        }
        settings.features_dir = get("E2E_FEATURES_DIR").map(PathBuf::from);
        settings.cucumber_json = get("E2E_CUCUMBER_JSON").map(PathBuf::from);

        Ok(settings)
    }

    /// Resolver over the configured directory.
    pub fn resolver(&self) -> EnvironmentResolver {
        EnvironmentResolver::new(&self.config_dir)
    }

    /// Environment name the resolver is asked for first.
    pub fn environment_name(&self) -> &str {
        self.environment.as_deref().unwrap_or(DEFAULT_ENVIRONMENT)
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(unrecognized(key, value, "true, false")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = RunSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.environment_name(), "local");
        assert_eq!(settings.browser, BrowserKind::Chromium);
        assert_eq!(settings.report_format, ReportFormat::Html);
        assert_eq!(settings.audit_failure, AuditFailurePolicy::Fallback);
        assert!(settings.headless);
    }

    #[test]
    fn test_reads_recognized_values() {
        let settings = RunSettings::from_lookup(lookup(&[
            ("TEST_ENV", "staging"),
            ("E2E_BROWSER", "Firefox"),
            ("REPORT_FORMAT", "json"),
            ("E2E_HEADLESS", "false"),
            ("E2E_AUDIT_FAILURE", "fail"),
        ]))
        .unwrap();

        assert_eq!(settings.environment_name(), "staging");
        assert_eq!(settings.browser, BrowserKind::Firefox);
        assert_eq!(settings.report_format, ReportFormat::Json);
        assert_eq!(settings.audit_failure, AuditFailurePolicy::Fail);
        assert!(!settings.headless);
    }

    #[test]
    fn test_harness_paths() {
        let defaults = RunSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(defaults.features_dir, None);
        assert_eq!(defaults.cucumber_json, None);

        let settings = RunSettings::from_lookup(lookup(&[
            ("E2E_FEATURES_DIR", "features/smoke"),
            ("E2E_CUCUMBER_JSON", "reports/cucumber.json"),
        ]))
        .unwrap();
        assert_eq!(settings.features_dir, Some(PathBuf::from("features/smoke")));
        assert_eq!(settings.cucumber_json, Some(PathBuf::from("reports/cucumber.json")));
    }

    #[test]
    fn test_e2e_env_wins_over_test_env() {
        let settings =
            RunSettings::from_lookup(lookup(&[("E2E_ENV", "ci"), ("TEST_ENV", "staging")])).unwrap();
        assert_eq!(settings.environment_name(), "ci");
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let settings = RunSettings::from_lookup(lookup(&[("E2E_ENV", "  ")])).unwrap();
        assert_eq!(settings.environment, None);
    }

    #[test]
    fn test_rejects_unknown_report_format() {
        let err = RunSettings::from_lookup(lookup(&[("REPORT_FORMAT", "pdf")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnrecognizedValue { key: "REPORT_FORMAT", .. }
        ));
    }

    #[test]
    fn test_only_chromium_supports_audits() {
        assert!(BrowserKind::Chromium.supports_audits());
        assert!(!BrowserKind::Firefox.supports_audits());
        assert!(!BrowserKind::Webkit.supports_audits());
    }
}
