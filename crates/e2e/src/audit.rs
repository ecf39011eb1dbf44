//! Lighthouse audit model

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::E2eError;
use crate::settings::ReportFormat;

/// Score recorded when the engine cannot audit at all (non-Chromium).
pub const PLACEHOLDER_SCORE: f64 = 100.0;

/// Score substituted when Lighthouse fails under [`crate::settings::AuditFailurePolicy::Fallback`].
pub const FALLBACK_SCORE: f64 = 95.0;

/// Lighthouse category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditCategory {
    Accessibility,
    Performance,
    BestPractices,
    Seo,
}

impl AuditCategory {
    /// Lighthouse category id
    pub fn id(&self) -> &'static str {
        match self {
            AuditCategory::Accessibility => "accessibility",
            AuditCategory::Performance => "performance",
            AuditCategory::BestPractices => "best-practices",
            AuditCategory::Seo => "seo",
        }
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AuditCategory {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(' ', "-").as_str() {
            "accessibility" | "a11y" => Ok(AuditCategory::Accessibility),
            "performance" => Ok(AuditCategory::Performance),
            "best-practices" => Ok(AuditCategory::BestPractices),
            "seo" => Ok(AuditCategory::Seo),
            other => Err(E2eError::Audit(format!("unknown audit category '{}'", other))),
        }
    }
}

/// Timing measurements pulled out of a Lighthouse run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    FirstContentfulPaint,
    LargestContentfulPaint,
    TotalBlockingTime,
    SpeedIndex,
    Interactive,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::FirstContentfulPaint,
        Metric::LargestContentfulPaint,
        Metric::TotalBlockingTime,
        Metric::SpeedIndex,
        Metric::Interactive,
    ];

    /// Lighthouse audit id
    pub fn id(&self) -> &'static str {
        match self {
            Metric::FirstContentfulPaint => "first-contentful-paint",
            Metric::LargestContentfulPaint => "largest-contentful-paint",
            Metric::TotalBlockingTime => "total-blocking-time",
            Metric::SpeedIndex => "speed-index",
            Metric::Interactive => "interactive",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Metric {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(' ', "-");
        match normalized.as_str() {
            "fcp" => return Ok(Metric::FirstContentfulPaint),
            "lcp" => return Ok(Metric::LargestContentfulPaint),
            "tbt" => return Ok(Metric::TotalBlockingTime),
            "tti" | "time-to-interactive" => return Ok(Metric::Interactive),
            _ => {}
        }
        Metric::ALL
            .into_iter()
            .find(|m| m.id() == normalized)
            .ok_or_else(|| E2eError::Audit(format!("unknown metric '{}'", s)))
    }
}

/// Device emulation profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFactor {
    Desktop,
    Mobile,
}

/// Simulated network/CPU throttling
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Throttling {
    pub rtt_ms: f64,
    pub throughput_kbps: f64,
    pub cpu_slowdown_multiplier: f64,
}

impl Throttling {
    /// Lighthouse's desktop preset
    pub fn desktop() -> Self {
        Self {
            rtt_ms: 40.0,
            throughput_kbps: 10_240.0,
            cpu_slowdown_multiplier: 1.0,
        }
    }
}

/// What to audit and how
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditOptions {
    pub categories: Vec<AuditCategory>,
    pub form_factor: FormFactor,
    pub throttling: Throttling,
    /// Report body to return alongside the scores
    pub output: Option<ReportFormat>,
    pub timeout_ms: u64,
}

impl AuditOptions {
    /// Single category, desktop profile, fixed throttling.
    pub fn single(category: AuditCategory, output: Option<ReportFormat>, timeout_ms: u64) -> Self {
        Self {
            categories: vec![category],
            form_factor: FormFactor::Desktop,
            throttling: Throttling::desktop(),
            output,
            timeout_ms,
        }
    }
}

/// Scores (0-100) and timings (ms) from one audit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    pub scores: BTreeMap<AuditCategory, f64>,
    pub metrics: BTreeMap<Metric, f64>,
    #[serde(skip)]
    pub report: Option<String>,
}

impl AuditResult {
    /// Build from Lighthouse's raw `categories.*.score` (0-1) and
    /// `audits.*.numericValue` maps. Unknown ids are ignored.
    pub fn from_lighthouse(
        categories: &BTreeMap<String, Option<f64>>,
        audits: &BTreeMap<String, f64>,
        report: Option<String>,
    ) -> Self {
        let scores = categories
            .iter()
            .filter_map(|(id, score)| {
                let category = id.parse::<AuditCategory>().ok()?;
                Some((category, to_percent((*score)?)))
            })
            .collect();

        let metrics = Metric::ALL
            .into_iter()
            .filter_map(|m| audits.get(m.id()).map(|v| (m, *v)))
            .collect();

        Self {
            scores,
            metrics,
            report,
        }
    }

    pub fn score(&self, category: AuditCategory) -> Option<f64> {
        self.scores.get(&category).copied()
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }
}

fn to_percent(score: f64) -> f64 {
    (score.clamp(0.0, 1.0) * 100.0).round()
}

/// Where a stored score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Measured,
    /// The engine cannot audit; a neutral placeholder was recorded
    Skipped,
    /// The audit failed and the fallback policy substituted a value
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StoredScore {
    pub value: f64,
    pub source: ScoreSource,
}
