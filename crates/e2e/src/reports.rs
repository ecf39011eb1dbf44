//! Audit report artifacts
//!
//! Reports are written flat into the reports directory as
//! `<page>-<category>-<timestamp>.<ext>`, e.g.
//! `login-accessibility-2026-10-19T08-15-02-417Z.html`. The page prefix lets
//! housekeeping select reports by the kind of page they audited.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::auth::{ADMIN_CONSOLE_GLOB, AUTH_FLOW_GLOB};
use crate::error::E2eResult;
use crate::locator::UrlPattern;
use crate::settings::ReportFormat;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";
const TIMESTAMP_LEN: usize = 24;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Which kind of page a report audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Login,
    Console,
    Page,
}

impl PageType {
    pub const ALL: [PageType; 3] = [PageType::Login, PageType::Console, PageType::Page];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Login => "login",
            PageType::Console => "console",
            PageType::Page => "page",
        }
    }

    /// Classify a page by its URL.
    pub fn from_url(url: &str) -> Self {
        let is = |glob: &str| {
            UrlPattern::new(glob)
                .map(|p| p.matches(url))
                .unwrap_or(false)
        };
        if is(AUTH_FLOW_GLOB) {
            PageType::Login
        } else if is(ADMIN_CONSOLE_GLOB) {
            PageType::Console
        } else {
            PageType::Page
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageType::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(())
    }
}

/// File name for a report created at `at`.
pub fn report_file_name(
    page: PageType,
    category: &str,
    format: ReportFormat,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{}-{}-{}.{}",
        page,
        category,
        at.format(TIMESTAMP_FORMAT),
        format.extension()
    )
}

/// What a report's file name encodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportName {
    pub page: PageType,
    pub category: String,
    pub created: DateTime<Utc>,
    pub format: ReportFormat,
}

impl ReportName {
    /// Parse a report file name; `None` for anything else.
    pub fn parse(file_name: &str) -> Option<Self> {
        let (stem, ext) = file_name.rsplit_once('.')?;
        let format = match ext {
            "json" => ReportFormat::Json,
            "html" => ReportFormat::Html,
            _ => return None,
        };

        let split = stem.len().checked_sub(TIMESTAMP_LEN)?;
        if !stem.is_char_boundary(split) {
            return None;
        }
        let (head, timestamp) = stem.split_at(split);
        let head = head.strip_suffix('-')?;
        let created = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .ok()?
            .and_utc();

        let (page, category) = head.split_once('-')?;
        if category.is_empty() {
            return None;
        }

        Some(Self {
            page: page.parse().ok()?,
            category: category.to_string(),
            created,
            format,
        })
    }
}

/// A report found on disk
#[derive(Debug, Clone)]
pub struct ReportFile {
    pub path: PathBuf,
    pub name: ReportName,
    pub size: u64,
    pub modified: SystemTime,
}

impl ReportFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Time since last modification (zero for mtimes in the future).
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.modified).unwrap_or_default()
    }
}

/// All recognized reports directly inside `dir`, newest first.
pub fn list_reports(dir: &Path) -> E2eResult<Vec<ReportFile>> {
    if !dir.is_dir() {
        debug!("Reports directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut reports = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let Some(name) = entry.file_name().to_str().and_then(ReportName::parse) else {
            continue;
        };
        let metadata = entry.metadata().map_err(std::io::Error::from)?;
        reports.push(ReportFile {
            path: entry.path().to_path_buf(),
            name,
            size: metadata.len(),
            modified: metadata.modified()?,
        });
    }

    reports.sort_by(|a, b| b.name.created.cmp(&a.name.created));
    Ok(reports)
}

/// Selection rules for report cleanup; all rules must hold.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// Page types to keep in the selection (empty = every type)
    pub page_types: Vec<PageType>,
    /// Only reports modified strictly longer ago than this
    pub older_than: Option<Duration>,
}

impl ReportFilter {
    /// Ages too large to represent never match.
    pub fn older_than_days(mut self, days: u64) -> Self {
        let limit = days
            .checked_mul(SECS_PER_DAY)
            .map(Duration::from_secs)
            .unwrap_or(Duration::MAX);
        self.older_than = Some(limit);
        self
    }

    pub fn with_type(mut self, page: PageType) -> Self {
        if !self.page_types.contains(&page) {
            self.page_types.push(page);
        }
        self
    }

    pub fn matches(&self, report: &ReportFile, now: SystemTime) -> bool {
        let type_ok = self.page_types.is_empty() || self.page_types.contains(&report.name.page);
        let age_ok = match self.older_than {
            Some(limit) => report.age(now) > limit,
            None => true,
        };
        type_ok && age_ok
    }

    pub fn select<'a>(&self, reports: &'a [ReportFile], now: SystemTime) -> Vec<&'a ReportFile> {
        reports.iter().filter(|r| self.matches(r, now)).collect()
    }
}

/// Write a report body; returns the created path.
pub fn write_report(
    dir: &Path,
    page: PageType,
    category: &str,
    format: ReportFormat,
    body: &str,
) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(page, category, format, Utc::now()));
    std::fs::write(&path, body)?;
    info!("Report written to: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 15, 2).unwrap() + chrono::Duration::milliseconds(417)
    }

    #[test]
    fn test_file_name_layout() {
        let name = report_file_name(PageType::Login, "accessibility", ReportFormat::Html, at());
        assert_eq!(name, "login-accessibility-2026-10-19T08-15-02-417Z.html");
    }

    #[test]
    fn test_parse_generated_name() {
        let name = report_file_name(PageType::Console, "best-practices", ReportFormat::Json, at());
        let parsed = ReportName::parse(&name).unwrap();
        assert_eq!(parsed.page, PageType::Console);
        assert_eq!(parsed.category, "best-practices");
        assert_eq!(parsed.created, at());
        assert_eq!(parsed.format, ReportFormat::Json);
    }

    #[test]
    fn test_parse_rejects_foreign_files() {
        assert!(ReportName::parse("index.html").is_none());
        assert!(ReportName::parse("login-accessibility.json").is_none());
        assert!(ReportName::parse("other-accessibility-2026-10-19T08-15-02-417Z.json").is_none());
        assert!(ReportName::parse("login-accessibility-2026-10-19T08-15-02-417Z.png").is_none());
        assert!(ReportName::parse("login-2026-10-19T08-15-02-417Z.json").is_none());
    }

    #[test]
    fn test_page_type_from_url() {
        assert_eq!(
            PageType::from_url("http://localhost:8080/realms/master/protocol/openid-connect/auth?client_id=x"),
            PageType::Login
        );
        assert_eq!(
            PageType::from_url("http://localhost:8080/admin/master/console/#/master/users"),
            PageType::Console
        );
        assert_eq!(PageType::from_url("http://localhost:8080/"), PageType::Page);
    }

    fn report(page: PageType, age_days: u64, now: SystemTime) -> ReportFile {
        ReportFile {
            path: PathBuf::from(format!("{}.json", page)),
            name: ReportName {
                page,
                category: "accessibility".to_string(),
                created: at(),
                format: ReportFormat::Json,
            },
            size: 10,
            modified: now - Duration::from_secs(age_days * 24 * 60 * 60),
        }
    }

    #[test]
    fn test_filter_age_is_strict() {
        let now = SystemTime::now();
        let filter = ReportFilter::default().older_than_days(7);

        assert!(!filter.matches(&report(PageType::Login, 7, now), now));
        assert!(filter.matches(&report(PageType::Login, 8, now), now));
        assert!(!filter.matches(&report(PageType::Login, 1, now), now));
    }

    #[test]
    fn test_filter_unrepresentable_age_matches_nothing() {
        let now = SystemTime::now();
        let filter = ReportFilter::default().older_than_days(213_503_982_334_602);

        assert_eq!(filter.older_than, Some(Duration::MAX));
        assert!(!filter.matches(&report(PageType::Login, 1, now), now));
        assert!(!filter.matches(&report(PageType::Login, 3650, now), now));
    }

    #[test]
    fn test_filter_combines_type_and_age() {
        let now = SystemTime::now();
        let reports = vec![
            report(PageType::Login, 10, now),
            report(PageType::Login, 2, now),
            report(PageType::Console, 10, now),
            report(PageType::Page, 10, now),
        ];

        let filter = ReportFilter::default()
            .with_type(PageType::Login)
            .older_than_days(7);
        let selected = filter.select(&reports, now);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name.page, PageType::Login);

        let both = ReportFilter::default()
            .with_type(PageType::Login)
            .with_type(PageType::Console)
            .older_than_days(7);
        assert_eq!(both.select(&reports, now).len(), 2);

        let all_old = ReportFilter::default().older_than_days(7);
        assert_eq!(all_old.select(&reports, now).len(), 3);
    }

    #[test]
    fn test_write_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_report(
            dir.path(),
            PageType::Login,
            "accessibility",
            ReportFormat::Json,
            "{}",
        )
        .unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        let reports = list_reports(dir.path()).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].path, written);
        assert_eq!(reports[0].size, 2);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_reports(&dir.path().join("nope")).unwrap().is_empty());
    }
}
