//! Index Command
//!
//! Writes `index.html` into the reports directory: every recognized report,
//! grouped by page type, newest first, with scores read from JSON reports.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde_json::Value;
use tracing::debug;

use console_e2e::reports::{self, PageType, ReportFile};
use console_e2e::{AuditResult, ReportFormat};

use crate::output::{format_size, print_info, print_success};

pub const INDEX_FILE: &str = "index.html";

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Page title
    #[arg(long, default_value = "Lighthouse Reports")]
    pub title: String,

    /// Open the index in the default browser
    #[arg(long)]
    pub open: bool,
}

/// One row of the index
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub file: String,
    pub page: PageType,
    pub category: String,
    pub created: DateTime<Utc>,
    pub size: u64,
    /// Category scores (0-100) for JSON reports
    pub scores: Option<AuditResult>,
}

impl IndexEntry {
    fn from_report(report: &ReportFile) -> Self {
        let scores = match report.name.format {
            ReportFormat::Json => read_scores(&report.path),
            ReportFormat::Html => None,
        };
        Self {
            file: report.file_name(),
            page: report.name.page,
            category: report.name.category.clone(),
            created: report.name.created,
            size: report.size,
            scores,
        }
    }
}

/// Scores and metrics of a Lighthouse JSON report; `None` if unreadable.
pub fn read_scores(path: &Path) -> Option<AuditResult> {
    let content = std::fs::read_to_string(path).ok()?;
    let lhr: Value = match serde_json::from_str(&content) {
        Ok(lhr) => lhr,
        Err(e) => {
            debug!("Skipping scores of {}: {}", path.display(), e);
            return None;
        }
    };

    let categories: BTreeMap<String, Option<f64>> = lhr
        .get("categories")?
        .as_object()?
        .iter()
        .map(|(id, category)| (id.clone(), category.get("score").and_then(Value::as_f64)))
        .collect();

    let audits: BTreeMap<String, f64> = lhr
        .get("audits")
        .and_then(Value::as_object)
        .map(|audits| {
            audits
                .iter()
                .filter_map(|(id, audit)| {
                    Some((id.clone(), audit.get("numericValue")?.as_f64()?))
                })
                .collect()
        })
        .unwrap_or_default();

    Some(AuditResult::from_lighthouse(&categories, &audits, None))
}

pub fn execute(args: IndexArgs, reports_dir: &Path) -> Result<()> {
    let path = write_index(reports_dir, &args.title)?;
    print_success(&format!("Index written to {}", path.display()));

    if args.open {
        open_in_browser(&path)?;
        print_success("Opened index in browser");
    } else {
        print_info("To open in browser, use: e2e-reports index --open");
    }
    Ok(())
}

/// Render and write the index; returns its path.
pub fn write_index(reports_dir: &Path, title: &str) -> Result<PathBuf> {
    let reports = reports::list_reports(reports_dir)
        .with_context(|| format!("Failed to list reports in {}", reports_dir.display()))?;
    let entries: Vec<IndexEntry> = reports.iter().map(IndexEntry::from_report).collect();
    debug!("Indexing {} report(s)", entries.len());

    std::fs::create_dir_all(reports_dir)
        .with_context(|| format!("Failed to create {}", reports_dir.display()))?;
    let path = reports_dir.join(INDEX_FILE);
    std::fs::write(&path, render(title, &entries, Utc::now()))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Self-contained HTML page for `entries` (already newest first).
pub fn render(title: &str, entries: &[IndexEntry], generated: DateTime<Utc>) -> String {
    let title = escape(title);
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; margin: 2rem; color: #1f2328; }}
table {{ border-collapse: collapse; width: 100%; margin-bottom: 2rem; }}
th, td {{ text-align: left; padding: .4rem .8rem; border-bottom: 1px solid #d0d7de; }}
.good {{ color: #1a7f37; }} .average {{ color: #9a6700; }} .poor {{ color: #cf222e; }}
.muted {{ color: #656d76; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p class="muted">{count} report(s), generated {generated}</p>
"#,
        count = entries.len(),
        generated = generated.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    if entries.is_empty() {
        html.push_str("<p>No reports found.</p>\n");
    }

    for page in PageType::ALL {
        let group: Vec<&IndexEntry> = entries.iter().filter(|e| e.page == page).collect();
        if group.is_empty() {
            continue;
        }

        let _ = write!(
            html,
            "<h2>{} ({})</h2>\n<table>\n<tr><th>Report</th><th>Category</th><th>Created</th><th>Size</th><th>Scores</th></tr>\n",
            heading(page),
            group.len()
        );
        for entry in group {
            let file = escape(&entry.file);
            let _ = writeln!(
                html,
                r#"<tr><td><a href="{file}">{file}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                escape(&entry.category),
                entry.created.format("%Y-%m-%d %H:%M:%S"),
                format_size(entry.size),
                scores_cell(entry.scores.as_ref()),
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn heading(page: PageType) -> &'static str {
    match page {
        PageType::Login => "Login page",
        PageType::Console => "Admin console",
        PageType::Page => "Other pages",
    }
}

fn scores_cell(result: Option<&AuditResult>) -> String {
    let Some(result) = result.filter(|r| !r.scores.is_empty()) else {
        return r#"<span class="muted">n/a</span>"#.to_string();
    };
    result
        .scores
        .iter()
        .map(|(category, score)| {
            let class = if *score >= 90.0 {
                "good"
            } else if *score >= 50.0 {
                "average"
            } else {
                "poor"
            };
            format!(r#"<span class="{}">{}: {}</span>"#, class, category, score)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn open_in_browser(path: &Path) -> Result<()> {
    let target = path.to_string_lossy().into_owned();

    #[cfg(target_os = "macos")]
    std::process::Command::new("open").arg(&target).spawn()?;

    #[cfg(target_os = "windows")]
    std::process::Command::new("cmd")
        .args(["/C", "start", "", &target])
        .spawn()?;

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    std::process::Command::new("xdg-open").arg(&target).spawn()?;

    Ok(())
}
