//! Clean Command
//!
//! Deletes generated audit reports, optionally restricted by page type and
//! age. Only files whose names parse as reports are ever touched.

use std::io::{BufRead, Write};
use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tracing::{debug, warn};

use console_e2e::reports::{self, PageType, ReportFile, ReportFilter};

use crate::output::{
    format_size, print_info, print_list, print_success, print_warning, OutputFormat, TableDisplay,
};

#[derive(Args, Debug, Clone, Default)]
pub struct CleanArgs {
    /// Show what would be deleted without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Only login page reports
    #[arg(long)]
    pub login: bool,

    /// Only admin console reports
    #[arg(long)]
    pub console: bool,

    /// Only reports last modified more than DAYS days ago
    #[arg(long, value_name = "DAYS")]
    pub older_than: Option<u64>,

    /// Delete without asking for confirmation
    #[arg(short, long)]
    pub force: bool,
}

impl CleanArgs {
    /// Selection rules; `--login` and `--console` together mean every type.
    pub fn filter(&self) -> ReportFilter {
        let mut filter = ReportFilter::default();
        match (self.login, self.console) {
            (true, false) => filter = filter.with_type(PageType::Login),
            (false, true) => filter = filter.with_type(PageType::Console),
            _ => {}
        }
        if let Some(days) = self.older_than {
            filter = filter.older_than_days(days);
        }
        filter
    }
}

/// A report selected for deletion
#[derive(Serialize, Clone)]
pub struct ReportRow {
    pub file: String,
    pub page: PageType,
    pub category: String,
    pub size: u64,
    pub modified: String,
}

impl ReportRow {
    fn from_report(report: &ReportFile) -> Self {
        let modified: DateTime<Utc> = report.modified.into();
        Self {
            file: report.file_name(),
            page: report.name.page,
            category: report.name.category.clone(),
            size: report.size,
            modified: modified.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl TableDisplay for ReportRow {
    fn headers() -> Vec<&'static str> {
        vec!["File", "Page", "Category", "Size", "Modified"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.file.clone(),
            self.page.to_string(),
            self.category.clone(),
            format_size(self.size),
            self.modified.clone(),
        ]
    }
}

/// What a clean run did
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub deleted: usize,
    pub freed: u64,
    pub failed: usize,
}

pub fn execute(args: CleanArgs, reports_dir: &Path, format: OutputFormat) -> Result<()> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut prompt = std::io::stdout();
    let summary = run(&args, reports_dir, format, SystemTime::now(), &mut input, &mut prompt)?;

    if summary.failed > 0 {
        anyhow::bail!("{} report(s) could not be deleted", summary.failed);
    }
    Ok(())
}

/// Select, confirm and delete reports.
pub fn run<R: BufRead, W: Write>(
    args: &CleanArgs,
    reports_dir: &Path,
    format: OutputFormat,
    now: SystemTime,
    input: &mut R,
    prompt: &mut W,
) -> Result<CleanSummary> {
    let reports = reports::list_reports(reports_dir)
        .with_context(|| format!("Failed to list reports in {}", reports_dir.display()))?;
    debug!("{} report(s) in {}", reports.len(), reports_dir.display());

    let selected = args.filter().select(&reports, now);
    if selected.is_empty() {
        print_info("No reports match the given filters");
        return Ok(CleanSummary::default());
    }

    let total: u64 = selected.iter().map(|r| r.size).sum();
    let rows: Vec<ReportRow> = selected.iter().map(|r| ReportRow::from_report(r)).collect();
    print_list(&rows, format);

    if args.dry_run {
        print_info(&format!(
            "Dry run: {} report(s), {} would be deleted",
            selected.len(),
            format_size(total)
        ));
        return Ok(CleanSummary::default());
    }

    if !args.force && !confirm(input, prompt, selected.len())? {
        print_warning("Aborted, nothing deleted");
        return Ok(CleanSummary::default());
    }

    let summary = delete(&selected);
    print_success(&format!(
        "Deleted {} report(s), freed {}",
        summary.deleted,
        format_size(summary.freed)
    ));
    Ok(summary)
}

/// Ask before deleting; anything but y/yes declines.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, prompt: &mut W, count: usize) -> Result<bool> {
    write!(prompt, "Delete {} report(s)? [y/N] ", count)?;
    prompt.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn delete(selected: &[&ReportFile]) -> CleanSummary {
    let mut summary = CleanSummary::default();
    for report in selected {
        match std::fs::remove_file(&report.path) {
            Ok(()) => {
                debug!("Deleted {}", report.path.display());
                summary.deleted += 1;
                summary.freed += report.size;
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", report.path.display(), e);
                summary.failed += 1;
            }
        }
    }
    summary
}
