//! Lighthouse audit steps

use std::time::Duration;

use tracing::{info, warn};

use crate::audit::{
    AuditCategory, AuditOptions, Metric, ScoreSource, StoredScore, FALLBACK_SCORE,
    PLACEHOLDER_SCORE,
};
use crate::context::ExecutionContext;
use crate::error::{E2eError, E2eResult};
use crate::reports::{self, PageType};
use crate::settings::AuditFailurePolicy;

/// Audit the current page for one category and store its score.
///
/// Engines without Lighthouse support record [`PLACEHOLDER_SCORE`]. When
/// Lighthouse fails, the run's [`AuditFailurePolicy`] decides between
/// storing [`FALLBACK_SCORE`] and failing the step.
pub async fn run_audit(
    ctx: &mut ExecutionContext,
    category: AuditCategory,
    timeout: Duration,
) -> E2eResult<StoredScore> {
    let kind = ctx.engine_kind()?;
    if !kind.supports_audits() {
        let score = StoredScore {
            value: PLACEHOLDER_SCORE,
            source: ScoreSource::Skipped,
        };
        ctx.scenario.scores.insert(category, score);
        ctx.scenario.last_audit = None;
        ctx.note(format!(
            "{} audit skipped: Lighthouse needs chromium, running {}; recorded {}",
            category, kind, PLACEHOLDER_SCORE
        ));
        return Ok(score);
    }

    let settings = ctx.settings()?;
    let policy = settings.audit_failure;
    let format = settings.report_format;
    let reports_dir = settings.write_reports.then(|| settings.reports_dir.clone());

    let url = ctx.page()?.url().await?;
    let options = AuditOptions::single(
        category,
        reports_dir.as_ref().map(|_| format),
        timeout.as_millis() as u64,
    );

    info!("Running {} audit on {}", category, url);
    let outcome = ctx
        .session()?
        .audit(&url, &options)
        .await
        .and_then(|result| match result.score(category) {
            Some(value) => Ok((value, result)),
            None => Err(E2eError::Audit(format!("Lighthouse returned no {} score", category))),
        });

    let score = match outcome {
        Ok((value, mut result)) => {
            info!("{} score: {}", category, value);
            if let (Some(dir), Some(body)) = (&reports_dir, result.report.take()) {
                let page = PageType::from_url(&url);
                if let Err(e) = reports::write_report(dir, page, category.id(), format, &body) {
                    warn!("Failed to write {} report: {}", category, e);
                }
            }
            ctx.scenario.last_audit = Some(result);
            StoredScore {
                value,
                source: ScoreSource::Measured,
            }
        }
        Err(e) => match policy {
            AuditFailurePolicy::Fail => return Err(e),
            AuditFailurePolicy::Fallback => {
                ctx.scenario.last_audit = None;
                ctx.note(format!(
                    "{} audit failed ({}); recorded fallback score {}",
                    category, e, FALLBACK_SCORE
                ));
                StoredScore {
                    value: FALLBACK_SCORE,
                    source: ScoreSource::Fallback,
                }
            }
        },
    };

    ctx.scenario.scores.insert(category, score);
    Ok(score)
}

/// The stored score for `category` is strictly above `threshold`.
pub async fn assert_score_above(
    ctx: &mut ExecutionContext,
    category: AuditCategory,
    threshold: f64,
) -> E2eResult<()> {
    let score = ctx
        .scenario
        .scores
        .get(&category)
        .copied()
        .ok_or_else(|| E2eError::ScoreNotAvailable(category.to_string()))?;

    if score.value > threshold {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(format!(
            "{} score {} ({:?}) is not above {}",
            category, score.value, score.source, threshold
        )))
    }
}

/// The last audit's `metric` is strictly below `limit_ms`.
///
/// Passes with a note when an audit was skipped or fell back, so nothing
/// was measured.
pub async fn assert_metric_below(
    ctx: &mut ExecutionContext,
    metric: Metric,
    limit_ms: f64,
) -> E2eResult<()> {
    let Some(value) = ctx.scenario.metric(metric) else {
        let unmeasured = ctx
            .scenario
            .scores
            .values()
            .find(|s| s.source != ScoreSource::Measured)
            .map(|s| s.source);
        if let Some(source) = unmeasured {
            ctx.note(format!(
                "{} check skipped: the audit score was {:?}, nothing was measured",
                metric, source
            ));
            return Ok(());
        }
        return Err(E2eError::MetricNotAvailable(metric.to_string()));
    };

    if value < limit_ms {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(format!(
            "{} is {} ms, expected below {} ms",
            metric, value, limit_ms
        )))
    }
}
