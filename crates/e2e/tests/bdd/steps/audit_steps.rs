use cucumber::{then, when};

use console_e2e::steps;
use console_e2e::{AuditCategory, E2eResult, Metric};

use crate::world::ConsoleWorld;

#[when(regex = r"^I run an? (.+) audit$")]
async fn run_audit(world: &mut ConsoleWorld, category: String) -> E2eResult<()> {
    let category: AuditCategory = category.parse()?;
    let timeout = world.timeouts().audit;
    steps::run_audit(&mut world.ctx, category, timeout).await?;
    Ok(())
}

#[then(regex = r"^the (.+) score should be above (\d+(?:\.\d+)?)$")]
async fn score_above(world: &mut ConsoleWorld, category: String, threshold: f64) -> E2eResult<()> {
    let category: AuditCategory = category.parse()?;
    steps::assert_score_above(&mut world.ctx, category, threshold).await
}

#[then(regex = r"^the (.+) should be below (\d+) ms$")]
async fn metric_below(world: &mut ConsoleWorld, metric: String, limit: f64) -> E2eResult<()> {
    let metric: Metric = metric.parse()?;
    steps::assert_metric_below(&mut world.ctx, metric, limit).await
}
