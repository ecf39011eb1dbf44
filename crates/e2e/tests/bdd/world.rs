use std::sync::Arc;

use console_e2e::settings::Timeouts;
use console_e2e::{ExecutionContext, Harness};
use tracing::warn;

/// Per-scenario cucumber world; a fresh one is built for every scenario.
#[derive(Debug, Default, cucumber::World)]
pub struct ConsoleWorld {
    pub ctx: ExecutionContext,
}

impl ConsoleWorld {
    /// Set up the execution context; a failure fails the scenario.
    pub async fn setup(&mut self, harness: Arc<Harness>) {
        if let Err(e) = self.ctx.setup(harness).await {
            panic!("Scenario setup failed: {}", e);
        }
    }

    /// Capture evidence of a failed scenario, then tear down.
    pub async fn finish(&mut self, scenario: &str, failed: bool) {
        if failed && self.ctx.is_ready() {
            if let Err(e) = self.ctx.screenshot(scenario).await {
                warn!("Failure screenshot not captured: {}", e);
            }
        }
        for note in &self.ctx.scenario.notes {
            warn!("[{}] {}", scenario, note);
        }
        self.ctx.teardown().await;
    }

    pub fn timeouts(&self) -> Timeouts {
        self.ctx
            .settings()
            .map(|s| s.timeouts)
            .unwrap_or_default()
    }
}
