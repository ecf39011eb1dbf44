//! Reachability check of the application under test
//!
//! Run once before any scenario so an unreachable server fails the run with
//! one clear error instead of a timeout in every scenario.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::EnvironmentConfig;
use crate::error::{E2eError, E2eResult};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll the base URL until it answers or `budget` runs out.
///
/// Any response below 500 counts as reachable. Certificates are not
/// verified, matching the browsing context policy.
pub async fn wait_until_reachable(env: &EnvironmentConfig, budget: Duration) -> E2eResult<()> {
    let url = env.base_url();
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(true)
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                info!("{} reachable ({})", url, resp.status());
                return Ok(());
            }
            Ok(resp) => {
                warn!("Preflight got {} from {}", resp.status(), url);
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} ...", url);
                }
                if !e.is_connect() && !e.is_timeout() {
                    warn!("Preflight error: {}", e);
                }
            }
        }

        if start.elapsed() >= budget {
            return Err(E2eError::Preflight {
                url: url.to_string(),
                attempts,
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}
