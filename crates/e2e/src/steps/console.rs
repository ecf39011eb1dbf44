//! Admin console steps

use std::time::Duration;

use tracing::info;

use crate::auth::{self, ADMIN_CONSOLE_PATH};
use crate::context::ExecutionContext;
use crate::engine::{LoadState, WaitState};
use crate::error::{E2eError, E2eResult};

use super::selectors;

/// Open the admin console directly (an existing session skips the login).
pub async fn navigate_to_console(ctx: &mut ExecutionContext, timeout: Duration) -> E2eResult<()> {
    let url = ctx.env()?.url(ADMIN_CONSOLE_PATH);
    let page = ctx.page()?;

    info!("Navigating to {}", url);
    page.goto(&url, timeout).await?;
    page.wait_for_load_state(LoadState::NetworkIdle, timeout).await
}

/// An element containing `text` becomes visible.
pub async fn assert_text_visible(
    ctx: &mut ExecutionContext,
    text: &str,
    timeout: Duration,
) -> E2eResult<()> {
    let selector = format!("text={}", text);
    ctx.page()?
        .wait_for_selector(&selector, WaitState::Visible, timeout)
        .await
        .map_err(|e| match e {
            E2eError::ElementTimeout { .. } => {
                E2eError::AssertionFailed(format!("text '{}' not visible: {}", text, e))
            }
            other => other,
        })
}

/// End the session and wait until the login form is back.
pub async fn logout(ctx: &mut ExecutionContext, timeout: Duration) -> E2eResult<()> {
    let url = auth::logout_url(ctx.env()?)?;
    let page = ctx.page()?;

    info!("Logging out");
    page.goto(&url, timeout).await?;
    page.wait_for_load_state(LoadState::NetworkIdle, timeout)
        .await?;

    if let Some(confirm) = selectors::logout_confirm().probe(page).await? {
        page.click(confirm, timeout).await?;
    }

    selectors::login_form()
        .first_visible(page, timeout)
        .await
        .map_err(|e| match e {
            E2eError::ElementTimeout { .. } => {
                E2eError::Navigation(format!("login form did not return after logout: {}", e))
            }
            other => other,
        })?;
    Ok(())
}
