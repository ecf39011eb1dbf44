//! Browser automation seam
//!
//! A scenario holds three nested handles: a [`BrowserSession`] (the launched
//! browser), a [`BrowsingContext`] inside it (cookies, TLS and download
//! policy) and a [`Page`] inside that. The Playwright bridge implements these
//! traits for real runs; unit tests substitute in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::audit::{AuditOptions, AuditResult};
use crate::error::E2eResult;
use crate::settings::{BrowserKind, Viewport};

/// Options for launching a browser session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchOptions {
    pub browser: BrowserKind,
    pub headless: bool,
    /// Chromium remote-debugging port, required for auditing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugging_port: Option<u16>,
}

/// Policy for a browsing context
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfacePolicy {
    /// Accept self-signed certificates of local endpoints
    pub ignore_https_errors: bool,
    pub accept_downloads: bool,
    pub viewport: Viewport,
}

impl SurfacePolicy {
    pub fn for_scenarios(viewport: Viewport) -> Self {
        Self {
            ignore_https_errors: true,
            accept_downloads: true,
            viewport,
        }
    }
}

/// Element state to wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    Visible,
    Hidden,
    Attached,
    Detached,
}

/// Page load milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

/// Launches browser sessions
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    fn kind(&self) -> BrowserKind;

    async fn launch(&self, options: &LaunchOptions) -> E2eResult<Box<dyn BrowserSession>>;
}

/// A running browser
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_context(&self, policy: &SurfacePolicy) -> E2eResult<Box<dyn BrowsingContext>>;

    /// Run a Lighthouse audit against `url` using this browser.
    ///
    /// Sessions that cannot audit return [`crate::E2eError::Audit`].
    async fn audit(&self, url: &str, options: &AuditOptions) -> E2eResult<AuditResult>;

    async fn close(&self) -> E2eResult<()>;
}

/// An isolated browsing context (interaction surface)
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    async fn new_page(&self) -> E2eResult<Box<dyn Page>>;

    async fn close(&self) -> E2eResult<()>;
}

/// A single tab (navigable surface)
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> E2eResult<()>;

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> E2eResult<()>;

    /// Wait until the first element matching `selector` reaches `state`.
    async fn wait_for_selector(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()>;

    /// Non-waiting visibility probe of the first match.
    async fn is_visible(&self, selector: &str) -> E2eResult<bool>;

    async fn count(&self, selector: &str) -> E2eResult<usize>;

    /// Clear the first match and type `value` into it.
    async fn fill(&self, selector: &str, value: &str, timeout: Duration) -> E2eResult<()>;

    async fn click(&self, selector: &str, timeout: Duration) -> E2eResult<()>;

    async fn url(&self) -> E2eResult<String>;

    async fn screenshot(&self, path: &std::path::Path, full_page: bool) -> E2eResult<()>;

    async fn close(&self) -> E2eResult<()>;
}
