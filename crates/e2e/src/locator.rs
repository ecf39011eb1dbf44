//! Selector fallback chains and URL glob patterns

use std::time::{Duration, Instant};

use regex::Regex;
use tracing::debug;

use crate::engine::Page;
use crate::error::{E2eError, E2eResult};

/// Polling interval while waiting on a chain
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ordered selector strategies for one logical element.
///
/// Strategies are tried in list order; the first one whose element is
/// visible wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorChain {
    name: &'static str,
    strategies: Vec<String>,
}

impl SelectorChain {
    pub fn new<I, S>(name: &'static str, strategies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            strategies: strategies.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn strategies(&self) -> &[String] {
        &self.strategies
    }

    /// Append a lower-priority strategy.
    pub fn or(mut self, selector: impl Into<String>) -> Self {
        self.strategies.push(selector.into());
        self
    }

    /// Single non-waiting pass: first visible strategy, if any.
    pub async fn probe(&self, page: &dyn Page) -> E2eResult<Option<&str>> {
        for selector in &self.strategies {
            if page.is_visible(selector).await? {
                return Ok(Some(selector.as_str()));
            }
        }
        Ok(None)
    }

    /// Poll until some strategy is visible or `timeout` elapses.
    pub async fn first_visible(&self, page: &dyn Page, timeout: Duration) -> E2eResult<&str> {
        let start = Instant::now();
        loop {
            if let Some(selector) = self.probe(page).await? {
                debug!("{} located via '{}'", self.name, selector);
                return Ok(selector);
            }
            if start.elapsed() >= timeout {
                return Err(E2eError::ElementTimeout {
                    what: format!("{} ({})", self.name, self.strategies.join(" | ")),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Whether any strategy matches at least one element, visible or not.
    pub async fn exists(&self, page: &dyn Page) -> E2eResult<bool> {
        for selector in &self.strategies {
            if page.count(selector).await? > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// URL glob where `*` matches any run of characters, `/` included.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    glob: String,
    regex: Regex,
}

impl UrlPattern {
    pub fn new(glob: &str) -> E2eResult<Self> {
        let body = glob
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{}$", body))
            .map_err(|e| E2eError::InvalidPattern(format!("{}: {}", glob, e)))?;
        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    /// Poll the page URL until it matches or `timeout` elapses.
    pub async fn wait_for(&self, page: &dyn Page, timeout: Duration) -> E2eResult<String> {
        let start = Instant::now();
        loop {
            let url = page.url().await?;
            if self.matches(&url) {
                return Ok(url);
            }
            if start.elapsed() >= timeout {
                return Err(E2eError::ElementTimeout {
                    what: format!("URL matching '{}' (last: {})", self.glob, url),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
