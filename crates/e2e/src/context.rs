//! Per-scenario execution context
//!
//! Lifecycle: `Uninitialized -> Ready -> TornDown`. A context is set up once,
//! torn down once, and never reused; the next scenario gets a fresh one.
//! While `Ready` it owns the session, browsing context and page handles
//! together with the resolved environment.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::audit::{AuditCategory, AuditResult, Metric, StoredScore};
use crate::config::{EnvironmentConfig, EnvironmentResolver};
use crate::engine::{BrowserEngine, BrowserSession, BrowsingContext, LaunchOptions, Page, SurfacePolicy};
use crate::error::{E2eError, E2eResult};
use crate::settings::RunSettings;

/// Process-wide pieces every scenario is set up from
pub struct Harness {
    pub settings: RunSettings,
    pub resolver: EnvironmentResolver,
    pub engine: Arc<dyn BrowserEngine>,
}

impl Harness {
    pub fn new(settings: RunSettings, engine: Arc<dyn BrowserEngine>) -> Self {
        Self {
            resolver: settings.resolver(),
            settings,
            engine,
        }
    }
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("settings", &self.settings)
            .field("engine", &self.engine.kind())
            .finish()
    }
}

/// Handles held while a context is ready; all three or none.
struct Handles {
    session: Box<dyn BrowserSession>,
    surface: Box<dyn BrowsingContext>,
    page: Box<dyn Page>,
    env: EnvironmentConfig,
    harness: Arc<Harness>,
}

enum State {
    Uninitialized,
    Ready(Handles),
    TornDown,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Uninitialized => "uninitialized",
            State::Ready(_) => "ready",
            State::TornDown => "torn down",
        }
    }
}

/// Values steps hand to each other within one scenario
#[derive(Debug, Default)]
pub struct ScenarioState {
    pub scores: BTreeMap<AuditCategory, StoredScore>,
    pub last_audit: Option<AuditResult>,
    /// Diagnostics attached by steps (skips, fallbacks)
    pub notes: Vec<String>,
}

impl ScenarioState {
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.last_audit.as_ref().and_then(|a| a.metric(metric))
    }
}

/// The per-scenario bundle of browser handles and resolved configuration
pub struct ExecutionContext {
    state: State,
    pub scenario: ScenarioState,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ExecutionContext");
        s.field("state", &self.state.name());
        if let State::Ready(handles) = &self.state {
            s.field("env", &handles.env);
        }
        s.field("scenario", &self.scenario).finish()
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            state: State::Uninitialized,
            scenario: ScenarioState::default(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    pub fn is_torn_down(&self) -> bool {
        matches!(self.state, State::TornDown)
    }

    /// Resolve configuration and acquire session, browsing context and page.
    ///
    /// Either every handle is acquired or none is left behind.
    pub async fn setup(&mut self, harness: Arc<Harness>) -> E2eResult<()> {
        if !matches!(self.state, State::Uninitialized) {
            return Err(E2eError::Setup(format!(
                "context is {}; a fresh context is required per scenario",
                self.state.name()
            )));
        }

        let settings = &harness.settings;
        let env = harness
            .resolver
            .resolve(settings.environment.as_deref())?;
        debug!("Resolved environment {:?}", env);

        let launch = LaunchOptions {
            browser: harness.engine.kind(),
            headless: settings.headless,
            debugging_port: None,
        };
        let session = harness
            .engine
            .launch(&launch)
            .await
            .map_err(|e| E2eError::Setup(format!("launching {}: {}", launch.browser, e)))?;

        let surface = match session
            .new_context(&SurfacePolicy::for_scenarios(settings.viewport))
            .await
        {
            Ok(surface) => surface,
            Err(e) => {
                release("session", session.close().await);
                return Err(E2eError::Setup(format!("opening browsing context: {}", e)));
            }
        };

        let page = match surface.new_page().await {
            Ok(page) => page,
            Err(e) => {
                release("browsing context", surface.close().await);
                release("session", session.close().await);
                return Err(E2eError::Setup(format!("opening page: {}", e)));
            }
        };

        info!("Execution context ready against {}", env.base_url());
        self.state = State::Ready(Handles {
            session,
            surface,
            page,
            env,
            harness,
        });
        Ok(())
    }

    /// Release page, browsing context and session, in that order.
    ///
    /// Never fails; release errors are logged. Safe to call repeatedly and on
    /// a context that was never set up.
    pub async fn teardown(&mut self) {
        let previous = std::mem::replace(&mut self.state, State::TornDown);
        self.scenario = ScenarioState::default();

        let State::Ready(handles) = previous else {
            return;
        };

        release("page", handles.page.close().await);
        release("browsing context", handles.surface.close().await);
        release("session", handles.session.close().await);
        debug!("Execution context torn down");
    }

    fn handles(&self) -> E2eResult<&Handles> {
        match &self.state {
            State::Ready(handles) => Ok(handles),
            other => Err(E2eError::InvalidState(other.name())),
        }
    }

    pub fn page(&self) -> E2eResult<&dyn Page> {
        Ok(self.handles()?.page.as_ref())
    }

    pub fn session(&self) -> E2eResult<&dyn BrowserSession> {
        Ok(self.handles()?.session.as_ref())
    }

    pub fn env(&self) -> E2eResult<&EnvironmentConfig> {
        Ok(&self.handles()?.env)
    }

    pub fn settings(&self) -> E2eResult<&RunSettings> {
        Ok(&self.handles()?.harness.settings)
    }

    /// Browser engine kind of the active session.
    pub fn engine_kind(&self) -> E2eResult<crate::settings::BrowserKind> {
        Ok(self.handles()?.harness.engine.kind())
    }

    /// Full-page screenshot of the current page into `<reports>/screenshots/`.
    pub async fn screenshot(&self, label: &str) -> E2eResult<PathBuf> {
        let handles = self.handles()?;
        let dir = handles.harness.settings.reports_dir.join("screenshots");
        std::fs::create_dir_all(&dir)?;

        let slug: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        let path = dir.join(format!(
            "{}-{}.png",
            slug.trim_matches('-'),
            Utc::now().format("%Y%m%dT%H%M%S%3fZ")
        ));

        handles.page.screenshot(&path, true).await?;
        info!("Screenshot saved to {}", path.display());
        Ok(path)
    }

    /// Attach a diagnostic note to the scenario.
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.scenario.notes.push(message);
    }
}

fn release(what: &str, result: E2eResult<()>) {
    if let Err(e) = result {
        warn!("Failed to release {}: {}", what, e);
    }
}
