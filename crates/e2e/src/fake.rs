//! In-memory engine for unit tests

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::audit::{AuditCategory, AuditOptions, AuditResult, Metric};
use crate::context::Harness;
use crate::engine::{
    BrowserEngine, BrowserSession, BrowsingContext, LaunchOptions, LoadState, Page, SurfacePolicy,
    WaitState,
};
use crate::error::{E2eError, E2eResult};
use crate::settings::{BrowserKind, RunSettings};

pub const LOCAL_CONFIG: &str =
    r#"{"baseUrl": "https://kc.test/", "username": "root", "password": "s3cret"}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Launch,
    Context,
    Page,
}

type Events = Arc<Mutex<Vec<String>>>;

fn push(events: &Events, event: &str) {
    events.lock().unwrap().push(event.to_string());
}

#[derive(Clone)]
pub struct FakeEngine {
    kind: BrowserKind,
    events: Events,
    fail_at: Arc<Mutex<Option<Stage>>>,
    fail_close: Arc<Mutex<HashSet<Stage>>>,
    audit: Arc<Mutex<Result<AuditResult, String>>>,
    audited: Arc<Mutex<Vec<AuditOptions>>>,
    pub page: FakePage,
    _config_dir: Arc<tempfile::TempDir>,
    config_path: std::path::PathBuf,
}

impl FakeEngine {
    /// Engine plus harness over a config dir holding `local.json`.
    pub fn harness() -> (Self, Arc<Harness>) {
        Self::harness_with_config(Some(LOCAL_CONFIG))
    }

    pub fn harness_with_config(local: Option<&str>) -> (Self, Arc<Harness>) {
        Self::build(BrowserKind::Chromium, local, |_| {})
    }

    pub fn harness_for(kind: BrowserKind) -> (Self, Arc<Harness>) {
        Self::build(kind, Some(LOCAL_CONFIG), |_| {})
    }

    /// Default config, with settings adjusted by `configure`.
    pub fn harness_with(configure: impl FnOnce(&mut RunSettings)) -> (Self, Arc<Harness>) {
        Self::build(BrowserKind::Chromium, Some(LOCAL_CONFIG), configure)
    }

    fn build(
        kind: BrowserKind,
        local: Option<&str>,
        configure: impl FnOnce(&mut RunSettings),
    ) -> (Self, Arc<Harness>) {
        let dir = tempfile::tempdir().unwrap();
        if let Some(body) = local {
            std::fs::write(dir.path().join("local.json"), body).unwrap();
        }
        let config_path = dir.path().to_path_buf();

        let events: Events = Arc::default();
        let mut audit = AuditResult::default();
        audit.scores.insert(AuditCategory::Accessibility, 92.0);
        audit.scores.insert(AuditCategory::Performance, 81.0);
        audit.metrics.insert(Metric::LargestContentfulPaint, 1800.0);

        let engine = Self {
            kind,
            events: events.clone(),
            fail_at: Arc::default(),
            fail_close: Arc::default(),
            audit: Arc::new(Mutex::new(Ok(audit))),
            audited: Arc::default(),
            page: FakePage::with_events(events),
            _config_dir: Arc::new(dir),
            config_path,
        };

        let mut settings = RunSettings {
            config_dir: engine.config_path.clone(),
            reports_dir: engine.config_path.join("reports"),
            browser: kind,
            write_reports: false,
            ..RunSettings::default()
        };
        configure(&mut settings);
        let harness = Arc::new(Harness::new(settings, Arc::new(engine.clone())));
        (engine, harness)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_path
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn fail_at(&self, stage: Stage) {
        *self.fail_at.lock().unwrap() = Some(stage);
    }

    pub fn fail_close(&self, stage: Stage) {
        self.fail_close.lock().unwrap().insert(stage);
        if stage == Stage::Page {
            self.page.state.lock().unwrap().fail_close = true;
        }
    }

    pub fn set_audit(&self, result: Result<AuditResult, String>) {
        *self.audit.lock().unwrap() = result;
    }

    pub fn audits(&self) -> Vec<AuditOptions> {
        self.audited.lock().unwrap().clone()
    }

    fn fails_at(&self, stage: Stage) -> bool {
        *self.fail_at.lock().unwrap() == Some(stage)
    }

    fn fails_close(&self, stage: Stage) -> bool {
        self.fail_close.lock().unwrap().contains(&stage)
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    fn kind(&self) -> BrowserKind {
        self.kind
    }

    async fn launch(&self, _options: &LaunchOptions) -> E2eResult<Box<dyn BrowserSession>> {
        if self.fails_at(Stage::Launch) {
            return Err(E2eError::Bridge("browser crashed".to_string()));
        }
        push(&self.events, "launch");
        Ok(Box::new(FakeSession {
            engine: self.clone(),
        }))
    }
}

struct FakeSession {
    engine: FakeEngine,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_context(&self, policy: &SurfacePolicy) -> E2eResult<Box<dyn BrowsingContext>> {
        assert!(policy.ignore_https_errors && policy.accept_downloads);
        if self.engine.fails_at(Stage::Context) {
            return Err(E2eError::Bridge("context refused".to_string()));
        }
        push(&self.engine.events, "context");
        Ok(Box::new(FakeContext {
            engine: self.engine.clone(),
        }))
    }

    async fn audit(&self, _url: &str, options: &AuditOptions) -> E2eResult<AuditResult> {
        self.engine.audited.lock().unwrap().push(options.clone());
        self.engine
            .audit
            .lock()
            .unwrap()
            .clone()
            .map_err(E2eError::Audit)
    }

    async fn close(&self) -> E2eResult<()> {
        push(&self.engine.events, "close session");
        if self.engine.fails_close(Stage::Launch) {
            return Err(E2eError::Bridge("session close failed".to_string()));
        }
        Ok(())
    }
}

struct FakeContext {
    engine: FakeEngine,
}

#[async_trait]
impl BrowsingContext for FakeContext {
    async fn new_page(&self) -> E2eResult<Box<dyn Page>> {
        if self.engine.fails_at(Stage::Page) {
            return Err(E2eError::Bridge("page refused".to_string()));
        }
        push(&self.engine.events, "page");
        Ok(Box::new(self.engine.page.clone()))
    }

    async fn close(&self) -> E2eResult<()> {
        push(&self.engine.events, "close context");
        if self.engine.fails_close(Stage::Context) {
            return Err(E2eError::Bridge("context close failed".to_string()));
        }
        Ok(())
    }
}

/// What happens to the page after an interaction
#[derive(Debug, Clone, Default)]
pub struct Transition {
    pub url: Option<String>,
    pub show: Vec<String>,
    pub hide: Vec<String>,
}

#[derive(Debug, Default)]
pub struct PageState {
    pub url: String,
    pub visible: HashSet<String>,
    pub attached: HashSet<String>,
    pub fills: Vec<(String, String)>,
    pub clicks: Vec<String>,
    pub visits: Vec<String>,
    pub on_goto: Option<Transition>,
    pub on_click: HashMap<String, Transition>,
    fail_close: bool,
}

impl PageState {
    fn apply(&mut self, transition: Transition) {
        if let Some(url) = transition.url {
            self.url = url;
        }
        for selector in transition.hide {
            self.visible.remove(&selector);
        }
        for selector in transition.show {
            self.attached.insert(selector.clone());
            self.visible.insert(selector);
        }
    }
}

/// Scriptable page: selectors are plain strings, visible or merely attached.
#[derive(Clone, Default)]
pub struct FakePage {
    pub state: Arc<Mutex<PageState>>,
    events: Option<Events>,
}

impl FakePage {
    fn with_events(events: Events) -> Self {
        Self {
            state: Arc::default(),
            events: Some(events),
        }
    }

    pub fn show(&self, selector: &str) {
        let mut state = self.state.lock().unwrap();
        state.attached.insert(selector.to_string());
        state.visible.insert(selector.to_string());
    }

    pub fn attach(&self, selector: &str) {
        self.state.lock().unwrap().attached.insert(selector.to_string());
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().unwrap().url = url.to_string();
    }

    pub fn on_goto(&self, transition: Transition) {
        self.state.lock().unwrap().on_goto = Some(transition);
    }

    pub fn on_click(&self, selector: &str, transition: Transition) {
        self.state
            .lock()
            .unwrap()
            .on_click
            .insert(selector.to_string(), transition);
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().fills.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    fn timeout(what: &str, timeout: Duration) -> E2eError {
        E2eError::ElementTimeout {
            what: what.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.visits.push(url.to_string());
        state.url = url.to_string();
        if let Some(transition) = state.on_goto.clone() {
            state.apply(transition);
        }
        Ok(())
    }

    async fn wait_for_load_state(&self, _state: LoadState, _timeout: Duration) -> E2eResult<()> {
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        wait: WaitState,
        timeout: Duration,
    ) -> E2eResult<()> {
        let state = self.state.lock().unwrap();
        let reached = match wait {
            WaitState::Visible => state.visible.contains(selector),
            WaitState::Hidden => !state.visible.contains(selector),
            WaitState::Attached => state.attached.contains(selector),
            WaitState::Detached => !state.attached.contains(selector),
        };
        if reached {
            Ok(())
        } else {
            Err(Self::timeout(selector, timeout))
        }
    }

    async fn is_visible(&self, selector: &str) -> E2eResult<bool> {
        Ok(self.state.lock().unwrap().visible.contains(selector))
    }

    async fn count(&self, selector: &str) -> E2eResult<usize> {
        Ok(usize::from(self.state.lock().unwrap().attached.contains(selector)))
    }

    async fn fill(&self, selector: &str, value: &str, timeout: Duration) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.visible.contains(selector) {
            return Err(Self::timeout(selector, timeout));
        }
        state.fills.push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str, timeout: Duration) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.visible.contains(selector) {
            return Err(Self::timeout(selector, timeout));
        }
        state.clicks.push(selector.to_string());
        if let Some(transition) = state.on_click.get(selector).cloned() {
            state.apply(transition);
        }
        Ok(())
    }

    async fn url(&self) -> E2eResult<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"png")?;
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        if let Some(events) = &self.events {
            push(events, "close page");
        }
        if self.state.lock().unwrap().fail_close {
            return Err(E2eError::Bridge("page close failed".to_string()));
        }
        Ok(())
    }
}
