//! Playwright browser automation
//!
//! Each session spawns `node` on a small bridge script (staged into a temp
//! directory) that owns one Playwright browser. Requests and responses are
//! single JSON lines over the child's stdin/stdout, matched by id.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::audit::{AuditOptions, AuditResult};
use crate::engine::{
    BrowserEngine, BrowserSession, BrowsingContext, LaunchOptions, LoadState, Page, SurfacePolicy,
    WaitState,
};
use crate::error::{E2eError, E2eResult};
use crate::settings::BrowserKind;

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Extra time granted on the Rust side beyond a call's own timeout
const RESPONSE_GRACE: Duration = Duration::from_secs(5);

/// Budget for calls that carry no timeout of their own
const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

/// Launches Playwright browsers through the Node bridge
pub struct PlaywrightEngine {
    kind: BrowserKind,
    node_path: PathBuf,
}

impl PlaywrightEngine {
    /// Create an engine; fails if `node` is not on `PATH`.
    pub fn new(kind: BrowserKind, node_path: Option<PathBuf>) -> E2eResult<Self> {
        Self::check_node_installed()?;

        let node_path = match node_path {
            Some(path) => path,
            None => std::env::current_dir()?.join("node_modules"),
        };
        if !node_path.is_dir() {
            warn!(
                "node_modules not found at {}; set E2E_NODE_PATH if playwright lives elsewhere",
                node_path.display()
            );
        }

        Ok(Self { kind, node_path })
    }

    fn check_node_installed() -> E2eResult<()> {
        let status = Command::new("node")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::NodeNotFound),
        }
    }
}

#[async_trait]
impl BrowserEngine for PlaywrightEngine {
    fn kind(&self) -> BrowserKind {
        self.kind
    }

    async fn launch(&self, options: &LaunchOptions) -> E2eResult<Box<dyn BrowserSession>> {
        let mut options = options.clone();
        if options.browser.supports_audits() && options.debugging_port.is_none() {
            options.debugging_port = Some(find_free_port()?);
        }

        let bridge = Arc::new(Bridge::spawn(&self.node_path).await?);
        let params = serde_json::to_value(&options)?;
        let launched: Value = match bridge.call("launch", params, CONTROL_TIMEOUT).await {
            Ok(v) => v,
            Err(e) => {
                bridge.shutdown().await;
                return Err(e);
            }
        };

        info!(
            "Launched {} {} (headless: {})",
            options.browser,
            launched["version"].as_str().unwrap_or("unknown"),
            options.headless
        );

        Ok(Box::new(PlaywrightSession {
            bridge,
            kind: options.browser,
        }))
    }
}

/// The bridge process and its pipes
struct Bridge {
    io: Mutex<BridgeIo>,
    child: Mutex<Option<Child>>,
    next_id: AtomicU64,
    _script_dir: tempfile::TempDir,
}

struct BridgeIo {
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    op: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl Bridge {
    async fn spawn(node_path: &Path) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        debug!("Spawning Playwright bridge: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(script_dir.path())
            .env("NODE_PATH", node_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Bridge(format!("failed to spawn node: {}", e)))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout not captured".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "playwright", "{}", line);
                }
            });
        }

        Ok(Self {
            io: Mutex::new(BridgeIo {
                stdin,
                stdout: BufReader::new(stdout).lines(),
            }),
            child: Mutex::new(Some(child)),
            next_id: AtomicU64::new(1),
            _script_dir: script_dir,
        })
    }

    /// Send one request and wait for its response.
    async fn call(&self, op: &str, params: Value, timeout: Duration) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&BridgeRequest { id, op, params })?;
        line.push('\n');

        let mut io = self.io.lock().await;
        let stdin = io
            .stdin
            .as_mut()
            .ok_or_else(|| E2eError::Bridge("bridge already shut down".to_string()))?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;

        let budget = timeout + RESPONSE_GRACE;
        let response = tokio::time::timeout(budget, read_response(&mut io.stdout, id))
            .await
            .map_err(|_| E2eError::ElementTimeout {
                what: format!("bridge response to '{}'", op),
                timeout,
            })??;

        if response.ok {
            return Ok(response.result);
        }

        let message = response.error.unwrap_or_else(|| "unknown error".to_string());
        match response.kind.as_deref() {
            Some("timeout") => Err(E2eError::ElementTimeout {
                what: format!("{}: {}", op, first_line(&message)),
                timeout,
            }),
            _ => Err(E2eError::Bridge(format!("{}: {}", op, message))),
        }
    }

    async fn call_as<T: DeserializeOwned>(
        &self,
        op: &str,
        params: Value,
        timeout: Duration,
    ) -> E2eResult<T> {
        let value = self.call(op, params, timeout).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Close stdin, give the process a moment to exit, then terminate it.
    async fn shutdown(&self) {
        self.io.lock().await.stdin.take();

        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };

        if let Ok(Ok(status)) = tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
            debug!("Playwright bridge exited: {}", status);
            return;
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && tokio::time::timeout(Duration::from_millis(500), child.wait())
                        .await
                        .is_ok()
                {
                    return;
                }
            }
        }

        warn!("Playwright bridge did not exit, killing it");
        let _ = child.kill().await;
    }
}

async fn read_response(
    stdout: &mut Lines<BufReader<ChildStdout>>,
    id: u64,
) -> E2eResult<BridgeResponse> {
    loop {
        let line = stdout
            .next_line()
            .await?
            .ok_or_else(|| E2eError::Bridge("bridge exited unexpectedly".to_string()))?;

        match serde_json::from_str::<BridgeResponse>(&line) {
            Ok(response) if response.id == id => return Ok(response),
            // Late answer to a call that already timed out on our side
            Ok(response) => debug!("Discarding stale bridge response {}", response.id),
            Err(_) => debug!(target: "playwright", "{}", line),
        }
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message)
}

fn find_free_port() -> E2eResult<u16> {
    use std::net::TcpListener;

    Ok(TcpListener::bind("127.0.0.1:0")?.local_addr()?.port())
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

/// A launched browser
pub struct PlaywrightSession {
    bridge: Arc<Bridge>,
    kind: BrowserKind,
}

#[derive(Deserialize)]
struct HandleId {
    id: u64,
}

#[derive(Deserialize)]
struct LighthouseResponse {
    categories: BTreeMap<String, Option<f64>>,
    audits: BTreeMap<String, f64>,
    report: Option<String>,
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    async fn new_context(&self, policy: &SurfacePolicy) -> E2eResult<Box<dyn BrowsingContext>> {
        let handle: HandleId = self
            .bridge
            .call_as("newContext", serde_json::to_value(policy)?, CONTROL_TIMEOUT)
            .await?;
        Ok(Box::new(PlaywrightContext {
            bridge: self.bridge.clone(),
            id: handle.id,
        }))
    }

    async fn audit(&self, url: &str, options: &AuditOptions) -> E2eResult<AuditResult> {
        if !self.kind.supports_audits() {
            return Err(E2eError::Audit(format!(
                "{} sessions cannot run Lighthouse",
                self.kind
            )));
        }

        let mut params = serde_json::to_value(options)?;
        params["url"] = json!(url);
        let timeout = Duration::from_millis(options.timeout_ms);

        let response: LighthouseResponse = self
            .bridge
            .call_as("lighthouse", params, timeout)
            .await
            .map_err(|e| match e {
                E2eError::Bridge(message) => E2eError::Audit(message),
                E2eError::ElementTimeout { .. } => E2eError::Audit(e.to_string()),
                other => other,
            })?;

        Ok(AuditResult::from_lighthouse(
            &response.categories,
            &response.audits,
            response.report,
        ))
    }

    async fn close(&self) -> E2eResult<()> {
        let result = self
            .bridge
            .call("closeBrowser", Value::Null, CONTROL_TIMEOUT)
            .await;
        self.bridge.shutdown().await;
        result.map(|_| ())
    }
}

/// A browsing context inside a session
pub struct PlaywrightContext {
    bridge: Arc<Bridge>,
    id: u64,
}

#[async_trait]
impl BrowsingContext for PlaywrightContext {
    async fn new_page(&self) -> E2eResult<Box<dyn Page>> {
        let handle: HandleId = self
            .bridge
            .call_as("newPage", json!({ "context": self.id }), CONTROL_TIMEOUT)
            .await?;
        Ok(Box::new(PlaywrightPage {
            bridge: self.bridge.clone(),
            id: handle.id,
        }))
    }

    async fn close(&self) -> E2eResult<()> {
        self.bridge
            .call("closeContext", json!({ "context": self.id }), CONTROL_TIMEOUT)
            .await
            .map(|_| ())
    }
}

/// A page inside a browsing context
pub struct PlaywrightPage {
    bridge: Arc<Bridge>,
    id: u64,
}

impl PlaywrightPage {
    async fn call(&self, op: &str, mut params: Value, timeout: Duration) -> E2eResult<Value> {
        params["page"] = json!(self.id);
        self.bridge.call(op, params, timeout).await
    }
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn goto(&self, url: &str, timeout: Duration) -> E2eResult<()> {
        self.call("goto", json!({ "url": url, "timeout": millis(timeout) }), timeout)
            .await
            .map_err(|e| match e {
                E2eError::Bridge(message) => E2eError::Navigation(message),
                other => other,
            })?;
        Ok(())
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> E2eResult<()> {
        self.call(
            "waitForLoadState",
            json!({ "state": state, "timeout": millis(timeout) }),
            timeout,
        )
        .await?;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.call(
            "waitForSelector",
            json!({ "selector": selector, "state": state, "timeout": millis(timeout) }),
            timeout,
        )
        .await?;
        Ok(())
    }

    async fn is_visible(&self, selector: &str) -> E2eResult<bool> {
        let value = self
            .call("isVisible", json!({ "selector": selector }), CONTROL_TIMEOUT)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn count(&self, selector: &str) -> E2eResult<usize> {
        let value = self
            .call("count", json!({ "selector": selector }), CONTROL_TIMEOUT)
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn fill(&self, selector: &str, value: &str, timeout: Duration) -> E2eResult<()> {
        self.call(
            "fill",
            json!({ "selector": selector, "value": value, "timeout": millis(timeout) }),
            timeout,
        )
        .await?;
        Ok(())
    }

    async fn click(&self, selector: &str, timeout: Duration) -> E2eResult<()> {
        self.call(
            "click",
            json!({ "selector": selector, "timeout": millis(timeout) }),
            timeout,
        )
        .await?;
        Ok(())
    }

    async fn url(&self) -> E2eResult<String> {
        let value = self.call("url", json!({}), CONTROL_TIMEOUT).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.call(
            "screenshot",
            json!({ "path": path.to_string_lossy(), "fullPage": full_page }),
            CONTROL_TIMEOUT,
        )
        .await?;
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        self.bridge
            .call("closePage", json!({ "page": self.id }), CONTROL_TIMEOUT)
            .await
            .map(|_| ())
    }
}
