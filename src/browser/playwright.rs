//! Playwright browser automation over a JSON-lines bridge.
//!
//! A small Node.js driver (embedded below) launches Chromium through
//! Playwright and serves one request per line on stdin, answering with one
//! JSON line per request on stdout:
//!
//! ```text
//! -> {"id":3,"cmd":"fill","page":1,"selector":"input[name='username']","text":"admin"}
//! <- {"id":3,"ok":true,"value":null}
//! <- {"id":4,"ok":false,"kind":"timeout","error":"page.waitForSelector: Timeout 5000ms exceeded."}
//! ```
//!
//! The Rust side awaits every response before sending the next request, so
//! the driver never runs two browser operations at once.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::types::{Browser, BrowserError, BrowserLauncher, BrowserResult, Page};
use crate::config;

/// Playwright's own default action timeout (milliseconds)
pub const PLAYWRIGHT_DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Extra time granted to the bridge on top of an operation's own bound
const RESPONSE_SLACK: Duration = Duration::from_secs(5);

/// Time allowed for the driver to launch Chromium and report readiness
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Time allowed for the driver process to exit after `close`
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Node.js driver speaking the JSON-lines protocol
const DRIVER_SCRIPT: &str = r#"
const readline = require('readline');

function emit(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

let chromium;
try {
  ({ chromium } = require('playwright'));
} catch (e) {
  emit({ event: 'error', message: 'playwright module not found: ' + e.message });
  process.exit(1);
}

const headless = process.env.WEB_VISION_PW_HEADLESS !== '0';
const viewport = {
  width: parseInt(process.env.WEB_VISION_PW_WIDTH || '1280', 10),
  height: parseInt(process.env.WEB_VISION_PW_HEIGHT || '720', 10),
};
const defaultTimeout = parseInt(process.env.WEB_VISION_PW_TIMEOUT || '30000', 10);

function classify(e) {
  if (e && e.name === 'TimeoutError') return 'timeout';
  const message = String((e && e.message) || e);
  if (/net::ERR_|NS_ERROR_|Navigation failed/.test(message)) return 'navigation';
  return 'driver';
}

(async () => {
  let browser;
  try {
    browser = await chromium.launch({ headless });
  } catch (e) {
    emit({ event: 'error', message: String((e && e.message) || e) });
    process.exit(1);
  }

  const pages = new Map();
  let nextPage = 1;
  const page = (req) => {
    const p = pages.get(req.page);
    if (!p) throw new Error('unknown page ' + req.page);
    return p;
  };

  async function handle(req) {
    switch (req.cmd) {
      case 'new_page': {
        const context = await browser.newContext({ viewport });
        const p = await context.newPage();
        p.setDefaultTimeout(defaultTimeout);
        const id = nextPage++;
        pages.set(id, p);
        return id;
      }
      case 'goto':
        await page(req).goto(req.url);
        return null;
      case 'wait_for_load_state':
        await page(req).waitForLoadState(req.state);
        return null;
      case 'fill':
        await page(req).fill(req.selector, req.text);
        return null;
      case 'click':
        await page(req).click(req.selector);
        return null;
      case 'click_and_wait_for_navigation': {
        const p = page(req);
        // Reply only once the click has settled too
        const [nav, click] = await Promise.allSettled([
          p.waitForNavigation({ timeout: req.timeout_ms }),
          p.click(req.selector),
        ]);
        if (click.status === 'rejected') throw click.reason;
        if (nav.status === 'rejected') throw nav.reason;
        return null;
      }
      case 'wait_for_navigation':
        await page(req).waitForNavigation({ timeout: req.timeout_ms });
        return null;
      case 'wait_for_selector':
        await page(req).waitForSelector(req.selector, { timeout: req.timeout_ms });
        return null;
      case 'text_content':
        return await page(req).textContent(req.selector);
      case 'screenshot': {
        const bytes = await page(req).screenshot({ type: 'png' });
        return bytes.toString('base64');
      }
      case 'close':
        return null;
      default:
        throw new Error('unknown command ' + req.cmd);
    }
  }

  emit({ event: 'ready', version: browser.version() });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    let req;
    try {
      req = JSON.parse(line);
    } catch (e) {
      emit({ id: null, ok: false, kind: 'driver', error: 'bad request: ' + e.message });
      continue;
    }
    try {
      const value = await handle(req);
      emit({ id: req.id, ok: true, value: value === undefined ? null : value });
    } catch (e) {
      emit({ id: req.id, ok: false, kind: classify(e), error: String((e && e.message) || e) });
    }
    if (req.cmd === 'close') break;
  }

  await browser.close().catch(() => {});
  process.exit(0);
})();
"#;

/// Configuration for the Playwright bridge
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    /// Node.js binary
    pub node_binary: String,
    /// Run Chromium headless
    pub headless: bool,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
    /// Default bound for operations without an explicit timeout
    pub default_timeout_ms: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            node_binary: cfg.browser.node_binary.clone(),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            default_timeout_ms: PLAYWRIGHT_DEFAULT_TIMEOUT_MS,
        }
    }
}

impl PlaywrightConfig {
    pub fn new(node_binary: impl Into<String>) -> Self {
        Self {
            node_binary: node_binary.into(),
            ..Default::default()
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

/// Requests understood by the driver
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum BridgeCommand {
    NewPage,
    Goto { page: u64, url: String },
    WaitForLoadState { page: u64, state: &'static str },
    Fill { page: u64, selector: String, text: String },
    Click { page: u64, selector: String },
    ClickAndWaitForNavigation { page: u64, selector: String, timeout_ms: u64 },
    WaitForNavigation { page: u64, timeout_ms: u64 },
    WaitForSelector { page: u64, selector: String, timeout_ms: u64 },
    TextContent { page: u64, selector: String },
    Screenshot { page: u64 },
    Close,
}

impl BridgeCommand {
    /// Short description used in timeout errors and logs
    fn describe(&self) -> String {
        match self {
            BridgeCommand::NewPage => "opening page".to_string(),
            BridgeCommand::Goto { url, .. } => format!("navigating to {}", url),
            BridgeCommand::WaitForLoadState { state, .. } => format!("waiting for load state '{}'", state),
            BridgeCommand::Fill { selector, .. } => format!("filling '{}'", selector),
            BridgeCommand::Click { selector, .. } => format!("clicking '{}'", selector),
            BridgeCommand::ClickAndWaitForNavigation { selector, .. } => {
                format!("waiting for navigation after clicking '{}'", selector)
            }
            BridgeCommand::WaitForNavigation { .. } => "waiting for navigation".to_string(),
            BridgeCommand::WaitForSelector { selector, .. } => format!("waiting for selector '{}'", selector),
            BridgeCommand::TextContent { selector, .. } => format!("reading text of '{}'", selector),
            BridgeCommand::Screenshot { .. } => "capturing screenshot".to_string(),
            BridgeCommand::Close => "closing browser".to_string(),
        }
    }

    /// Bound the driver applies to this command
    fn timeout_ms(&self, default_ms: u64) -> u64 {
        match self {
            BridgeCommand::ClickAndWaitForNavigation { timeout_ms, .. }
            | BridgeCommand::WaitForNavigation { timeout_ms, .. }
            | BridgeCommand::WaitForSelector { timeout_ms, .. } => *timeout_ms,
            _ => default_ms,
        }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    #[serde(flatten)]
    command: &'a BridgeCommand,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: Option<u64>,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadyEvent {
    event: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Live connection to the driver process
struct Connection {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    default_timeout_ms: u64,
    /// Extra wait on top of each request's own bound
    response_slack: Duration,
    closed: bool,
}

impl Connection {
    /// Take over the pipes of a spawned driver process
    fn open(mut child: Child, default_timeout_ms: u64) -> BrowserResult<Self> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BrowserError::Launch("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BrowserError::Launch("bridge stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "web_vision::browser::bridge", "{}", line);
                }
            });
        }

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            default_timeout_ms,
            response_slack: RESPONSE_SLACK,
            closed: false,
        })
    }

    /// Wait for the driver's ready event, returning the browser version
    async fn handshake(&mut self) -> BrowserResult<Option<String>> {
        let first = tokio::time::timeout(LAUNCH_TIMEOUT, self.stdout.next_line())
            .await
            .map_err(|_| BrowserError::Launch(format!("browser not ready after {:?}", LAUNCH_TIMEOUT)))??
            .ok_or_else(|| BrowserError::Launch("browser bridge exited before becoming ready".to_string()))?;
        let ready: ReadyEvent = serde_json::from_str(&first)
            .map_err(|e| BrowserError::Launch(format!("unexpected bridge output '{}': {}", first, e)))?;
        if ready.event != "ready" {
            return Err(BrowserError::Launch(
                ready.message.unwrap_or_else(|| "unknown launch failure".to_string()),
            ));
        }
        Ok(ready.version)
    }

    async fn request(&mut self, command: BridgeCommand) -> BrowserResult<serde_json::Value> {
        if self.closed {
            return Err(BrowserError::Closed);
        }

        self.next_id += 1;
        let id = self.next_id;
        let timeout_ms = command.timeout_ms(self.default_timeout_ms);

        let mut line = serde_json::to_string(&Request { id, command: &command })?;
        line.push('\n');
        debug!(id, action = %command.describe(), "Sending bridge request");
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let bound = Duration::from_millis(timeout_ms) + self.response_slack;
        let response = match tokio::time::timeout(bound, self.read_response(id)).await {
            Ok(response) => response?,
            Err(_) => {
                return Err(BrowserError::Timeout {
                    action: format!("{} (no response from browser bridge)", command.describe()),
                    timeout_ms: bound.as_millis() as u64,
                });
            }
        };

        if response.ok {
            return Ok(response.value);
        }

        let message = response
            .error
            .as_deref()
            .and_then(|e| e.lines().next())
            .unwrap_or("unknown error")
            .to_string();
        Err(match response.kind.as_deref() {
            Some("timeout") => BrowserError::Timeout {
                action: command.describe(),
                timeout_ms,
            },
            Some("navigation") => BrowserError::Navigation(message),
            _ => BrowserError::Driver(message),
        })
    }

    /// Read lines until the response for `id` arrives, skipping answers to
    /// requests that already timed out on this side.
    async fn read_response(&mut self, id: u64) -> BrowserResult<Response> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| BrowserError::Protocol("browser bridge exited".to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let response: Response = serde_json::from_str(&line)
                .map_err(|e| BrowserError::Protocol(format!("unreadable response '{}': {}", line, e)))?;
            match response.id {
                Some(rid) if rid == id => return Ok(response),
                other => debug!(expected = id, got = ?other, "Discarding stale bridge response"),
            }
        }
    }

    async fn shutdown(&mut self) -> BrowserResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.request(BridgeCommand::Close).await;
        self.closed = true;

        match tokio::time::timeout(CLOSE_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Browser bridge exited"),
            Ok(Err(e)) => warn!(error = %e, "Failed to reap browser bridge"),
            Err(_) => {
                warn!("Browser bridge did not exit, killing it");
                self.child.kill().await?;
            }
        }
        result.map(|_| ())
    }
}

/// Launches Chromium through the Playwright bridge
#[derive(Debug, Clone)]
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }
}

impl Default for PlaywrightLauncher {
    fn default() -> Self {
        Self::new(PlaywrightConfig::default())
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    type Browser = PlaywrightBrowser;

    async fn launch(&self) -> BrowserResult<PlaywrightBrowser> {
        let child = Command::new(&self.config.node_binary)
            .arg("-e")
            .arg(DRIVER_SCRIPT)
            .env("WEB_VISION_PW_HEADLESS", if self.config.headless { "1" } else { "0" })
            .env("WEB_VISION_PW_WIDTH", self.config.viewport_width.to_string())
            .env("WEB_VISION_PW_HEIGHT", self.config.viewport_height.to_string())
            .env("WEB_VISION_PW_TIMEOUT", self.config.default_timeout_ms.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::Launch(format!("failed to spawn '{}': {}", self.config.node_binary, e)))?;

        let mut connection = Connection::open(child, self.config.default_timeout_ms)?;
        let version = connection.handshake().await?;
        info!(
            version = version.as_deref().unwrap_or("unknown"),
            headless = self.config.headless,
            "Chromium launched"
        );

        Ok(PlaywrightBrowser {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn engine(&self) -> &str {
        "Chromium (Playwright)"
    }
}

/// Chromium instance behind the bridge
pub struct PlaywrightBrowser {
    connection: Arc<Mutex<Connection>>,
}

#[async_trait]
impl Browser for PlaywrightBrowser {
    type Page = PlaywrightPage;

    async fn new_page(&mut self) -> BrowserResult<PlaywrightPage> {
        let value = self.connection.lock().await.request(BridgeCommand::NewPage).await?;
        let id = value
            .as_u64()
            .ok_or_else(|| BrowserError::Protocol(format!("expected page id, got {}", value)))?;
        Ok(PlaywrightPage {
            connection: Arc::clone(&self.connection),
            id,
        })
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.connection.lock().await.shutdown().await
    }
}

/// One page (tab) of the bridged browser
pub struct PlaywrightPage {
    connection: Arc<Mutex<Connection>>,
    id: u64,
}

impl PlaywrightPage {
    async fn send(&self, command: BridgeCommand) -> BrowserResult<serde_json::Value> {
        self.connection.lock().await.request(command).await
    }
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn goto(&mut self, url: &str) -> BrowserResult<()> {
        self.send(BridgeCommand::Goto {
            page: self.id,
            url: url.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn wait_for_network_idle(&mut self) -> BrowserResult<()> {
        self.send(BridgeCommand::WaitForLoadState {
            page: self.id,
            state: "networkidle",
        })
        .await
        .map(|_| ())
    }

    async fn fill(&mut self, selector: &str, text: &str) -> BrowserResult<()> {
        self.send(BridgeCommand::Fill {
            page: self.id,
            selector: selector.to_string(),
            text: text.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn click(&mut self, selector: &str) -> BrowserResult<()> {
        self.send(BridgeCommand::Click {
            page: self.id,
            selector: selector.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn click_and_wait_for_navigation(&mut self, selector: &str, timeout_ms: u64) -> BrowserResult<()> {
        self.send(BridgeCommand::ClickAndWaitForNavigation {
            page: self.id,
            selector: selector.to_string(),
            timeout_ms,
        })
        .await
        .map(|_| ())
    }

    async fn wait_for_navigation(&mut self, timeout_ms: u64) -> BrowserResult<()> {
        self.send(BridgeCommand::WaitForNavigation {
            page: self.id,
            timeout_ms,
        })
        .await
        .map(|_| ())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout_ms: u64) -> BrowserResult<()> {
        self.send(BridgeCommand::WaitForSelector {
            page: self.id,
            selector: selector.to_string(),
            timeout_ms,
        })
        .await
        .map(|_| ())
    }

    async fn text_content(&mut self, selector: &str) -> BrowserResult<Option<String>> {
        let value = self
            .send(BridgeCommand::TextContent {
                page: self.id,
                selector: selector.to_string(),
            })
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn screenshot(&mut self) -> BrowserResult<Vec<u8>> {
        let value = self.send(BridgeCommand::Screenshot { page: self.id }).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| BrowserError::Protocol("screenshot payload is not a string".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| BrowserError::Protocol(format!("invalid screenshot payload: {}", e)))
    }
}
