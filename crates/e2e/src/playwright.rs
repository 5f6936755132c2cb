//! Playwright browser automation
//!
//! A small Node script is written to a temp dir and kept running for the
//! lifetime of one scenario. The harness sends one JSON request per line on
//! its stdin and reads one JSON response per line from its stdout, so the
//! page (cookies, session, current URL) survives between steps.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use crate::driver::{BrowserDriver, DriverFactory};
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Driver(format!("unsupported browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Browser locale; native validation messages are rendered in it
    pub locale: String,
    /// Directory holding `node_modules/playwright`, exported as NODE_PATH
    pub node_path: Option<PathBuf>,
    /// Playwright's own per-action timeout
    pub action_timeout_ms: u64,
    /// Upper bound for one request/response round trip
    pub command_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            locale: "pt-BR".to_string(),
            node_path: None,
            action_timeout_ms: 10_000,
            command_timeout: Duration::from_secs(30),
        }
    }
}

/// One request line sent to the driver script
#[derive(Debug, Clone, Serialize)]
struct Request<'a> {
    id: u64,
    #[serde(flatten)]
    op: Op<'a>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Op<'a> {
    Goto { url: &'a str },
    Fill { selector: &'a str, value: &'a str },
    Click { selector: &'a str },
    Count { selector: &'a str },
    InnerTexts { selector: &'a str },
    ValidationMessage { selector: &'a str },
    Url,
    Screenshot { path: &'a Path },
    Close,
}

impl Op<'_> {
    fn name(&self) -> String {
        match self {
            Op::Goto { url } => format!("goto:{}", url),
            Op::Fill { selector, .. } => format!("fill:{}", selector),
            Op::Click { selector } => format!("click:{}", selector),
            Op::Count { selector } => format!("count:{}", selector),
            Op::InnerTexts { selector } => format!("inner_texts:{}", selector),
            Op::ValidationMessage { selector } => format!("validation_message:{}", selector),
            Op::Url => "url".to_string(),
            Op::Screenshot { path } => format!("screenshot:{}", path.display()),
            Op::Close => "close".to_string(),
        }
    }
}

/// One response line read back from the driver script
#[derive(Debug, Clone, Deserialize)]
struct Response {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// Playwright browser handle backed by a long-lived Node process
pub struct PlaywrightDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    command_timeout: Duration,
    closed: bool,
    // Keeps the driver script on disk while node runs it
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Launch a browser and wait until the driver script reports ready
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, build_script(config))?;

        debug!("Starting Playwright driver: {}", script_path.display());

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(node_path) = &config.node_path {
            cmd.env("NODE_PATH", node_path.join("node_modules"));
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| E2eError::Driver(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdout not captured".to_string()))?;

        let mut driver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            command_timeout: config.command_timeout,
            closed: false,
            _script_dir: script_dir,
        };

        // The script greets with id 0 once the page exists
        driver.read_response(0).await?;
        info!("Playwright {} ready", config.browser.as_str());
        Ok(driver)
    }

    async fn send(&mut self, op: Op<'_>) -> E2eResult<serde_json::Value> {
        if self.closed {
            return Err(E2eError::Driver("driver already closed".to_string()));
        }

        let id = self.next_id;
        self.next_id += 1;
        let name = op.name();
        debug!("-> [{}] {}", id, name);

        let mut line = serde_json::to_string(&Request { id, op })?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let response = self.read_response(id).await?;
        if response.ok {
            Ok(response.value)
        } else {
            Err(E2eError::Driver(format!(
                "{} failed: {}",
                name,
                response.error.unwrap_or_else(|| "unknown error".to_string())
            )))
        }
    }

    async fn read_response(&mut self, id: u64) -> E2eResult<Response> {
        let limit = self.command_timeout;
        loop {
            let next = tokio::time::timeout(limit, self.stdout.next_line())
                .await
                .map_err(|_| {
                    E2eError::Driver(format!("no response to request {} within {:?}", id, limit))
                })??;

            let Some(line) = next else {
                return Err(E2eError::Driver("driver process exited".to_string()));
            };

            match serde_json::from_str::<Response>(&line) {
                Ok(response) if response.id == id => return Ok(response),
                Ok(response) => warn!("Discarding stale driver response {}", response.id),
                Err(_) => debug!("driver: {}", line),
            }
        }
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.send(Op::Goto { url }).await.map(drop)
    }

    async fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()> {
        self.send(Op::Fill { selector, value }).await.map(drop)
    }

    async fn click(&mut self, selector: &str) -> E2eResult<()> {
        self.send(Op::Click { selector }).await.map(drop)
    }

    async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        let value = self.send(Op::Count { selector }).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| E2eError::Driver(format!("count returned {}", value)))
    }

    async fn inner_texts(&mut self, selector: &str) -> E2eResult<Vec<String>> {
        let value = self.send(Op::InnerTexts { selector }).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn validation_message(&mut self, selector: &str) -> E2eResult<String> {
        let value = self.send(Op::ValidationMessage { selector }).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        let value = self.send(Op::Url).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.send(Op::Screenshot { path }).await.map(drop)
    }

    async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.send(Op::Close).await.map(drop);
        self.closed = true;
        if let Err(e) = self.child.wait().await {
            warn!("Playwright driver did not exit cleanly: {}", e);
        }
        result
    }
}

/// Spawns one [`PlaywrightDriver`] per scenario
#[derive(Debug, Clone)]
pub struct PlaywrightFactory {
    config: PlaywrightConfig,
}

impl PlaywrightFactory {
    /// Verify Playwright is installed and build a factory
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        check_playwright_installed()?;
        Ok(Self { config })
    }
}

#[async_trait]
impl DriverFactory for PlaywrightFactory {
    type Driver = PlaywrightDriver;

    async fn create(&self) -> E2eResult<PlaywrightDriver> {
        PlaywrightDriver::launch(&self.config).await
    }
}

/// Check if Playwright is installed
fn check_playwright_installed() -> E2eResult<()> {
    let output = Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match output {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::DriverNotFound),
    }
}

/// Build the Node driver script for a configuration
fn build_script(config: &PlaywrightConfig) -> String {
    // serde_json quoting yields a valid JS string literal
    let locale = serde_json::to_string(&config.locale).unwrap_or_else(|_| "\"pt-BR\"".to_string());

    format!(
        r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const readline = require('readline');

const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }},
    locale: {locale}
  }});
  const page = await context.newPage();
  page.setDefaultTimeout({action_timeout});
  reply({{ id: 0, ok: true, value: 'ready' }});

  const rl = readline.createInterface({{ input: process.stdin }});
  for await (const line of rl) {{
    if (!line.trim()) continue;
    const req = JSON.parse(line);
    try {{
      let value = null;
      switch (req.op) {{
        case 'goto':
          await page.goto(req.url, {{ waitUntil: 'load' }});
          break;
        case 'fill':
          await page.locator(req.selector).first().fill(req.value);
          break;
        case 'click':
          await page.locator(req.selector).first().click();
          await page.waitForLoadState('load');
          break;
        case 'count':
          value = await page.locator(req.selector).count();
          break;
        case 'inner_texts':
          value = await page.locator(req.selector).allInnerTexts();
          break;
        case 'validation_message':
          value = await page.locator(req.selector).first().evaluate((el) => {{
            el.reportValidity();
            return el.validationMessage;
          }});
          break;
        case 'url':
          value = page.url();
          break;
        case 'screenshot':
          await page.screenshot({{ path: req.path, fullPage: true }});
          break;
        case 'close':
          reply({{ id: req.id, ok: true, value: null }});
          await browser.close();
          process.exit(0);
        default:
          throw new Error('unknown op: ' + req.op);
      }}
      reply({{ id: req.id, ok: true, value }});
    }} catch (error) {{
      reply({{ id: req.id, ok: false, error: error.message }});
    }}
  }}
  await browser.close();
}})().catch((error) => {{
  console.error(JSON.stringify({{ success: false, error: error.message, stack: error.stack }}));
  process.exit(1);
}});
"#,
        browser = config.browser.as_str(),
        headless = config.headless,
        width = config.viewport_width,
        height = config.viewport_height,
        locale = locale,
        action_timeout = config.action_timeout_ms,
    )
}
