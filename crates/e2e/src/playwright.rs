//! Playwright browser automation
//!
//! A [`TestSpec`] is rendered into one Node script that drives a single
//! browser page through every step. Each step reports its own outcome on
//! stdout behind [`STEP_MARKER`], so a failing run still says which step
//! broke and how long the earlier ones took.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::spec::{TestSpec, TestStep};

/// Prefix of the stdout lines carrying step outcomes
pub const STEP_MARKER: &str = "@@apiprobe-step ";

const DEFAULT_ACTION_TIMEOUT_MS: u64 = 10_000;

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

    /// Unknown names fall back to Chromium
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "firefox" => Browser::Firefox,
            "webkit" => Browser::Webkit,
            _ => Browser::Chromium,
        }
    }
}

/// Outcome of one step, as reported by the generated script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    /// Directory whose `node_modules` provides `playwright`
    pub work_dir: PathBuf,
    pub browser: Browser,
    pub headless: bool,
    /// Upper bound for a whole spec run
    pub run_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.ramp.com".to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            work_dir: PathBuf::from("."),
            browser: Browser::Chromium,
            headless: true,
            run_timeout: Duration::from_secs(120),
        }
    }
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

impl PlaywrightHandle {
    /// Create a handle after checking that Playwright can be launched
    pub async fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config).await?;
        std::fs::create_dir_all(&config.screenshot_dir)?;
        Ok(Self { config })
    }

    async fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let status = Command::new("npx")
            .args(["--no-install", "playwright", "--version"])
            .current_dir(&config.work_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Render a spec into a runnable Node script
    pub fn build_script(&self, spec: &TestSpec) -> String {
        render_script(&self.config, spec)
    }

    /// Run every step of `spec` in one browser session
    ///
    /// A step failure is reported through the returned results; an `Err`
    /// means the script could not run at all.
    pub async fn run_spec(&self, spec: &TestSpec) -> E2eResult<Vec<StepResult>> {
        let script = self.build_script(spec);
        let temp_dir = tempfile::tempdir_in(&self.config.work_dir)?;
        let script_path = temp_dir.path().join(script_file_name(&spec.name));
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let child = Command::new("node")
            .arg(&script_path)
            .current_dir(&self.config.work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("failed to spawn node: {}", e)))?;

        let output = tokio::time::timeout(self.config.run_timeout, child.wait_with_output())
            .await
            .map_err(|_| E2eError::Timeout(format!("spec {}", spec.name)))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let steps = parse_step_results(&stdout);

        for line in stdout.lines().filter(|l| l.starts_with("[TEST]")) {
            info!("{}", line);
        }

        if !output.status.success() && !steps.iter().any(|s| !s.success) {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(E2eError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }
        if steps.len() < spec.steps.len() && steps.iter().all(|s| s.success) {
            warn!(
                "{}: only {} of {} steps reported",
                spec.name,
                steps.len(),
                spec.steps.len()
            );
        }

        Ok(steps)
    }
}

/// Collect the step outcomes printed behind [`STEP_MARKER`]
pub fn parse_step_results(stdout: &str) -> Vec<StepResult> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix(STEP_MARKER))
        .filter_map(|json| match serde_json::from_str(json) {
            Ok(step) => Some(step),
            Err(e) => {
                warn!("unparseable step report {:?}: {}", json, e);
                None
            }
        })
        .collect()
}

/// JavaScript string literal for `s`
fn js(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Locator expression for a selector, honouring the `label:` and `text:` prefixes
fn locator(selector: &str) -> String {
    if let Some(label) = selector.strip_prefix("label:") {
        format!("page.getByLabel({})", js(label.trim()))
    } else if let Some(text) = selector.strip_prefix("text:") {
        format!("page.getByText({})", js(text.trim()))
    } else {
        format!("page.locator({})", js(selector))
    }
}

fn render_script(config: &PlaywrightConfig, spec: &TestSpec) -> String {
    let mut script = format!(
        r#"const {{ chromium, firefox, webkit }} = require('playwright');
const {{ expect }} = require('@playwright/test');

const MARKER = {marker};
const report = (event) => console.log(MARKER + JSON.stringify(event));
const escapeRegExp = (s) => s.replace(/[.*+?^${{}}()|[\]\\]/g, '\\$&');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  page.setDefaultTimeout({action_timeout});
  const baseUrl = {base_url};

  const step = async (index, name, body) => {{
    const started = Date.now();
    try {{
      await body();
      report({{ index, name, success: true, duration_ms: Date.now() - started }});
    }} catch (error) {{
      report({{ index, name, success: false, duration_ms: Date.now() - started, error: error.message }});
      throw error;
    }}
  }};

  try {{
"#,
        marker = js(STEP_MARKER),
        browser = config.browser.as_str(),
        headless = config.headless,
        width = spec.viewport.width,
        height = spec.viewport.height,
        action_timeout = DEFAULT_ACTION_TIMEOUT_MS,
        base_url = js(&config.base_url),
    );

    for (i, step) in spec.steps.iter().enumerate() {
        script.push_str(&format!(
            "    await step({}, {}, async () => {{\n{}\n    }});\n",
            i,
            js(&step.name()),
            step_to_js(config, step)
        ));
    }

    script.push_str(
        r#"  } catch (error) {
    console.error(error.stack || String(error));
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#,
    );

    script
}

/// Convert a step to JavaScript statements
fn step_to_js(config: &PlaywrightConfig, step: &TestStep) -> String {
    match step {
        TestStep::Navigate {
            url,
            wait_for_selector,
        } => {
            let wait = wait_for_selector
                .as_deref()
                .map(|s| format!("\n      await {}.first().waitFor();", locator(s)))
                .unwrap_or_default();
            format!(
                "      await page.goto(new URL({}, baseUrl).toString());{}",
                js(url),
                wait
            )
        }
        TestStep::Click {
            selector,
            timeout_ms,
        } => format!(
            "      await {}.first().click({{ timeout: {} }});",
            locator(selector),
            timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS)
        ),
        TestStep::Fill {
            selector,
            value,
            clear_first,
        } => {
            let target = format!("{}.first()", locator(selector));
            if *clear_first {
                format!(
                    "      await {t}.fill('');\n      await {t}.fill({v});",
                    t = target,
                    v = js(value)
                )
            } else {
                format!("      await {}.fill({});", target, js(value))
            }
        }
        TestStep::Type {
            selector,
            text,
            delay_ms,
        } => format!(
            "      await {}.first().pressSequentially({}, {{ delay: {} }});",
            locator(selector),
            js(text),
            delay_ms.unwrap_or(50)
        ),
        TestStep::Press { selector, key } => match selector {
            Some(sel) => format!("      await {}.first().press({});", locator(sel), js(key)),
            None => format!("      await page.keyboard.press({});", js(key)),
        },
        TestStep::Wait {
            selector,
            timeout_ms,
            state,
        } => format!(
            "      await {}.first().waitFor({{ state: '{}', timeout: {} }});",
            locator(selector),
            state.as_str(),
            timeout_ms
        ),
        TestStep::Sleep { ms } => format!("      await page.waitForTimeout({});", ms),
        TestStep::Assert {
            selector,
            visible,
            enabled,
            text,
            text_contains,
            value,
            attribute,
            count,
            timeout_ms,
        } => {
            let first = format!("{}.first()", locator(selector));
            let opts = format!(
                "{{ timeout: {} }}",
                timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS)
            );
            let mut lines = Vec::new();

            match visible {
                Some(true) => lines.push(format!("await expect({}).toBeVisible({});", first, opts)),
                Some(false) => lines.push(format!("await expect({}).toBeHidden({});", first, opts)),
                None => {}
            }
            match enabled {
                Some(true) => lines.push(format!("await expect({}).toBeEnabled({});", first, opts)),
                Some(false) => {
                    lines.push(format!("await expect({}).toBeDisabled({});", first, opts))
                }
                None => {}
            }
            if let Some(t) = text {
                lines.push(format!("await expect({}).toHaveText({}, {});", first, js(t), opts));
            }
            if let Some(t) = text_contains {
                lines.push(format!(
                    "await expect({}).toContainText({}, {});",
                    first,
                    js(t),
                    opts
                ));
            }
            if let Some(v) = value {
                lines.push(format!("await expect({}).toHaveValue({}, {});", first, js(v), opts));
            }
            if let Some(attr) = attribute {
                let expected = match (&attr.value, &attr.contains) {
                    (Some(v), _) => format!(", {}", js(v)),
                    (None, Some(c)) => format!(", new RegExp(escapeRegExp({}))", js(c)),
                    (None, None) => String::new(),
                };
                lines.push(format!(
                    "await expect({}).toHaveAttribute({}{}, {});",
                    first,
                    js(&attr.name),
                    expected,
                    opts
                ));
            }
            if let Some(c) = count {
                lines.push(format!(
                    "await expect({}).toHaveCount({}, {});",
                    locator(selector),
                    c,
                    opts
                ));
            }

            lines
                .iter()
                .map(|l| format!("      {}", l))
                .collect::<Vec<_>>()
                .join("\n")
        }
        TestStep::AssertText { text, timeout_ms } => format!(
            "      await expect(page.getByText({}).first()).toBeVisible({{ timeout: {} }});",
            js(text),
            timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS)
        ),
        TestStep::AssertUrl {
            equals,
            contains,
            timeout_ms,
        } => match (equals, contains) {
            (Some(url), _) => format!(
                "      await page.waitForURL({}, {{ timeout: {} }});",
                js(url),
                timeout_ms
            ),
            (None, Some(part)) => format!(
                "      await page.waitForURL((u) => u.toString().includes({}), {{ timeout: {} }});",
                js(part),
                timeout_ms
            ),
            (None, None) => "      throw new Error('assert_url needs equals or contains');".to_string(),
        },
        TestStep::Screenshot {
            name,
            selector,
            full_page,
        } => {
            let path = config.screenshot_dir.join(format!("{}.png", name));
            let path = js(&path.to_string_lossy());
            match selector {
                Some(sel) => format!(
                    "      await {}.first().screenshot({{ path: {} }});",
                    locator(sel),
                    path
                ),
                None => format!(
                    "      await page.screenshot({{ path: {}, fullPage: {} }});",
                    path, full_page
                ),
            }
        }
        TestStep::Hover { selector } => {
            format!("      await {}.first().hover();", locator(selector))
        }
        TestStep::Focus { selector } => {
            format!("      await {}.first().focus();", locator(selector))
        }
        TestStep::Blur { selector } => {
            format!("      await {}.first().blur();", locator(selector))
        }
        TestStep::Log { message } => {
            format!("      console.log('[TEST] ' + {});", js(message))
        }
    }
}

/// Spec names come from YAML files; keep them to one plain path component
fn script_file_name(spec_name: &str) -> String {
    let stem: String = spec_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}.js", stem)
}
