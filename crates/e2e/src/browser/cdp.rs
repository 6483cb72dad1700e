//! Chromium engine over the DevTools protocol
//!
//! Each session is its own browser context, so cookies and the basic-auth
//! header set for one session never leak into another. Elements are resolved
//! in the page with `querySelectorAll` / `document.evaluate`; clicks and hovers
//! go through real mouse events at the element's centre so menus that open on
//! hover behave as they do for a user.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser as ChromiumBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, Headers, SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::layout::Point;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Browser, BrowserPage, BrowserSession, LoadState, Locator, WaitState};
use crate::config::{RunConfig, SessionOptions};
use crate::error::{E2eError, E2eResult};

/// Interval between polls while waiting on page state
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// No new resource entries for this long counts as network idle
const NETWORK_QUIET_PERIOD: Duration = Duration::from_millis(500);

const IS_VISIBLE_JS: &str = "const isVisible = el => { \
    if (!(el instanceof Element)) return false; \
    const style = window.getComputedStyle(el); \
    const rect = el.getBoundingClientRect(); \
    return style.visibility !== 'hidden' && style.display !== 'none' \
        && rect.width > 0 && rect.height > 0; };";

/// Launched Chromium process plus the task pumping its CDP events
pub struct CdpBrowser {
    inner: Arc<Mutex<ChromiumBrowser>>,
    handler: JoinHandle<()>,
}

impl CdpBrowser {
    /// Launch Chromium with the run's headless and viewport settings.
    pub async fn launch(config: &RunConfig) -> E2eResult<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .window_size(config.viewport_width, config.viewport_height);

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder.build().map_err(E2eError::Browser)?;

        info!("Launching Chromium (headless: {})", config.headless);
        let (browser, mut handler) = ChromiumBrowser::launch(browser_config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler stopped: {}", e);
                    break;
                }
            }
        });

        Ok(Self {
            inner: Arc::new(Mutex::new(browser)),
            handler,
        })
    }

    /// Close Chromium and stop the event task.
    pub async fn shutdown(self) -> E2eResult<()> {
        let result = {
            let mut browser = self.inner.lock().await;
            browser.close().await.map(|_| ())
        };
        self.handler.abort();
        result.map_err(E2eError::from)
    }
}

#[async_trait]
impl Browser for CdpBrowser {
    type Session = CdpSession;

    async fn open_session(&self, options: &SessionOptions) -> E2eResult<CdpSession> {
        let context_id = {
            let mut browser = self.inner.lock().await;
            browser
                .create_browser_context(CreateBrowserContextParams::default())
                .await?
        };

        let opened = self.open_page(context_id.clone(), options).await;
        let session = dispose_on_error(opened, async {
            let mut browser = self.inner.lock().await;
            browser.dispose_browser_context(context_id).await?;
            Ok::<(), E2eError>(())
        })
        .await?;

        debug!(
            "Opened browser session {:?} ({}x{})",
            session.context_id, options.viewport_width, options.viewport_height
        );
        Ok(session)
    }
}

impl CdpBrowser {
    async fn open_page(
        &self,
        context_id: BrowserContextId,
        options: &SessionOptions,
    ) -> E2eResult<CdpSession> {
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(E2eError::Browser)?;

        let page = {
            let browser = self.inner.lock().await;
            browser.new_page(target).await?
        };

        let session = CdpSession {
            page,
            context_id,
            browser: Arc::clone(&self.inner),
            action_timeout: options.action_timeout,
        };
        if let Err(e) = session.configure(options).await {
            if let Err(close_err) = session.page.clone().close().await {
                warn!("Closing unconfigured page failed: {}", close_err);
            }
            return Err(e);
        }
        Ok(session)
    }
}

/// Run `dispose` if `result` failed, returning the original error either way.
async fn dispose_on_error<T, D>(result: E2eResult<T>, dispose: D) -> E2eResult<T>
where
    D: Future<Output = E2eResult<()>>,
{
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(dispose_err) = dispose.await {
                warn!("Disposing browser context failed: {}", dispose_err);
            }
            Err(e)
        }
    }
}

/// One isolated browser context with a single page
pub struct CdpSession {
    page: Page,
    context_id: BrowserContextId,
    browser: Arc<Mutex<ChromiumBrowser>>,
    action_timeout: Duration,
}

/// First match of a locator as seen from the page
#[derive(Debug, Deserialize)]
struct ElementProbe {
    count: usize,
    visible: bool,
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct DocumentProbe {
    /// `performance.timeOrigin`, distinct for every loaded document
    origin: f64,
    ready: String,
    resources: usize,
}

/// Progress of one load-state wait across polls.
struct LoadWaiter {
    state: LoadState,
    /// Origin of the document a click navigated away from, if any.
    previous_origin: Option<f64>,
    last_resources: Option<usize>,
    quiet_since: Instant,
}

impl LoadWaiter {
    fn new(state: LoadState, previous_origin: Option<f64>, now: Instant) -> Self {
        Self {
            state,
            previous_origin,
            last_resources: None,
            quiet_since: now,
        }
    }

    /// Feed one document poll; true once the wait is over.
    fn observe(&mut self, doc: &DocumentProbe, now: Instant) -> bool {
        if self.previous_origin == Some(doc.origin) {
            return false;
        }
        match self.state {
            LoadState::DomContentLoaded => doc.ready != "loading",
            LoadState::Load => doc.ready == "complete",
            LoadState::NetworkIdle => {
                if self.last_resources != Some(doc.resources) {
                    self.last_resources = Some(doc.resources);
                    self.quiet_since = now;
                }
                doc.ready == "complete"
                    && now.duration_since(self.quiet_since) >= NETWORK_QUIET_PERIOD
            }
        }
    }

    /// A poll failed, typically while the old document is being torn down.
    fn interrupted(&mut self, now: Instant) {
        self.quiet_since = now;
    }
}

impl CdpSession {
    async fn configure(&self, options: &SessionOptions) -> E2eResult<()> {
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(options.viewport_width))
            .height(i64::from(options.viewport_height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(E2eError::Browser)?;
        self.page.execute(metrics).await?;

        if let Some(ref auth) = options.basic_auth {
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", auth.username, auth.password));
            self.page.execute(NetworkEnableParams::default()).await?;
            let headers = Headers::new(serde_json::json!({
                "Authorization": format!("Basic {}", token),
            }));
            self.page.execute(SetExtraHttpHeadersParams::new(headers)).await?;
        }

        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> E2eResult<T> {
        let result = self.page.evaluate(script).await?;
        Ok(result.into_value()?)
    }

    async fn probe(&self, locator: &Locator, scroll: bool) -> E2eResult<ElementProbe> {
        let script = format!(
            "(() => {{ {visible} const nodes = {nodes}; const el = nodes[0]; \
             if (!el) return {{ count: 0, visible: false, x: 0, y: 0 }}; \
             if ({scroll} && el.scrollIntoView) el.scrollIntoView({{ block: 'center', inline: 'center' }}); \
             const r = el.getBoundingClientRect(); \
             return {{ count: nodes.length, visible: isVisible(el), x: r.left + r.width / 2, y: r.top + r.height / 2 }}; }})()",
            visible = IS_VISIBLE_JS,
            nodes = nodes_js(locator)?,
            scroll = scroll,
        );
        self.eval(script).await
    }

    /// Wait for the first match to be visible, scroll it into view and return
    /// its centre point.
    async fn actionable_point(&self, locator: &Locator) -> E2eResult<Point> {
        self.wait_for(locator, WaitState::Visible, self.action_timeout)
            .await?;
        let probe = self.probe(locator, true).await?;
        if probe.count == 0 {
            return Err(E2eError::ElementNotFound(locator.to_string()));
        }
        Ok(Point {
            x: probe.x,
            y: probe.y,
        })
    }

    async fn document_state(&self) -> E2eResult<DocumentProbe> {
        self.eval(
            "({ origin: performance.timeOrigin, ready: document.readyState, \
               resources: performance.getEntriesByType('resource').length })"
                .to_string(),
        )
        .await
    }

    /// Poll until the current document reaches `state`. With
    /// `previous_origin` set, the document carrying that origin never counts.
    async fn wait_for_document(
        &self,
        state: LoadState,
        previous_origin: Option<f64>,
    ) -> E2eResult<()> {
        let start = Instant::now();
        let mut waiter = LoadWaiter::new(state, previous_origin, start);

        loop {
            match self.document_state().await {
                Ok(doc) => {
                    if waiter.observe(&doc, Instant::now()) {
                        return Ok(());
                    }
                }
                Err(e) => {
                    debug!("document state unavailable: {}", e);
                    waiter.interrupted(Instant::now());
                }
            }

            if start.elapsed() >= self.action_timeout {
                let what = if previous_origin.is_some() {
                    "navigation to"
                } else {
                    "load state"
                };
                return Err(E2eError::Timeout(format!(
                    "{} {} ({} ms)",
                    what,
                    state.as_str(),
                    self.action_timeout.as_millis()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn state_reached(probe: &ElementProbe, state: WaitState) -> bool {
        match state {
            WaitState::Visible => probe.count > 0 && probe.visible,
            WaitState::Hidden => probe.count == 0 || !probe.visible,
            WaitState::Attached => probe.count > 0,
            WaitState::Detached => probe.count == 0,
        }
    }
}

#[async_trait]
impl BrowserPage for CdpSession {
    async fn goto(&self, url: &str, wait_until: LoadState) -> E2eResult<()> {
        debug!("goto {} (until {})", url, wait_until.as_str());
        self.page
            .goto(url)
            .await
            .map_err(|e| E2eError::Navigation {
                url: url.to_string(),
                source: Box::new(E2eError::Cdp(e)),
            })?;
        self.wait_for_load_state(wait_until).await
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        Ok(self.probe(locator, false).await?.count)
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let probe = self.probe(locator, false).await?;
        Ok(probe.count > 0 && probe.visible)
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        debug!("click {}", locator);
        let point = self.actionable_point(locator).await?;
        self.page.click(point).await?;
        Ok(())
    }

    async fn click_and_wait(&self, locator: &Locator, state: LoadState) -> E2eResult<()> {
        let origin = self.document_state().await?.origin;
        self.click(locator).await?;
        self.wait_for_document(state, Some(origin)).await
    }

    async fn hover(&self, locator: &Locator) -> E2eResult<()> {
        debug!("hover {}", locator);
        let point = self.actionable_point(locator).await?;
        self.page.move_mouse(point).await?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        debug!("fill {}", locator);
        self.wait_for(locator, WaitState::Visible, self.action_timeout)
            .await?;
        let script = format!(
            "(() => {{ const el = {nodes}[0]; if (!el) return false; el.focus(); \
             el.value = {value}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
            nodes = nodes_js(locator)?,
            value = serde_json::to_string(value)?,
        );
        if self.eval::<bool>(script).await? {
            Ok(())
        } else {
            Err(E2eError::ElementNotFound(locator.to_string()))
        }
    }

    async fn select_option(&self, locator: &Locator, option: &str) -> E2eResult<()> {
        debug!("select {} in {}", option, locator);
        self.wait_for(locator, WaitState::Visible, self.action_timeout)
            .await?;
        let script = format!(
            "(() => {{ const el = {nodes}[0]; if (!el || !el.options) return false; \
             const wanted = {option}; \
             const match = Array.from(el.options).find(o => o.value === wanted \
                 || o.label.trim() === wanted || o.text.trim() === wanted); \
             if (!match) return false; \
             el.value = match.value; match.selected = true; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
            nodes = nodes_js(locator)?,
            option = serde_json::to_string(option)?,
        );
        if self.eval::<bool>(script).await? {
            Ok(())
        } else {
            Err(E2eError::ElementNotFound(format!(
                "option '{}' in {}",
                option, locator
            )))
        }
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()> {
        let start = Instant::now();
        loop {
            match self.probe(locator, false).await {
                Ok(probe) if Self::state_reached(&probe, state) => return Ok(()),
                Ok(_) => {}
                // The document may be swapped out mid-navigation
                Err(e) => debug!("probe of {} failed while waiting: {}", locator, e),
            }

            if start.elapsed() >= timeout {
                return Err(E2eError::Timeout(format!(
                    "{} to be {:?} ({} ms)",
                    locator,
                    state,
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_load_state(&self, state: LoadState) -> E2eResult<()> {
        self.wait_for_document(state, None).await
    }

    async fn visible_texts(&self, locator: &Locator) -> E2eResult<Vec<String>> {
        let script = format!(
            "(() => {{ {visible} return {nodes}.filter(isVisible).map(el => el.innerText); }})()",
            visible = IS_VISIBLE_JS,
            nodes = nodes_js(locator)?,
        );
        self.eval(script).await
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page.save_screenshot(params, path).await?;
        debug!("Screenshot written to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn close(&self) -> E2eResult<()> {
        if let Err(e) = self.page.clone().close().await {
            warn!("Closing page failed: {}", e);
        }
        let mut browser = self.browser.lock().await;
        browser
            .dispose_browser_context(self.context_id.clone())
            .await?;
        debug!("Disposed browser session {:?}", self.context_id);
        Ok(())
    }
}

/// JavaScript expression evaluating to the array of elements a locator matches.
fn nodes_js(locator: &Locator) -> E2eResult<String> {
    Ok(match locator {
        Locator::Css(selector) => format!(
            "Array.from(document.querySelectorAll({}))",
            serde_json::to_string(selector)?
        ),
        Locator::XPath(expression) => format!(
            "(() => {{ const r = document.evaluate({}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
             for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
             return out; }})()",
            serde_json::to_string(expression)?
        ),
    })
}
