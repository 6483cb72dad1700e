//! Scripted in-memory browser for unit tests
//!
//! A [`FakeSite`] is a set of named screens, each declaring which locators are
//! present, which of them are hidden, their texts, and which screen a click
//! leads to. Every interaction is recorded so tests can assert on the exact
//! sequence a page object or the bootstrapper performed.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Browser, BrowserPage, BrowserSession, LoadState, Locator, WaitState};
use crate::config::SessionOptions;
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeScreen {
    present: HashSet<Locator>,
    hidden: HashSet<Locator>,
    texts: HashMap<Locator, Vec<String>>,
    options: HashMap<Locator, Vec<String>>,
    transitions: HashMap<Locator, String>,
    failing_probes: HashMap<Locator, String>,
}

impl FakeScreen {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn element(mut self, locator: Locator) -> Self {
        self.present.insert(locator);
        self
    }

    /// Present in the DOM but not rendered.
    pub(crate) fn hidden(mut self, locator: Locator) -> Self {
        self.present.insert(locator.clone());
        self.hidden.insert(locator);
        self
    }

    pub(crate) fn text(mut self, locator: Locator, text: &str) -> Self {
        self.present.insert(locator.clone());
        self.texts.entry(locator).or_default().push(text.to_string());
        self
    }

    pub(crate) fn select(mut self, locator: Locator, options: &[&str]) -> Self {
        self.present.insert(locator.clone());
        self.options
            .insert(locator, options.iter().map(|o| o.to_string()).collect());
        self
    }

    /// Looking `locator` up fails with a browser error carrying `message`.
    pub(crate) fn failing_probe(mut self, locator: Locator, message: &str) -> Self {
        self.failing_probes.insert(locator, message.to_string());
        self
    }

    /// Clicking `locator` switches the page to screen `next`.
    pub(crate) fn navigates(mut self, locator: Locator, next: &str) -> Self {
        self.present.insert(locator.clone());
        self.transitions.insert(locator, next.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    screens: HashMap<String, FakeScreen>,
    routes: HashMap<String, String>,
    failing_routes: HashMap<String, String>,
    current: String,
    actions: Vec<String>,
    values: HashMap<Locator, String>,
    sessions_opened: usize,
    sessions_closed: usize,
    last_options: Option<SessionOptions>,
}

impl FakeState {
    fn screen(&self) -> FakeScreen {
        self.screens.get(&self.current).cloned().unwrap_or_default()
    }

    fn require(&self, locator: &Locator) -> E2eResult<FakeScreen> {
        let screen = self.screen();
        if screen.present.contains(locator) && !screen.hidden.contains(locator) {
            Ok(screen)
        } else {
            Err(E2eError::Timeout(format!("{} to be Visible", locator)))
        }
    }
}

/// Shared handle onto the scripted site; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeSite {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSite {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn screen(self, name: &str, screen: FakeScreen) -> Self {
        self.state.lock().screens.insert(name.to_string(), screen);
        self
    }

    /// Navigating to `url` shows screen `name`.
    pub(crate) fn route(self, url: &str, name: &str) -> Self {
        self.state
            .lock()
            .routes
            .insert(url.to_string(), name.to_string());
        self
    }

    /// Navigating to `url` fails with a browser error carrying `message`.
    pub(crate) fn failing_route(self, url: &str, message: &str) -> Self {
        self.state
            .lock()
            .failing_routes
            .insert(url.to_string(), message.to_string());
        self
    }

    pub(crate) fn start_at(self, name: &str) -> Self {
        self.state.lock().current = name.to_string();
        self
    }

    pub(crate) fn session(&self) -> FakeSession {
        FakeSession { site: self.clone() }
    }

    pub(crate) fn current_screen(&self) -> String {
        self.state.lock().current.clone()
    }

    pub(crate) fn actions(&self) -> Vec<String> {
        self.state.lock().actions.clone()
    }

    pub(crate) fn clicked(&self, locator: &Locator) -> bool {
        let wanted = format!("click {}", locator);
        self.state.lock().actions.iter().any(|a| *a == wanted)
    }

    pub(crate) fn value_of(&self, locator: &Locator) -> Option<String> {
        self.state.lock().values.get(locator).cloned()
    }

    pub(crate) fn sessions_opened(&self) -> usize {
        self.state.lock().sessions_opened
    }

    pub(crate) fn sessions_closed(&self) -> usize {
        self.state.lock().sessions_closed
    }

    pub(crate) fn last_session_options(&self) -> Option<SessionOptions> {
        self.state.lock().last_options.clone()
    }

    fn record(&self, action: String) {
        self.state.lock().actions.push(action);
    }
}

pub(crate) struct FakeSession {
    site: FakeSite,
}

#[async_trait]
impl BrowserPage for FakeSession {
    async fn goto(&self, url: &str, wait_until: LoadState) -> E2eResult<()> {
        self.site
            .record(format!("goto {} ({})", url, wait_until.as_str()));
        let mut state = self.site.state.lock();
        if let Some(message) = state.failing_routes.get(url) {
            return Err(E2eError::Navigation {
                url: url.to_string(),
                source: Box::new(E2eError::Browser(message.clone())),
            });
        }
        match state.routes.get(url).cloned() {
            Some(next) => {
                state.current = next;
                Ok(())
            }
            None => Err(E2eError::Navigation {
                url: url.to_string(),
                source: Box::new(E2eError::Browser("net::ERR_NAME_NOT_RESOLVED".into())),
            }),
        }
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let screen = self.site.state.lock().screen();
        if let Some(message) = screen.failing_probes.get(locator) {
            return Err(E2eError::Browser(message.clone()));
        }
        Ok(usize::from(screen.present.contains(locator)))
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let screen = self.site.state.lock().screen();
        Ok(screen.present.contains(locator) && !screen.hidden.contains(locator))
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        self.site.record(format!("click {}", locator));
        let mut state = self.site.state.lock();
        let screen = state.require(locator)?;
        if let Some(next) = screen.transitions.get(locator) {
            state.current = next.clone();
        }
        Ok(())
    }

    async fn click_and_wait(&self, locator: &Locator, state: LoadState) -> E2eResult<()> {
        let navigates = self
            .site
            .state
            .lock()
            .screen()
            .transitions
            .contains_key(locator);
        self.click(locator).await?;
        if !navigates {
            return Err(E2eError::Timeout(format!(
                "navigation after clicking {}",
                locator
            )));
        }
        self.wait_for_load_state(state).await
    }

    async fn hover(&self, locator: &Locator) -> E2eResult<()> {
        self.site.record(format!("hover {}", locator));
        self.site.state.lock().require(locator).map(|_| ())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.site.record(format!("fill {} = {}", locator, value));
        let mut state = self.site.state.lock();
        state.require(locator)?;
        state.values.insert(locator.clone(), value.to_string());
        Ok(())
    }

    async fn select_option(&self, locator: &Locator, option: &str) -> E2eResult<()> {
        self.site.record(format!("select {} = {}", locator, option));
        let mut state = self.site.state.lock();
        let screen = state.require(locator)?;
        let known = screen
            .options
            .get(locator)
            .map(|options| options.iter().any(|o| o == option))
            .unwrap_or(false);
        if !known {
            return Err(E2eError::ElementNotFound(format!(
                "option '{}' in {}",
                option, locator
            )));
        }
        state.values.insert(locator.clone(), option.to_string());
        Ok(())
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        state: WaitState,
        _timeout: Duration,
    ) -> E2eResult<()> {
        self.site.record(format!("wait {} {:?}", locator, state));
        let screen = self.site.state.lock().screen();
        let present = screen.present.contains(locator);
        let visible = present && !screen.hidden.contains(locator);
        let reached = match state {
            WaitState::Visible => visible,
            WaitState::Hidden => !visible,
            WaitState::Attached => present,
            WaitState::Detached => !present,
        };
        if reached {
            Ok(())
        } else {
            Err(E2eError::Timeout(format!("{} to be {:?}", locator, state)))
        }
    }

    async fn wait_for_load_state(&self, state: LoadState) -> E2eResult<()> {
        self.site.record(format!("load {}", state.as_str()));
        Ok(())
    }

    async fn visible_texts(&self, locator: &Locator) -> E2eResult<Vec<String>> {
        let screen = self.site.state.lock().screen();
        if screen.hidden.contains(locator) {
            return Ok(Vec::new());
        }
        Ok(screen.texts.get(locator).cloned().unwrap_or_default())
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        self.site.record(format!("screenshot {}", path.display()));
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn close(&self) -> E2eResult<()> {
        self.site.record("close".to_string());
        self.site.state.lock().sessions_closed += 1;
        Ok(())
    }
}

#[async_trait]
impl Browser for FakeSite {
    type Session = FakeSession;

    async fn open_session(&self, options: &SessionOptions) -> E2eResult<FakeSession> {
        {
            let mut state = self.state.lock();
            state.sessions_opened += 1;
            state.last_options = Some(options.clone());
        }
        self.record("open".to_string());
        Ok(self.session())
    }
}
