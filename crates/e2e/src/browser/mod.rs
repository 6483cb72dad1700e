//! Narrow capability interface over the browser-automation engine
//!
//! Page objects and the bootstrapper only ever talk to [`BrowserPage`]. The
//! engine behind it (see [`cdp`]) owns navigation, element lookup and the
//! waiting primitives; this crate composes those calls and never implements
//! its own retry loop on top of them.

pub mod cdp;

#[cfg(test)]
pub(crate) mod fake;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::SessionOptions;
use crate::error::E2eResult;

/// How an element is located. Actions always target the first match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css={}", selector),
            Locator::XPath(expression) => write!(f, "xpath={}", expression),
        }
    }
}

/// Document readiness a navigation should settle to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    DomContentLoaded,
    #[default]
    Load,
    /// Load finished and no new network requests for a quiet period.
    NetworkIdle,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::DomContentLoaded => "domcontentloaded",
            LoadState::Load => "load",
            LoadState::NetworkIdle => "networkidle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

/// One page of an open browser session.
///
/// Every method blocks (from the caller's view) until the engine reports the
/// step as done, and surfaces the engine's own timeout as an error.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait until `wait_until` is reached.
    async fn goto(&self, url: &str, wait_until: LoadState) -> E2eResult<()>;

    /// Number of elements currently matching, without waiting.
    async fn count(&self, locator: &Locator) -> E2eResult<usize>;

    /// Whether the first match is rendered and visible right now.
    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    async fn click(&self, locator: &Locator) -> E2eResult<()>;

    /// Click something that starts a navigation and wait until the document
    /// it loads reaches `state`. Never settles on the document clicked from.
    async fn click_and_wait(&self, locator: &Locator, state: LoadState) -> E2eResult<()>;

    async fn hover(&self, locator: &Locator) -> E2eResult<()>;

    /// Replace the value of an input.
    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()>;

    /// Pick a `<select>` option by value or by visible label.
    async fn select_option(&self, locator: &Locator, option: &str) -> E2eResult<()>;

    async fn wait_for(&self, locator: &Locator, state: WaitState, timeout: Duration)
        -> E2eResult<()>;

    async fn wait_for_load_state(&self, state: LoadState) -> E2eResult<()>;

    /// Rendered text of every visible match.
    async fn visible_texts(&self, locator: &Locator) -> E2eResult<Vec<String>>;

    async fn screenshot(&self, path: &Path) -> E2eResult<()>;
}

/// An isolated browser context (own cookies, credentials and viewport) with a
/// single page.
#[async_trait]
pub trait BrowserSession: BrowserPage {
    /// Close the page and dispose of the context.
    async fn close(&self) -> E2eResult<()>;
}

/// A launched browser able to hand out isolated sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    type Session: BrowserSession;

    async fn open_session(&self, options: &SessionOptions) -> E2eResult<Self::Session>;
}

/// Quote arbitrary text as an XPath 1.0 string expression.
///
/// XPath literals cannot escape quotes, so the text is split on `'` and
/// rebuilt with `concat()`.
pub fn xpath_literal(text: &str) -> String {
    let split_quotes = text.replace('\'', "', \"'\", '");
    format!("concat('{}', '')", split_quotes)
}
