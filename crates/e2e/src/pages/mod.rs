//! Page objects for the WordPress screens the run passes through
//!
//! Each page object borrows the active [`BrowserPage`] and nothing else, so
//! any number of them can wrap the same page one after another. Action
//! methods assume their screen is showing; callers check
//! [`Screen::is_displayed_now`] first when that is not already known.

pub(crate) mod admin;
pub(crate) mod language_chooser;
pub(crate) mod login;
pub(crate) mod options;
pub(crate) mod plugins;
pub(crate) mod rebuild;
pub(crate) mod welcome;

pub use admin::AdminShell;
pub use language_chooser::LanguageChooser;
pub use login::Login;
pub use options::{OptionsScreen, StaticPressSettings};
pub use plugins::PluginList;
pub use rebuild::RebuildScreen;
pub use welcome::{InstallForm, Welcome};

use async_trait::async_trait;
use tracing::debug;

use crate::browser::{xpath_literal, BrowserPage, LoadState, Locator};
use crate::error::E2eResult;

/// Detection half of the page-object contract.
#[async_trait]
pub trait Screen: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this screen is showing right now.
    ///
    /// Looks for the screen's identifying element once, without waiting.
    /// Lookup failures count as "not displayed".
    async fn is_displayed_now(&self) -> bool;
}

/// One-shot existence check shared by the `is_displayed_now` implementations.
pub(crate) async fn is_present(page: &dyn BrowserPage, locator: &Locator) -> bool {
    match page.count(locator).await {
        Ok(count) => count > 0,
        Err(e) => {
            debug!("probe {} treated as absent: {}", locator, e);
            false
        }
    }
}

/// Click the first `<tag>` whose text contains `text`, then wait for the
/// resulting page to go network-idle.
pub async fn click_by_text(page: &dyn BrowserPage, tag: &str, text: &str) -> E2eResult<()> {
    page.click_and_wait(&text_link(tag, text), LoadState::NetworkIdle)
        .await
}

pub(crate) fn text_link(tag: &str, text: &str) -> Locator {
    Locator::xpath(format!(".//{}[contains(text(), {})]", tag, xpath_literal(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeScreen, FakeSite};

    #[test]
    fn test_text_link_escapes_text() {
        assert_eq!(
            text_link("a", "Log In").to_string(),
            "xpath=.//a[contains(text(), concat('Log In', ''))]"
        );
    }

    #[tokio::test]
    async fn test_click_by_text_follows_link() {
        let site = FakeSite::new()
            .screen(
                "installed",
                FakeScreen::new().navigates(text_link("a", "Log In"), "login"),
            )
            .start_at("installed");
        let page = site.session();

        click_by_text(&page, "a", "Log In").await.unwrap();

        assert_eq!(site.current_screen(), "login");
        assert_eq!(site.actions().last().unwrap(), "load networkidle");
    }

    #[tokio::test]
    async fn test_click_by_text_missing_link_propagates() {
        let site = FakeSite::new()
            .screen("blank", FakeScreen::new())
            .start_at("blank");
        let err = click_by_text(&site.session(), "a", "Log In")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Log In"));
    }
}
