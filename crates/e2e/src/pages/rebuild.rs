//! StaticPress rebuild screen

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use super::{is_present, Screen};
use crate::browser::{BrowserPage, Locator, WaitState};
use crate::error::{E2eError, E2eResult};

pub struct RebuildScreen<'a> {
    page: &'a dyn BrowserPage,
    timeout: Duration,
}

impl<'a> RebuildScreen<'a> {
    /// `timeout` bounds the whole rebuild, not a single step.
    pub fn new(page: &'a dyn BrowserPage, timeout: Duration) -> Self {
        Self { page, timeout }
    }

    /// Start a rebuild and wait until the progress log reports "End".
    pub async fn click_rebuild(&self) -> E2eResult<()> {
        info!("Starting rebuild");
        self.page.click(&rebuild_button()).await?;
        self.page
            .wait_for(&end_marker(), WaitState::Visible, self.timeout)
            .await?;
        info!("Rebuild finished");
        Ok(())
    }

    /// Fail unless some visible result line matches `pattern`.
    pub async fn assert_result_visible(&self, pattern: &Regex) -> E2eResult<()> {
        let lines = self.page.visible_texts(&result_line()).await?;
        debug!("{} result lines", lines.len());
        if lines.iter().any(|line| pattern.is_match(line)) {
            Ok(())
        } else {
            Err(E2eError::AssertionFailed(format!(
                "no rebuild result matching /{}/ among {} lines",
                pattern.as_str(),
                lines.len()
            )))
        }
    }
}

#[async_trait]
impl Screen for RebuildScreen<'_> {
    fn name(&self) -> &'static str {
        "staticpress rebuild"
    }

    async fn is_displayed_now(&self) -> bool {
        is_present(self.page, &rebuild_button()).await
    }
}

pub(crate) fn rebuild_button() -> Locator {
    Locator::css(r#"input[value="Rebuild"]"#)
}

pub(crate) fn end_marker() -> Locator {
    Locator::xpath(r#".//p[@id="message"]/strong[text()="End"]"#)
}

/// One entry of the rebuild log; the admin menu's own `li`s never match.
pub(crate) fn result_line() -> Locator {
    Locator::css("ul.result-list > li")
}

/// Rebuild screen whose button leads to a finished log listing `files`.
#[cfg(test)]
pub(crate) fn fake_screens(
    site: crate::browser::fake::FakeSite,
    files: &[&str],
) -> crate::browser::fake::FakeSite {
    use crate::browser::fake::FakeScreen;

    let mut done = FakeScreen::new().element(end_marker());
    for file in files {
        done = done.text(result_line(), file);
    }
    site.screen(
        "rebuild",
        FakeScreen::new().navigates(rebuild_button(), "rebuilt"),
    )
    .screen("rebuilt", done)
}
