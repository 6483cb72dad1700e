//! First-run language chooser (WordPress 5.4.2 and later)

use async_trait::async_trait;

use super::{is_present, Screen};
use crate::browser::{BrowserPage, LoadState, Locator};
use crate::error::E2eResult;

pub struct LanguageChooser<'a> {
    page: &'a dyn BrowserPage,
}

impl<'a> LanguageChooser<'a> {
    pub fn new(page: &'a dyn BrowserPage) -> Self {
        Self { page }
    }

    /// Pick `language` by its label and continue to the installer.
    pub async fn choose(&self, language: &str) -> E2eResult<()> {
        self.page.select_option(&language_select(), language).await?;
        self.page
            .click_and_wait(&continue_button(), LoadState::NetworkIdle)
            .await
    }
}

#[async_trait]
impl Screen for LanguageChooser<'_> {
    fn name(&self) -> &'static str {
        "language chooser"
    }

    async fn is_displayed_now(&self) -> bool {
        is_present(self.page, &heading()).await
    }
}

pub(crate) fn heading() -> Locator {
    Locator::xpath(r#".//label[text()="Select a default language"]"#)
}

pub(crate) fn language_select() -> Locator {
    Locator::css(r#"select[id="language"]"#)
}

pub(crate) fn continue_button() -> Locator {
    Locator::css(r#"input[value="Continue"]"#)
}
