//! StaticPress options screen

use async_trait::async_trait;

use super::{is_present, Screen};
use crate::browser::{BrowserPage, LoadState, Locator};
use crate::error::E2eResult;

/// Values entered on the options screen. Basic-auth fields left `None` are
/// not touched.
#[derive(Debug, Clone, Default)]
pub struct StaticPressSettings {
    pub static_url: String,
    pub dump_directory: String,
    pub basic_auth_user: Option<String>,
    pub basic_auth_password: Option<String>,
    pub request_timeout: String,
}

pub struct OptionsScreen<'a> {
    page: &'a dyn BrowserPage,
}

impl<'a> OptionsScreen<'a> {
    pub fn new(page: &'a dyn BrowserPage) -> Self {
        Self { page }
    }

    pub async fn set_options(&self, settings: &StaticPressSettings) -> E2eResult<()> {
        self.enter(&static_url_input(), &settings.static_url).await?;
        self.enter(&dump_directory_input(), &settings.dump_directory)
            .await?;
        if let Some(ref user) = settings.basic_auth_user {
            self.enter(&basic_auth_user_input(), user).await?;
        }
        if let Some(ref password) = settings.basic_auth_password {
            self.enter(&basic_auth_password_input(), password).await?;
        }
        self.enter(&timeout_input(), &settings.request_timeout)
            .await?;

        self.page
            .click_and_wait(&save_button(), LoadState::DomContentLoaded)
            .await
    }

    async fn enter(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.page.click(locator).await?;
        self.page.fill(locator, value).await
    }
}

#[async_trait]
impl Screen for OptionsScreen<'_> {
    fn name(&self) -> &'static str {
        "staticpress options"
    }

    async fn is_displayed_now(&self) -> bool {
        is_present(self.page, &Locator::css("input#static_url")).await
    }
}

pub(crate) fn static_url_input() -> Locator {
    Locator::css(r#"input[id="static_url"]"#)
}

pub(crate) fn dump_directory_input() -> Locator {
    Locator::css(r#"input[id="static_dir"]"#)
}

pub(crate) fn basic_auth_user_input() -> Locator {
    Locator::css(r#"input[id="basic_usr"]"#)
}

pub(crate) fn basic_auth_password_input() -> Locator {
    Locator::css(r#"input[id="basic_pwd"]"#)
}

pub(crate) fn timeout_input() -> Locator {
    Locator::css(r#"input[id="timeout"]"#)
}

pub(crate) fn save_button() -> Locator {
    Locator::css(r#"input[value="Save Changes"]"#)
}

/// Options form as a scripted screen; saving leads to `next`.
#[cfg(test)]
pub(crate) fn fake_screen(next: &str) -> crate::browser::fake::FakeScreen {
    crate::browser::fake::FakeScreen::new()
        .element(Locator::css("input#static_url"))
        .element(static_url_input())
        .element(dump_directory_input())
        .element(basic_auth_user_input())
        .element(basic_auth_password_input())
        .element(timeout_input())
        .navigates(save_button(), next)
}
