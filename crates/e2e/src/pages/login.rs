//! wp-login.php

use std::time::Duration;

use async_trait::async_trait;

use super::{is_present, Screen};
use crate::browser::{BrowserPage, LoadState, Locator, WaitState};
use crate::error::E2eResult;

pub struct Login<'a> {
    page: &'a dyn BrowserPage,
    timeout: Duration,
}

impl<'a> Login<'a> {
    pub fn new(page: &'a dyn BrowserPage, timeout: Duration) -> Self {
        Self { page, timeout }
    }

    pub async fn login(&self, username: &str, password: &str) -> E2eResult<()> {
        self.page
            .wait_for(&username_input(), WaitState::Visible, self.timeout)
            .await?;
        self.page.fill(&username_input(), username).await?;

        self.page
            .wait_for(&password_input(), WaitState::Visible, self.timeout)
            .await?;
        self.page.fill(&password_input(), password).await?;

        self.page
            .click_and_wait(&submit_button(), LoadState::NetworkIdle)
            .await
    }
}

#[async_trait]
impl Screen for Login<'_> {
    fn name(&self) -> &'static str {
        "login"
    }

    async fn is_displayed_now(&self) -> bool {
        is_present(self.page, &submit_button()).await
    }
}

pub(crate) fn username_input() -> Locator {
    Locator::css("input#user_login")
}

pub(crate) fn password_input() -> Locator {
    Locator::css("input#user_pass")
}

pub(crate) fn submit_button() -> Locator {
    Locator::css(r#"input[type="submit"][name="wp-submit"]"#)
}

/// Login form as a scripted screen, shared by the bootstrap and runner tests.
#[cfg(test)]
pub(crate) fn fake_screen(next: &str) -> crate::browser::fake::FakeScreen {
    crate::browser::fake::FakeScreen::new()
        .element(username_input())
        .element(password_input())
        .navigates(submit_button(), next)
}
