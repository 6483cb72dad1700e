//! Dashboard side menu, shared by every wp-admin screen

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{is_present, Screen};
use crate::browser::{xpath_literal, BrowserPage, LoadState, Locator, WaitState};
use crate::error::E2eResult;

pub struct AdminShell<'a> {
    page: &'a dyn BrowserPage,
    timeout: Duration,
}

impl<'a> AdminShell<'a> {
    pub fn new(page: &'a dyn BrowserPage, timeout: Duration) -> Self {
        Self { page, timeout }
    }

    /// Hover a top-level menu entry so its submenu flies out.
    pub async fn hover_menu(&self, label: &str) -> E2eResult<()> {
        self.page.hover(&menu_entry(label)).await
    }

    pub async fn click_menu(&self, label: &str) -> E2eResult<()> {
        debug!("menu: {}", label);
        self.page
            .click_and_wait(&menu_entry(label), LoadState::NetworkIdle)
            .await
    }

    pub async fn wait_for_submenu(&self, label: &str) -> E2eResult<()> {
        self.page
            .wait_for(&submenu_entry(label), WaitState::Visible, self.timeout)
            .await
    }

    pub async fn click_submenu(&self, label: &str) -> E2eResult<()> {
        debug!("submenu: {}", label);
        self.page
            .click_and_wait(&submenu_entry(label), LoadState::NetworkIdle)
            .await
    }

    /// Hover `menu`, wait for `submenu` to show and follow it.
    pub async fn open(&self, menu: &str, submenu: &str) -> E2eResult<()> {
        self.hover_menu(menu).await?;
        self.wait_for_submenu(submenu).await?;
        self.click_submenu(submenu).await
    }
}

#[async_trait]
impl Screen for AdminShell<'_> {
    fn name(&self) -> &'static str {
        "admin"
    }

    async fn is_displayed_now(&self) -> bool {
        is_present(self.page, &admin_menu()).await
    }
}

pub(crate) fn admin_menu() -> Locator {
    Locator::css("#adminmenu")
}

pub(crate) fn menu_entry(label: &str) -> Locator {
    Locator::xpath(format!(
        r#".//div[@class="wp-menu-name" and contains(text(), {})]"#,
        xpath_literal(label)
    ))
}

pub(crate) fn submenu_entry(label: &str) -> Locator {
    Locator::xpath(format!(".//a[text()={}]", xpath_literal(label)))
}
