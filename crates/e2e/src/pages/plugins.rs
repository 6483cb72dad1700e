//! Installed plugins list

use async_trait::async_trait;
use tracing::info;

use super::{is_present, Screen};
use crate::browser::{xpath_literal, BrowserPage, LoadState, Locator};
use crate::error::E2eResult;

pub struct PluginList<'a> {
    page: &'a dyn BrowserPage,
}

impl<'a> PluginList<'a> {
    pub fn new(page: &'a dyn BrowserPage) -> Self {
        Self { page }
    }

    /// Click the "Activate" link in the row of the plugin named `name`.
    pub async fn activate_plugin(&self, name: &str) -> E2eResult<()> {
        info!("Activating plugin {}", name);
        self.page
            .click_and_wait(&activate_link(name), LoadState::DomContentLoaded)
            .await
    }
}

#[async_trait]
impl Screen for PluginList<'_> {
    fn name(&self) -> &'static str {
        "plugins"
    }

    async fn is_displayed_now(&self) -> bool {
        is_present(self.page, &plugin_table()).await
    }
}

pub(crate) fn plugin_table() -> Locator {
    Locator::css("table.plugins")
}

pub(crate) fn activate_link(name: &str) -> Locator {
    Locator::xpath(format!(
        r#".//strong[text()={}]/following-sibling::div//a[text()="Activate"]"#,
        xpath_literal(name)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeScreen, FakeSite};

    #[tokio::test]
    async fn test_activate_plugin() {
        let site = FakeSite::new()
            .screen(
                "plugins",
                FakeScreen::new()
                    .element(plugin_table())
                    .navigates(activate_link("StaticPress2019"), "activated"),
            )
            .screen("activated", FakeScreen::new().element(plugin_table()))
            .start_at("plugins");
        let page = site.session();
        let plugins = PluginList::new(&page);

        assert!(plugins.is_displayed_now().await);
        plugins.activate_plugin("StaticPress2019").await.unwrap();

        assert_eq!(site.current_screen(), "activated");
        assert_eq!(site.actions().last().unwrap(), "load domcontentloaded");
    }

    #[tokio::test]
    async fn test_activate_unknown_plugin_fails() {
        let site = FakeSite::new()
            .screen(
                "plugins",
                FakeScreen::new().element(activate_link("StaticPress2019")),
            )
            .start_at("plugins");
        let page = site.session();

        assert!(PluginList::new(&page)
            .activate_plugin("Hello Dolly")
            .await
            .is_err());
    }
}
