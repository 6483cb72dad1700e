//! Workflow tests run by the suite

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use crate::browser::LoadState;
use crate::error::E2eResult;
use crate::pages::{AdminShell, Login, OptionsScreen, RebuildScreen, StaticPressSettings};
use crate::runner::{Scenario, ScenarioContext};
use crate::verify::assert_options;

pub const STATIC_URL: &str = "http://example.com/sub/";
pub const DUMP_DIRECTORY: &str = "/tmp/static/";
pub const REQUEST_TIMEOUT: &str = "10";

/// Options saved through the UI land in the database, and a rebuild dumps
/// the home page even with basic authentication enabled.
pub struct SetsOptionAndRebuilds {
    dumped_page: Regex,
}

impl SetsOptionAndRebuilds {
    pub fn new() -> E2eResult<Self> {
        Ok(Self {
            dumped_page: Regex::new(r".*/tmp/static/sub/index\.html")?,
        })
    }
}

#[async_trait]
impl Scenario for SetsOptionAndRebuilds {
    fn name(&self) -> &str {
        "sets option and rebuilds"
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> E2eResult<()> {
        let config = ctx.config;
        let page = ctx.page;
        let plugin = config.plugin_name.as_str();

        page.goto(&config.admin_url(), LoadState::NetworkIdle)
            .await
            .map_err(|e| e.described("page.goto()"))?;
        Login::new(page, config.action_timeout())
            .login(&config.app_username, &config.app_password)
            .await?;

        let admin = AdminShell::new(page, config.action_timeout());
        admin.open(plugin, &format!("{} Options", plugin)).await?;

        OptionsScreen::new(page)
            .set_options(&StaticPressSettings {
                static_url: STATIC_URL.to_string(),
                dump_directory: DUMP_DIRECTORY.to_string(),
                basic_auth_user: Some(config.basic_auth_username.clone()),
                basic_auth_password: Some(config.basic_auth_password.clone()),
                request_timeout: REQUEST_TIMEOUT.to_string(),
            })
            .await?;
        info!("Options saved");

        let ns = &config.option_namespace;
        let static_url = format!("{}static url", ns);
        let static_dir = format!("{}static dir", ns);
        let timeout = format!("{}timeout", ns);
        assert_options(
            ctx.store,
            &[
                (static_url.as_str(), STATIC_URL),
                (static_dir.as_str(), DUMP_DIRECTORY),
                (timeout.as_str(), REQUEST_TIMEOUT),
            ],
        )
        .await?;

        admin.open(plugin, plugin).await?;
        let rebuild = RebuildScreen::new(page, config.rebuild_timeout());
        rebuild.click_rebuild().await?;
        rebuild.assert_result_visible(&self.dumped_page).await
    }
}
