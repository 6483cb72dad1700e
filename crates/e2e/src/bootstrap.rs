//! Once-per-run session bootstrap
//!
//! Brings the target from an unknown setup state to a logged-in, plugin-ready
//! installation using a dedicated browser session:
//!
//! ```text
//! Start ─► BasicAuthChallenge ─► LanguageCheck ─┬─► Installing ─┬─► Operational
//!                                               └─► LoggingIn ──┘
//! ```
//!
//! The session is closed whichever way the run ends, so none of its cookies
//! reach the per-test sessions.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::browser::{Browser, BrowserPage, BrowserSession, LoadState};
use crate::config::RunConfig;
use crate::error::{E2eError, E2eResult};
use crate::pages::{
    click_by_text, AdminShell, InstallForm, LanguageChooser, Login, PluginList, Screen, Welcome,
};

/// Setup state inferred from what the target shows. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupState {
    LanguageSelectionPending,
    InstallPending,
    Operational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapPhase {
    Start,
    BasicAuthChallenge,
    LanguageCheck,
    Installing,
    LoggingIn,
    Operational,
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapPhase::Start => "start",
            BootstrapPhase::BasicAuthChallenge => "basic auth challenge",
            BootstrapPhase::LanguageCheck => "language check",
            BootstrapPhase::Installing => "installing",
            BootstrapPhase::LoggingIn => "logging in",
            BootstrapPhase::Operational => "operational",
        };
        f.write_str(name)
    }
}

/// What a successful bootstrap went through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapReport {
    pub initial_state: SetupState,
    pub language_chosen: bool,
    /// `Installing` or `LoggingIn`, never both.
    pub branch: BootstrapPhase,
    pub phases: Vec<BootstrapPhase>,
}

/// Probe the screens in priority order and return the first state whose
/// screen is showing. Nothing matching means the target is already set up.
pub async fn detect_setup_state(page: &dyn BrowserPage) -> SetupState {
    let probes: [(SetupState, Box<dyn Screen + '_>); 2] = [
        (
            SetupState::LanguageSelectionPending,
            Box::new(LanguageChooser::new(page)),
        ),
        (SetupState::InstallPending, Box::new(Welcome::new(page))),
    ];

    for (state, screen) in probes.iter() {
        if screen.is_displayed_now().await {
            debug!("{} screen is showing", screen.name());
            return *state;
        }
    }
    SetupState::Operational
}

pub struct SessionBootstrapper<'a, B: Browser> {
    browser: &'a B,
    config: &'a RunConfig,
}

impl<'a, B: Browser> SessionBootstrapper<'a, B> {
    pub fn new(browser: &'a B, config: &'a RunConfig) -> Self {
        Self { browser, config }
    }

    /// Run the state machine in a fresh session and close it afterwards.
    ///
    /// Any failure aborts the bootstrap. When both driving and closing fail,
    /// the driving error is returned and the close error is logged.
    pub async fn run(&self) -> E2eResult<BootstrapReport> {
        self.config.validate()?;

        let session = self
            .browser
            .open_session(&self.config.session_options())
            .await
            .map_err(abort(BootstrapPhase::Start, "Browser.open_session()"))?;

        let result = self.drive(&session).await;

        match (result, session.close().await) {
            (Ok(report), Ok(())) => {
                info!("Bootstrap finished via {}", report.branch);
                Ok(report)
            }
            (Ok(_), Err(e)) => Err(abort(BootstrapPhase::Operational, "BrowserSession.close()")(e)),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!("Closing bootstrap session failed: {}", close_err);
                Err(e)
            }
        }
    }

    async fn drive(&self, page: &dyn BrowserPage) -> E2eResult<BootstrapReport> {
        let config = self.config;
        let mut phases = vec![BootstrapPhase::Start];

        phases.push(BootstrapPhase::BasicAuthChallenge);
        info!("Start basic authentication");
        page.goto(&config.url(""), LoadState::Load)
            .await
            .map_err(abort(BootstrapPhase::BasicAuthChallenge, "page.goto()"))?;
        page.screenshot(&config.screenshot_dir.join("screenshot1.png"))
            .await
            .map_err(abort(BootstrapPhase::BasicAuthChallenge, "page.screenshot()"))?;
        info!("Finish basic authentication");

        phases.push(BootstrapPhase::LanguageCheck);
        let initial_state = detect_setup_state(page).await;
        debug!("Initial setup state: {:?}", initial_state);

        let language_chosen = initial_state == SetupState::LanguageSelectionPending;
        if language_chosen {
            info!("Start choosing language");
            LanguageChooser::new(page)
                .choose(&config.language)
                .await
                .map_err(abort(BootstrapPhase::LanguageCheck, "LanguageChooser.choose()"))?;
            info!("Finish choosing language");
        }

        let branch = if Welcome::new(page).is_displayed_now().await {
            phases.push(BootstrapPhase::Installing);
            self.install(page)
                .await
                .map_err(abort(BootstrapPhase::Installing, "install"))?;
            BootstrapPhase::Installing
        } else {
            phases.push(BootstrapPhase::LoggingIn);
            self.login(page)
                .await
                .map_err(abort(BootstrapPhase::LoggingIn, "login"))?;
            BootstrapPhase::LoggingIn
        };

        phases.push(BootstrapPhase::Operational);
        Ok(BootstrapReport {
            initial_state,
            language_chosen,
            branch,
            phases,
        })
    }

    async fn install(&self, page: &dyn BrowserPage) -> E2eResult<()> {
        let config = self.config;
        let credentials = config.credentials();
        let form = InstallForm {
            site_title: config.site_title.clone(),
            username: credentials.username,
            password: credentials.password,
            email: credentials.email,
        };

        info!("Start install");
        Welcome::new(page)
            .with_screenshot(config.screenshot_dir.join("screenshot.png"))
            .install(&form)
            .await?;
        info!("Finish install");

        click_by_text(page, "a", "Log In").await?;
        self.login(page).await?;

        info!("Start activating plugin");
        AdminShell::new(page, config.action_timeout())
            .click_menu("Plugins")
            .await?;
        PluginList::new(page)
            .activate_plugin(&config.plugin_name)
            .await?;
        info!("Finish activating plugin");
        Ok(())
    }

    async fn login(&self, page: &dyn BrowserPage) -> E2eResult<()> {
        let config = self.config;
        let credentials = config.credentials();

        info!("Start login");
        page.goto(&config.admin_url(), LoadState::NetworkIdle)
            .await
            .map_err(|e| e.described("page.goto()"))?;
        Login::new(page, config.action_timeout())
            .login(&credentials.username, &credentials.password)
            .await?;
        info!("Finish login");
        Ok(())
    }
}

/// Log a bootstrap failure and wrap it with the phase it happened in.
fn abort(phase: BootstrapPhase, operation: &str) -> impl FnOnce(E2eError) -> E2eError + '_ {
    move |e| {
        let e = e.described(operation);
        error!("Bootstrap failed during {}: {}", phase, e);
        E2eError::BootstrapAborted {
            phase: phase.to_string(),
            source: Box::new(e),
        }
    }
}
