//! Installer form ("Information needed")

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{is_present, Screen};
use crate::browser::{BrowserPage, LoadState, Locator};
use crate::error::{E2eError, E2eResult};

/// Values typed into the installer.
#[derive(Debug, Clone)]
pub struct InstallForm {
    pub site_title: String,
    pub username: String,
    pub password: String,
    pub email: String,
}

impl InstallForm {
    fn validate(&self) -> E2eResult<()> {
        let fields = [
            ("site title", &self.site_title),
            ("username", &self.username),
            ("password", &self.password),
            ("email", &self.email),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(E2eError::Config(format!(
                "install requires a {}",
                field
            ))),
            None => Ok(()),
        }
    }
}

pub struct Welcome<'a> {
    page: &'a dyn BrowserPage,
    screenshot: Option<PathBuf>,
}

impl<'a> Welcome<'a> {
    pub fn new(page: &'a dyn BrowserPage) -> Self {
        Self {
            page,
            screenshot: None,
        }
    }

    /// Capture the filled form to `path` right before submitting it.
    pub fn with_screenshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.screenshot = Some(path.into());
        self
    }

    /// Fill in and submit the installer.
    ///
    /// An empty field is rejected before anything is typed.
    pub async fn install(&self, form: &InstallForm) -> E2eResult<()> {
        form.validate()?;

        self.page.fill(&site_title_input(), &form.site_title).await?;
        self.page.fill(&username_input(), &form.username).await?;

        // #pass1 on current WordPress, #pass1-text on 4.3
        let password_input = if self.page.is_visible(&password_input()).await.unwrap_or(false) {
            password_input()
        } else {
            debug!("#pass1 not visible, using #pass1-text");
            legacy_password_input()
        };
        self.page.click(&password_input).await?;
        self.page.fill(&password_input, &form.password).await?;
        self.page.fill(&email_input(), &form.email).await?;

        if let Some(ref path) = self.screenshot {
            self.page.screenshot(path).await?;
        }

        self.page
            .click_and_wait(&install_button(), LoadState::NetworkIdle)
            .await
    }
}

#[async_trait]
impl Screen for Welcome<'_> {
    fn name(&self) -> &'static str {
        "welcome"
    }

    async fn is_displayed_now(&self) -> bool {
        is_present(self.page, &heading()).await
    }
}

/// `<h2>` on current WordPress, `<h1>` on 4.3.
pub(crate) fn heading() -> Locator {
    Locator::xpath(r#".//*[self::h1 or self::h2][text()="Information needed"]"#)
}

pub(crate) fn site_title_input() -> Locator {
    Locator::css(r#"input[id="weblog_title"]"#)
}

pub(crate) fn username_input() -> Locator {
    Locator::css(r#"input[id="user_login"]"#)
}

pub(crate) fn password_input() -> Locator {
    Locator::css("#pass1")
}

pub(crate) fn legacy_password_input() -> Locator {
    Locator::css("#pass1-text")
}

pub(crate) fn email_input() -> Locator {
    Locator::css(r#"input[id="admin_email"]"#)
}

pub(crate) fn install_button() -> Locator {
    Locator::css(r#"input[value="Install WordPress"]"#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeScreen, FakeSite};

    fn form() -> InstallForm {
        InstallForm {
            site_title: "test_title".into(),
            username: "test_user".into(),
            password: "-JfG+L.3-s!A6YmhsKGkGERc+hq&XswU".into(),
            email: "test@gmail.com".into(),
        }
    }

    fn installer(legacy: bool) -> FakeScreen {
        let screen = FakeScreen::new()
            .element(heading())
            .element(site_title_input())
            .element(username_input())
            .element(email_input())
            .navigates(install_button(), "success");
        if legacy {
            screen
                .hidden(password_input())
                .element(legacy_password_input())
        } else {
            screen.element(password_input())
        }
    }

    #[tokio::test]
    async fn test_install_fills_form_and_submits() {
        let site = FakeSite::new()
            .screen("welcome", installer(false))
            .start_at("welcome");
        let page = site.session();

        Welcome::new(&page)
            .with_screenshot("shots/screenshot.png")
            .install(&form())
            .await
            .unwrap();

        assert_eq!(site.value_of(&site_title_input()).as_deref(), Some("test_title"));
        assert_eq!(site.value_of(&username_input()).as_deref(), Some("test_user"));
        assert_eq!(
            site.value_of(&password_input()).as_deref(),
            Some("-JfG+L.3-s!A6YmhsKGkGERc+hq&XswU")
        );
        assert_eq!(site.value_of(&email_input()).as_deref(), Some("test@gmail.com"));
        assert_eq!(site.current_screen(), "success");

        let actions = site.actions();
        let shot = actions.iter().position(|a| a == "screenshot shots/screenshot.png");
        let submit = actions
            .iter()
            .position(|a| *a == format!("click {}", install_button()));
        assert!(shot.unwrap() < submit.unwrap());
    }

    #[tokio::test]
    async fn test_install_uses_legacy_password_field() {
        let site = FakeSite::new()
            .screen("welcome", installer(true))
            .start_at("welcome");
        let page = site.session();

        Welcome::new(&page).install(&form()).await.unwrap();

        assert!(site.value_of(&password_input()).is_none());
        assert!(site.value_of(&legacy_password_input()).is_some());
    }

    #[tokio::test]
    async fn test_missing_field_is_config_error() {
        let site = FakeSite::new()
            .screen("welcome", installer(false))
            .start_at("welcome");
        let page = site.session();
        let incomplete = InstallForm {
            email: String::new(),
            ..form()
        };

        let err = Welcome::new(&page).install(&incomplete).await.unwrap_err();

        assert!(matches!(err, E2eError::Config(ref m) if m.contains("email")));
        assert!(site.actions().is_empty());
    }

    #[tokio::test]
    async fn test_detection() {
        let site = FakeSite::new()
            .screen("welcome", installer(false))
            .screen("login", FakeScreen::new())
            .start_at("welcome");
        let page = site.session();
        assert!(Welcome::new(&page).is_displayed_now().await);

        let site = site.start_at("login");
        let page = site.session();
        assert!(!Welcome::new(&page).is_displayed_now().await);
    }
}
