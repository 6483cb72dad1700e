//! Run configuration
//!
//! Everything the bootstrap and fixture layers need is collected into one
//! [`RunConfig`], parsed once at process start from flags and environment
//! variables, then passed down by reference.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::{E2eError, E2eResult};

/// Password used for the administrator account created during install.
pub const DEFAULT_APP_PASSWORD: &str = "-JfG+L.3-s!A6YmhsKGkGERc+hq&XswU";

/// Fixture shipped with the crate, absolute so it resolves from any cwd.
pub const DEFAULT_FIXTURE_PATH: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/WpOptionsStaticPress2019.yml");

#[derive(Parser, Debug, Clone)]
#[command(name = "staticpress-e2e")]
#[command(about = "Browser E2E run for the StaticPress2019 plugin")]
pub struct RunConfig {
    /// Base URL of the WordPress site under test
    #[arg(long, env = "HOST", default_value = "http://localhost/")]
    pub host: String,

    /// Basic authentication user in front of the site
    #[arg(long, env = "BASIC_AUTH_USERNAME", default_value = "authuser")]
    pub basic_auth_username: String,

    /// Basic authentication password in front of the site
    #[arg(long, env = "BASIC_AUTH_PASSWORD", default_value = "authpassword")]
    pub basic_auth_password: String,

    /// Run Chromium without a window
    #[arg(long, env = "HEADLESS", default_value_t = true, action = clap::ArgAction::Set)]
    pub headless: bool,

    /// Explicit Chromium executable (auto-detected otherwise)
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    #[arg(long, env = "VIEWPORT_WIDTH", default_value = "1920")]
    pub viewport_width: u32,

    #[arg(long, env = "VIEWPORT_HEIGHT", default_value = "1080")]
    pub viewport_height: u32,

    /// WordPress site title used by the installer
    #[arg(long, env = "SITE_TITLE", default_value = "test_title")]
    pub site_title: String,

    /// Administrator account name
    #[arg(long, env = "APP_USERNAME", default_value = "test_user")]
    pub app_username: String,

    /// Administrator account password
    #[arg(long, env = "APP_PASSWORD", default_value = DEFAULT_APP_PASSWORD)]
    pub app_password: String,

    /// Administrator e-mail address
    #[arg(long, env = "APP_EMAIL", default_value = "test@gmail.com")]
    pub app_email: String,

    /// Language picked on the first-run language chooser
    #[arg(long, env = "WP_LANGUAGE", default_value = "English (United States)")]
    pub language: String,

    /// Plugin activated right after install
    #[arg(long, env = "PLUGIN_NAME", default_value = "StaticPress2019")]
    pub plugin_name: String,

    /// Per-action timeout for element waits, in milliseconds
    #[arg(long, env = "ACTION_TIMEOUT_MS", default_value = "30000")]
    pub action_timeout_ms: u64,

    /// Upper bound for a full rebuild to finish, in milliseconds
    #[arg(long, env = "REBUILD_TIMEOUT_MS", default_value = "180000")]
    pub rebuild_timeout_ms: u64,

    /// Full database URL (`mysql://...` or `sqlite://...`); overrides the parts below
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "DATABASE_HOST", default_value = "localhost")]
    pub database_host: String,

    #[arg(long, env = "DATABASE_PORT", default_value = "3306")]
    pub database_port: u16,

    #[arg(long, env = "DATABASE_USER", default_value = "exampleuser")]
    pub database_user: String,

    #[arg(long, env = "DATABASE_PASSWORD", default_value = "examplepass")]
    pub database_password: String,

    #[arg(long, env = "DATABASE_NAME", default_value = "exampledb")]
    pub database_name: String,

    /// WordPress table prefix
    #[arg(long, env = "TABLE_PREFIX", default_value = "wp_")]
    pub table_prefix: String,

    /// Option-name prefix owned by the fixtures
    #[arg(long, env = "OPTION_NAMESPACE", default_value = "StaticPress::")]
    pub option_namespace: String,

    /// Fixture file applied before every test
    #[arg(long, env = "FIXTURE_PATH", default_value = DEFAULT_FIXTURE_PATH)]
    pub fixture_path: PathBuf,

    /// Where bootstrap screenshots are written
    #[arg(long, env = "SCREENSHOT_DIR", default_value = "test-results/screenshots")]
    pub screenshot_dir: PathBuf,

    /// Output directory for results
    #[arg(long, env = "OUTPUT_DIR", default_value = "test-results")]
    pub output_dir: PathBuf,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost/".to_string(),
            basic_auth_username: "authuser".to_string(),
            basic_auth_password: "authpassword".to_string(),
            headless: true,
            chrome_path: None,
            viewport_width: 1920,
            viewport_height: 1080,
            site_title: "test_title".to_string(),
            app_username: "test_user".to_string(),
            app_password: DEFAULT_APP_PASSWORD.to_string(),
            app_email: "test@gmail.com".to_string(),
            language: "English (United States)".to_string(),
            plugin_name: "StaticPress2019".to_string(),
            action_timeout_ms: 30_000,
            rebuild_timeout_ms: 180_000,
            database_url: None,
            database_host: "localhost".to_string(),
            database_port: 3306,
            database_user: "exampleuser".to_string(),
            database_password: "examplepass".to_string(),
            database_name: "exampledb".to_string(),
            table_prefix: "wp_".to_string(),
            option_namespace: "StaticPress::".to_string(),
            fixture_path: PathBuf::from(DEFAULT_FIXTURE_PATH),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            output_dir: PathBuf::from("test-results"),
            log_level: "info".to_string(),
        }
    }
}

impl RunConfig {
    /// Reject configurations the bootstrap cannot work with.
    ///
    /// Missing install fields are configuration errors, never retried.
    pub fn validate(&self) -> E2eResult<()> {
        let required = [
            ("HOST", &self.host),
            ("SITE_TITLE", &self.site_title),
            ("APP_USERNAME", &self.app_username),
            ("APP_PASSWORD", &self.app_password),
            ("APP_EMAIL", &self.app_email),
            ("PLUGIN_NAME", &self.plugin_name),
            ("OPTION_NAMESPACE", &self.option_namespace),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(E2eError::Config(format!("{} must not be empty", name)));
            }
        }

        if !self
            .table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(E2eError::Config(format!(
                "TABLE_PREFIX contains unsupported characters: {}",
                self.table_prefix
            )));
        }

        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(E2eError::Config("viewport must be non-zero".to_string()));
        }

        Ok(())
    }

    /// Target URL for a path relative to the site root.
    pub fn url(&self, path: &str) -> String {
        if self.host.ends_with('/') {
            format!("{}{}", self.host, path.trim_start_matches('/'))
        } else {
            format!("{}/{}", self.host, path.trim_start_matches('/'))
        }
    }

    /// Admin entry point (`wp-admin/`).
    pub fn admin_url(&self) -> String {
        self.url("wp-admin/")
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn rebuild_timeout(&self) -> Duration {
        Duration::from_millis(self.rebuild_timeout_ms)
    }

    /// Connection string for the option store.
    pub fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.clone(),
            None => format!(
                "mysql://{}:{}@{}:{}/{}",
                urlencoding::encode(&self.database_user),
                urlencoding::encode(&self.database_password),
                self.database_host,
                self.database_port,
                self.database_name
            ),
        }
    }

    /// Options table name with the WordPress prefix applied.
    pub fn options_table(&self) -> String {
        format!("{}options", self.table_prefix)
    }

    /// Settings for an isolated browser session.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            basic_auth: Some(BasicAuth {
                username: self.basic_auth_username.clone(),
                password: self.basic_auth_password.clone(),
            }),
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            action_timeout: self.action_timeout(),
        }
    }

    pub fn credentials(&self) -> AppCredentials {
        AppCredentials {
            username: self.app_username.clone(),
            password: self.app_password.clone(),
            email: self.app_email.clone(),
        }
    }
}

/// Administrator account used for install and every login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCredentials {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Per-session browser settings
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub basic_auth: Option<BasicAuth>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub action_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            basic_auth: None,
            viewport_width: 1920,
            viewport_height: 1080,
            action_timeout: Duration::from_secs(30),
        }
    }
}
