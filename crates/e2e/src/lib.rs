//! StaticPress2019 E2E harness
//!
//! Drives a WordPress site with the StaticPress2019 plugin through a real
//! Chromium over CDP:
//! - Bootstraps the target once per run (language, install or login)
//! - Resets and seeds the options table from a YAML fixture before each test
//! - Runs workflow scenarios through page objects and checks the database
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  SuiteRunner (once per run)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SessionBootstrapper                                        │
//! │    ├── Start ─► BasicAuthChallenge ─► LanguageCheck         │
//! │    ├── Installing  (Welcome, Login, AdminShell, PluginList) │
//! │    └── LoggingIn   (Login)                                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  per scenario                                               │
//! │    ├── PerTestFixtureSetup                                  │
//! │    │     ├── TableCleaner.clean()   ─┐                      │
//! │    │     └── FixtureLoader.load()   ─┴─► OptionStore        │
//! │    ├── Browser::open_session() -> isolated context          │
//! │    └── Scenario::run(page objects, verify::assert_option)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserPage (capability interface)                         │
//! │    └── CdpBrowser / CdpSession (chromiumoxide)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod bootstrap;
pub mod browser;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod pages;
pub mod runner;
pub mod scenarios;
pub mod store;
pub mod verify;

pub use bootstrap::{BootstrapReport, SessionBootstrapper, SetupState};
pub use browser::cdp::CdpBrowser;
pub use config::RunConfig;
pub use error::{E2eError, E2eResult};
pub use fixtures::{FixtureLoader, PerTestFixtureSetup, TableCleaner};
pub use runner::{Scenario, SuiteRunner, TestSuiteResult};
pub use store::{open_store, OptionStore};
