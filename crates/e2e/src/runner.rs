//! Suite runner: bootstrap once, then seed fixtures and run each scenario in
//! its own browser session

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::bootstrap::{BootstrapReport, SessionBootstrapper};
use crate::browser::{Browser, BrowserPage, BrowserSession};
use crate::config::RunConfig;
use crate::error::E2eResult;
use crate::fixtures::PerTestFixtureSetup;
use crate::store::OptionStore;

/// What a scenario body gets to work with.
pub struct ScenarioContext<'a> {
    pub page: &'a dyn BrowserPage,
    pub config: &'a RunConfig,
    pub store: &'a dyn OptionStore,
}

/// One test body. Runs against a freshly seeded store and a new session.
#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &ScenarioContext<'_>) -> E2eResult<()>;
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub bootstrap: BootstrapReport,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

pub struct SuiteRunner<'a, B: Browser> {
    browser: &'a B,
    config: &'a RunConfig,
    store: &'a dyn OptionStore,
    bootstrap: OnceCell<BootstrapReport>,
    scenarios: Vec<Box<dyn Scenario>>,
}

impl<'a, B: Browser> SuiteRunner<'a, B> {
    pub fn new(browser: &'a B, config: &'a RunConfig, store: &'a dyn OptionStore) -> Self {
        Self {
            browser,
            config,
            store,
            bootstrap: OnceCell::new(),
            scenarios: Vec::new(),
        }
    }

    pub fn register(&mut self, scenario: impl Scenario + 'static) -> &mut Self {
        self.scenarios.push(Box::new(scenario));
        self
    }

    /// Bootstrap the target unless that already happened in this run.
    pub async fn ensure_bootstrapped(&self) -> E2eResult<&BootstrapReport> {
        self.bootstrap
            .get_or_try_init(|| async {
                SessionBootstrapper::new(self.browser, self.config).run().await
            })
            .await
    }

    /// Run every registered scenario in order.
    ///
    /// A bootstrap failure is returned as an error; scenario failures are
    /// recorded in the result.
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let bootstrap = self.ensure_bootstrapped().await?.clone();

        info!("Running {} test(s)...", self.scenarios.len());

        let mut results = Vec::with_capacity(self.scenarios.len());
        for scenario in &self.scenarios {
            let result = self.run_scenario(scenario.as_ref()).await;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        Ok(TestSuiteResult {
            total: results.len(),
            passed,
            failed,
            duration_ms,
            bootstrap,
            results,
        })
    }

    /// Seed fixtures, open a session, run the body and close the session.
    pub async fn run_scenario(&self, scenario: &dyn Scenario) -> TestResult {
        let started_at = Utc::now();
        let start = Instant::now();
        debug!("Running test: {}", scenario.name());

        let outcome = self.execute(scenario).await;

        TestResult {
            name: scenario.name().to_string(),
            success: outcome.is_ok(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    async fn execute(&self, scenario: &dyn Scenario) -> E2eResult<()> {
        PerTestFixtureSetup::new(
            self.store,
            &self.config.option_namespace,
            &self.config.fixture_path,
        )
        .run()
        .await?;

        let session = self
            .browser
            .open_session(&self.config.session_options())
            .await
            .map_err(|e| e.described("Browser.open_session()"))?;

        let ctx = ScenarioContext {
            page: &session,
            config: self.config,
            store: self.store,
        };
        let outcome = scenario.run(&ctx).await;

        match (outcome, session.close().await) {
            (Ok(()), close) => close,
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!("Closing session for {} failed: {}", scenario.name(), close_err);
                Err(e)
            }
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
