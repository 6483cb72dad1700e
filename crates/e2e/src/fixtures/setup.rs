//! Resetting and seeding the options table before each test

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use super::FixtureSet;
use crate::error::E2eResult;
use crate::store::OptionStore;

/// Removes every option in the managed namespace.
pub struct TableCleaner<'a> {
    store: &'a dyn OptionStore,
    namespace: &'a str,
}

impl<'a> TableCleaner<'a> {
    pub fn new(store: &'a dyn OptionStore, namespace: &'a str) -> Self {
        Self { store, namespace }
    }

    /// Returns the number of rows removed; an already clean table is fine.
    pub async fn clean(&self) -> E2eResult<u64> {
        let removed = self.store.delete_prefixed(self.namespace).await?;
        debug!("Removed {} option(s) under {}", removed, self.namespace);
        Ok(removed)
    }
}

/// Applies a fixture file to the options table.
pub struct FixtureLoader<'a> {
    store: &'a dyn OptionStore,
    namespace: &'a str,
}

impl<'a> FixtureLoader<'a> {
    pub fn new(store: &'a dyn OptionStore, namespace: &'a str) -> Self {
        Self { store, namespace }
    }

    /// Parse the whole file first, then upsert every record in one
    /// transaction. A malformed file writes nothing.
    pub async fn load(&self, path: impl AsRef<Path>) -> E2eResult<usize> {
        let set = FixtureSet::read(path, self.namespace)?;
        let rows = set.rows();
        self.store.upsert_all(&rows).await?;
        debug!("Loaded {} option(s) from {}", rows.len(), set.path.display());
        Ok(rows.len())
    }
}

/// Clean, then load the fixed fixture file. Runs before every test.
pub struct PerTestFixtureSetup<'a> {
    store: &'a dyn OptionStore,
    namespace: &'a str,
    fixture_path: PathBuf,
}

impl<'a> PerTestFixtureSetup<'a> {
    pub fn new(store: &'a dyn OptionStore, namespace: &'a str, fixture_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            namespace,
            fixture_path: fixture_path.into(),
        }
    }

    pub async fn run(&self) -> E2eResult<()> {
        info!("Start fixture setup");

        TableCleaner::new(self.store, self.namespace)
            .clean()
            .await
            .map_err(|e| {
                let e = e.described("TableCleaner.clean()");
                error!("{}", e);
                e
            })?;

        FixtureLoader::new(self.store, self.namespace)
            .load(&self.fixture_path)
            .await
            .map_err(|e| {
                let e = e.described("FixtureLoader.load()");
                error!("{}", e);
                e
            })?;

        info!("Finish fixture setup");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;
    use crate::store::{OptionRow, SqliteOptionStore};
    use async_trait::async_trait;

    const NS: &str = "StaticPress::";

    fn silent() -> E2eError {
        E2eError::Io(std::io::Error::new(std::io::ErrorKind::Other, ""))
    }

    /// Store whose every operation fails with an empty message.
    struct SilentFailure;

    #[async_trait]
    impl OptionStore for SilentFailure {
        async fn delete_prefixed(&self, _prefix: &str) -> E2eResult<u64> {
            Err(silent())
        }
        async fn upsert_all(&self, _rows: &[OptionRow]) -> E2eResult<()> {
            Err(silent())
        }
        async fn get(&self, _name: &str) -> E2eResult<Option<String>> {
            Err(silent())
        }
        async fn list_prefixed(&self, _prefix: &str) -> E2eResult<Vec<OptionRow>> {
            Err(silent())
        }
    }

    fn sqlite(dir: &tempfile::TempDir) -> SqliteOptionStore {
        SqliteOptionStore::open(dir.path().join("wp.db"), "wp_options").unwrap()
    }

    fn write_fixture(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("fixture.yml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn test_clean_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite(&dir);
        assert_eq!(TableCleaner::new(&store, NS).clean().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_setup_replaces_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite(&dir);
        store
            .upsert_all(&[
                OptionRow::new("StaticPress::static url", "http://example.com/sub/"),
                OptionRow::new("StaticPress::leftover", "x"),
            ])
            .await
            .unwrap();
        let path = write_fixture(
            &dir,
            "entity: WpOption\nitems:\n  url:\n    optionName: \"StaticPress::static url\"\n    optionValue: \"http://example.org/sub/\"\n",
        );

        PerTestFixtureSetup::new(&store, NS, &path).run().await.unwrap();

        assert_eq!(
            store.list_prefixed(NS).await.unwrap(),
            vec![OptionRow::new("StaticPress::static url", "http://example.org/sub/")]
        );
    }

    #[tokio::test]
    async fn test_blank_storage_error_is_described() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "entity: WpOption\n");

        let err = PerTestFixtureSetup::new(&SilentFailure, NS, &path)
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "TableCleaner.clean() failed with empty error");
    }

    #[tokio::test]
    async fn test_malformed_fixture_leaves_store_clean() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite(&dir);
        let path = write_fixture(&dir, "entity: WpOption\nitems: [not, a, map]\n");

        let err = PerTestFixtureSetup::new(&store, NS, &path)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, E2eError::FixtureParse { .. }));
        assert!(store.list_prefixed(NS).await.unwrap().is_empty());
    }
}
