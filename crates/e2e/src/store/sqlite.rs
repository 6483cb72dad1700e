//! SQLite-backed option store, used for local runs and the harness's own tests

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{check_table_name, OptionRow, OptionStore};
use crate::error::E2eResult;

#[derive(Debug, Clone)]
pub struct SqliteOptionStore {
    path: PathBuf,
    table: String,
}

impl SqliteOptionStore {
    /// Open or create the database at `path` and make sure `table` exists.
    pub fn open(path: impl AsRef<Path>, table: &str) -> E2eResult<Self> {
        check_table_name(table)?;
        let store = Self {
            path: path.as_ref().to_path_buf(),
            table: table.to_string(),
        };

        let conn = store.connect()?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                option_id INTEGER PRIMARY KEY AUTOINCREMENT,
                option_name TEXT NOT NULL UNIQUE,
                option_value TEXT NOT NULL,
                autoload TEXT NOT NULL DEFAULT 'yes'
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_autoload ON {table}(autoload);
            "#,
            table = store.table
        ))?;

        debug!("Opened option store at {:?}", store.path);
        Ok(store)
    }

    fn connect(&self) -> E2eResult<Connection> {
        Ok(Connection::open(&self.path)?)
    }
}

#[async_trait]
impl OptionStore for SqliteOptionStore {
    async fn delete_prefixed(&self, prefix: &str) -> E2eResult<u64> {
        let conn = self.connect()?;
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE substr(option_name, 1, ?1) = ?2",
                self.table
            ),
            params![prefix.chars().count() as i64, prefix],
        )?;
        Ok(deleted as u64)
    }

    async fn upsert_all(&self, rows: &[OptionRow]) -> E2eResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (option_name, option_value, autoload) VALUES (?1, ?2, ?3)
                 ON CONFLICT(option_name) DO UPDATE SET
                     option_value = excluded.option_value,
                     autoload = excluded.autoload",
                self.table
            ))?;
            for row in rows {
                stmt.execute(params![row.name, row.value, row.autoload])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn get(&self, name: &str) -> E2eResult<Option<String>> {
        let conn = self.connect()?;
        let value = conn
            .query_row(
                &format!(
                    "SELECT option_value FROM {} WHERE option_name = ?1",
                    self.table
                ),
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn list_prefixed(&self, prefix: &str) -> E2eResult<Vec<OptionRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT option_name, option_value, autoload FROM {}
             WHERE substr(option_name, 1, ?1) = ?2 ORDER BY option_name",
            self.table
        ))?;
        let rows = stmt
            .query_map(params![prefix.chars().count() as i64, prefix], |row| {
                Ok(OptionRow {
                    name: row.get(0)?,
                    value: row.get(1)?,
                    autoload: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;

    fn store() -> (tempfile::TempDir, SqliteOptionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteOptionStore::open(dir.path().join("wp.db"), "wp_options").unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let (_dir, store) = store();
        store
            .upsert_all(&[OptionRow::new("StaticPress::timeout", "20")])
            .await
            .unwrap();
        store
            .upsert_all(&[OptionRow::new("StaticPress::timeout", "10")])
            .await
            .unwrap();

        let rows = store.list_prefixed("StaticPress::").await.unwrap();
        assert_eq!(rows, vec![OptionRow::new("StaticPress::timeout", "10")]);
    }

    #[tokio::test]
    async fn test_delete_prefixed_leaves_other_options() {
        let (_dir, store) = store();
        store
            .upsert_all(&[
                OptionRow::new("StaticPress::static url", "http://example.org/sub/"),
                OptionRow::new("StaticPress::static dir", "/var/www/web/static/"),
                OptionRow::new("siteurl", "http://localhost"),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_prefixed("StaticPress::").await.unwrap(), 2);
        assert!(store.list_prefixed("StaticPress::").await.unwrap().is_empty());
        assert_eq!(
            store.get("siteurl").await.unwrap().as_deref(),
            Some("http://localhost")
        );
    }

    #[tokio::test]
    async fn test_prefix_is_literal() {
        // LIKE would treat `_` and `%` as wildcards.
        let (_dir, store) = store();
        store
            .upsert_all(&[OptionRow::new("StaticPressXtimeout", "1")])
            .await
            .unwrap();

        assert_eq!(store.delete_prefixed("StaticPress_").await.unwrap(), 0);
        assert_eq!(store.delete_prefixed("StaticPress%").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_upsert_writes_nothing() {
        let (_dir, store) = store();
        {
            let conn = store.connect().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON wp_options
                 WHEN NEW.option_name = 'StaticPress::bad'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();
        }

        let err = store
            .upsert_all(&[
                OptionRow::new("StaticPress::static url", "http://example.org/sub/"),
                OptionRow::new("StaticPress::bad", "x"),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, E2eError::Sqlite(_)));
        assert!(store.get("StaticPress::static url").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (_dir, store) = store();
        assert!(store.get("StaticPress::timeout").await.unwrap().is_none());
    }
}
