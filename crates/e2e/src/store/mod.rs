//! Access to the WordPress options table
//!
//! The harness only ever touches rows by option name, so the store interface
//! is a handful of name-addressed operations. Each call opens its own
//! connection and releases it before returning.

mod mysql;
mod sqlite;

pub use mysql::MySqlOptionStore;
pub use sqlite::SqliteOptionStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{E2eError, E2eResult};

/// One row of `<prefix>options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRow {
    pub name: String,
    pub value: String,
    pub autoload: String,
}

impl OptionRow {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            autoload: "yes".to_string(),
        }
    }
}

#[async_trait]
pub trait OptionStore: Send + Sync {
    /// Delete every row whose name starts with `prefix`; returns the number
    /// of rows removed.
    async fn delete_prefixed(&self, prefix: &str) -> E2eResult<u64>;

    /// Insert or overwrite all `rows` in one transaction. Either every row
    /// is written or none is.
    async fn upsert_all(&self, rows: &[OptionRow]) -> E2eResult<()>;

    /// Stored value of option `name`.
    async fn get(&self, name: &str) -> E2eResult<Option<String>>;

    /// Rows whose name starts with `prefix`, ordered by name.
    async fn list_prefixed(&self, prefix: &str) -> E2eResult<Vec<OptionRow>>;
}

/// Open the store behind `url` (`mysql://…` or `sqlite://<path>`).
pub async fn open_store(url: &str, table: &str) -> E2eResult<Box<dyn OptionStore>> {
    check_table_name(table)?;

    if url.starts_with("mysql://") || url.starts_with("mariadb://") {
        info!("Using MySQL option store, table {}", table);
        Ok(Box::new(MySqlOptionStore::new(url, table)))
    } else if let Some(path) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    {
        info!("Using SQLite option store at {}, table {}", path, table);
        Ok(Box::new(SqliteOptionStore::open(path, table)?))
    } else {
        Err(E2eError::Config(format!(
            "unsupported database URL scheme: {}",
            url.split("://").next().unwrap_or(url)
        )))
    }
}

/// Table names are spliced into SQL, so only plain identifiers are allowed.
pub(crate) fn check_table_name(table: &str) -> E2eResult<()> {
    if !table.is_empty() && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(E2eError::Config(format!("invalid table name: {:?}", table)))
    }
}
