//! MySQL-backed option store: the target WordPress database

use async_trait::async_trait;
use sqlx::mysql::MySqlConnection;
use sqlx::{Connection, Row};
use tracing::{debug, warn};

use super::{OptionRow, OptionStore};
use crate::error::E2eResult;

#[derive(Debug, Clone)]
pub struct MySqlOptionStore {
    url: String,
    table: String,
}

impl MySqlOptionStore {
    /// Nothing is connected until the first operation.
    pub fn new(url: &str, table: &str) -> Self {
        Self {
            url: url.to_string(),
            table: table.to_string(),
        }
    }

    async fn connect(&self) -> E2eResult<MySqlConnection> {
        let conn = MySqlConnection::connect(&self.url).await?;
        debug!("Connected to option store, table {}", self.table);
        Ok(conn)
    }
}

async fn release(conn: MySqlConnection) {
    if let Err(e) = conn.close().await {
        warn!("Closing MySQL connection failed: {}", e);
    }
}

#[async_trait]
impl OptionStore for MySqlOptionStore {
    async fn delete_prefixed(&self, prefix: &str) -> E2eResult<u64> {
        let mut conn = self.connect().await?;
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE SUBSTRING(option_name, 1, ?) = ?",
            self.table
        ))
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .execute(&mut conn)
        .await;
        release(conn).await;
        Ok(result?.rows_affected())
    }

    async fn upsert_all(&self, rows: &[OptionRow]) -> E2eResult<()> {
        let sql = format!(
            "INSERT INTO {} (option_name, option_value, autoload) VALUES (?, ?, ?)
             ON DUPLICATE KEY UPDATE option_value = VALUES(option_value), autoload = VALUES(autoload)",
            self.table
        );

        let mut conn = self.connect().await?;
        let result = async {
            let mut tx = conn.begin().await?;
            for row in rows {
                sqlx::query(&sql)
                    .bind(&row.name)
                    .bind(&row.value)
                    .bind(&row.autoload)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await
        }
        .await;
        release(conn).await;
        Ok(result?)
    }

    async fn get(&self, name: &str) -> E2eResult<Option<String>> {
        let mut conn = self.connect().await?;
        let result = sqlx::query_scalar::<_, String>(&format!(
            "SELECT option_value FROM {} WHERE option_name = ?",
            self.table
        ))
        .bind(name)
        .fetch_optional(&mut conn)
        .await;
        release(conn).await;
        Ok(result?)
    }

    async fn list_prefixed(&self, prefix: &str) -> E2eResult<Vec<OptionRow>> {
        let mut conn = self.connect().await?;
        let result = sqlx::query(&format!(
            "SELECT option_name, option_value, autoload FROM {}
             WHERE SUBSTRING(option_name, 1, ?) = ? ORDER BY option_name",
            self.table
        ))
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(&mut conn)
        .await;
        release(conn).await;

        let rows = result?;
        rows.iter()
            .map(|row| -> E2eResult<OptionRow> {
                Ok(OptionRow {
                    name: row.try_get("option_name")?,
                    value: row.try_get("option_value")?,
                    autoload: row.try_get("autoload")?,
                })
            })
            .collect()
    }
}
