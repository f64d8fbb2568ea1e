//! Structured tier: a transactional SQLite store.

use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::instrument;

use super::Tier;
use crate::error::{ErrorKind, Result};
use crate::{Asset, Capability};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// One lookup per stylesheet, all fired at once. Articles rarely link more
// than a handful of stylesheets, so... 4 should do.
const MAX_CONNECTIONS: u32 = 4;

/// SQLite-backed asset store.
#[derive(Debug, Clone)]
pub struct SqliteTier {
    pool: SqlitePool,
}

impl SqliteTier {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Query-based PRAGMAs have to be applied to every connection the
            // pool opens, not only the first.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let tier = Self { pool };
        tier.migrate().await?;
        Ok(tier)
    }

    /// Open (or create) the asset database at `path` and run migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = Self::base_options().filename(path.as_ref()).create_if_missing(true);
        Self::new(options, None).await
    }

    /// Connect to an in-memory database.
    ///
    /// Not gated behind `#[cfg(test)]`; other crates use it in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Every connection to ":memory:" is its own database.
        Self::new(options, Some(1)).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_millis(1500))
            // Cached assets churn; reuse freed pages rather than shrinking.
            .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::None)
    }

    /// PRAGMAs that aren't exposed via `SqliteConnectOptions`.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA wal_autocheckpoint = 800;
                PRAGMA cache_size = -8192;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("performing cache database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[async_trait]
impl Tier for SqliteTier {
    fn capability(&self) -> Capability {
        Capability::Structured
    }

    async fn get(&self, key: &str) -> Result<Option<Asset>> {
        let row: Option<(i64, Vec<u8>)> = sqlx::query_as("SELECT kind, content FROM assets WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|(kind, content)| Asset::from_parts(kind, content)).transpose()
    }

    async fn put(&self, key: &str, asset: &Asset) -> Result<()> {
        let stored_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .or_raise(|| ErrorKind::InvalidData("unformattable timestamp"))?;
        sqlx::query(
            "INSERT INTO assets (key, kind, content, stored_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (key) DO UPDATE SET kind = excluded.kind, content = excluded.content, stored_at = excluded.stored_at",
        )
        .bind(key)
        .bind(asset.kind())
        .bind(asset.as_bytes())
        .bind(stored_at)
        .execute(&self.pool)
        .await
        .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM assets WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let result = sqlx::query("DELETE FROM assets").execute(&mut *tx).await.or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64> {
        // Probing relies on this being a real read transaction.
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM assets").fetch_one(&mut *tx).await.or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(count.max(0) as u64)
    }
}
