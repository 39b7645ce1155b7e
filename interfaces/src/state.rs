use crate::defs::{FragmentStream, LedgerStore, RawFragment, StoreError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

/// Rows fetched per query while a ledger is read.
const READ_BATCH: i64 = 64;

/// Ledger store backed by a SQLite database.
///
/// One database can hold the ledgers of several sources; each ledger is keyed
/// by the origin URL of the source that wrote it.
pub struct SqliteLedgerStore {
    pool: SqlitePool,
    origin: String,
}

impl SqliteLedgerStore {
    /// Connect to `database_url` (e.g. `sqlite://cache.db?mode=rwc` or
    /// `sqlite::memory:`) and make sure the ledger table exists.
    pub async fn connect(database_url: &str, origin: &str) -> Result<Self, StoreError> {
        // A single connection keeps in-memory databases alive between calls
        // and matches the single-writer use of a ledger.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await?;

        let store = Self {
            pool,
            origin: origin.to_string(),
        };
        store.setup_schema().await?;
        Ok(store)
    }

    async fn setup_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_ledger (
                origin TEXT NOT NULL,
                seq INTEGER NOT NULL,
                fragment TEXT NOT NULL,
                PRIMARY KEY (origin, seq)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

}

/// Fragments of `origin` from `seq` on, plus the seq the following batch
/// starts at (`None` once the ledger is exhausted).
async fn read_batch(
    pool: &SqlitePool,
    origin: &str,
    seq: i64,
) -> Result<(Vec<Result<RawFragment, StoreError>>, Option<i64>), StoreError> {
    let rows = sqlx::query("SELECT seq, fragment FROM cache_ledger WHERE origin = ? AND seq >= ? ORDER BY seq LIMIT ?")
        .bind(origin)
        .bind(seq)
        .bind(READ_BATCH)
        .fetch_all(pool)
        .await?;

    let next = match rows.last() {
        Some(last) if rows.len() as i64 == READ_BATCH => Some(last.get::<i64, _>("seq") + 1),
        _ => None,
    };
    let fragments = rows
        .iter()
        .map(|row| RawFragment::decode(row.get::<&str, _>("fragment")))
        .collect();
    Ok((fragments, next))
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn append(&self, fragments: &[RawFragment]) -> Result<(), StoreError> {
        if fragments.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT COALESCE(MAX(seq) + 1, 0) AS next_seq FROM cache_ledger WHERE origin = ?")
            .bind(&self.origin)
            .fetch_one(&mut *tx)
            .await?;
        let mut seq: i64 = row.get("next_seq");

        for fragment in fragments {
            sqlx::query("INSERT INTO cache_ledger (origin, seq, fragment) VALUES (?, ?, ?)")
                .bind(&self.origin)
                .bind(seq)
                .bind(fragment.encode()?)
                .execute(&mut *tx)
                .await?;
            seq += 1;
        }

        tx.commit().await?;
        debug!("Appended {} fragments to ledger of {}", fragments.len(), self.origin);
        Ok(())
    }

    async fn read_sequence(&self) -> Result<FragmentStream, StoreError> {
        let pool = self.pool.clone();
        let origin = self.origin.clone();

        let batches = stream::try_unfold(Some(0), move |seq| {
            let pool = pool.clone();
            let origin = origin.clone();
            async move {
                match seq {
                    None => Ok(None),
                    Some(seq) => read_batch(&pool, &origin, seq)
                        .await
                        .map(|(fragments, next)| Some((stream::iter(fragments), next))),
                }
            }
        });
        Ok(batches.try_flatten().boxed())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cache_ledger WHERE origin = ?")
            .bind(&self.origin)
            .execute(&self.pool)
            .await?;
        debug!("Cleared ledger of {}", self.origin);
        Ok(())
    }
}
