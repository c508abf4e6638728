// Copyright 2025-2026 CEMAXECUTER LLC

//! SQLite sink for power readings.
//!
//! The store owns a single-threaded tokio runtime and drives `sqlx` on it, so
//! callers see a plain blocking API.

use std::io;
use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tokio::runtime::Runtime;

use crate::PowerReading;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS Data(\
    Id INTEGER PRIMARY KEY AUTOINCREMENT, \
    Time TEXT, \
    Frequency INT, \
    Bandwidth INT, \
    Power REAL)";

const INSERT_READING: &str = "INSERT INTO Data(Time, Frequency, Bandwidth, Power) \
    VALUES(?, ?, ?, ?)";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create tokio runtime")]
    Runtime(#[source] io::Error),

    #[error("database {path}")]
    Sql {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
}

/// A row read back from the `Data` table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: i64,
    pub time: String,
    pub frequency: i64,
    pub bandwidth: i64,
    pub power: f64,
}

pub struct PowerStore {
    pool: SqlitePool,
    path: PathBuf,
    rt: Runtime,
}

impl PowerStore {
    /// Open or create the database at `path` and make sure `Data` exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(StoreError::Runtime)?;

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete);

        let pool = rt
            .block_on(async {
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect_with(options)
                    .await?;
                sqlx::query(CREATE_TABLE).execute(&pool).await?;
                Ok::<_, sqlx::Error>(pool)
            })
            .map_err(|source| StoreError::Sql {
                path: path.clone(),
                source,
            })?;

        log::info!("opened database {}", path.display());
        Ok(Self { pool, path, rt })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert every reading in one transaction. Returns the number of rows
    /// written; nothing is written if any insert fails.
    pub fn append(&self, readings: &[PowerReading]) -> Result<usize, StoreError> {
        self.rt
            .block_on(async {
                let mut tx = self.pool.begin().await?;
                for r in readings {
                    sqlx::query(INSERT_READING)
                        .bind(&r.time)
                        .bind(r.frequency)
                        .bind(r.bandwidth)
                        .bind(r.power)
                        .execute(&mut *tx)
                        .await?;
                }
                tx.commit().await?;
                Ok::<_, sqlx::Error>(readings.len())
            })
            .map_err(|source| self.sql_error(source))
    }

    pub fn row_count(&self) -> Result<i64, StoreError> {
        self.rt
            .block_on(
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM Data").fetch_one(&self.pool),
            )
            .map_err(|source| self.sql_error(source))
    }

    /// All rows in insertion order.
    pub fn rows(&self) -> Result<Vec<StoredRow>, StoreError> {
        let rows = self
            .rt
            .block_on(
                sqlx::query_as::<_, (i64, String, i64, i64, f64)>(
                    "SELECT Id, Time, Frequency, Bandwidth, Power FROM Data ORDER BY Id",
                )
                .fetch_all(&self.pool),
            )
            .map_err(|source| self.sql_error(source))?;

        Ok(rows
            .into_iter()
            .map(|(id, time, frequency, bandwidth, power)| StoredRow {
                id,
                time,
                frequency,
                bandwidth,
                power,
            })
            .collect())
    }

    /// Close the connection. Dropping the store has the same effect.
    pub fn close(self) {}

    fn sql_error(&self, source: sqlx::Error) -> StoreError {
        StoreError::Sql {
            path: self.path.clone(),
            source,
        }
    }
}

impl Drop for PowerStore {
    fn drop(&mut self) {
        self.rt.block_on(self.pool.close());
        log::debug!("closed database {}", self.path.display());
    }
}
