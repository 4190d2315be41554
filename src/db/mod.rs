//! SQLite storage.
//!
//! One pool per database file; the server and the client-side cache share the
//! same schema, so either can be rebuilt from the other through a full sync.
//! Access is split into [`Reader`] and [`Writer`] handles: read paths hold a
//! `Reader` and cannot reach a transaction, mutations go through `Writer`.
//! Repository operations live in `plan_repo`, `log_repo`, and `client_repo`
//! as impls on these two types.

mod client_repo;
mod log_repo;
mod plan_repo;

pub use client_repo::{ClientInfo, ServerCounts};
pub use log_repo::{ApplyOutcome, LogRecord};
pub use plan_repo::{ExercisePatch, PlanMetadata, PlanRecord, PlanSummary};

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

use crate::error::StoreError;

/// Read-only handle over a database.
#[derive(Clone)]
pub struct Reader {
    pub(crate) pool: SqlitePool,
}

/// Read-write handle over a database. The only type that opens transactions.
#[derive(Clone)]
pub struct Writer {
    pub(crate) pool: SqlitePool,
}

impl Writer {
    /// Derives the read half for callers that only need queries.
    pub fn reader(&self) -> Reader {
        Reader {
            pool: self.pool.clone(),
        }
    }
}

/// Opens (creating if needed) a database file, runs migrations, and returns
/// the split handles.
pub async fn init_db(db_path: &Path) -> Result<(Reader, Writer), sqlx::Error> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| sqlx::Error::Io(std::io::Error::other(e)))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok((
        Reader { pool: pool.clone() },
        Writer { pool },
    ))
}

/// In-memory database for tests.
#[cfg(test)]
pub(crate) async fn init_test_db() -> (Reader, Writer) {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    (Reader { pool: pool.clone() }, Writer { pool })
}

/// Timestamps are stored as RFC 3339 UTC strings so lexical order in SQL
/// matches chronological order.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Validation(format!("invalid stored timestamp '{}': {}", s, e)))
}

/// Calendar dates are stored as ISO `YYYY-MM-DD` strings.
pub(crate) fn format_date(d: chrono::NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(s: &str) -> Result<chrono::NaiveDate, StoreError> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| StoreError::Validation(format!("invalid date '{}': {}", s, e)))
}
