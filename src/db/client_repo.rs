//! Client registry and sync bookkeeping.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{format_ts, parse_ts, Reader, Writer};
use crate::error::StoreError;

#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub id: String,
    pub name: Option<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerCounts {
    pub sessions: i64,
    pub session_logs: i64,
    pub clients: i64,
}

impl Writer {
    /// Registers a client or refreshes its last-seen time. Re-registering
    /// with a name keeps the newest non-null name.
    pub async fn register_client(
        &self,
        id: &str,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO clients (id, name, last_seen_at) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = COALESCE(excluded.name, name),
                last_seen_at = excluded.last_seen_at",
        )
        .bind(id)
        .bind(name)
        .bind(format_ts(now))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn touch_client(&self, id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE clients SET last_seen_at = ? WHERE id = ?")
            .bind(format_ts(now))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sync_meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl Reader {
    pub async fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM sync_meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    pub async fn list_clients(&self) -> Result<Vec<ClientInfo>, StoreError> {
        let rows: Vec<(String, Option<String>, Option<String>)> =
            sqlx::query_as("SELECT id, name, last_seen_at FROM clients ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(id, name, seen)| {
                Ok(ClientInfo {
                    id,
                    name,
                    last_seen_at: seen.as_deref().map(parse_ts).transpose()?,
                })
            })
            .collect()
    }

    pub async fn counts(&self) -> Result<ServerCounts, StoreError> {
        let sessions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM workout_sessions")
            .fetch_one(&self.pool)
            .await?;
        let session_logs: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM workout_session_logs")
            .fetch_one(&self.pool)
            .await?;
        let clients: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await?;

        Ok(ServerCounts {
            sessions: sessions.0,
            session_logs: session_logs.0,
            clients: clients.0,
        })
    }
}
