//! Durable sync session storage.
//!
//! The client id, the server checkpoint, and the dirty-date state live in the
//! local cache database so pending uploads survive restarts. Everything else
//! in the cache is disposable and rebuildable from a full download.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SyncState;
use crate::db::{Reader, Writer};
use crate::error::StoreError;

const SESSION_KEY: &str = "session";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSession {
    pub client_id: Option<String>,
    /// Server time of the last completed cycle; the next download window
    /// opens here.
    pub last_server_sync_time: Option<DateTime<Utc>>,
    pub state: SyncState,
}

impl Writer {
    pub async fn save_sync_session(&self, session: &SyncSession) -> Result<(), StoreError> {
        let value = serde_json::to_string(session)?;
        sqlx::query(
            "INSERT INTO sync_state (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(SESSION_KEY)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl Reader {
    pub async fn load_sync_session(&self) -> Result<SyncSession, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM sync_state WHERE key = ?")
            .bind(SESSION_KEY)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some((value,)) => Ok(serde_json::from_str(&value)?),
            None => Ok(SyncSession::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    #[tokio::test]
    async fn test_session_roundtrip() {
        let (reader, writer) = init_test_db().await;

        let loaded = reader.load_sync_session().await.unwrap();
        assert!(loaded.client_id.is_none());

        let mut session = SyncSession::default();
        session.client_id = Some("client-a".to_string());
        session.last_server_sync_time = Some("2026-03-02T10:00:00Z".parse().unwrap());
        session.state.apply_local_edit("2026-03-03".parse().unwrap());
        writer.save_sync_session(&session).await.unwrap();

        let loaded = reader.load_sync_session().await.unwrap();
        assert_eq!(loaded.client_id.as_deref(), Some("client-a"));
        assert_eq!(loaded.last_server_sync_time, session.last_server_sync_time);
        assert_eq!(loaded.state.dirty_dates().len(), 1);
    }
}
