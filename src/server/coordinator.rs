//! Sync coordinator.
//!
//! Server-side sync semantics, independent of the HTTP layer. The server's
//! receipt time is the authoritative write timestamp for every upload;
//! client clocks are never trusted for ordering.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::db::{Reader, Writer};
use crate::error::StoreError;
use crate::models::SessionLog;
use crate::sync::protocol::{
    DownloadResponse, RegisterResponse, StatusResponse, UploadRequest, UploadResponse,
};

const LAST_SYNC_KEY: &str = "last_server_sync_time";
const DEFAULT_WINDOW_DAYS: i64 = 30;

pub struct Coordinator {
    reader: Reader,
    writer: Writer,
}

impl Coordinator {
    pub fn new(reader: Reader, writer: Writer) -> Self {
        Self { reader, writer }
    }

    /// Issues a new client id, or refreshes the registry entry when the
    /// client already has one. The id comes back either way.
    pub async fn register(
        &self,
        client_id: Option<&str>,
        client_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<RegisterResponse, StoreError> {
        let client_id = match client_id {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        self.writer.register_client(&client_id, client_name, now).await?;

        tracing::info!(client_id = %client_id, name = ?client_name, "registered sync client");
        Ok(RegisterResponse {
            client_id,
            server_time: now,
        })
    }

    /// Plans and logs changed in `(since, now]`; without `since`, everything
    /// from the trailing 30 days.
    pub async fn download(
        &self,
        since: Option<DateTime<Utc>>,
        client_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DownloadResponse, StoreError> {
        let cutoff = since.unwrap_or(now - Duration::days(DEFAULT_WINDOW_DAYS));

        let mut plans = BTreeMap::new();
        let mut plan_times = BTreeMap::new();
        for r in self.reader.plans_modified_since(cutoff).await? {
            plan_times.insert(r.date, r.last_modified);
            plans.insert(r.date, r.plan);
        }

        let mut logs = BTreeMap::new();
        let mut log_times = BTreeMap::new();
        for r in self.reader.logs_modified_since(cutoff).await? {
            log_times.insert(r.date, r.last_modified);
            logs.insert(r.date, r.log);
        }

        if let Some(id) = client_id {
            self.writer.touch_client(id, now).await?;
        }

        tracing::debug!(
            plans = plans.len(),
            logs = logs.len(),
            since = %cutoff,
            "serving download"
        );
        Ok(DownloadResponse {
            server_time: now,
            plans,
            logs,
            plan_times,
            log_times,
        })
    }

    /// Merges uploaded logs date by date. A date that fails validation lands
    /// in `failed` without disturbing the others; only a storage failure
    /// aborts the request. Applied dates come back with their authoritative
    /// post-merge logs.
    pub async fn upload(
        &self,
        request: &UploadRequest,
        now: DateTime<Utc>,
    ) -> Result<UploadResponse, StoreError> {
        let mut applied_dates = Vec::new();
        let mut failed = BTreeMap::new();

        for (date_raw, payload) in &request.logs {
            let date = match date_raw.parse::<chrono::NaiveDate>() {
                Ok(d) => d,
                Err(e) => {
                    failed.insert(date_raw.clone(), format!("invalid date: {}", e));
                    continue;
                }
            };
            let log: SessionLog = match serde_json::from_value(payload.clone()) {
                Ok(l) => l,
                Err(e) => {
                    failed.insert(date_raw.clone(), format!("invalid log payload: {}", e));
                    continue;
                }
            };

            match self
                .writer
                .apply_log(date, &log, Some(&request.client_id), now)
                .await
            {
                Ok(outcome) => {
                    tracing::debug!(
                        %date,
                        applied = outcome.applied.len(),
                        ignored = outcome.ignored.len(),
                        "merged uploaded log"
                    );
                    applied_dates.push(date);
                }
                Err(StoreError::Storage(e)) => return Err(StoreError::Storage(e)),
                Err(e) => {
                    failed.insert(date_raw.clone(), e.to_string());
                }
            }
        }

        let mut applied_logs = BTreeMap::new();
        let mut log_times = BTreeMap::new();
        for date in &applied_dates {
            if let Some(record) = self.reader.get_log(*date).await? {
                log_times.insert(record.date, record.last_modified);
                applied_logs.insert(record.date, record.log);
            }
        }

        self.writer
            .set_meta(LAST_SYNC_KEY, &crate::db::format_ts(now))
            .await?;
        self.writer.touch_client(&request.client_id, now).await?;

        if !failed.is_empty() {
            tracing::warn!(failed = failed.len(), "upload had per-date failures");
        }
        Ok(UploadResponse {
            server_time: now,
            applied_logs,
            log_times,
            failed,
        })
    }

    pub async fn status(&self, now: DateTime<Utc>) -> Result<StatusResponse, StoreError> {
        let counts = self.reader.counts().await?;
        let last_sync_time = match self.reader.get_meta(LAST_SYNC_KEY).await? {
            Some(raw) => Some(crate::db::parse_ts(&raw)?),
            None => None,
        };

        Ok(StatusResponse {
            status: "ok".to_string(),
            server_time: now,
            sessions: counts.sessions,
            session_logs: counts.session_logs,
            clients: counts.clients,
            last_sync_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::models::RawPlan;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    async fn coordinator() -> Coordinator {
        let (reader, writer) = init_test_db().await;
        Coordinator::new(reader, writer)
    }

    fn log_payload(note: &str) -> Value {
        json!({
            "session_feedback": {},
            "ex_1": {"completed": true, "user_note": note}
        })
    }

    fn upload_request(client_id: &str, entries: Vec<(&str, Value)>) -> UploadRequest {
        UploadRequest {
            client_id: client_id.to_string(),
            logs: entries
                .into_iter()
                .map(|(date, log)| (date.to_string(), log))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_register_issues_unique_ids() {
        let coord = coordinator().await;
        let now = t("2026-03-01T10:00:00Z");

        let a = coord.register(None, Some("laptop"), now).await.unwrap();
        let b = coord.register(None, None, now).await.unwrap();
        assert_ne!(a.client_id, b.client_id);

        let status = coord.status(now).await.unwrap();
        assert_eq!(status.clients, 2);
    }

    #[tokio::test]
    async fn test_reregister_echoes_id_and_refreshes_last_seen() {
        let (reader, writer) = init_test_db().await;
        let coord = Coordinator::new(reader.clone(), writer);

        let first = coord
            .register(None, Some("laptop"), t("2026-03-01T10:00:00Z"))
            .await
            .unwrap();
        let again = coord
            .register(Some(&first.client_id), None, t("2026-03-01T11:00:00Z"))
            .await
            .unwrap();
        assert_eq!(again.client_id, first.client_id);

        let clients = reader.list_clients().await.unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].name.as_deref(), Some("laptop"));
        assert_eq!(clients[0].last_seen_at, Some(t("2026-03-01T11:00:00Z")));
    }

    #[tokio::test]
    async fn test_upload_partial_failure() {
        let coord = coordinator().await;
        let client = coord.register(None, None, t("2026-03-01T09:00:00Z")).await.unwrap();

        let request = upload_request(
            &client.client_id,
            vec![
                ("2026-03-02", log_payload("good")),
                ("not-a-date", json!({})),
                ("2026-03-03", json!("not an object")),
                ("2026-03-04", log_payload("also good")),
            ],
        );

        let resp = coord.upload(&request, t("2026-03-05T10:00:00Z")).await.unwrap();
        let applied: Vec<_> = resp.applied_logs.keys().copied().collect();
        assert_eq!(applied, vec![d("2026-03-02"), d("2026-03-04")]);
        assert_eq!(resp.failed.len(), 2);
        assert!(resp.failed.contains_key("not-a-date"));
        assert!(resp.failed.contains_key("2026-03-03"));
    }

    #[tokio::test]
    async fn test_upload_uses_server_time_for_merge() {
        let coord = coordinator().await;
        let client = coord.register(None, None, t("2026-03-01T09:00:00Z")).await.unwrap();

        // First upload arrives later in server time, second earlier payload
        // arrives after it; the second upload still wins because receipt time
        // is what orders writes.
        let first = upload_request(
            &client.client_id,
            vec![("2026-03-02", log_payload("first arrival"))],
        );
        coord.upload(&first, t("2026-03-05T10:00:00Z")).await.unwrap();

        let second = upload_request(
            &client.client_id,
            vec![("2026-03-02", log_payload("second arrival"))],
        );
        let resp = coord.upload(&second, t("2026-03-05T11:00:00Z")).await.unwrap();

        let log = &resp.applied_logs[&d("2026-03-02")];
        assert_eq!(log.exercises["ex_1"].user_note.as_deref(), Some("second arrival"));
    }

    #[tokio::test]
    async fn test_upload_then_download_round_trip() {
        let (reader, writer) = init_test_db().await;
        let coord = Coordinator::new(reader, writer.clone());

        let raw: RawPlan = serde_json::from_str(
            r#"{"blocks": [{"block_type": "strength",
                "exercises": [{"name": "Squat", "sets": 3}]}]}"#,
        )
        .unwrap();
        writer
            .set_plan(d("2026-03-02"), &raw, Some("planner"), t("2026-03-01T08:00:00Z"))
            .await
            .unwrap();

        let client = coord.register(None, None, t("2026-03-01T09:00:00Z")).await.unwrap();
        let request = upload_request(&client.client_id, vec![("2026-03-02", log_payload("done"))]);
        coord.upload(&request, t("2026-03-02T18:00:00Z")).await.unwrap();

        // A second client downloading since before the edits sees both the
        // plan and the merged log, keyed by date.
        let resp = coord
            .download(
                Some(t("2026-03-01T00:00:00Z")),
                Some(&client.client_id),
                t("2026-03-02T19:00:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(resp.plans.len(), 1);
        let plan = &resp.plans[&d("2026-03-02")];
        assert_eq!(plan.blocks[0].exercises[0].id, "strength_0_1");
        assert_eq!(resp.logs.len(), 1);
        assert!(resp.logs[&d("2026-03-02")].exercises["ex_1"].completed);
        assert_eq!(
            resp.log_times[&d("2026-03-02")],
            t("2026-03-02T18:00:00Z")
        );

        // Nothing changed after the log merge.
        let resp = coord
            .download(Some(t("2026-03-02T18:00:00Z")), None, t("2026-03-02T20:00:00Z"))
            .await
            .unwrap();
        assert!(resp.plans.is_empty());
        assert!(resp.logs.is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_last_sync_checkpoint() {
        let coord = coordinator().await;
        let client = coord.register(None, None, t("2026-03-01T09:00:00Z")).await.unwrap();

        let status = coord.status(t("2026-03-01T09:30:00Z")).await.unwrap();
        assert!(status.last_sync_time.is_none());

        let request = upload_request(&client.client_id, vec![("2026-03-02", log_payload("n"))]);
        coord.upload(&request, t("2026-03-02T10:00:00Z")).await.unwrap();

        let status = coord.status(t("2026-03-02T11:00:00Z")).await.unwrap();
        assert_eq!(status.last_sync_time, Some(t("2026-03-02T10:00:00Z")));
        assert_eq!(status.session_logs, 1);
    }
}
