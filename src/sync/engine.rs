//! Client sync cycle.
//!
//! One cycle is: snapshot the dirty dates, upload their logs, apply the
//! server's post-merge logs back to the cache, then download everything that
//! changed since the last checkpoint and replace it locally. Plans are always
//! taken from the server verbatim; the cache never merges them. Any failure
//! marks the cycle failed and leaves the dirty set for the next attempt.
//!
//! Other processes share the persisted sync session, so it is re-read right
//! before every save; the cycle only ever removes the dates the server
//! confirmed, never a dirty mark added while it was in flight.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::client::{SyncClientError, SyncHttpClient};
use super::protocol::UploadRequest;
use super::state::SyncStatus;
use crate::db::{Reader, Writer};

const SERVER_ACTOR: &str = "server";

#[derive(Debug)]
pub struct SyncReport {
    pub uploaded: usize,
    pub upload_failed: usize,
    pub plans_downloaded: usize,
    pub logs_downloaded: usize,
    pub status: SyncStatus,
}

pub struct SyncEngine {
    client: SyncHttpClient,
    reader: Reader,
    writer: Writer,
    client_name: Option<String>,
}

struct CycleResult {
    applied: Vec<NaiveDate>,
    server_time: DateTime<Utc>,
    uploaded: usize,
    upload_failed: usize,
    plans_downloaded: usize,
    logs_downloaded: usize,
}

impl SyncEngine {
    pub fn new(
        client: SyncHttpClient,
        reader: Reader,
        writer: Writer,
        client_name: Option<String>,
    ) -> Self {
        Self {
            client,
            reader,
            writer,
            client_name,
        }
    }

    /// Runs one sync cycle, persisting state transitions either way.
    pub async fn run_cycle(&self) -> Result<SyncReport, SyncClientError> {
        let mut session = self.reader.load_sync_session().await?;

        let snapshot = session.state.begin_sync();
        let checkpoint = session.last_server_sync_time;
        let known_id = session.client_id.clone();

        let outcome = async {
            let client_id = match known_id {
                Some(id) => id,
                None => {
                    let resp = self.client.register(None, self.client_name.as_deref()).await?;
                    tracing::info!(client_id = %resp.client_id, "registered with sync server");
                    self.store_client_id(&resp.client_id).await?;
                    resp.client_id
                }
            };
            self.cycle(&client_id, &snapshot, checkpoint).await
        }
        .await;

        match outcome {
            Ok(result) => {
                let status = self.persist_success(&result.applied, result.server_time).await?;
                tracing::info!(
                    uploaded = result.uploaded,
                    plans = result.plans_downloaded,
                    logs = result.logs_downloaded,
                    "sync cycle complete"
                );
                Ok(SyncReport {
                    uploaded: result.uploaded,
                    upload_failed: result.upload_failed,
                    plans_downloaded: result.plans_downloaded,
                    logs_downloaded: result.logs_downloaded,
                    status,
                })
            }
            Err(e) => {
                self.persist_failure().await?;
                tracing::warn!(error = %e, "sync cycle failed");
                Err(e)
            }
        }
    }

    async fn store_client_id(&self, id: &str) -> Result<(), SyncClientError> {
        let mut session = self.reader.load_sync_session().await?;
        session.client_id = Some(id.to_string());
        self.writer.save_sync_session(&session).await?;
        Ok(())
    }

    /// Re-reads the session before saving, so a date dirtied by another
    /// process during the cycle survives; only the confirmed dates clear.
    async fn persist_success(
        &self,
        applied: &[NaiveDate],
        server_time: DateTime<Utc>,
    ) -> Result<SyncStatus, SyncClientError> {
        let mut session = self.reader.load_sync_session().await?;
        session.state.complete_sync(applied, server_time);
        session.last_server_sync_time = Some(server_time);
        self.writer.save_sync_session(&session).await?;
        Ok(session.state.status())
    }

    async fn persist_failure(&self) -> Result<(), SyncClientError> {
        let mut session = self.reader.load_sync_session().await?;
        session.state.fail_sync();
        self.writer.save_sync_session(&session).await?;
        Ok(())
    }

    async fn cycle(
        &self,
        client_id: &str,
        dirty: &BTreeSet<NaiveDate>,
        checkpoint: Option<DateTime<Utc>>,
    ) -> Result<CycleResult, SyncClientError> {
        let mut applied = Vec::new();
        let mut uploaded = 0;
        let mut upload_failed = 0;

        if !dirty.is_empty() {
            let mut logs = BTreeMap::new();
            for date in dirty {
                if let Some(record) = self.reader.get_log(*date).await? {
                    logs.insert(
                        crate::db::format_date(*date),
                        serde_json::to_value(&record.log)
                            .map_err(crate::error::StoreError::from)?,
                    );
                } else {
                    // Nothing stored for the date; treat it as settled.
                    applied.push(*date);
                }
            }

            if !logs.is_empty() {
                let request = UploadRequest {
                    client_id: client_id.to_string(),
                    logs,
                };
                let resp = self.client.upload(&request).await?;
                uploaded = resp.applied_logs.len();
                upload_failed = resp.failed.len();
                applied.extend(resp.applied_logs.keys().copied());

                // The server's post-merge logs are authoritative for the
                // dates we just uploaded.
                for (date, log) in &resp.applied_logs {
                    let ts = resp.log_times.get(date).copied().unwrap_or(resp.server_time);
                    self.writer
                        .replace_log(*date, log, Some(SERVER_ACTOR), ts)
                        .await?;
                }
            }
        }

        let download = self.client.download(Some(client_id), checkpoint).await?;
        for (date, plan) in &download.plans {
            let ts = download
                .plan_times
                .get(date)
                .copied()
                .unwrap_or(download.server_time);
            self.writer
                .set_normalized_plan(*date, plan, Some(SERVER_ACTOR), ts)
                .await?;
        }
        for (date, log) in &download.logs {
            // A date still waiting to upload keeps its local log; taking the
            // server copy now would drop the pending edit.
            if dirty.contains(date) && !applied.contains(date) {
                continue;
            }
            let ts = download
                .log_times
                .get(date)
                .copied()
                .unwrap_or(download.server_time);
            self.writer
                .replace_log(*date, log, Some(SERVER_ACTOR), ts)
                .await?;
        }

        Ok(CycleResult {
            applied,
            server_time: download.server_time,
            uploaded,
            upload_failed,
            plans_downloaded: download.plans.len(),
            logs_downloaded: download.logs.len(),
        })
    }
}
