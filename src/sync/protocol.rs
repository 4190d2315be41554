//! Wire types for the sync endpoints.
//!
//! Shared by the server handlers and the client. Field names are camelCase
//! on the wire; timestamps are RFC 3339 UTC. Plans and logs travel as maps
//! keyed by date. Upload log payloads stay as raw JSON values so one
//! malformed date degrades to a per-date failure instead of failing the
//! whole request body.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::{Plan, SessionLog};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Present on re-registration; the server echoes it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub client_id: String,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadParams {
    #[serde(default)]
    pub client_id: Option<String>,
    /// Exclusive lower bound; omitted means the trailing 30 days.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub server_time: DateTime<Utc>,
    pub plans: BTreeMap<NaiveDate, Plan>,
    pub logs: BTreeMap<NaiveDate, SessionLog>,
    /// Modification time per date in `plans`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plan_times: BTreeMap<NaiveDate, DateTime<Utc>>,
    /// Newest record time per date in `logs`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub log_times: BTreeMap<NaiveDate, DateTime<Utc>>,
}

/// Keys of `logs` are date strings, validated per entry on the server, not
/// by the request deserializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub client_id: String,
    pub logs: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub server_time: DateTime<Utc>,
    /// Authoritative post-merge log per applied date.
    pub applied_logs: BTreeMap<NaiveDate, SessionLog>,
    /// Newest record time per date in `applied_logs`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub log_times: BTreeMap<NaiveDate, DateTime<Utc>>,
    /// Per-date failures, keyed by the date string as sent.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failed: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub server_time: DateTime<Utc>,
    pub sessions: i64,
    pub session_logs: i64,
    pub clients: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,
}
