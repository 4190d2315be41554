//! HTTP client for the sync endpoints.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use super::protocol::{
    DownloadResponse, RegisterRequest, RegisterResponse, StatusResponse, UploadRequest,
    UploadResponse,
};
use crate::error::StoreError;

#[derive(Debug)]
pub enum SyncClientError {
    /// Request never produced a usable response (refused, DNS, timeout).
    Network(reqwest::Error),
    /// The server answered with a non-success status.
    Server { status: u16, message: String },
    /// Local cache failure while applying sync results.
    Storage(StoreError),
    /// No sync server configured.
    NotConfigured,
}

impl fmt::Display for SyncClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncClientError::Network(e) => write!(f, "Network error: {}", e),
            SyncClientError::Server { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            SyncClientError::Storage(e) => write!(f, "Local storage error: {}", e),
            SyncClientError::NotConfigured => write!(f, "No sync server configured"),
        }
    }
}

impl std::error::Error for SyncClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncClientError::Network(e) => Some(e),
            SyncClientError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncClientError {
    fn from(e: reqwest::Error) -> Self {
        SyncClientError::Network(e)
    }
}

impl From<StoreError> for SyncClientError {
    fn from(e: StoreError) -> Self {
        SyncClientError::Storage(e)
    }
}

pub struct SyncHttpClient {
    http: reqwest::Client,
    base_url: String,
}

impl SyncHttpClient {
    /// `timeout` bounds every request; there is no other limit on a sync
    /// cycle.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends the existing id when there is one, so the server refreshes its
    /// registry entry instead of minting a new client.
    pub async fn register(
        &self,
        client_id: Option<&str>,
        client_name: Option<&str>,
    ) -> Result<RegisterResponse, SyncClientError> {
        let request = RegisterRequest {
            client_id: client_id.map(String::from),
            client_name: client_name.map(String::from),
        };
        let resp = self
            .http
            .post(format!("{}/api/register", self.base_url))
            .json(&request)
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }

    pub async fn download(
        &self,
        client_id: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<DownloadResponse, SyncClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(id) = client_id {
            query.push(("clientId", id.to_string()));
        }
        if let Some(since) = since {
            query.push(("since", since.to_rfc3339()));
        }

        let resp = self
            .http
            .get(format!("{}/api/sync", self.base_url))
            .query(&query)
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }

    pub async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, SyncClientError> {
        let resp = self
            .http
            .post(format!("{}/api/sync", self.base_url))
            .json(request)
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }

    pub async fn status(&self) -> Result<StatusResponse, SyncClientError> {
        let resp = self
            .http
            .get(format!("{}/api/status", self.base_url))
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }
}

async fn checked(resp: reqwest::Response) -> Result<reqwest::Response, SyncClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(SyncClientError::Server {
        status: status.as_u16(),
        message,
    })
}
