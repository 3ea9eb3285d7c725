//! Report collection served over HTTP.
//!
//! Speaks the realtime-database REST shape: `POST {base}/{path}.json` with a
//! record returns `{"name": key}`, and `GET {base}/{path}.json` returns a
//! key to record map, or `null` for an empty collection.

use std::time::Duration;

use async_trait::async_trait;
use reportline_common::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::report_store::{
    ListenerRegistry, ReportStore, ReportSubscription, DEFAULT_CHANNEL_CAPACITY,
};
use crate::models::{decode_collection, now_millis, Report, ReportList};

/// Default polling interval for subscriptions.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// Remote report collection client.
///
/// Subscriptions poll the endpoint and emit only when the snapshot changes.
#[derive(Clone)]
pub struct HttpReportStore {
    client: Client,
    collection_url: Url,
    poll_interval: Duration,
    listeners: ListenerRegistry,
    capacity: usize,
}

impl HttpReportStore {
    /// Create a client for `{base_url}/{path}.json`.
    pub fn new(base_url: &str, path: &str) -> AppResult<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        let collection_url = base.join(&format!("{}.json", path.trim_matches('/')))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            collection_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            listeners: ListenerRegistry::new(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
        })
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Collection endpoint.
    #[must_use]
    pub const fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn active_listeners(&self) -> usize {
        self.listeners.active()
    }

    /// Raw collection document. An empty body reads as `null`.
    async fn get_document(client: &Client, url: &Url) -> AppResult<Value> {
        let response = client
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = %status, body = %body, "Collection read failed");
            return Err(AppError::Fetch(format!("HTTP {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| AppError::Fetch(e.to_string()))
    }
}

#[async_trait]
impl ReportStore for HttpReportStore {
    fn subscribe(&self) -> ReportSubscription {
        let client = self.client.clone();
        let url = self.collection_url.clone();
        let interval = self.poll_interval;

        ReportSubscription::spawn(&self.listeners, self.capacity, move |tx| async move {
            // Compare raw documents. Decoding stamps missing timestamps with the read time.
            let mut last: Option<Value> = None;
            loop {
                match Self::get_document(&client, &url).await {
                    Ok(document) => {
                        if last.as_ref() != Some(&document) {
                            let reports = decode_collection(&document, now_millis());
                            if tx.send(Ok(reports)).await.is_err() {
                                break;
                            }
                            last = Some(document);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Report subscription failed");
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                }
                tokio::time::sleep(interval).await;
            }
        })
    }

    async fn fetch_once(&self) -> AppResult<ReportList> {
        let document = Self::get_document(&self.client, &self.collection_url).await?;
        Ok(decode_collection(&document, now_millis()))
    }

    async fn append(&self, report: Report) -> AppResult<String> {
        if let Some(id) = &report.id {
            tracing::debug!(id = %id, "Ignoring caller-supplied report key");
        }

        let response = self
            .client
            .post(self.collection_url.clone())
            .json(&report.to_record())
            .send()
            .await
            .map_err(|e| AppError::Submission(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                url = %self.collection_url,
                status = %status,
                body = %body,
                "Report submission failed"
            );
            return Err(AppError::Submission(format!("HTTP {status}")));
        }

        let pushed: PushResponse = response
            .json()
            .await
            .map_err(|e| AppError::Submission(e.to_string()))?;

        tracing::info!(id = %pushed.name, "Report submitted");
        Ok(pushed.name)
    }
}
