//! Report collection access.
//!
//! A store exposes three operations over one append-only collection: a live
//! subscription, a one-shot fetch, and append. Keys are assigned by the store
//! and are never part of the stored payload.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use reportline_common::{AppError, AppResult, IdGenerator};
use reportline_db::entities::report;
use reportline_db::repositories::ReportRepository;
use sea_orm::Set;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::models::{now_millis, sort_newest_first, Report, ReportList, ANONYMOUS_NICKNAME};

/// Default buffer size for subscription and change-feed channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Access to a report collection.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Open a live subscription. The first emission is the current snapshot.
    ///
    /// Must be called within a tokio runtime.
    fn subscribe(&self) -> ReportSubscription;

    /// Read the collection once.
    async fn fetch_once(&self) -> AppResult<ReportList>;

    /// Append a report, returning its assigned key. Any caller-supplied key is ignored.
    async fn append(&self, report: Report) -> AppResult<String>;
}

/// Counts live subscriptions held against a store.
#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry {
    count: Arc<AtomicUsize>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn active(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn register(&self) -> ListenerGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        ListenerGuard {
            count: self.count.clone(),
        }
    }
}

/// Released on drop.
#[derive(Debug)]
struct ListenerGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Live stream of collection snapshots.
///
/// Yields `Ok` snapshots in order. A failure is yielded once as `Err` and
/// then the stream ends. After [`unsubscribe`](Self::unsubscribe) (or drop)
/// nothing more is yielded and the listener is released exactly once.
#[derive(Debug)]
pub struct ReportSubscription {
    rx: mpsc::Receiver<AppResult<ReportList>>,
    task: JoinHandle<()>,
    listener: Option<ListenerGuard>,
}

impl ReportSubscription {
    /// Start a producer task feeding a new subscription.
    pub fn spawn<F, Fut>(registry: &ListenerRegistry, capacity: usize, producer: F) -> Self
    where
        F: FnOnce(mpsc::Sender<AppResult<ReportList>>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let listener = registry.register();
        let task = tokio::spawn(producer(tx));
        Self {
            rx,
            task,
            listener: Some(listener),
        }
    }

    /// Stop the subscription. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if self.listener.take().is_some() {
            self.task.abort();
            self.rx.close();
            tracing::debug!("Report subscription closed");
        }
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has run.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.listener.is_none()
    }
}

impl Stream for ReportSubscription {
    type Item = AppResult<ReportList>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.listener.is_none() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl Drop for ReportSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Report collection backed by the local database.
///
/// Appends signal a change feed; each subscriber re-reads the collection on
/// every signal, so snapshots are always complete and in append order.
#[derive(Clone)]
pub struct DbReportStore {
    repo: ReportRepository,
    collection: String,
    id_gen: IdGenerator,
    changes: broadcast::Sender<String>,
    listeners: ListenerRegistry,
    capacity: usize,
}

impl DbReportStore {
    #[must_use]
    pub fn new(repo: ReportRepository, collection: impl Into<String>) -> Self {
        Self::with_capacity(repo, collection, DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(
        repo: ReportRepository,
        collection: impl Into<String>,
        capacity: usize,
    ) -> Self {
        let capacity = capacity.max(1);
        let (changes, _) = broadcast::channel(capacity);
        Self {
            repo,
            collection: collection.into(),
            id_gen: IdGenerator::new(),
            changes,
            listeners: ListenerRegistry::new(),
            capacity,
        }
    }

    /// Collection path.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn active_listeners(&self) -> usize {
        self.listeners.active()
    }

    async fn read_snapshot(repo: &ReportRepository, collection: &str) -> AppResult<ReportList> {
        let rows = repo
            .list(collection)
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        let now = now_millis();
        let mut reports: ReportList = rows.into_iter().map(|row| from_row(row, now)).collect();
        sort_newest_first(&mut reports);
        Ok(reports)
    }
}

/// Stored payload of a row as a wire record. Empty columns are omitted.
fn row_record(row: &report::Model) -> Value {
    let mut record = Map::new();
    let mut put = |field: &str, value: Option<Value>| {
        if let Some(value) = value {
            record.insert(field.to_string(), value);
        }
    };
    put("type", row.report_type.clone().map(Value::String));
    put("description", row.description.clone().map(Value::String));
    put("location", row.location.clone().map(Value::String));
    put("imageUrl", row.image_url.clone().map(Value::String));
    put("nickname", row.nickname.clone().map(Value::String));
    put("timestamp", row.timestamp.map(Value::from));
    Value::Object(record)
}

fn from_row(row: report::Model, now: i64) -> Report {
    if row.report_type.is_none() || row.description.is_none() || row.location.is_none() {
        tracing::warn!(id = %row.id, "Report row is missing required fields, using defaults");
    }
    Report {
        id: Some(row.id),
        report_type: row.report_type.unwrap_or_default(),
        description: row.description.unwrap_or_default(),
        location: row.location.unwrap_or_default(),
        image_url: row.image_url,
        nickname: row
            .nickname
            .unwrap_or_else(|| ANONYMOUS_NICKNAME.to_string()),
        timestamp: row.timestamp.unwrap_or(now),
    }
}

#[async_trait]
impl ReportStore for DbReportStore {
    fn subscribe(&self) -> ReportSubscription {
        // Subscribe to the feed before the first read so no append is missed.
        let mut changes = self.changes.subscribe();
        let repo = self.repo.clone();
        let collection = self.collection.clone();

        ReportSubscription::spawn(&self.listeners, self.capacity, move |tx| async move {
            loop {
                match Self::read_snapshot(&repo, &collection).await {
                    Ok(reports) => {
                        if tx.send(Ok(reports)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(collection = %collection, error = %e, "Report subscription failed");
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                }

                match changes.recv().await {
                    Ok(id) => tracing::trace!(id = %id, "Collection changed"),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Subscription lagged, re-reading snapshot");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn fetch_once(&self) -> AppResult<ReportList> {
        Self::read_snapshot(&self.repo, &self.collection).await
    }

    async fn append(&self, report: Report) -> AppResult<String> {
        if let Some(id) = &report.id {
            tracing::debug!(id = %id, "Ignoring caller-supplied report key");
        }
        self.append_record(&report.to_record()).await
    }
}

impl DbReportStore {
    /// The collection as stored: a key to record map, or `null` when empty.
    ///
    /// Records are not defaulted, so repeated reads of an unchanged
    /// collection are identical.
    pub async fn fetch_document(&self) -> AppResult<Value> {
        let rows = self
            .repo
            .list(&self.collection)
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))?;
        if rows.is_empty() {
            return Ok(Value::Null);
        }
        Ok(Value::Object(
            rows.iter()
                .map(|row| (row.id.clone(), row_record(row)))
                .collect(),
        ))
    }

    /// Append a raw wire record as given. Missing or mistyped fields are
    /// stored empty and defaulted on read.
    pub async fn append_record(&self, record: &Value) -> AppResult<String> {
        let text = |field: &str| record.get(field).and_then(Value::as_str).map(str::to_string);

        let id = self.id_gen.generate();
        let model = report::ActiveModel {
            id: Set(id.clone()),
            collection: Set(self.collection.clone()),
            report_type: Set(text("type")),
            description: Set(text("description")),
            location: Set(text("location")),
            image_url: Set(text("imageUrl")),
            nickname: Set(text("nickname")),
            timestamp: Set(record.get("timestamp").and_then(Value::as_i64)),
        };

        self.repo
            .create(model)
            .await
            .map_err(|e| AppError::Submission(e.to_string()))?;

        tracing::info!(id = %id, collection = %self.collection, "Report appended");

        // No receivers is fine.
        let _ = self.changes.send(id.clone());
        Ok(id)
    }
}
